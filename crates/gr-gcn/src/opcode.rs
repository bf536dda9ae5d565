//! GCN opcodes

use crate::instruction::MimgModifiers;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Instruction family, deciding how an instruction interacts with EXEC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstCategory {
    ScalarAlu,
    ScalarMemory,
    FlowControl,
    VectorAlu,
    VectorMemory,
    VectorInterpolation,
    DataShare,
    Image,
    Export,
}

impl InstCategory {
    /// Whether instructions of this family execute per lane under EXEC
    pub fn is_per_lane(self) -> bool {
        !matches!(
            self,
            InstCategory::ScalarAlu | InstCategory::ScalarMemory | InstCategory::FlowControl
        )
    }
}

/// Decoded GCN opcode
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // SOP1 / SOP2 / SOPK
    S_MOV_B32,
    S_MOV_B64,
    S_MOVK_I32,
    S_CSELECT_B32,
    S_ADD_U32,
    S_SUB_U32,
    S_ADD_I32,
    S_SUB_I32,
    S_MUL_I32,
    S_AND_B32,
    S_OR_B32,
    S_XOR_B32,
    S_LSHL_B32,
    S_LSHR_B32,
    S_ASHR_I32,
    S_AND_B64,
    S_OR_B64,
    S_ANDN2_B64,
    S_AND_SAVEEXEC_B64,
    S_GETPC_B64,
    S_SETPC_B64,
    S_SWAPPC_B64,

    // SOPC
    S_CMP_EQ_I32,
    S_CMP_LG_I32,
    S_CMP_GT_I32,
    S_CMP_GE_I32,
    S_CMP_LT_I32,
    S_CMP_LE_I32,
    S_CMP_EQ_U32,
    S_CMP_LG_U32,
    S_CMP_GT_U32,
    S_CMP_GE_U32,
    S_CMP_LT_U32,
    S_CMP_LE_U32,

    // SOPP
    S_NOP,
    S_ENDPGM,
    S_BRANCH,
    S_CBRANCH_SCC0,
    S_CBRANCH_SCC1,
    S_CBRANCH_VCCZ,
    S_CBRANCH_VCCNZ,
    S_CBRANCH_EXECZ,
    S_CBRANCH_EXECNZ,
    S_BARRIER,
    S_WAITCNT,
    S_SENDMSG,

    // SMRD
    S_LOAD_DWORD,
    S_LOAD_DWORDX2,
    S_LOAD_DWORDX4,
    S_LOAD_DWORDX8,
    S_LOAD_DWORDX16,
    S_BUFFER_LOAD_DWORD,
    S_BUFFER_LOAD_DWORDX2,
    S_BUFFER_LOAD_DWORDX4,
    S_BUFFER_LOAD_DWORDX8,
    S_BUFFER_LOAD_DWORDX16,

    // VOP1 / VOP2 / VOP3
    V_MOV_B32,
    V_CNDMASK_B32,
    V_ADD_F32,
    V_SUB_F32,
    V_SUBREV_F32,
    V_MUL_F32,
    V_MIN_F32,
    V_MAX_F32,
    V_AND_B32,
    V_OR_B32,
    V_LSHLREV_B32,
    V_LSHRREV_B32,
    V_MAC_F32,
    V_ADD_I32,
    V_SUB_I32,
    V_CVT_PKRTZ_F16_F32,
    V_CVT_F32_I32,
    V_CVT_F32_U32,
    V_CVT_U32_F32,
    V_CVT_OFF_F32_I4,
    V_FRACT_F32,
    V_FLOOR_F32,
    V_RCP_F32,
    V_RSQ_F32,
    V_MAD_F32,
    V_FMA_F32,
    V_MED3_F32,
    V_SAD_U32,
    V_MUL_HI_U32,

    // VOPC
    V_CMP_F_F32,
    V_CMP_LT_F32,
    V_CMP_EQ_F32,
    V_CMP_LE_F32,
    V_CMP_GT_F32,
    V_CMP_LG_F32,
    V_CMP_GE_F32,
    V_CMP_TRU_F32,
    V_CMP_F_I32,
    V_CMP_LT_I32,
    V_CMP_EQ_I32,
    V_CMP_LE_I32,
    V_CMP_GT_I32,
    V_CMP_NE_I32,
    V_CMP_GE_I32,
    V_CMP_T_I32,
    V_CMP_F_U32,
    V_CMP_LT_U32,
    V_CMP_EQ_U32,
    V_CMP_LE_U32,
    V_CMP_GT_U32,
    V_CMP_NE_U32,
    V_CMP_GE_U32,
    V_CMP_T_U32,
    V_CMPX_F_U32,
    V_CMPX_LT_U32,
    V_CMPX_EQ_U32,
    V_CMPX_LE_U32,
    V_CMPX_GT_U32,
    V_CMPX_NE_U32,
    V_CMPX_GE_U32,
    V_CMPX_T_U32,

    // VINTRP
    V_INTERP_P1_F32,
    V_INTERP_P2_F32,

    // MUBUF / MTBUF
    BUFFER_LOAD_FORMAT_X,
    BUFFER_LOAD_FORMAT_XY,
    BUFFER_LOAD_FORMAT_XYZ,
    BUFFER_LOAD_FORMAT_XYZW,
    BUFFER_STORE_FORMAT_X,
    BUFFER_STORE_FORMAT_XY,
    BUFFER_STORE_FORMAT_XYZ,
    BUFFER_STORE_FORMAT_XYZW,
    BUFFER_ATOMIC_ADD,
    TBUFFER_LOAD_FORMAT_X,
    TBUFFER_LOAD_FORMAT_XY,
    TBUFFER_LOAD_FORMAT_XYZ,
    TBUFFER_LOAD_FORMAT_XYZW,
    TBUFFER_STORE_FORMAT_X,
    TBUFFER_STORE_FORMAT_XY,
    TBUFFER_STORE_FORMAT_XYZ,
    TBUFFER_STORE_FORMAT_XYZW,

    // DS
    DS_READ_B32,
    DS_READ2_B32,
    DS_READ_I8,
    DS_READ_U8,
    DS_READ_I16,
    DS_READ_U16,
    DS_READ_B64,
    DS_WRITE_B32,
    DS_WRITE2_B32,
    DS_WRITE_B8,
    DS_WRITE_B16,
    DS_WRITE_B64,

    // MIMG
    IMAGE_SAMPLE,
    IMAGE_SAMPLE_L,
    IMAGE_SAMPLE_B,
    IMAGE_SAMPLE_LZ,
    IMAGE_SAMPLE_C,
    IMAGE_SAMPLE_C_LZ,
    IMAGE_SAMPLE_O,
    IMAGE_SAMPLE_D,
    IMAGE_GET_RESINFO,
    IMAGE_STORE,

    // EXP
    EXP,
}

impl Opcode {
    pub fn category(self) -> InstCategory {
        use Opcode::*;
        match self {
            S_MOV_B32 | S_MOV_B64 | S_MOVK_I32 | S_CSELECT_B32 | S_ADD_U32 | S_SUB_U32
            | S_ADD_I32 | S_SUB_I32 | S_MUL_I32 | S_AND_B32 | S_OR_B32 | S_XOR_B32
            | S_LSHL_B32 | S_LSHR_B32 | S_ASHR_I32 | S_AND_B64 | S_OR_B64 | S_ANDN2_B64
            | S_AND_SAVEEXEC_B64 | S_GETPC_B64 | S_CMP_EQ_I32 | S_CMP_LG_I32 | S_CMP_GT_I32
            | S_CMP_GE_I32 | S_CMP_LT_I32 | S_CMP_LE_I32 | S_CMP_EQ_U32 | S_CMP_LG_U32
            | S_CMP_GT_U32 | S_CMP_GE_U32 | S_CMP_LT_U32 | S_CMP_LE_U32 => InstCategory::ScalarAlu,

            S_SETPC_B64 | S_SWAPPC_B64 | S_NOP | S_ENDPGM | S_BRANCH | S_CBRANCH_SCC0
            | S_CBRANCH_SCC1 | S_CBRANCH_VCCZ | S_CBRANCH_VCCNZ | S_CBRANCH_EXECZ
            | S_CBRANCH_EXECNZ | S_BARRIER | S_WAITCNT | S_SENDMSG => InstCategory::FlowControl,

            S_LOAD_DWORD | S_LOAD_DWORDX2 | S_LOAD_DWORDX4 | S_LOAD_DWORDX8 | S_LOAD_DWORDX16
            | S_BUFFER_LOAD_DWORD | S_BUFFER_LOAD_DWORDX2 | S_BUFFER_LOAD_DWORDX4
            | S_BUFFER_LOAD_DWORDX8 | S_BUFFER_LOAD_DWORDX16 => InstCategory::ScalarMemory,

            V_INTERP_P1_F32 | V_INTERP_P2_F32 => InstCategory::VectorInterpolation,

            BUFFER_LOAD_FORMAT_X | BUFFER_LOAD_FORMAT_XY | BUFFER_LOAD_FORMAT_XYZ
            | BUFFER_LOAD_FORMAT_XYZW | BUFFER_STORE_FORMAT_X | BUFFER_STORE_FORMAT_XY
            | BUFFER_STORE_FORMAT_XYZ | BUFFER_STORE_FORMAT_XYZW | BUFFER_ATOMIC_ADD
            | TBUFFER_LOAD_FORMAT_X | TBUFFER_LOAD_FORMAT_XY | TBUFFER_LOAD_FORMAT_XYZ
            | TBUFFER_LOAD_FORMAT_XYZW | TBUFFER_STORE_FORMAT_X | TBUFFER_STORE_FORMAT_XY
            | TBUFFER_STORE_FORMAT_XYZ | TBUFFER_STORE_FORMAT_XYZW => InstCategory::VectorMemory,

            DS_READ_B32 | DS_READ2_B32 | DS_READ_I8 | DS_READ_U8 | DS_READ_I16 | DS_READ_U16
            | DS_READ_B64 | DS_WRITE_B32 | DS_WRITE2_B32 | DS_WRITE_B8 | DS_WRITE_B16
            | DS_WRITE_B64 => InstCategory::DataShare,

            IMAGE_SAMPLE | IMAGE_SAMPLE_L | IMAGE_SAMPLE_B | IMAGE_SAMPLE_LZ | IMAGE_SAMPLE_C
            | IMAGE_SAMPLE_C_LZ | IMAGE_SAMPLE_O | IMAGE_SAMPLE_D | IMAGE_GET_RESINFO
            | IMAGE_STORE => InstCategory::Image,

            EXP => InstCategory::Export,

            _ => InstCategory::VectorAlu,
        }
    }

    /// Sampling modifiers encoded by the opcode itself
    pub fn implied_mimg_modifiers(self) -> MimgModifiers {
        match self {
            Opcode::IMAGE_SAMPLE_L => MimgModifiers::LOD,
            Opcode::IMAGE_SAMPLE_B => MimgModifiers::LOD_BIAS,
            Opcode::IMAGE_SAMPLE_LZ => MimgModifiers::LEVEL0,
            Opcode::IMAGE_SAMPLE_C => MimgModifiers::PCF,
            Opcode::IMAGE_SAMPLE_C_LZ => MimgModifiers::PCF | MimgModifiers::LEVEL0,
            Opcode::IMAGE_SAMPLE_O => MimgModifiers::OFFSET,
            Opcode::IMAGE_SAMPLE_D => MimgModifiers::DERIVATIVE,
            _ => MimgModifiers::empty(),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(Opcode::S_MUL_I32.category(), InstCategory::ScalarAlu);
        assert_eq!(Opcode::S_BUFFER_LOAD_DWORDX4.category(), InstCategory::ScalarMemory);
        assert_eq!(Opcode::S_WAITCNT.category(), InstCategory::FlowControl);
        assert_eq!(Opcode::V_CMPX_GT_U32.category(), InstCategory::VectorAlu);
        assert_eq!(Opcode::TBUFFER_LOAD_FORMAT_XY.category(), InstCategory::VectorMemory);
        assert_eq!(Opcode::DS_READ2_B32.category(), InstCategory::DataShare);
        assert_eq!(Opcode::IMAGE_GET_RESINFO.category(), InstCategory::Image);
        assert_eq!(Opcode::V_INTERP_P2_F32.category(), InstCategory::VectorInterpolation);
        assert_eq!(Opcode::EXP.category(), InstCategory::Export);
    }

    #[test]
    fn test_per_lane_families() {
        assert!(!InstCategory::ScalarAlu.is_per_lane());
        assert!(!InstCategory::FlowControl.is_per_lane());
        assert!(InstCategory::VectorAlu.is_per_lane());
        assert!(InstCategory::Export.is_per_lane());
    }

    #[test]
    fn test_implied_modifiers() {
        assert_eq!(
            Opcode::IMAGE_SAMPLE_C_LZ.implied_mimg_modifiers(),
            MimgModifiers::PCF | MimgModifiers::LEVEL0
        );
        assert!(Opcode::IMAGE_SAMPLE.implied_mimg_modifiers().is_empty());
    }

    #[test]
    fn test_opcode_display() {
        assert_eq!(Opcode::V_CNDMASK_B32.to_string(), "V_CNDMASK_B32");
    }
}
