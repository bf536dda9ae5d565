//! Decoded GCN instruction records
//!
//! Operand conventions per family:
//! - SMRD: `src[0]` is the raw `sbase` field, counted in register pairs
//! - MUBUF/MTBUF: `src[0]` vaddr, `src[1]` vdata, `src[2]` raw `srsrc` field
//!   (counted in groups of four SGPRs), `src[3]` soffset
//! - MIMG: `dst[0]` vdata, `src[0]` vaddr, `src[2]` T# and `src[3]` S#
//!   (raw fields counted in groups of four SGPRs)
//! - DS: `dst[0]` vdst, `src[0]` address, `src[1]`/`src[2]` data
//! - EXP: `src[0..4]` the exported VGPRs
//! - VOPC and other lane-mask producers: `dst[0]` receives the mask
//!   (VCC when absent); carry-out of vector add/sub is `dst[1]`

use crate::opcode::Opcode;
use bitflags::bitflags;
use gr_core::error::TranslateError;
use serde::{Deserialize, Serialize};

/// Operand addressing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandField {
    ScalarGpr,
    VccLo,
    VccHi,
    M0,
    ExecLo,
    ExecHi,
    ConstZero,
    SignedConstIntPos,
    SignedConstIntNeg,
    ConstFloatPos0_5,
    ConstFloatNeg0_5,
    ConstFloatPos1_0,
    ConstFloatNeg1_0,
    ConstFloatPos2_0,
    ConstFloatNeg2_0,
    ConstFloatPos4_0,
    ConstFloatNeg4_0,
    VccZ,
    ExecZ,
    Scc,
    LiteralConst,
    VectorGpr,
    Undefined,
}

impl OperandField {
    /// Value of a float inline constant
    pub fn float_constant(self) -> Option<f32> {
        let value = match self {
            OperandField::ConstFloatPos0_5 => 0.5,
            OperandField::ConstFloatNeg0_5 => -0.5,
            OperandField::ConstFloatPos1_0 => 1.0,
            OperandField::ConstFloatNeg1_0 => -1.0,
            OperandField::ConstFloatPos2_0 => 2.0,
            OperandField::ConstFloatNeg2_0 => -2.0,
            OperandField::ConstFloatPos4_0 => 4.0,
            OperandField::ConstFloatNeg4_0 => -4.0,
            _ => return None,
        };
        Some(value)
    }
}

/// Declared numeric type of an operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScalarType {
    #[default]
    Uint32,
    Sint32,
    Float32,
    Uint64,
}

bitflags! {
    /// VOP3 source modifiers, applied as abs then neg
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct InputModifiers: u8 {
        const NEG = 1 << 0;
        const ABS = 1 << 1;
    }
}

/// VOP3 output multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Omod {
    #[default]
    None,
    Mul2,
    Mul4,
    Div2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OutputModifier {
    pub clamp: bool,
    pub multiplier: Omod,
}

impl OutputModifier {
    pub fn is_identity(&self) -> bool {
        !self.clamp && self.multiplier == Omod::None
    }
}

/// One source or destination operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstOperand {
    pub field: OperandField,
    /// Register index, raw constant encoding, or literal bits
    pub code: u32,
    #[serde(default)]
    pub ty: ScalarType,
    #[serde(default)]
    pub input_modifier: InputModifiers,
    #[serde(default)]
    pub output_modifier: OutputModifier,
}

impl InstOperand {
    pub fn new(field: OperandField, code: u32) -> Self {
        Self {
            field,
            code,
            ty: ScalarType::default(),
            input_modifier: InputModifiers::empty(),
            output_modifier: OutputModifier::default(),
        }
    }

    /// Decode a 9-bit source encoding; `literal` supplies the dword following
    /// the instruction when the encoding selects it.
    pub fn from_encoding(encoding: u32, literal: u32) -> Self {
        let (field, code) = match encoding {
            0..=103 => (OperandField::ScalarGpr, encoding),
            106 => (OperandField::VccLo, 0),
            107 => (OperandField::VccHi, 0),
            124 => (OperandField::M0, 0),
            126 => (OperandField::ExecLo, 0),
            127 => (OperandField::ExecHi, 0),
            128 => (OperandField::ConstZero, encoding),
            129..=192 => (OperandField::SignedConstIntPos, encoding),
            193..=208 => (OperandField::SignedConstIntNeg, encoding),
            240 => (OperandField::ConstFloatPos0_5, encoding),
            241 => (OperandField::ConstFloatNeg0_5, encoding),
            242 => (OperandField::ConstFloatPos1_0, encoding),
            243 => (OperandField::ConstFloatNeg1_0, encoding),
            244 => (OperandField::ConstFloatPos2_0, encoding),
            245 => (OperandField::ConstFloatNeg2_0, encoding),
            246 => (OperandField::ConstFloatPos4_0, encoding),
            247 => (OperandField::ConstFloatNeg4_0, encoding),
            251 => (OperandField::VccZ, 0),
            252 => (OperandField::ExecZ, 0),
            253 => (OperandField::Scc, 0),
            255 => (OperandField::LiteralConst, literal),
            256..=511 => (OperandField::VectorGpr, encoding - 256),
            _ => (OperandField::Undefined, encoding),
        };
        Self::new(field, code)
    }

    pub fn sgpr(index: u32) -> Self {
        Self::new(OperandField::ScalarGpr, index)
    }

    pub fn vgpr(index: u32) -> Self {
        Self::new(OperandField::VectorGpr, index)
    }

    pub fn vcc() -> Self {
        Self::new(OperandField::VccLo, 0)
    }

    pub fn exec() -> Self {
        Self::new(OperandField::ExecLo, 0)
    }

    pub fn m0() -> Self {
        Self::new(OperandField::M0, 0)
    }

    pub fn scc() -> Self {
        Self::new(OperandField::Scc, 0)
    }

    pub fn literal(bits: u32) -> Self {
        Self::new(OperandField::LiteralConst, bits)
    }

    pub fn literal_f32(value: f32) -> Self {
        Self::literal(value.to_bits()).float()
    }

    /// Integer constant, inline when it fits the inline range
    pub fn int(value: i32) -> Self {
        match value {
            0 => Self::from_encoding(128, 0),
            1..=64 => Self::from_encoding(128 + value as u32, 0),
            -16..=-1 => Self::from_encoding((192 - value) as u32, 0),
            _ => Self::literal(value as u32),
        }
    }

    /// Float constant, inline when it is one of the inline values
    pub fn float_const(value: f32) -> Self {
        let encoding = (240..=247)
            .find(|&enc| {
                Self::from_encoding(enc, 0).field.float_constant().map(f32::to_bits)
                    == Some(value.to_bits())
            })
            .or((value.to_bits() == 0).then_some(128));
        match encoding {
            Some(enc) => Self::from_encoding(enc, 0).float(),
            None => Self::literal_f32(value),
        }
    }

    /// Mark the operand as read or written as a float
    pub fn float(mut self) -> Self {
        self.ty = ScalarType::Float32;
        self
    }

    pub fn neg(mut self) -> Self {
        self.input_modifier |= InputModifiers::NEG;
        self
    }

    pub fn abs(mut self) -> Self {
        self.input_modifier |= InputModifiers::ABS;
        self
    }

    pub fn clamp(mut self) -> Self {
        self.output_modifier.clamp = true;
        self
    }

    pub fn omod(mut self, multiplier: Omod) -> Self {
        self.output_modifier.multiplier = multiplier;
        self
    }

    pub fn is_float(&self) -> bool {
        self.ty == ScalarType::Float32
    }

    pub fn is_float_constant(&self) -> bool {
        self.field.float_constant().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SmrdControl {
    /// Dword offset when `imm`, otherwise the SGPR holding a byte offset
    pub offset: u32,
    pub imm: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BufferControl {
    pub offset: u32,
    pub offen: bool,
    pub idxen: bool,
    #[serde(default)]
    pub glc: bool,
    #[serde(default)]
    pub slc: bool,
    /// Data and number format of typed (MTBUF) accesses
    #[serde(default)]
    pub dfmt: u32,
    #[serde(default)]
    pub nfmt: u32,
}

bitflags! {
    /// Sampling variations selected by MIMG opcodes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct MimgModifiers: u16 {
        const OFFSET = 1 << 0;
        const LOD_BIAS = 1 << 1;
        const PCF = 1 << 2;
        const DERIVATIVE = 1 << 3;
        const LOD_CLAMP = 1 << 4;
        const LEVEL0 = 1 << 5;
        const LOD = 1 << 6;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MimgControl {
    pub dmask: u32,
    #[serde(default)]
    pub unorm: bool,
    /// Array resource
    #[serde(default)]
    pub da: bool,
    #[serde(default)]
    pub modifiers: MimgModifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DsControl {
    pub offset0: u32,
    pub offset1: u32,
    #[serde(default)]
    pub gds: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExpControl {
    /// Enabled components, one bit each
    pub en: u32,
    pub target: u32,
    #[serde(default)]
    pub compr: bool,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub vm: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VintrpControl {
    pub attr: u32,
    pub chan: u32,
}

/// Encoding-specific immediate fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InstControl {
    #[default]
    None,
    Smrd(SmrdControl),
    Buffer(BufferControl),
    Mimg(MimgControl),
    Ds(DsControl),
    Exp(ExpControl),
    Vintrp(VintrpControl),
}

/// A decoded GCN instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcnInst {
    pub opcode: Opcode,
    #[serde(default)]
    pub src: Vec<InstOperand>,
    #[serde(default)]
    pub dst: Vec<InstOperand>,
    #[serde(default)]
    pub control: InstControl,
}

impl GcnInst {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            src: Vec::new(),
            dst: Vec::new(),
            control: InstControl::None,
        }
    }

    /// `opcode dst, src...`
    pub fn op(opcode: Opcode, dst: InstOperand, src: &[InstOperand]) -> Self {
        Self {
            opcode,
            src: src.to_vec(),
            dst: vec![dst],
            control: InstControl::None,
        }
    }

    pub fn with_src(mut self, operand: InstOperand) -> Self {
        self.src.push(operand);
        self
    }

    pub fn with_dst(mut self, operand: InstOperand) -> Self {
        self.dst.push(operand);
        self
    }

    pub fn with_control(mut self, control: InstControl) -> Self {
        self.control = control;
        self
    }

    pub fn src(&self, index: usize) -> Result<&InstOperand, TranslateError> {
        self.src.get(index).ok_or(TranslateError::MissingOperand {
            role: "source",
            index,
        })
    }

    pub fn dst(&self, index: usize) -> Result<&InstOperand, TranslateError> {
        self.dst.get(index).ok_or(TranslateError::MissingOperand {
            role: "destination",
            index,
        })
    }

    pub fn smrd(&self) -> Result<SmrdControl, TranslateError> {
        match self.control {
            InstControl::Smrd(control) => Ok(control),
            _ => Err(TranslateError::MissingControl("SMRD")),
        }
    }

    pub fn buffer(&self) -> Result<BufferControl, TranslateError> {
        match self.control {
            InstControl::Buffer(control) => Ok(control),
            _ => Err(TranslateError::MissingControl("MUBUF/MTBUF")),
        }
    }

    pub fn mimg(&self) -> Result<MimgControl, TranslateError> {
        match self.control {
            InstControl::Mimg(control) => Ok(control),
            _ => Err(TranslateError::MissingControl("MIMG")),
        }
    }

    pub fn ds(&self) -> Result<DsControl, TranslateError> {
        match self.control {
            InstControl::Ds(control) => Ok(control),
            _ => Err(TranslateError::MissingControl("DS")),
        }
    }

    pub fn exp(&self) -> Result<ExpControl, TranslateError> {
        match self.control {
            InstControl::Exp(control) => Ok(control),
            _ => Err(TranslateError::MissingControl("EXP")),
        }
    }

    pub fn vintrp(&self) -> Result<VintrpControl, TranslateError> {
        match self.control {
            InstControl::Vintrp(control) => Ok(control),
            _ => Err(TranslateError::MissingControl("VINTRP")),
        }
    }
}
