//! IR operations

use std::fmt;

/// IR operation code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Special
    Prologue,
    Barrier,
    GetRegister,
    Copy,

    // Attributes
    GetAttribute,
    GetAttributeU32,
    SetAttribute,

    // Bit casts and composites
    BitCastU32F32,
    BitCastF32U32,
    CompositeConstruct,
    CompositeExtract,

    // Integer arithmetic
    IAdd,
    ISub,
    IMul,
    UMin,
    UMax,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseNot,
    ShiftLeftLogical,
    ShiftRightLogical,
    ShiftRightArithmetic,

    // Integer comparison
    IEqual,
    INotEqual,
    SLessThan,
    ULessThan,
    SLessThanEqual,
    ULessThanEqual,
    SGreaterThan,
    UGreaterThan,
    SGreaterThanEqual,
    UGreaterThanEqual,

    // Logical
    LogicalAnd,
    LogicalOr,
    LogicalNot,
    VoteAny,
    Select,

    // Floating point
    FpAdd,
    FpSub,
    FpMul,
    FpFma,
    FpMin,
    FpMax,
    FpNeg,
    FpAbs,
    FpFloor,
    FpFract,
    FpRecip,
    FpRecipSqrt,
    FpSaturate,

    // Ordered floating point comparison
    FpOrdEqual,
    FpOrdNotEqual,
    FpOrdLessThan,
    FpOrdLessThanEqual,
    FpOrdGreaterThan,
    FpOrdGreaterThanEqual,

    // Conversion
    ConvertF32S32,
    ConvertF32U32,
    ConvertU32F32,
    PackHalf2x16Rtz,
    UnpackHalf2x16,

    // Memory
    ReadConst,
    ReadConstBuffer,
    LoadBuffer,
    StoreBuffer,
    LoadShared,
    WriteShared,

    // Images
    ImageSampleImplicitLod,
    ImageSampleExplicitLod,
    ImageSampleDrefImplicitLod,
    ImageSampleDrefExplicitLod,
    ImageQueryDimensions,
}

impl Opcode {
    /// Operations that must not be removed or reordered by later passes
    pub fn has_side_effects(self) -> bool {
        matches!(
            self,
            Opcode::Prologue
                | Opcode::Barrier
                | Opcode::SetAttribute
                | Opcode::StoreBuffer
                | Opcode::WriteShared
        )
    }

    /// Operations whose result depends on memory that may be written in the block
    pub fn reads_memory(self) -> bool {
        matches!(
            self,
            Opcode::ReadConst | Opcode::ReadConstBuffer | Opcode::LoadBuffer | Opcode::LoadShared
        )
    }

    pub fn is_image(self) -> bool {
        matches!(
            self,
            Opcode::ImageSampleImplicitLod
                | Opcode::ImageSampleExplicitLod
                | Opcode::ImageSampleDrefImplicitLod
                | Opcode::ImageSampleDrefExplicitLod
                | Opcode::ImageQueryDimensions
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
