//! Shader stage inputs and outputs

use std::fmt;

/// Fixed-function attribute read or written by a shader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    /// Color attachment 0..8
    RenderTarget(u32),
    Depth,
    /// Position slot 0..4
    Position(u32),
    /// Generic parameter 0..32
    Param(u32),
    VertexId,
    InstanceId,
    PrimitiveId,
    FragCoord,
    FrontFacing,
    LocalInvocationId,
    WorkgroupId,
}

impl Attribute {
    pub const MAX_RENDER_TARGETS: u32 = 8;
    pub const MAX_POSITIONS: u32 = 4;
    pub const MAX_PARAMS: u32 = 32;

    pub fn is_param(self) -> bool {
        matches!(self, Attribute::Param(_))
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::RenderTarget(n) => write!(f, "RenderTarget{n}"),
            Attribute::Depth => f.write_str("Depth"),
            Attribute::Position(n) => write!(f, "Position{n}"),
            Attribute::Param(n) => write!(f, "Param{n}"),
            Attribute::VertexId => f.write_str("VertexId"),
            Attribute::InstanceId => f.write_str("InstanceId"),
            Attribute::PrimitiveId => f.write_str("PrimitiveId"),
            Attribute::FragCoord => f.write_str("FragCoord"),
            Attribute::FrontFacing => f.write_str("FrontFacing"),
            Attribute::LocalInvocationId => f.write_str("LocalInvocationId"),
            Attribute::WorkgroupId => f.write_str("WorkgroupId"),
        }
    }
}
