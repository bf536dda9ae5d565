//! GCN shader translation
//!
//! This crate provides the decoded GCN instruction model, the per-shader
//! metadata consumed during translation, and the translator that rewrites
//! one basic block of GCN instructions into IR.

pub mod info;
pub mod instruction;
pub mod opcode;
pub mod translate;

pub use info::{
    BufferResource, ImageKind, ImageResource, PsInput, SamplerResource, ShaderInfo, ShaderUsage,
    Stage, VertexInput,
};
pub use instruction::{
    BufferControl, DsControl, ExpControl, GcnInst, InputModifiers, InstControl, InstOperand,
    MimgControl, MimgModifiers, Omod, OperandField, OutputModifier, ScalarType, SmrdControl,
    VintrpControl,
};
pub use opcode::{InstCategory, Opcode};
pub use translate::{
    has_handler, translate, translate_entry, translate_shader, ConditionOp, Translator,
};
