//! Shader IR
//!
//! This crate provides the intermediate representation GCN instructions are
//! rewritten into:
//! - Typed SSA values and the registers/attributes they are read from
//! - Append-only basic blocks with per-instruction execution masks
//! - A typed emitter and the execution-mask type threaded through translation
//! - A per-lane reference evaluator for checking translated blocks

pub mod attribute;
pub mod block;
pub mod emitter;
pub mod eval;
pub mod exec;
pub mod opcode;
pub mod reg;
pub mod types;

pub use attribute::Attribute;
pub use block::{
    Block, BufferFormat, BufferInstInfo, DataFormat, Inst, InstFlags, InstId, NumberFormat,
    SharedInstInfo, TextureInstInfo,
};
pub use emitter::IrEmitter;
pub use eval::{Evaluation, Evaluator};
pub use exec::ExecMask;
pub use opcode::Opcode;
pub use reg::Reg;
pub use types::{Type, Value};
