//! Execution mask threaded through block translation

use crate::emitter::IrEmitter;
use crate::reg::Reg;
use crate::types::{Type, Value};

/// The set of lanes currently executing.
///
/// Only obtainable as all lanes or as the mask live into the block, and only
/// changeable through [`ExecMask::narrow`], so within a block the mask can
/// never gain lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecMask {
    value: Value,
}

impl ExecMask {
    /// Every lane of the wavefront
    pub fn full() -> Self {
        Self {
            value: Value::U1(true),
        }
    }

    /// The mask held in EXEC on entry to the block
    pub fn live_in(ir: &mut IrEmitter<'_>) -> Self {
        Self {
            value: ir.get_register(Reg::ExecLo, Type::U1),
        }
    }

    /// Per-lane boolean value of the mask
    pub fn value(self) -> Value {
        self.value
    }

    pub fn is_full(self) -> bool {
        self.value == Value::U1(true)
    }

    /// Restrict the mask to lanes where `pred` holds.
    #[must_use]
    pub fn narrow(self, ir: &mut IrEmitter<'_>, pred: Value) -> Self {
        let value = match (self.value, pred) {
            (Value::U1(true), pred) => pred,
            (current, Value::U1(true)) => current,
            (_, Value::U1(false)) => Value::U1(false),
            (current, pred) => ir.logical_and(current, pred),
        };
        Self { value }
    }
}
