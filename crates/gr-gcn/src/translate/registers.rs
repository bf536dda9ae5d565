//! Per-block register file

use gr_ir::{Reg, Value};
use std::collections::BTreeMap;

/// Contents of one 32-bit register slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Word(Value),
    /// Low half of a register pair holding a lane mask
    MaskLo(Value),
    /// High half of a register pair holding a lane mask
    MaskHi(Value),
    /// Half of a lane-mask pair whose other half was overwritten
    Partial,
}

/// Latest value committed to each register within the block.
///
/// Pair writes update both halves in one call.
#[derive(Debug, Default)]
pub(crate) struct RegisterFile {
    slots: BTreeMap<Reg, Slot>,
    live_ins: BTreeMap<Reg, Value>,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, reg: Reg) -> Option<Slot> {
        self.slots.get(&reg).copied()
    }

    pub fn live_in(&self, reg: Reg) -> Option<Value> {
        self.live_ins.get(&reg).copied()
    }

    pub fn record_live_in(&mut self, reg: Reg, value: Value) {
        self.live_ins.insert(reg, value);
    }

    /// A write to `reg` breaks any lane mask it was half of
    fn detach(&mut self, reg: Reg) {
        let partner = match self.slots.get(&reg) {
            Some(Slot::MaskLo(_)) => reg.pair_hi(),
            Some(Slot::MaskHi(_)) => reg.pair_lo(),
            _ => None,
        };
        if let Some(partner) = partner {
            self.slots.insert(partner, Slot::Partial);
        }
    }

    pub fn set_word(&mut self, reg: Reg, value: Value) {
        self.detach(reg);
        self.slots.insert(reg, Slot::Word(value));
    }

    /// Commit two 32-bit halves starting at `lo`
    pub fn set_halves(&mut self, lo: Reg, hi: Reg, low: Value, high: Value) {
        self.detach(lo);
        self.detach(hi);
        self.slots.insert(lo, Slot::Word(low));
        self.slots.insert(hi, Slot::Word(high));
    }

    /// Commit a lane mask to the pair starting at `lo`
    pub fn set_mask(&mut self, lo: Reg, hi: Reg, mask: Value) {
        self.detach(lo);
        self.detach(hi);
        self.slots.insert(lo, Slot::MaskLo(mask));
        self.slots.insert(hi, Slot::MaskHi(mask));
    }

    /// Final value of every register written in the block
    pub fn outputs(&self) -> impl Iterator<Item = (Reg, Value)> + '_ {
        self.slots.iter().filter_map(|(reg, slot)| match slot {
            Slot::Word(value) | Slot::MaskLo(value) => Some((*reg, *value)),
            Slot::MaskHi(_) | Slot::Partial => None,
        })
    }
}
