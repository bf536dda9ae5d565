//! Physical GCN registers as seen by the IR

use std::fmt;

/// A 32-bit physical register.
///
/// A `U1`-typed value associated with `VccLo` or `ExecLo` stands for the
/// whole 64-lane mask held in the register pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reg {
    Sgpr(u32),
    Vgpr(u32),
    VccLo,
    VccHi,
    ExecLo,
    ExecHi,
    M0,
    Scc,
}

impl Reg {
    /// High half of a 64-bit register pair starting at this register
    pub fn pair_hi(self) -> Option<Reg> {
        match self {
            Reg::Sgpr(n) => Some(Reg::Sgpr(n + 1)),
            Reg::VccLo => Some(Reg::VccHi),
            Reg::ExecLo => Some(Reg::ExecHi),
            _ => None,
        }
    }

    /// Low half of the pair this register is the high half of
    pub fn pair_lo(self) -> Option<Reg> {
        match self {
            Reg::Sgpr(n) if n > 0 => Some(Reg::Sgpr(n - 1)),
            Reg::VccHi => Some(Reg::VccLo),
            Reg::ExecHi => Some(Reg::ExecLo),
            _ => None,
        }
    }

    pub fn is_vector(self) -> bool {
        matches!(self, Reg::Vgpr(_))
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reg::Sgpr(n) => write!(f, "s{n}"),
            Reg::Vgpr(n) => write!(f, "v{n}"),
            Reg::VccLo => f.write_str("vcc_lo"),
            Reg::VccHi => f.write_str("vcc_hi"),
            Reg::ExecLo => f.write_str("exec_lo"),
            Reg::ExecHi => f.write_str("exec_hi"),
            Reg::M0 => f.write_str("m0"),
            Reg::Scc => f.write_str("scc"),
        }
    }
}
