//! Reference evaluator for translated blocks
//!
//! Executes a block over a small wavefront with every lane held explicitly.
//! Pure operations are computed for all lanes; memory writes and exports
//! only take effect in lanes enabled by the instruction's execution mask.
//! Buffer and image operations need descriptor contents and are rejected.

use crate::attribute::Attribute;
use crate::block::{Block, Inst, InstFlags};
use crate::opcode::Opcode;
use crate::reg::Reg;
use crate::types::{Type, Value};
use gr_core::error::IrError;
use half::f16;
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

/// Up to four 32-bit components of one lane
type Lane = [u32; 4];

const DEFAULT_SHARED_SIZE: usize = 64 * 1024;

/// Inputs for evaluating a block
pub struct Evaluator {
    lanes: usize,
    registers: HashMap<Reg, Vec<u32>>,
    attributes: HashMap<(Attribute, u32), Vec<u32>>,
    memory: HashMap<u64, u32>,
    const_buffers: HashMap<u32, Vec<u32>>,
    shared_size: usize,
}

/// Per-lane results of an evaluated block
#[derive(Debug, Clone)]
pub struct Evaluation {
    lanes: usize,
    values: Vec<Vec<Lane>>,
    exports: BTreeMap<(Attribute, u32), Vec<Option<u32>>>,
    shared: Vec<u8>,
}

impl Evaluator {
    pub fn new(lanes: usize) -> Self {
        Self {
            lanes,
            registers: HashMap::new(),
            attributes: HashMap::new(),
            memory: HashMap::new(),
            const_buffers: HashMap::new(),
            shared_size: DEFAULT_SHARED_SIZE,
        }
    }

    pub fn lanes(&self) -> usize {
        self.lanes
    }

    fn fit(&self, mut values: Vec<u32>) -> Vec<u32> {
        values.resize(self.lanes, 0);
        values
    }

    /// Per-lane live-in value of a register
    pub fn with_register(mut self, reg: Reg, values: Vec<u32>) -> Self {
        let values = self.fit(values);
        self.registers.insert(reg, values);
        self
    }

    /// Same live-in value in every lane
    pub fn with_uniform(self, reg: Reg, value: u32) -> Self {
        let values = vec![value; self.lanes];
        self.with_register(reg, values)
    }

    /// Live-in lane mask, bit `i` enabling lane `i`
    pub fn with_mask(self, reg: Reg, mask: u64) -> Self {
        let values = (0..self.lanes)
            .map(|lane| u32::from(lane < 64 && mask & (1 << lane) != 0))
            .collect();
        self.with_register(reg, values)
    }

    pub fn with_attribute(mut self, attr: Attribute, comp: u32, values: Vec<u32>) -> Self {
        let values = self.fit(values);
        self.attributes.insert((attr, comp), values);
        self
    }

    /// Dword of constant memory at a byte address
    pub fn with_memory(mut self, addr: u64, value: u32) -> Self {
        self.memory.insert(addr, value);
        self
    }

    pub fn with_const_buffer(mut self, binding: u32, dwords: Vec<u32>) -> Self {
        self.const_buffers.insert(binding, dwords);
        self
    }

    pub fn with_shared_memory(mut self, size: usize) -> Self {
        self.shared_size = size;
        self
    }

    /// Evaluate every instruction of `block` in order
    pub fn run(&self, block: &Block) -> Result<Evaluation, IrError> {
        let mut state = Evaluation {
            lanes: self.lanes,
            values: Vec::with_capacity(block.len()),
            exports: BTreeMap::new(),
            shared: vec![0; self.shared_size],
        };

        trace!("Evaluating block {} over {} lanes", block.id(), self.lanes);
        for (index, inst) in block.insts().iter().enumerate() {
            let result = self.eval_inst(&mut state, index as u32, inst)?;
            state.values.push(result);
        }

        Ok(state)
    }

    fn eval_inst(&self, state: &mut Evaluation, index: u32, inst: &Inst) -> Result<Vec<Lane>, IrError> {
        let n = self.lanes;
        let void = vec![[0; 4]; n];
        let args = inst
            .args
            .iter()
            .map(|arg| state.operand(*arg, index))
            .collect::<Result<Vec<_>, _>>()?;
        let arg = |i: usize| {
            args.get(i).ok_or_else(|| IrError::TypeMismatch {
                index,
                detail: format!("{} expects operand {i}", inst.op),
            })
        };
        let active = state.active_lanes(inst.exec, index)?;

        let result = match inst.op {
            Opcode::Prologue | Opcode::Barrier => void,
            Opcode::GetRegister => {
                let InstFlags::Register(reg) = inst.flags else {
                    return Err(flags_mismatch(index, inst));
                };
                let values = self
                    .registers
                    .get(&reg)
                    .ok_or_else(|| IrError::MissingInput(reg.to_string()))?;
                values
                    .iter()
                    .map(|&v| {
                        let v = if inst.ty == Type::U1 { u32::from(v != 0) } else { v };
                        [v, 0, 0, 0]
                    })
                    .collect()
            }
            Opcode::Copy | Opcode::BitCastU32F32 | Opcode::BitCastF32U32 => arg(0)?.clone(),
            Opcode::GetAttribute | Opcode::GetAttributeU32 => {
                let InstFlags::Attribute { attr, comp } = inst.flags else {
                    return Err(flags_mismatch(index, inst));
                };
                let values = self
                    .attributes
                    .get(&(attr, comp))
                    .ok_or_else(|| IrError::MissingInput(format!("{attr}.{comp}")))?;
                values.iter().map(|&v| [v, 0, 0, 0]).collect()
            }
            Opcode::SetAttribute => {
                let InstFlags::Attribute { attr, comp } = inst.flags else {
                    return Err(flags_mismatch(index, inst));
                };
                let data = arg(0)?;
                let slot = state.exports.entry((attr, comp)).or_insert_with(|| vec![None; n]);
                for lane in (0..n).filter(|&lane| active[lane]) {
                    slot[lane] = Some(data[lane][0]);
                }
                void
            }
            Opcode::CompositeConstruct => (0..n)
                .map(|lane| {
                    let mut out = [0; 4];
                    for (slot, element) in out.iter_mut().zip(args.iter()) {
                        *slot = element[lane][0];
                    }
                    out
                })
                .collect(),
            Opcode::CompositeExtract => {
                let which = inst.args.get(1).and_then(Value::as_u32).unwrap_or(0) as usize;
                arg(0)?.iter().map(|v| [v[which.min(3)], 0, 0, 0]).collect()
            }

            Opcode::IAdd => map2(arg(0)?, arg(1)?, u32::wrapping_add),
            Opcode::ISub => map2(arg(0)?, arg(1)?, u32::wrapping_sub),
            Opcode::IMul => map2(arg(0)?, arg(1)?, u32::wrapping_mul),
            Opcode::UMin => map2(arg(0)?, arg(1)?, u32::min),
            Opcode::UMax => map2(arg(0)?, arg(1)?, u32::max),
            Opcode::BitwiseAnd => map2(arg(0)?, arg(1)?, |a, b| a & b),
            Opcode::BitwiseOr => map2(arg(0)?, arg(1)?, |a, b| a | b),
            Opcode::BitwiseXor => map2(arg(0)?, arg(1)?, |a, b| a ^ b),
            Opcode::BitwiseNot => map1(arg(0)?, |a| !a),
            Opcode::ShiftLeftLogical => map2(arg(0)?, arg(1)?, u32::wrapping_shl),
            Opcode::ShiftRightLogical => map2(arg(0)?, arg(1)?, u32::wrapping_shr),
            Opcode::ShiftRightArithmetic => {
                map2(arg(0)?, arg(1)?, |a, b| (a as i32).wrapping_shr(b) as u32)
            }

            Opcode::IEqual => cmp2(arg(0)?, arg(1)?, |a, b| a == b),
            Opcode::INotEqual => cmp2(arg(0)?, arg(1)?, |a, b| a != b),
            Opcode::ULessThan => cmp2(arg(0)?, arg(1)?, |a, b| a < b),
            Opcode::ULessThanEqual => cmp2(arg(0)?, arg(1)?, |a, b| a <= b),
            Opcode::UGreaterThan => cmp2(arg(0)?, arg(1)?, |a, b| a > b),
            Opcode::UGreaterThanEqual => cmp2(arg(0)?, arg(1)?, |a, b| a >= b),
            Opcode::SLessThan => cmp2(arg(0)?, arg(1)?, |a, b| (a as i32) < (b as i32)),
            Opcode::SLessThanEqual => cmp2(arg(0)?, arg(1)?, |a, b| (a as i32) <= (b as i32)),
            Opcode::SGreaterThan => cmp2(arg(0)?, arg(1)?, |a, b| (a as i32) > (b as i32)),
            Opcode::SGreaterThanEqual => cmp2(arg(0)?, arg(1)?, |a, b| (a as i32) >= (b as i32)),

            Opcode::LogicalAnd => cmp2(arg(0)?, arg(1)?, |a, b| a != 0 && b != 0),
            Opcode::LogicalOr => cmp2(arg(0)?, arg(1)?, |a, b| a != 0 || b != 0),
            Opcode::LogicalNot => map1(arg(0)?, |a| u32::from(a == 0)),
            Opcode::VoteAny => {
                let pred = arg(0)?;
                let any = (0..n).any(|lane| active[lane] && pred[lane][0] != 0);
                vec![[u32::from(any), 0, 0, 0]; n]
            }
            Opcode::Select => {
                let (cond, a, b) = (arg(0)?, arg(1)?, arg(2)?);
                (0..n)
                    .map(|lane| if cond[lane][0] != 0 { a[lane] } else { b[lane] })
                    .collect()
            }

            Opcode::FpAdd => fmap2(arg(0)?, arg(1)?, |a, b| a + b),
            Opcode::FpSub => fmap2(arg(0)?, arg(1)?, |a, b| a - b),
            Opcode::FpMul => fmap2(arg(0)?, arg(1)?, |a, b| a * b),
            Opcode::FpFma => {
                let (a, b, c) = (arg(0)?, arg(1)?, arg(2)?);
                (0..n)
                    .map(|lane| {
                        let r = f(a[lane][0]).mul_add(f(b[lane][0]), f(c[lane][0]));
                        [r.to_bits(), 0, 0, 0]
                    })
                    .collect()
            }
            Opcode::FpMin => fmap2(arg(0)?, arg(1)?, f32::min),
            Opcode::FpMax => fmap2(arg(0)?, arg(1)?, f32::max),
            Opcode::FpNeg => map1(arg(0)?, |a| a ^ 0x8000_0000),
            Opcode::FpAbs => map1(arg(0)?, |a| a & 0x7fff_ffff),
            Opcode::FpFloor => fmap1(arg(0)?, f32::floor),
            Opcode::FpFract => fmap1(arg(0)?, fract),
            Opcode::FpRecip => fmap1(arg(0)?, |a| 1.0 / a),
            Opcode::FpRecipSqrt => fmap1(arg(0)?, |a| 1.0 / a.sqrt()),
            Opcode::FpSaturate => fmap1(arg(0)?, |a| if a.is_nan() { 0.0 } else { a.clamp(0.0, 1.0) }),

            Opcode::FpOrdEqual => fcmp2(arg(0)?, arg(1)?, |a, b| a == b),
            Opcode::FpOrdNotEqual => fcmp2(arg(0)?, arg(1)?, |a, b| a < b || a > b),
            Opcode::FpOrdLessThan => fcmp2(arg(0)?, arg(1)?, |a, b| a < b),
            Opcode::FpOrdLessThanEqual => fcmp2(arg(0)?, arg(1)?, |a, b| a <= b),
            Opcode::FpOrdGreaterThan => fcmp2(arg(0)?, arg(1)?, |a, b| a > b),
            Opcode::FpOrdGreaterThanEqual => fcmp2(arg(0)?, arg(1)?, |a, b| a >= b),

            Opcode::ConvertF32S32 => map1(arg(0)?, |a| ((a as i32) as f32).to_bits()),
            Opcode::ConvertF32U32 => map1(arg(0)?, |a| (a as f32).to_bits()),
            Opcode::ConvertU32F32 => map1(arg(0)?, |a| f(a) as u32),
            Opcode::PackHalf2x16Rtz => arg(0)?
                .iter()
                .map(|v| {
                    let lo = u32::from(f32_to_f16_rtz(f(v[0])));
                    let hi = u32::from(f32_to_f16_rtz(f(v[1])));
                    [lo | (hi << 16), 0, 0, 0]
                })
                .collect(),
            Opcode::UnpackHalf2x16 => arg(0)?
                .iter()
                .map(|v| {
                    let lo = f16::from_bits(v[0] as u16).to_f32();
                    let hi = f16::from_bits((v[0] >> 16) as u16).to_f32();
                    [lo.to_bits(), hi.to_bits(), 0, 0]
                })
                .collect(),

            Opcode::ReadConst => {
                let (base, offset) = (arg(0)?, arg(1)?);
                (0..n)
                    .map(|lane| {
                        let addr = u64::from(base[lane][0]) | (u64::from(base[lane][1]) << 32);
                        let addr = addr.wrapping_add(u64::from(offset[lane][0]) * 4);
                        self.memory
                            .get(&addr)
                            .map(|&v| [v, 0, 0, 0])
                            .ok_or_else(|| IrError::MissingInput(format!("memory 0x{addr:x}")))
                    })
                    .collect::<Result<_, _>>()?
            }
            Opcode::ReadConstBuffer => {
                let InstFlags::ConstBuffer { binding } = inst.flags else {
                    return Err(flags_mismatch(index, inst));
                };
                let dwords = self
                    .const_buffers
                    .get(&binding)
                    .ok_or_else(|| IrError::MissingInput(format!("cb{binding}")))?;
                arg(0)?
                    .iter()
                    .map(|v| {
                        dwords
                            .get(v[0] as usize)
                            .map(|&d| [d, 0, 0, 0])
                            .ok_or_else(|| IrError::MissingInput(format!("cb{binding}[{}]", v[0])))
                    })
                    .collect::<Result<_, _>>()?
            }
            Opcode::LoadShared => {
                let InstFlags::Shared(info) = inst.flags else {
                    return Err(flags_mismatch(index, inst));
                };
                let addr = arg(0)?;
                let mut out = void;
                for lane in (0..n).filter(|&lane| active[lane]) {
                    out[lane] = state.load_shared(addr[lane][0], info.bit_size, info.is_signed)?;
                }
                out
            }
            Opcode::WriteShared => {
                let InstFlags::Shared(info) = inst.flags else {
                    return Err(flags_mismatch(index, inst));
                };
                let (addr, data) = (arg(0)?, arg(1)?);
                for lane in (0..n).filter(|&lane| active[lane]) {
                    state.write_shared(addr[lane][0], info.bit_size, data[lane])?;
                }
                void
            }

            Opcode::LoadBuffer
            | Opcode::StoreBuffer
            | Opcode::ImageSampleImplicitLod
            | Opcode::ImageSampleExplicitLod
            | Opcode::ImageSampleDrefImplicitLod
            | Opcode::ImageSampleDrefExplicitLod
            | Opcode::ImageQueryDimensions => {
                return Err(IrError::Unevaluable(inst.op.to_string()));
            }
        };

        Ok(result)
    }
}

impl Evaluation {
    fn operand(&self, value: Value, index: u32) -> Result<Vec<Lane>, IrError> {
        match value {
            Value::Inst(id, _) => self.values.get(id.index()).cloned().ok_or_else(|| {
                IrError::TypeMismatch {
                    index,
                    detail: format!("{id} is not defined before use"),
                }
            }),
            imm => {
                let bits = imm.imm_bits().unwrap_or(0);
                Ok(vec![[bits, 0, 0, 0]; self.lanes])
            }
        }
    }

    fn active_lanes(&self, exec: Option<Value>, index: u32) -> Result<Vec<bool>, IrError> {
        match exec {
            None => Ok(vec![true; self.lanes]),
            Some(mask) => Ok(self
                .operand(mask, index)?
                .iter()
                .map(|lane| lane[0] != 0)
                .collect()),
        }
    }

    fn shared_range(&self, addr: u32, bytes: usize) -> Result<std::ops::Range<usize>, IrError> {
        let start = addr as usize;
        let end = start + bytes;
        if end > self.shared.len() {
            return Err(IrError::SharedOutOfBounds { addr });
        }
        Ok(start..end)
    }

    fn load_shared(&self, addr: u32, bit_size: u32, is_signed: bool) -> Result<Lane, IrError> {
        let range = self.shared_range(addr, (bit_size / 8).max(1) as usize)?;
        let bytes = &self.shared[range];
        let word = |offset: usize| {
            u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };
        let lane = match (bit_size, is_signed) {
            (8, false) => [u32::from(bytes[0]), 0, 0, 0],
            (8, true) => [bytes[0] as i8 as i32 as u32, 0, 0, 0],
            (16, false) => [u32::from(u16::from_le_bytes([bytes[0], bytes[1]])), 0, 0, 0],
            (16, true) => [i16::from_le_bytes([bytes[0], bytes[1]]) as i32 as u32, 0, 0, 0],
            (32, _) => [word(0), 0, 0, 0],
            (64, _) => [word(0), word(4), 0, 0],
            _ => return Err(IrError::Unevaluable(format!("{bit_size}-bit shared load"))),
        };
        Ok(lane)
    }

    fn write_shared(&mut self, addr: u32, bit_size: u32, data: Lane) -> Result<(), IrError> {
        let range = self.shared_range(addr, (bit_size / 8).max(1) as usize)?;
        let bytes = &mut self.shared[range];
        match bit_size {
            8 => bytes[0] = data[0] as u8,
            16 => bytes.copy_from_slice(&(data[0] as u16).to_le_bytes()),
            32 => bytes.copy_from_slice(&data[0].to_le_bytes()),
            64 => {
                bytes[..4].copy_from_slice(&data[0].to_le_bytes());
                bytes[4..].copy_from_slice(&data[1].to_le_bytes());
            }
            _ => return Err(IrError::Unevaluable(format!("{bit_size}-bit shared store"))),
        }
        Ok(())
    }

    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// First component of `value` in every lane
    pub fn value(&self, value: Value) -> Vec<u32> {
        self.component(value, 0)
    }

    pub fn component(&self, value: Value, comp: usize) -> Vec<u32> {
        self.operand(value, u32::MAX)
            .map(|lanes| lanes.iter().map(|lane| lane[comp.min(3)]).collect())
            .unwrap_or_default()
    }

    pub fn value_f32(&self, value: Value) -> Vec<f32> {
        self.value(value).into_iter().map(f32::from_bits).collect()
    }

    /// A per-lane boolean as a bitmask, lane `i` in bit `i`
    pub fn mask(&self, value: Value) -> u64 {
        self.value(value)
            .iter()
            .enumerate()
            .filter(|(lane, v)| *lane < 64 && **v != 0)
            .fold(0, |mask, (lane, _)| mask | (1 << lane))
    }

    /// Exported value per lane; `None` for lanes that did not export
    pub fn export(&self, attr: Attribute, comp: u32) -> Option<&[Option<u32>]> {
        self.exports.get(&(attr, comp)).map(Vec::as_slice)
    }

    pub fn shared(&self) -> &[u8] {
        &self.shared
    }
}

fn flags_mismatch(index: u32, inst: &Inst) -> IrError {
    IrError::TypeMismatch {
        index,
        detail: format!("{} has flags {:?}", inst.op, inst.flags),
    }
}

#[inline]
fn f(bits: u32) -> f32 {
    f32::from_bits(bits)
}

fn map1(a: &[Lane], op: impl Fn(u32) -> u32) -> Vec<Lane> {
    a.iter().map(|x| [op(x[0]), 0, 0, 0]).collect()
}

fn map2(a: &[Lane], b: &[Lane], op: impl Fn(u32, u32) -> u32) -> Vec<Lane> {
    a.iter().zip(b).map(|(x, y)| [op(x[0], y[0]), 0, 0, 0]).collect()
}

fn cmp2(a: &[Lane], b: &[Lane], op: impl Fn(u32, u32) -> bool) -> Vec<Lane> {
    map2(a, b, |x, y| u32::from(op(x, y)))
}

fn fmap1(a: &[Lane], op: impl Fn(f32) -> f32) -> Vec<Lane> {
    map1(a, |x| op(f(x)).to_bits())
}

fn fmap2(a: &[Lane], b: &[Lane], op: impl Fn(f32, f32) -> f32) -> Vec<Lane> {
    map2(a, b, |x, y| op(f(x), f(y)).to_bits())
}

fn fcmp2(a: &[Lane], b: &[Lane], op: impl Fn(f32, f32) -> bool) -> Vec<Lane> {
    map2(a, b, |x, y| u32::from(op(f(x), f(y))))
}

/// Fractional part, kept strictly below one
fn fract(x: f32) -> f32 {
    (x - x.floor()).min(f32::from_bits(0x3f7f_ffff))
}

/// Convert to half precision rounding toward zero
pub fn f32_to_f16_rtz(value: f32) -> u16 {
    let nearest = f16::from_f32(value);
    if !value.is_finite() {
        return nearest.to_bits();
    }
    let bits = nearest.to_bits();
    if nearest.is_infinite() {
        // Largest finite half with the input's sign
        return (bits & 0x8000) | 0x7bff;
    }
    if nearest.to_f32().abs() > value.abs() {
        bits - 1
    } else {
        bits
    }
}
