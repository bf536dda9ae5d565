//! Operand resolution and register commits

use super::registers::Slot;
use super::Translator;
use crate::instruction::{InputModifiers, InstOperand, Omod, OperandField};
use gr_core::config::UndefinedReadPolicy;
use gr_core::error::TranslateError;
use gr_ir::{Reg, Type, Value};

/// A 64-bit scalar operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pair {
    /// One lane mask spanning both registers
    Mask(Value),
    /// Low and high 32-bit halves
    Halves(Value, Value),
}

fn unsupported(field: impl ToString, reason: &str) -> TranslateError {
    TranslateError::UnsupportedOperand {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn field_name(operand: &InstOperand) -> String {
    format!("{:?}", operand.field)
}

/// Register `code * scale + offset` of a range addressed by `operand`
pub(crate) fn register_index(operand: &InstOperand, scale: u32, offset: u32) -> Result<u32, TranslateError> {
    operand
        .code
        .checked_mul(scale)
        .and_then(|base| base.checked_add(offset))
        .ok_or_else(|| unsupported(field_name(operand), "register index out of range"))
}

/// Integer value of an inline integer constant
fn inline_int(operand: &InstOperand) -> Result<Option<i32>, TranslateError> {
    let value = match (operand.field, operand.code) {
        (OperandField::ConstZero, _) => 0,
        (OperandField::SignedConstIntPos, code @ 128..=192) => code as i32 - 128,
        (OperandField::SignedConstIntNeg, code @ 193..=208) => 192 - code as i32,
        (OperandField::SignedConstIntPos | OperandField::SignedConstIntNeg, _) => {
            return Err(unsupported(field_name(operand), "inline constant code out of range"))
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// Register addressed by a 32-bit register operand
fn operand_reg(operand: &InstOperand) -> Option<Reg> {
    match operand.field {
        OperandField::ScalarGpr => Some(Reg::Sgpr(operand.code)),
        OperandField::VectorGpr => Some(Reg::Vgpr(operand.code)),
        OperandField::VccLo => Some(Reg::VccLo),
        OperandField::VccHi => Some(Reg::VccHi),
        OperandField::M0 => Some(Reg::M0),
        _ => None,
    }
}

impl<'a> Translator<'a> {
    /// Resolve a source operand as `u32`, or as `f32` when `force_flt` is
    /// set or the operand is declared float.
    pub(crate) fn resolve(&mut self, operand: &InstOperand, force_flt: bool) -> Result<Value, TranslateError> {
        let is_float = force_flt || operand.is_float();
        let want = if is_float { Type::F32 } else { Type::U32 };

        let value = if let Some(int) = inline_int(operand)? {
            if is_float {
                Value::F32(int as u32)
            } else {
                Value::U32(int as u32)
            }
        } else if let Some(float) = operand.field.float_constant() {
            if is_float {
                Value::imm_f32(float)
            } else {
                Value::U32(float.to_bits())
            }
        } else {
            match operand.field {
                OperandField::LiteralConst => {
                    if is_float {
                        Value::F32(operand.code)
                    } else {
                        Value::U32(operand.code)
                    }
                }
                OperandField::Scc => {
                    let scc = self.get_scc()?;
                    let word = self.ir.select(scc, Value::U32(1), Value::U32(0));
                    self.cast(word, want)?
                }
                _ => match operand_reg(operand) {
                    Some(reg) => self.read_word(reg, want)?,
                    None => {
                        return Err(unsupported(
                            field_name(operand),
                            "not readable as a 32-bit value",
                        ))
                    }
                },
            }
        };

        self.apply_input_modifiers(operand, value, is_float)
    }

    fn apply_input_modifiers(
        &mut self,
        operand: &InstOperand,
        mut value: Value,
        is_float: bool,
    ) -> Result<Value, TranslateError> {
        let mods = operand.input_modifier;
        if mods.is_empty() {
            return Ok(value);
        }
        if !is_float {
            return Err(unsupported(field_name(operand), "input modifiers on an integer read"));
        }
        if mods.contains(InputModifiers::ABS) {
            value = self.ir.fp_abs(value);
        }
        if mods.contains(InputModifiers::NEG) {
            value = self.ir.fp_neg(value);
        }
        Ok(value)
    }

    pub(crate) fn get_src(&mut self, operand: &InstOperand) -> Result<Value, TranslateError> {
        self.resolve(operand, false)
    }

    pub(crate) fn get_src_f32(&mut self, operand: &InstOperand) -> Result<Value, TranslateError> {
        self.resolve(operand, true)
    }

    /// Reinterpret `value` as `want` (`u32` or `f32`)
    pub(crate) fn cast(&mut self, value: Value, want: Type) -> Result<Value, TranslateError> {
        match (value.ty(), want) {
            (have, want) if have == want => Ok(value),
            (Type::U32, Type::F32) => Ok(self.ir.bitcast_to_f32(value)),
            (Type::F32, Type::U32) => Ok(self.ir.bitcast_to_u32(value)),
            (Type::U1, _) => {
                let word = self.ir.select(value, Value::U32(1), Value::U32(0));
                self.cast(word, want)
            }
            (have, want) => Err(unsupported(have, &format!("cannot be read as {want}"))),
        }
    }

    fn read_word(&mut self, reg: Reg, want: Type) -> Result<Value, TranslateError> {
        let value = match self.regs.get(reg) {
            Some(Slot::Word(value)) => value,
            Some(Slot::MaskLo(_) | Slot::MaskHi(_)) => {
                return Err(unsupported(reg, "holds half of a lane mask"))
            }
            Some(Slot::Partial) => return Err(unsupported(reg, "partially overwritten lane mask")),
            None => self.undefined_word(reg, want)?,
        };
        self.cast(value, want)
    }

    /// Value of a register never written in this block
    fn undefined_word(&mut self, reg: Reg, want: Type) -> Result<Value, TranslateError> {
        match self.config.undefined_reads {
            UndefinedReadPolicy::LiveIn => Ok(self.live_in(reg, want)),
            UndefinedReadPolicy::Zero => Ok(Value::U32(0)),
            UndefinedReadPolicy::Error => Err(TranslateError::UndefinedRegister(reg.to_string())),
        }
    }

    /// Read `reg` on entry to the block, once per register
    fn live_in(&mut self, reg: Reg, ty: Type) -> Value {
        let is_mask = ty == Type::U1;
        if let Some(cached) = self.regs.live_in(reg) {
            if (cached.ty() == Type::U1) == is_mask {
                return cached;
            }
        }
        let saved = self.ir.exec();
        self.ir.set_exec(None);
        let value = self.ir.get_register(reg, ty);
        self.ir.set_exec(saved);
        self.regs.record_live_in(reg, value);
        value
    }

    /// Commit a 32-bit result, applying the operand's output modifiers.
    ///
    /// VGPR writes keep the previous contents in lanes outside EXEC.
    pub(crate) fn set_dst(&mut self, operand: &InstOperand, value: Value) -> Result<(), TranslateError> {
        let value = self.apply_output_modifiers(operand, value)?;
        match operand.field {
            OperandField::ExecLo | OperandField::ExecHi => {
                Err(TranslateError::UnsupportedFeature("32-bit EXEC write".to_string()))
            }
            _ => match operand_reg(operand) {
                Some(reg) => {
                    let value = if operand.field == OperandField::VectorGpr {
                        self.merge_inactive_lanes(reg, value)?
                    } else {
                        value
                    };
                    self.regs.set_word(reg, value);
                    Ok(())
                }
                None => Err(unsupported(field_name(operand), "not a writable register")),
            },
        }
    }

    fn merge_inactive_lanes(&mut self, reg: Reg, value: Value) -> Result<Value, TranslateError> {
        let exec = self.current_exec()?;
        if exec.is_full() {
            return Ok(value);
        }
        let old = self.read_word(reg, value.ty())?;
        Ok(self.ir.select(exec.value(), value, old))
    }

    /// Commit a moved value; registers are copied so every write is a new value
    pub(crate) fn set_dst_move(&mut self, operand: &InstOperand, value: Value) -> Result<(), TranslateError> {
        let value = if value.is_immediate() { value } else { self.ir.copy(value) };
        self.set_dst(operand, value)
    }

    fn apply_output_modifiers(&mut self, operand: &InstOperand, mut value: Value) -> Result<Value, TranslateError> {
        let modifier = operand.output_modifier;
        if modifier.is_identity() {
            return Ok(value);
        }
        if value.ty() != Type::F32 {
            return Err(unsupported(field_name(operand), "output modifiers on an integer result"));
        }
        let scale = match modifier.multiplier {
            Omod::None => None,
            Omod::Mul2 => Some(2.0),
            Omod::Mul4 => Some(4.0),
            Omod::Div2 => Some(0.5),
        };
        if let Some(scale) = scale {
            value = self.ir.fp_mul(value, Value::imm_f32(scale));
        }
        if modifier.clamp {
            value = self.ir.fp_saturate(value);
        }
        Ok(value)
    }

    pub(crate) fn get_scc(&mut self) -> Result<Value, TranslateError> {
        match self.regs.get(Reg::Scc) {
            Some(Slot::Word(value)) => Ok(value),
            Some(_) => Err(unsupported(Reg::Scc, "not a condition code")),
            None => match self.config.undefined_reads {
                UndefinedReadPolicy::LiveIn => Ok(self.live_in(Reg::Scc, Type::U1)),
                UndefinedReadPolicy::Zero => Ok(Value::U1(false)),
                UndefinedReadPolicy::Error => Err(TranslateError::UndefinedRegister(Reg::Scc.to_string())),
            },
        }
    }

    pub(crate) fn set_scc(&mut self, value: Value) {
        self.regs.set_word(Reg::Scc, value);
    }

    /// Registers of the pair addressed by a 64-bit operand
    fn pair_regs(operand: &InstOperand) -> Option<(Reg, Reg)> {
        match operand.field {
            OperandField::ScalarGpr => operand
                .code
                .checked_add(1)
                .map(|hi| (Reg::Sgpr(operand.code), Reg::Sgpr(hi))),
            OperandField::VccLo => Some((Reg::VccLo, Reg::VccHi)),
            _ => None,
        }
    }

    /// Whether a 64-bit register operand currently holds two 32-bit halves
    pub(crate) fn holds_halves(&self, operand: &InstOperand) -> bool {
        Self::pair_regs(operand)
            .is_some_and(|(lo, hi)| matches!(self.regs.get(lo), Some(Slot::Word(_))) || matches!(self.regs.get(hi), Some(Slot::Word(_))))
    }

    /// Read a 64-bit operand.
    ///
    /// A pair never written in the block is read as a lane mask when
    /// `prefer_mask` is set, otherwise as two halves.
    pub(crate) fn read_pair(&mut self, operand: &InstOperand, prefer_mask: bool) -> Result<Pair, TranslateError> {
        if operand.field == OperandField::ExecLo {
            return Ok(Pair::Mask(self.current_exec()?.value()));
        }

        if let Some(int) = inline_int(operand)? {
            let high = if int < 0 { u32::MAX } else { 0 };
            return self.const_pair(int as u32, high, prefer_mask);
        }
        if operand.field == OperandField::LiteralConst {
            return self.const_pair(operand.code, 0, prefer_mask);
        }

        let Some((lo, hi)) = Self::pair_regs(operand) else {
            return Err(unsupported(field_name(operand), "not readable as a 64-bit value"));
        };
        match (self.regs.get(lo), self.regs.get(hi)) {
            (Some(Slot::MaskLo(mask)), Some(Slot::MaskHi(other))) if mask == other => Ok(Pair::Mask(mask)),
            (None, None) if prefer_mask => {
                let mask = match self.config.undefined_reads {
                    UndefinedReadPolicy::LiveIn => self.live_in(lo, Type::U1),
                    UndefinedReadPolicy::Zero => Value::U1(false),
                    UndefinedReadPolicy::Error => {
                        return Err(TranslateError::UndefinedRegister(lo.to_string()))
                    }
                };
                Ok(Pair::Mask(mask))
            }
            (None | Some(Slot::Word(_)), None | Some(Slot::Word(_))) => {
                let low = self.read_word(lo, Type::U32)?;
                let high = self.read_word(hi, Type::U32)?;
                Ok(Pair::Halves(low, high))
            }
            _ => Err(unsupported(lo, "partially overwritten lane mask")),
        }
    }

    fn const_pair(&mut self, low: u32, high: u32, prefer_mask: bool) -> Result<Pair, TranslateError> {
        let pair = Pair::Halves(Value::U32(low), Value::U32(high));
        if prefer_mask {
            Ok(Pair::Mask(self.pair_to_mask(pair)?))
        } else {
            Ok(pair)
        }
    }

    /// Lane mask held by a pair
    pub(crate) fn pair_to_mask(&mut self, pair: Pair) -> Result<Value, TranslateError> {
        match pair {
            Pair::Mask(mask) => Ok(mask),
            Pair::Halves(Value::U32(0), Value::U32(0)) => Ok(Value::U1(false)),
            Pair::Halves(Value::U32(u32::MAX), Value::U32(u32::MAX)) => Ok(Value::U1(true)),
            Pair::Halves(..) => Err(unsupported("pair", "32-bit halves used as a lane mask")),
        }
    }

    /// Read a 64-bit operand as a lane mask
    pub(crate) fn read_mask(&mut self, operand: &InstOperand) -> Result<Value, TranslateError> {
        let pair = self.read_pair(operand, true)?;
        self.pair_to_mask(pair)
    }

    /// Commit a lane mask to both registers of a pair
    pub(crate) fn commit_mask(&mut self, operand: Option<&InstOperand>, mask: Value) -> Result<(), TranslateError> {
        let (lo, hi) = match operand {
            None => (Reg::VccLo, Reg::VccHi),
            Some(operand) => match Self::pair_regs(operand) {
                Some(regs) => regs,
                None if operand.field == OperandField::ExecLo => {
                    return Err(TranslateError::UnsupportedFeature(
                        "EXEC write that may widen the mask".to_string(),
                    ))
                }
                None => return Err(unsupported(field_name(operand), "not a writable register pair")),
            },
        };
        self.regs.set_mask(lo, hi, mask);
        Ok(())
    }

    /// Commit a 64-bit value to both registers of a pair
    pub(crate) fn commit_pair(&mut self, operand: &InstOperand, pair: Pair) -> Result<(), TranslateError> {
        match pair {
            Pair::Mask(mask) => self.commit_mask(Some(operand), mask),
            Pair::Halves(low, high) => {
                let Some((lo, hi)) = Self::pair_regs(operand) else {
                    if operand.field == OperandField::ExecLo {
                        return Err(TranslateError::UnsupportedFeature(
                            "EXEC write that may widen the mask".to_string(),
                        ));
                    }
                    return Err(unsupported(field_name(operand), "not a writable register pair"));
                };
                self.regs.set_halves(lo, hi, low, high);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;
    use crate::instruction::{GcnInst, InstOperand};
    use crate::opcode::Opcode;
    use gr_core::config::TranslatorConfig;
    use gr_ir::{Block, ExecMask, Opcode as IrOp};
    use crate::info::ShaderInfo;

    fn with_translator<R>(config: TranslatorConfig, f: impl FnOnce(&mut Translator<'_>) -> R) -> (R, Block) {
        let mut block = Block::new(0);
        let mut info = ShaderInfo::default();
        let result = {
            let mut t = Translator::new(&mut block, &mut info, &config).with_entry_exec(ExecMask::full());
            f(&mut t)
        };
        (result, block)
    }

    #[test]
    fn test_inline_constants_typed() {
        let (values, block) = with_translator(TranslatorConfig::default(), |t| {
            [
                t.get_src(&InstOperand::int(-3)).unwrap(),
                t.get_src_f32(&InstOperand::float_const(0.5)).unwrap(),
                t.get_src(&InstOperand::float_const(1.0)).unwrap(),
                t.get_src_f32(&InstOperand::int(2)).unwrap(),
                t.get_src(&InstOperand::literal(0x1234)).unwrap(),
            ]
        });
        assert_eq!(values[0], Value::U32((-3i32) as u32));
        assert_eq!(values[1], Value::imm_f32(0.5));
        assert_eq!(values[2], Value::U32(0x3f80_0000));
        assert_eq!(values[3], Value::F32(2));
        assert_eq!(values[4], Value::U32(0x1234));
        assert!(block.is_empty());
    }

    #[test]
    fn test_live_in_read_once() {
        let (values, block) = with_translator(TranslatorConfig::default(), |t| {
            let a = t.get_src(&InstOperand::sgpr(4)).unwrap();
            let b = t.get_src(&InstOperand::sgpr(4)).unwrap();
            (a, b)
        });
        assert_eq!(values.0, values.1);
        assert_eq!(block.filter_op(IrOp::GetRegister).count(), 1);
    }

    #[test]
    fn test_float_read_of_integer_register_bitcasts() {
        let (value, block) = with_translator(TranslatorConfig::default(), |t| {
            let int = t.ir.iadd(Value::U32(1), Value::U32(2));
            t.set_dst(&InstOperand::vgpr(0), int).unwrap();
            t.get_src_f32(&InstOperand::vgpr(0)).unwrap()
        });
        assert_eq!(value.ty(), Type::F32);
        assert_eq!(block.def(value).unwrap().op, IrOp::BitCastF32U32);
    }

    #[test]
    fn test_input_modifiers_abs_then_neg() {
        let (value, block) = with_translator(TranslatorConfig::default(), |t| {
            t.get_src_f32(&InstOperand::vgpr(1).abs().neg()).unwrap()
        });
        let neg = block.def(value).unwrap();
        assert_eq!(neg.op, IrOp::FpNeg);
        assert_eq!(block.def(neg.args[0]).unwrap().op, IrOp::FpAbs);
    }

    #[test]
    fn test_modifiers_rejected_on_integer_reads() {
        let (result, _) = with_translator(TranslatorConfig::default(), |t| {
            t.get_src(&InstOperand::vgpr(1).neg())
        });
        assert!(matches!(result, Err(TranslateError::UnsupportedOperand { .. })));
    }

    #[test]
    fn test_output_modifiers() {
        let (_, block) = with_translator(TranslatorConfig::default(), |t| {
            let v = t.get_src_f32(&InstOperand::vgpr(1)).unwrap();
            t.set_dst(&InstOperand::vgpr(0).omod(Omod::Mul2).clamp(), v).unwrap();
        });
        let out = block.live_out(Reg::Vgpr(0)).unwrap();
        let sat = block.def(out).unwrap();
        assert_eq!(sat.op, IrOp::FpSaturate);
        let mul = block.def(sat.args[0]).unwrap();
        assert_eq!(mul.op, IrOp::FpMul);
        assert_eq!(mul.args[1], Value::imm_f32(2.0));
    }

    #[test]
    fn test_vgpr_write_keeps_inactive_lanes() {
        let (pred, block) = with_translator(TranslatorConfig::default(), |t| {
            let pred = t.ir.get_register(Reg::VccLo, Type::U1);
            t.narrow_exec(pred).unwrap();
            t.set_dst(&InstOperand::vgpr(0), Value::U32(9)).unwrap();
            t.set_dst(&InstOperand::sgpr(0), Value::U32(9)).unwrap();
            pred
        });
        let merge = block.def(block.live_out(Reg::Vgpr(0)).unwrap()).unwrap();
        assert_eq!(merge.op, IrOp::Select);
        assert_eq!(merge.args[0], pred);
        assert_eq!(merge.args[1], Value::U32(9));
        assert_eq!(block.def(merge.args[2]).unwrap().op, IrOp::GetRegister);
        assert_eq!(block.live_out(Reg::Sgpr(0)), Some(Value::U32(9)));
    }

    #[test]
    fn test_out_of_range_codes_rejected() {
        let (results, _) = with_translator(TranslatorConfig::default(), |t| {
            [
                t.get_src(&InstOperand::new(OperandField::SignedConstIntPos, u32::MAX)).map(drop),
                t.get_src(&InstOperand::new(OperandField::SignedConstIntNeg, 7)).map(drop),
                t.read_pair(&InstOperand::sgpr(u32::MAX), false).map(drop),
                register_index(&InstOperand::sgpr(u32::MAX / 2), 4, 0).map(drop),
                register_index(&InstOperand::vgpr(u32::MAX), 1, 1).map(drop),
            ]
        });
        for result in results {
            assert!(matches!(result, Err(TranslateError::UnsupportedOperand { .. })));
        }
        assert_eq!(register_index(&InstOperand::sgpr(3), 4, 1), Ok(13));
    }

    #[test]
    fn test_unreadable_operands() {
        let (results, _) = with_translator(TranslatorConfig::default(), |t| {
            [
                t.get_src(&InstOperand::from_encoding(251, 0)),
                t.get_src(&InstOperand::from_encoding(110, 0)),
                t.get_src(&InstOperand::exec()),
            ]
        });
        for result in results {
            assert!(matches!(result, Err(TranslateError::UnsupportedOperand { .. })));
        }
    }

    #[test]
    fn test_zero_policy_defaults() {
        let config = TranslatorConfig {
            undefined_reads: UndefinedReadPolicy::Zero,
            ..Default::default()
        };
        let (values, block) = with_translator(config, |t| {
            (
                t.get_src(&InstOperand::vgpr(9)).unwrap(),
                t.read_mask(&InstOperand::vcc()).unwrap(),
                t.current_exec().unwrap().value(),
            )
        });
        assert_eq!(values, (Value::U32(0), Value::U1(false), Value::U1(true)));
        assert!(block.is_empty());
    }

    #[test]
    fn test_constant_pairs() {
        let (pairs, _) = with_translator(TranslatorConfig::default(), |t| {
            (
                t.read_pair(&InstOperand::int(-1), false).unwrap(),
                t.read_mask(&InstOperand::int(-1)).unwrap(),
                t.read_mask(&InstOperand::int(0)).unwrap(),
                t.read_mask(&InstOperand::int(5)),
            )
        });
        assert_eq!(pairs.0, Pair::Halves(Value::U32(u32::MAX), Value::U32(u32::MAX)));
        assert_eq!(pairs.1, Value::U1(true));
        assert_eq!(pairs.2, Value::U1(false));
        assert!(pairs.3.is_err());
    }

    #[test]
    fn test_mask_pair_round_trip_and_partial() {
        let (results, _) = with_translator(TranslatorConfig::default(), |t| {
            let pred = t.ir.get_register(Reg::VccLo, Type::U1);
            t.commit_mask(Some(&InstOperand::sgpr(10)), pred).unwrap();
            let whole = t.read_pair(&InstOperand::sgpr(10), false).unwrap();
            t.set_dst(&InstOperand::sgpr(11), Value::U32(0)).unwrap();
            let broken = t.read_pair(&InstOperand::sgpr(10), false);
            (pred, whole, broken)
        });
        assert_eq!(results.1, Pair::Mask(results.0));
        assert!(matches!(results.2, Err(TranslateError::UnsupportedOperand { .. })));
    }

    #[test]
    fn test_scc_read_as_word() {
        let (value, block) = with_translator(TranslatorConfig::default(), |t| {
            t.set_scc(Value::U1(true));
            t.get_src(&InstOperand::scc()).unwrap()
        });
        assert_eq!(block.def(value).unwrap().op, IrOp::Select);
    }

    #[test]
    fn test_exec_is_not_a_word_destination() {
        let insts = vec![GcnInst::op(Opcode::S_MOV_B32, InstOperand::exec(), &[InstOperand::int(0)])];
        let err = try_translate(&insts).unwrap_err();
        assert!(matches!(err.root(), TranslateError::UnsupportedFeature(_)));
    }
}
