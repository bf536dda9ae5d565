//! Scalar ALU handlers (SOP1, SOP2, SOPK, SOPC)

use super::operand::Pair;
use super::{ConditionOp, HandlerTable, Translator};
use crate::instruction::{GcnInst, InstOperand, OperandField};
use crate::opcode::Opcode;
use gr_core::error::TranslateError;
use gr_ir::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BitOp {
    And,
    Or,
    Xor,
    /// `a & !b`
    AndN2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShiftOp {
    Left,
    RightLogical,
    RightArithmetic,
}

pub(super) fn register(table: &mut HandlerTable) {
    table.add(Opcode::S_MOV_B32, "s_mov", |t, i| t.s_mov(i));
    table.add(Opcode::S_MOVK_I32, "s_mov", |t, i| t.s_mov(i));
    table.add(Opcode::S_MOV_B64, "s_mov_b64", |t, i| t.s_mov_b64(i));
    table.add(Opcode::S_CSELECT_B32, "s_cselect", |t, i| t.s_cselect(i));
    table.add(Opcode::S_MUL_I32, "s_mul", |t, i| t.s_mul(i));
    table.add(Opcode::S_ADD_U32, "s_add_u32", |t, i| t.s_add(false, i));
    table.add(Opcode::S_ADD_I32, "s_add_i32", |t, i| t.s_add(true, i));
    table.add(Opcode::S_SUB_U32, "s_sub_u32", |t, i| t.s_sub(false, i));
    table.add(Opcode::S_SUB_I32, "s_sub_i32", |t, i| t.s_sub(true, i));
    table.add(Opcode::S_AND_B32, "s_and", |t, i| t.s_bitwise(BitOp::And, i));
    table.add(Opcode::S_OR_B32, "s_or", |t, i| t.s_bitwise(BitOp::Or, i));
    table.add(Opcode::S_XOR_B32, "s_xor", |t, i| t.s_bitwise(BitOp::Xor, i));
    table.add(Opcode::S_LSHL_B32, "s_lshl", |t, i| t.s_shift(ShiftOp::Left, i));
    table.add(Opcode::S_LSHR_B32, "s_lshr", |t, i| t.s_shift(ShiftOp::RightLogical, i));
    table.add(Opcode::S_ASHR_I32, "s_ashr", |t, i| t.s_shift(ShiftOp::RightArithmetic, i));
    table.add(Opcode::S_AND_B64, "s_and_b64", |t, i| t.s_bitwise_b64(BitOp::And, i));
    table.add(Opcode::S_OR_B64, "s_or_b64", |t, i| t.s_bitwise_b64(BitOp::Or, i));
    table.add(Opcode::S_ANDN2_B64, "s_andn2_b64", |t, i| t.s_bitwise_b64(BitOp::AndN2, i));
    table.add(Opcode::S_AND_SAVEEXEC_B64, "s_and_saveexec", |t, i| t.s_and_saveexec(i));

    table.add(Opcode::S_CMP_EQ_I32, "s_cmp", |t, i| t.s_cmp(ConditionOp::Eq, true, i));
    table.add(Opcode::S_CMP_LG_I32, "s_cmp", |t, i| t.s_cmp(ConditionOp::Lg, true, i));
    table.add(Opcode::S_CMP_GT_I32, "s_cmp", |t, i| t.s_cmp(ConditionOp::Gt, true, i));
    table.add(Opcode::S_CMP_GE_I32, "s_cmp", |t, i| t.s_cmp(ConditionOp::Ge, true, i));
    table.add(Opcode::S_CMP_LT_I32, "s_cmp", |t, i| t.s_cmp(ConditionOp::Lt, true, i));
    table.add(Opcode::S_CMP_LE_I32, "s_cmp", |t, i| t.s_cmp(ConditionOp::Le, true, i));
    table.add(Opcode::S_CMP_EQ_U32, "s_cmp", |t, i| t.s_cmp(ConditionOp::Eq, false, i));
    table.add(Opcode::S_CMP_LG_U32, "s_cmp", |t, i| t.s_cmp(ConditionOp::Lg, false, i));
    table.add(Opcode::S_CMP_GT_U32, "s_cmp", |t, i| t.s_cmp(ConditionOp::Gt, false, i));
    table.add(Opcode::S_CMP_GE_U32, "s_cmp", |t, i| t.s_cmp(ConditionOp::Ge, false, i));
    table.add(Opcode::S_CMP_LT_U32, "s_cmp", |t, i| t.s_cmp(ConditionOp::Lt, false, i));
    table.add(Opcode::S_CMP_LE_U32, "s_cmp", |t, i| t.s_cmp(ConditionOp::Le, false, i));
}

impl<'a> Translator<'a> {
    /// Emit `cond(a, b)` on 32-bit integers
    pub(super) fn emit_int_compare(&mut self, cond: ConditionOp, is_signed: bool, a: Value, b: Value) -> Value {
        match cond {
            ConditionOp::False => Value::U1(false),
            ConditionOp::Eq => self.ir.i_equal(a, b),
            ConditionOp::Lg => self.ir.i_not_equal(a, b),
            ConditionOp::Gt => self.ir.i_greater_than(a, b, is_signed),
            ConditionOp::Ge => self.ir.i_greater_than_equal(a, b, is_signed),
            ConditionOp::Lt => self.ir.i_less_than(a, b, is_signed),
            ConditionOp::Le => self.ir.i_less_than_equal(a, b, is_signed),
        }
    }

    /// Shift amounts only use their low five bits
    pub(super) fn shift_amount(&mut self, shift: Value) -> Value {
        match shift {
            Value::U32(bits) => Value::U32(bits & 0x1f),
            _ => self.ir.bitwise_and(shift, Value::U32(0x1f)),
        }
    }

    fn set_scc_nonzero(&mut self, result: Value) {
        let scc = self.ir.i_not_equal(result, Value::U32(0));
        self.set_scc(scc);
    }

    fn s_mov(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let value = self.get_src(inst.src(0)?)?;
        self.set_dst_move(inst.dst(0)?, value)
    }

    fn s_mov_b64(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let src = inst.src(0)?;
        let dst = inst.dst(0)?;
        if dst.field == OperandField::ExecLo {
            return Err(TranslateError::UnsupportedFeature(
                "EXEC write that may widen the mask".to_string(),
            ));
        }
        let prefer_mask = matches!(src.field, OperandField::VccLo | OperandField::ExecLo);
        let pair = match self.read_pair(src, prefer_mask)? {
            Pair::Mask(mask) => Pair::Mask(self.copy_of(mask)),
            Pair::Halves(low, high) => Pair::Halves(self.copy_of(low), self.copy_of(high)),
        };
        self.commit_pair(dst, pair)
    }

    fn copy_of(&mut self, value: Value) -> Value {
        if value.is_immediate() {
            value
        } else {
            self.ir.copy(value)
        }
    }

    fn s_cselect(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src(inst.src(0)?)?;
        let b = self.get_src(inst.src(1)?)?;
        let scc = self.get_scc()?;
        let result = self.ir.select(scc, a, b);
        self.set_dst(inst.dst(0)?, result)
    }

    fn s_mul(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src(inst.src(0)?)?;
        let b = self.get_src(inst.src(1)?)?;
        let result = self.ir.imul(a, b);
        self.set_dst(inst.dst(0)?, result)
    }

    /// SCC is the carry-out, or signed overflow for the signed form
    fn s_add(&mut self, is_signed: bool, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src(inst.src(0)?)?;
        let b = self.get_src(inst.src(1)?)?;
        let result = self.ir.iadd(a, b);
        let scc = if is_signed {
            let a_diff = self.ir.bitwise_xor(a, result);
            let b_diff = self.ir.bitwise_xor(b, result);
            let both = self.ir.bitwise_and(a_diff, b_diff);
            self.ir.i_less_than(both, Value::U32(0), true)
        } else {
            self.ir.i_less_than(result, a, false)
        };
        self.set_dst(inst.dst(0)?, result)?;
        self.set_scc(scc);
        Ok(())
    }

    /// SCC is the borrow, or signed overflow for the signed form
    fn s_sub(&mut self, is_signed: bool, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src(inst.src(0)?)?;
        let b = self.get_src(inst.src(1)?)?;
        let result = self.ir.isub(a, b);
        let scc = if is_signed {
            let sign_diff = self.ir.bitwise_xor(a, b);
            let result_diff = self.ir.bitwise_xor(a, result);
            let both = self.ir.bitwise_and(sign_diff, result_diff);
            self.ir.i_less_than(both, Value::U32(0), true)
        } else {
            self.ir.i_less_than(a, b, false)
        };
        self.set_dst(inst.dst(0)?, result)?;
        self.set_scc(scc);
        Ok(())
    }

    fn s_bitwise(&mut self, op: BitOp, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src(inst.src(0)?)?;
        let b = self.get_src(inst.src(1)?)?;
        let result = self.bitwise_u32(op, a, b);
        self.set_dst(inst.dst(0)?, result)?;
        self.set_scc_nonzero(result);
        Ok(())
    }

    fn bitwise_u32(&mut self, op: BitOp, a: Value, b: Value) -> Value {
        match op {
            BitOp::And => self.ir.bitwise_and(a, b),
            BitOp::Or => self.ir.bitwise_or(a, b),
            BitOp::Xor => self.ir.bitwise_xor(a, b),
            BitOp::AndN2 => {
                let not_b = self.ir.bitwise_not(b);
                self.ir.bitwise_and(a, not_b)
            }
        }
    }

    fn bitwise_mask(&mut self, op: BitOp, a: Value, b: Value) -> Value {
        match op {
            BitOp::And => self.ir.logical_and(a, b),
            BitOp::Or => self.ir.logical_or(a, b),
            BitOp::Xor => self.ir.i_not_equal(a, b),
            BitOp::AndN2 => {
                let not_b = self.ir.logical_not(b);
                self.ir.logical_and(a, not_b)
            }
        }
    }

    fn s_shift(&mut self, op: ShiftOp, inst: &GcnInst) -> Result<(), TranslateError> {
        let base = self.get_src(inst.src(0)?)?;
        let shift = self.get_src(inst.src(1)?)?;
        let shift = self.shift_amount(shift);
        let result = match op {
            ShiftOp::Left => self.ir.shift_left_logical(base, shift),
            ShiftOp::RightLogical => self.ir.shift_right_logical(base, shift),
            ShiftOp::RightArithmetic => self.ir.shift_right_arithmetic(base, shift),
        };
        self.set_dst(inst.dst(0)?, result)?;
        self.set_scc_nonzero(result);
        Ok(())
    }

    fn s_cmp(&mut self, cond: ConditionOp, is_signed: bool, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src(inst.src(0)?)?;
        let b = self.get_src(inst.src(1)?)?;
        let result = self.emit_int_compare(cond, is_signed, a, b);
        self.set_scc(result);
        Ok(())
    }

    /// 64-bit bitwise op on register pairs, committing both halves at once
    fn s_bitwise_b64(&mut self, op: BitOp, inst: &GcnInst) -> Result<(), TranslateError> {
        let src0 = inst.src(0)?;
        let src1 = inst.src(1)?;
        let dst = inst.dst(0)?;

        if dst.field == OperandField::ExecLo {
            return self.s_narrow_exec(op, src0, src1);
        }

        let prefer_mask = !(self.holds_halves(src0) || self.holds_halves(src1));
        let a = self.read_pair(src0, prefer_mask)?;
        let b = self.read_pair(src1, prefer_mask)?;
        match (a, b) {
            (Pair::Halves(a_lo, a_hi), Pair::Halves(b_lo, b_hi)) => {
                let lo = self.bitwise_u32(op, a_lo, b_lo);
                let hi = self.bitwise_u32(op, a_hi, b_hi);
                let any = self.ir.bitwise_or(lo, hi);
                self.commit_pair(dst, Pair::Halves(lo, hi))?;
                self.set_scc_nonzero(any);
            }
            (a, b) => {
                let a = self.pair_to_mask(a)?;
                let b = self.pair_to_mask(b)?;
                let mask = self.bitwise_mask(op, a, b);
                let any = self.ir.vote_any(mask);
                self.commit_mask(Some(dst), mask)?;
                self.set_scc(any);
            }
        }
        Ok(())
    }

    /// `exec = exec & x` or `exec = exec & !x`; anything else could add lanes
    fn s_narrow_exec(
        &mut self,
        op: BitOp,
        src0: &InstOperand,
        src1: &InstOperand,
    ) -> Result<(), TranslateError> {
        let other = match op {
            BitOp::And if src0.field == OperandField::ExecLo => src1,
            BitOp::And if src1.field == OperandField::ExecLo => src0,
            BitOp::AndN2 if src0.field == OperandField::ExecLo => src1,
            _ => {
                return Err(TranslateError::UnsupportedFeature(
                    "EXEC write that may widen the mask".to_string(),
                ))
            }
        };
        let mut pred = self.read_mask(other)?;
        if op == BitOp::AndN2 {
            pred = match pred {
                Value::U1(lanes) => Value::U1(!lanes),
                _ => self.ir.logical_not(pred),
            };
        }
        let exec = self.narrow_exec(pred)?;
        let any = self.ir.vote_any(exec.value());
        self.set_scc(any);
        Ok(())
    }

    /// Save EXEC into the destination pair, then narrow it by the source
    fn s_and_saveexec(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let src = inst.src(0)?;
        let dst = inst.dst(0)?;
        let old = self.current_exec()?;
        let pred = self.read_mask(src)?;
        self.commit_mask(Some(dst), old.value())?;
        let exec = self.narrow_exec(pred)?;
        let any = self.ir.vote_any(exec.value());
        self.set_scc(any);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;
    use gr_ir::{Evaluator, Opcode as IrOp, Reg, Type};

    fn sop2(opcode: Opcode, dst: u32, a: InstOperand, b: InstOperand) -> GcnInst {
        GcnInst::op(opcode, InstOperand::sgpr(dst), &[a, b])
    }

    #[test]
    fn test_mov_then_mul() {
        let block = translate_ok(&[
            GcnInst::op(Opcode::S_MOV_B32, InstOperand::sgpr(0), &[InstOperand::int(5)]),
            sop2(Opcode::S_MUL_I32, 1, InstOperand::sgpr(0), InstOperand::sgpr(0)),
        ]);
        assert_eq!(block.live_out(Reg::Sgpr(0)), Some(Value::U32(5)));
        let s1 = block.live_out(Reg::Sgpr(1)).unwrap();
        let mul = block.def(s1).unwrap();
        assert_eq!(mul.op, IrOp::IMul);
        assert_eq!(mul.args, vec![Value::U32(5), Value::U32(5)]);

        let eval = Evaluator::new(1).run(&block).unwrap();
        assert_eq!(eval.value(s1), vec![25]);
    }

    #[test]
    fn test_register_move_commits_new_value() {
        let block = translate_ok(&[
            GcnInst::op(Opcode::S_MOV_B32, InstOperand::sgpr(1), &[InstOperand::sgpr(0)]),
            GcnInst::op(Opcode::S_MOV_B32, InstOperand::sgpr(2), &[InstOperand::sgpr(0)]),
        ]);
        let s1 = block.live_out(Reg::Sgpr(1)).unwrap();
        let s2 = block.live_out(Reg::Sgpr(2)).unwrap();
        assert_ne!(s1, s2);
        assert_eq!(block.def(s1).unwrap().op, IrOp::Copy);
    }

    #[test]
    fn test_unsigned_add_carry() {
        let block = translate_ok(&[sop2(
            Opcode::S_ADD_U32,
            2,
            InstOperand::sgpr(0),
            InstOperand::sgpr(1),
        )]);
        let eval = Evaluator::new(1)
            .with_uniform(Reg::Sgpr(0), u32::MAX)
            .with_uniform(Reg::Sgpr(1), 2)
            .run(&block)
            .unwrap();
        assert_eq!(eval.value(block.live_out(Reg::Sgpr(2)).unwrap()), vec![1]);
        assert_eq!(eval.value(block.live_out(Reg::Scc).unwrap()), vec![1]);
    }

    #[test]
    fn test_signed_overflow() {
        let insts = [
            sop2(Opcode::S_ADD_I32, 2, InstOperand::sgpr(0), InstOperand::sgpr(1)),
            GcnInst::op(Opcode::S_CSELECT_B32, InstOperand::sgpr(3), &[InstOperand::int(1), InstOperand::int(0)]),
        ];
        let block = translate_ok(&insts);
        let s3 = block.live_out(Reg::Sgpr(3)).unwrap();
        let run = |a: u32, b: u32| {
            Evaluator::new(1)
                .with_uniform(Reg::Sgpr(0), a)
                .with_uniform(Reg::Sgpr(1), b)
                .run(&block)
                .unwrap()
                .value(s3)
        };
        assert_eq!(run(i32::MAX as u32, 1), vec![1]);
        assert_eq!(run(5, (-7i32) as u32), vec![0]);
    }

    #[test]
    fn test_unsigned_sub_borrow() {
        let block = translate_ok(&[sop2(Opcode::S_SUB_U32, 2, InstOperand::int(3), InstOperand::int(4))]);
        let eval = Evaluator::new(1).run(&block).unwrap();
        assert_eq!(eval.value(block.live_out(Reg::Sgpr(2)).unwrap()), vec![u32::MAX]);
        assert_eq!(eval.value(block.live_out(Reg::Scc).unwrap()), vec![1]);
    }

    #[test]
    fn test_shift_masks_amount() {
        let block = translate_ok(&[sop2(
            Opcode::S_LSHL_B32,
            1,
            InstOperand::sgpr(0),
            InstOperand::int(33),
        )]);
        let s1 = block.live_out(Reg::Sgpr(1)).unwrap();
        assert_eq!(block.def(s1).unwrap().args[1], Value::U32(1));
        let eval = Evaluator::new(1).with_uniform(Reg::Sgpr(0), 3).run(&block).unwrap();
        assert_eq!(eval.value(s1), vec![6]);
    }

    #[test]
    fn test_scalar_compare_signedness() {
        let block = translate_ok(&[GcnInst::new(Opcode::S_CMP_LT_I32)
            .with_src(InstOperand::int(-1))
            .with_src(InstOperand::int(0))]);
        let scc = block.live_out(Reg::Scc).unwrap();
        assert_eq!(Evaluator::new(1).run(&block).unwrap().value(scc), vec![1]);

        let block = translate_ok(&[GcnInst::new(Opcode::S_CMP_LT_U32)
            .with_src(InstOperand::int(-1))
            .with_src(InstOperand::int(0))]);
        let scc = block.live_out(Reg::Scc).unwrap();
        assert_eq!(Evaluator::new(1).run(&block).unwrap().value(scc), vec![0]);
    }

    #[test]
    fn test_andn2_b64_on_halves() {
        let lit = |v: u32| InstOperand::literal(v);
        let block = translate_ok(&[
            GcnInst::op(Opcode::S_MOV_B32, InstOperand::sgpr(0), &[lit(0xff00_ff00)]),
            GcnInst::op(Opcode::S_MOV_B32, InstOperand::sgpr(1), &[lit(0x0000_ffff)]),
            GcnInst::op(Opcode::S_MOV_B32, InstOperand::sgpr(2), &[lit(0xf000_0000)]),
            GcnInst::op(Opcode::S_MOV_B32, InstOperand::sgpr(3), &[lit(0x0000_00ff)]),
            sop2(Opcode::S_ANDN2_B64, 4, InstOperand::sgpr(0), InstOperand::sgpr(2)),
        ]);
        let eval = Evaluator::new(1).run(&block).unwrap();
        assert_eq!(eval.value(block.live_out(Reg::Sgpr(4)).unwrap()), vec![0x0f00_ff00]);
        assert_eq!(eval.value(block.live_out(Reg::Sgpr(5)).unwrap()), vec![0x0000_ff00]);
        assert_eq!(eval.value(block.live_out(Reg::Scc).unwrap()), vec![1]);
    }

    #[test]
    fn test_and_b64_on_masks() {
        let block = translate_ok(&[GcnInst::op(
            Opcode::S_AND_B64,
            InstOperand::sgpr(0),
            &[InstOperand::vcc(), InstOperand::sgpr(4)],
        )]);
        let mask = block.live_out(Reg::Sgpr(0)).unwrap();
        assert_eq!(mask.ty(), Type::U1);
        assert!(block.live_out(Reg::Sgpr(1)).is_none());

        let eval = Evaluator::new(8)
            .with_mask(Reg::VccLo, 0b1100_1100)
            .with_mask(Reg::Sgpr(4), 0b1010_1010)
            .run(&block)
            .unwrap();
        assert_eq!(eval.mask(mask), 0b1000_1000);
    }

    #[test]
    fn test_and_saveexec() {
        let block = translate_live_exec(&[
            GcnInst::op(Opcode::S_AND_SAVEEXEC_B64, InstOperand::sgpr(8), &[InstOperand::vcc()]),
            GcnInst::op(Opcode::V_MOV_B32, InstOperand::vgpr(0), &[InstOperand::vgpr(1)]),
        ]);
        let eval = Evaluator::new(8)
            .with_uniform(Reg::Vgpr(0), 3)
            .with_uniform(Reg::Vgpr(1), 7)
            .with_mask(Reg::ExecLo, 0b0000_1111)
            .with_mask(Reg::VccLo, 0b0101_0101)
            .run(&block)
            .unwrap();
        assert_eq!(eval.mask(block.live_out(Reg::Sgpr(8)).unwrap()), 0b0000_1111);
        let exec = block.live_out(Reg::ExecLo).unwrap();
        assert_eq!(eval.mask(exec), 0b0000_0101);
        assert_eq!(eval.value(block.live_out(Reg::Scc).unwrap())[0], 1);
        assert_eq!(
            eval.value(block.live_out(Reg::Vgpr(0)).unwrap()),
            vec![7, 3, 7, 3, 3, 3, 3, 3]
        );

        let mov = block.insts().last().unwrap();
        assert_eq!(mov.exec, Some(exec));
    }

    #[test]
    fn test_andn2_into_exec_narrows() {
        let block = translate_live_exec(&[GcnInst::op(
            Opcode::S_ANDN2_B64,
            InstOperand::exec(),
            &[InstOperand::exec(), InstOperand::vcc()],
        )]);
        let eval = Evaluator::new(4)
            .with_mask(Reg::ExecLo, 0b1111)
            .with_mask(Reg::VccLo, 0b0011)
            .run(&block)
            .unwrap();
        assert_eq!(eval.mask(block.live_out(Reg::ExecLo).unwrap()), 0b1100);
    }

    #[test]
    fn test_widening_exec_writes_rejected() {
        let or = GcnInst::op(Opcode::S_OR_B64, InstOperand::exec(), &[InstOperand::exec(), InstOperand::vcc()]);
        let mov = GcnInst::op(Opcode::S_MOV_B64, InstOperand::exec(), &[InstOperand::int(-1)]);
        for inst in [or, mov] {
            let err = try_translate(&[inst]).unwrap_err();
            assert!(matches!(err.root(), TranslateError::UnsupportedFeature(_)));
        }
    }

    #[test]
    fn test_mov_b64_copies_both_halves() {
        let block = translate_ok(&[
            GcnInst::op(Opcode::S_MOV_B64, InstOperand::sgpr(2), &[InstOperand::sgpr(0)]),
            GcnInst::op(Opcode::S_MOV_B64, InstOperand::sgpr(4), &[InstOperand::vcc()]),
        ]);
        let s2 = block.live_out(Reg::Sgpr(2)).unwrap();
        let s3 = block.live_out(Reg::Sgpr(3)).unwrap();
        assert_eq!(block.def(s2).unwrap().op, IrOp::Copy);
        assert_eq!(block.def(s3).unwrap().op, IrOp::Copy);
        assert_eq!(block.live_out(Reg::Sgpr(4)).unwrap().ty(), Type::U1);
    }
}
