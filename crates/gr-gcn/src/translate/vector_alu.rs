//! Vector ALU handlers (VOP1, VOP2, VOP3, VOPC)

use super::{ConditionOp, HandlerTable, Translator};
use crate::instruction::{GcnInst, InstOperand};
use crate::opcode::Opcode;
use gr_core::error::TranslateError;
use gr_ir::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FloatOp {
    Add,
    Sub,
    /// `src1 - src0`
    SubRev,
    Mul,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FloatUnary {
    Fract,
    Floor,
    Recip,
    RecipSqrt,
}

pub(super) fn register(table: &mut HandlerTable) {
    table.add(Opcode::V_MOV_B32, "v_mov", |t, i| t.v_mov(i));
    table.add(Opcode::V_CNDMASK_B32, "v_cndmask", |t, i| t.v_cndmask(i));
    table.add(Opcode::V_ADD_F32, "v_add_f32", |t, i| t.v_float_binary(FloatOp::Add, i));
    table.add(Opcode::V_SUB_F32, "v_sub_f32", |t, i| t.v_float_binary(FloatOp::Sub, i));
    table.add(Opcode::V_SUBREV_F32, "v_subrev_f32", |t, i| t.v_float_binary(FloatOp::SubRev, i));
    table.add(Opcode::V_MUL_F32, "v_mul_f32", |t, i| t.v_float_binary(FloatOp::Mul, i));
    table.add(Opcode::V_MIN_F32, "v_min_f32", |t, i| t.v_float_binary(FloatOp::Min, i));
    table.add(Opcode::V_MAX_F32, "v_max_f32", |t, i| t.v_float_binary(FloatOp::Max, i));
    table.add(Opcode::V_MAC_F32, "v_mac_f32", |t, i| t.v_mac_f32(i));
    table.add(Opcode::V_MAD_F32, "v_fma_f32", |t, i| t.v_fma_f32(i));
    table.add(Opcode::V_FMA_F32, "v_fma_f32", |t, i| t.v_fma_f32(i));
    table.add(Opcode::V_MED3_F32, "v_med3_f32", |t, i| t.v_med3_f32(i));
    table.add(Opcode::V_FRACT_F32, "v_fract_f32", |t, i| t.v_float_unary(FloatUnary::Fract, i));
    table.add(Opcode::V_FLOOR_F32, "v_floor_f32", |t, i| t.v_float_unary(FloatUnary::Floor, i));
    table.add(Opcode::V_RCP_F32, "v_rcp_f32", |t, i| t.v_float_unary(FloatUnary::Recip, i));
    table.add(Opcode::V_RSQ_F32, "v_rsq_f32", |t, i| t.v_float_unary(FloatUnary::RecipSqrt, i));
    table.add(Opcode::V_SAD_U32, "v_sad_u32", |t, i| t.v_sad_u32(i));
    table.add(Opcode::V_AND_B32, "v_and_b32", |t, i| t.v_and_b32(i));
    table.add(Opcode::V_OR_B32, "v_or_b32", |t, i| t.v_or_b32(i));
    table.add(Opcode::V_LSHLREV_B32, "v_lshlrev_b32", |t, i| t.v_shift_rev(true, i));
    table.add(Opcode::V_LSHRREV_B32, "v_lshrrev_b32", |t, i| t.v_shift_rev(false, i));
    table.add(Opcode::V_ADD_I32, "v_add_i32", |t, i| t.v_add_i32(i));
    table.add(Opcode::V_SUB_I32, "v_sub_i32", |t, i| t.v_sub_i32(i));
    table.add(Opcode::V_CVT_PKRTZ_F16_F32, "v_cvt_pkrtz_f16_f32", |t, i| t.v_cvt_pkrtz_f16_f32(i));
    table.add(Opcode::V_CVT_F32_I32, "v_cvt_f32_i32", |t, i| t.v_cvt_f32_i32(i));
    table.add(Opcode::V_CVT_F32_U32, "v_cvt_f32_u32", |t, i| t.v_cvt_f32_u32(i));
    table.add(Opcode::V_CVT_U32_F32, "v_cvt_u32_f32", |t, i| t.v_cvt_u32_f32(i));
    table.add(Opcode::V_CVT_OFF_F32_I4, "v_cvt_off_f32_i4", |t, i| t.v_cvt_off_f32_i4(i));

    table.add(Opcode::V_CMP_F_F32, "v_cmp_f32", |t, i| t.v_cmp_f32(ConditionOp::False, i));
    table.add(Opcode::V_CMP_LT_F32, "v_cmp_f32", |t, i| t.v_cmp_f32(ConditionOp::Lt, i));
    table.add(Opcode::V_CMP_EQ_F32, "v_cmp_f32", |t, i| t.v_cmp_f32(ConditionOp::Eq, i));
    table.add(Opcode::V_CMP_LE_F32, "v_cmp_f32", |t, i| t.v_cmp_f32(ConditionOp::Le, i));
    table.add(Opcode::V_CMP_GT_F32, "v_cmp_f32", |t, i| t.v_cmp_f32(ConditionOp::Gt, i));
    table.add(Opcode::V_CMP_LG_F32, "v_cmp_f32", |t, i| t.v_cmp_f32(ConditionOp::Lg, i));
    table.add(Opcode::V_CMP_GE_F32, "v_cmp_f32", |t, i| t.v_cmp_f32(ConditionOp::Ge, i));

    table.add(Opcode::V_CMP_F_I32, "v_cmp_i32", |t, i| t.v_cmp_int(ConditionOp::False, true, false, i));
    table.add(Opcode::V_CMP_LT_I32, "v_cmp_i32", |t, i| t.v_cmp_int(ConditionOp::Lt, true, false, i));
    table.add(Opcode::V_CMP_EQ_I32, "v_cmp_i32", |t, i| t.v_cmp_int(ConditionOp::Eq, true, false, i));
    table.add(Opcode::V_CMP_LE_I32, "v_cmp_i32", |t, i| t.v_cmp_int(ConditionOp::Le, true, false, i));
    table.add(Opcode::V_CMP_GT_I32, "v_cmp_i32", |t, i| t.v_cmp_int(ConditionOp::Gt, true, false, i));
    table.add(Opcode::V_CMP_NE_I32, "v_cmp_i32", |t, i| t.v_cmp_int(ConditionOp::Lg, true, false, i));
    table.add(Opcode::V_CMP_GE_I32, "v_cmp_i32", |t, i| t.v_cmp_int(ConditionOp::Ge, true, false, i));

    table.add(Opcode::V_CMP_F_U32, "v_cmp_u32", |t, i| t.v_cmp_int(ConditionOp::False, false, false, i));
    table.add(Opcode::V_CMP_LT_U32, "v_cmp_u32", |t, i| t.v_cmp_int(ConditionOp::Lt, false, false, i));
    table.add(Opcode::V_CMP_EQ_U32, "v_cmp_u32", |t, i| t.v_cmp_int(ConditionOp::Eq, false, false, i));
    table.add(Opcode::V_CMP_LE_U32, "v_cmp_u32", |t, i| t.v_cmp_int(ConditionOp::Le, false, false, i));
    table.add(Opcode::V_CMP_GT_U32, "v_cmp_u32", |t, i| t.v_cmp_int(ConditionOp::Gt, false, false, i));
    table.add(Opcode::V_CMP_NE_U32, "v_cmp_u32", |t, i| t.v_cmp_int(ConditionOp::Lg, false, false, i));
    table.add(Opcode::V_CMP_GE_U32, "v_cmp_u32", |t, i| t.v_cmp_int(ConditionOp::Ge, false, false, i));

    table.add(Opcode::V_CMPX_F_U32, "v_cmpx_u32", |t, i| t.v_cmp_int(ConditionOp::False, false, true, i));
    table.add(Opcode::V_CMPX_LT_U32, "v_cmpx_u32", |t, i| t.v_cmp_int(ConditionOp::Lt, false, true, i));
    table.add(Opcode::V_CMPX_EQ_U32, "v_cmpx_u32", |t, i| t.v_cmp_int(ConditionOp::Eq, false, true, i));
    table.add(Opcode::V_CMPX_LE_U32, "v_cmpx_u32", |t, i| t.v_cmp_int(ConditionOp::Le, false, true, i));
    table.add(Opcode::V_CMPX_GT_U32, "v_cmpx_u32", |t, i| t.v_cmp_int(ConditionOp::Gt, false, true, i));
    table.add(Opcode::V_CMPX_NE_U32, "v_cmpx_u32", |t, i| t.v_cmp_int(ConditionOp::Lg, false, true, i));
    table.add(Opcode::V_CMPX_GE_U32, "v_cmpx_u32", |t, i| t.v_cmp_int(ConditionOp::Ge, false, true, i));
}

impl<'a> Translator<'a> {
    fn v_mov(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let value = self.get_src(inst.src(0)?)?;
        self.set_dst_move(inst.dst(0)?, value)
    }

    /// `dst = flag ? src1 : src0`, the flag being VCC unless given as `src[2]`
    fn v_cndmask(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let src0 = inst.src(0)?;
        let src1 = inst.src(1)?;
        let flag_operand = inst.src.get(2).copied().unwrap_or_else(InstOperand::vcc);
        let flag = self.read_mask(&flag_operand)?;

        let has_flt = [src0, src1]
            .iter()
            .any(|src| src.is_float() || src.is_float_constant());
        let false_value = self.resolve(src0, has_flt)?;
        let true_value = self.resolve(src1, has_flt)?;
        let result = self.ir.select(flag, true_value, false_value);
        self.set_dst(inst.dst(0)?, result)
    }

    fn v_float_binary(&mut self, op: FloatOp, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src_f32(inst.src(0)?)?;
        let b = self.get_src_f32(inst.src(1)?)?;
        let result = match op {
            FloatOp::Add => self.ir.fp_add(a, b),
            FloatOp::Sub => self.ir.fp_sub(a, b),
            FloatOp::SubRev => self.ir.fp_sub(b, a),
            FloatOp::Mul => self.ir.fp_mul(a, b),
            FloatOp::Min => self.ir.fp_min(a, b),
            FloatOp::Max => self.ir.fp_max(a, b),
        };
        self.set_dst(inst.dst(0)?, result)
    }

    fn v_float_unary(&mut self, op: FloatUnary, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src_f32(inst.src(0)?)?;
        let result = match op {
            FloatUnary::Fract => self.ir.fp_fract(a),
            FloatUnary::Floor => self.ir.fp_floor(a),
            FloatUnary::Recip => self.ir.fp_recip(a),
            FloatUnary::RecipSqrt => self.ir.fp_recip_sqrt(a),
        };
        self.set_dst(inst.dst(0)?, result)
    }

    /// `dst = src0 * src1 + dst`
    fn v_mac_f32(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let dst = inst.dst(0)?;
        let a = self.get_src_f32(inst.src(0)?)?;
        let b = self.get_src_f32(inst.src(1)?)?;
        let acc = self.get_src_f32(&InstOperand::new(dst.field, dst.code))?;
        let result = self.ir.fp_fma(a, b, acc);
        self.set_dst(dst, result)
    }

    fn v_fma_f32(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src_f32(inst.src(0)?)?;
        let b = self.get_src_f32(inst.src(1)?)?;
        let c = self.get_src_f32(inst.src(2)?)?;
        let result = self.ir.fp_fma(a, b, c);
        self.set_dst(inst.dst(0)?, result)
    }

    /// Median of three
    fn v_med3_f32(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src_f32(inst.src(0)?)?;
        let b = self.get_src_f32(inst.src(1)?)?;
        let c = self.get_src_f32(inst.src(2)?)?;
        let min_ab = self.ir.fp_min(a, b);
        let max_ab = self.ir.fp_max(a, b);
        let upper = self.ir.fp_min(max_ab, c);
        let result = self.ir.fp_max(min_ab, upper);
        self.set_dst(inst.dst(0)?, result)
    }

    /// `|src0 - src1| + src2` on unsigned integers
    fn v_sad_u32(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src(inst.src(0)?)?;
        let b = self.get_src(inst.src(1)?)?;
        let c = self.get_src(inst.src(2)?)?;
        let max = self.ir.umax(a, b);
        let min = self.ir.umin(a, b);
        let diff = self.ir.isub(max, min);
        let result = self.ir.iadd(diff, c);
        self.set_dst(inst.dst(0)?, result)
    }

    fn v_and_b32(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src(inst.src(0)?)?;
        let b = self.get_src(inst.src(1)?)?;
        let result = self.ir.bitwise_and(a, b);
        self.set_dst(inst.dst(0)?, result)
    }

    fn v_or_b32(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src(inst.src(0)?)?;
        let b = self.get_src(inst.src(1)?)?;
        let result = self.ir.bitwise_or(a, b);
        self.set_dst(inst.dst(0)?, result)
    }

    /// `src1` shifted by `src0`
    fn v_shift_rev(&mut self, left: bool, inst: &GcnInst) -> Result<(), TranslateError> {
        let shift = self.get_src(inst.src(0)?)?;
        let base = self.get_src(inst.src(1)?)?;
        let shift = self.shift_amount(shift);
        let result = if left {
            self.ir.shift_left_logical(base, shift)
        } else {
            self.ir.shift_right_logical(base, shift)
        };
        self.set_dst(inst.dst(0)?, result)
    }

    /// Carry-out goes to `dst[1]` when the encoding names one
    fn v_add_i32(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src(inst.src(0)?)?;
        let b = self.get_src(inst.src(1)?)?;
        let result = self.ir.iadd(a, b);
        self.set_dst(inst.dst(0)?, result)?;
        if let Some(carry_dst) = inst.dst.get(1) {
            let carry = self.ir.i_less_than(result, a, false);
            let carry = self.mask_by_exec(carry)?;
            self.commit_mask(Some(carry_dst), carry)?;
        }
        Ok(())
    }

    fn v_sub_i32(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src(inst.src(0)?)?;
        let b = self.get_src(inst.src(1)?)?;
        let result = self.ir.isub(a, b);
        self.set_dst(inst.dst(0)?, result)?;
        if let Some(borrow_dst) = inst.dst.get(1) {
            let borrow = self.ir.i_less_than(a, b, false);
            let borrow = self.mask_by_exec(borrow)?;
            self.commit_mask(Some(borrow_dst), borrow)?;
        }
        Ok(())
    }

    fn v_cvt_pkrtz_f16_f32(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src_f32(inst.src(0)?)?;
        let b = self.get_src_f32(inst.src(1)?)?;
        let vector = self.ir.composite_construct(&[a, b]);
        let result = self.ir.pack_half_2x16_rtz(vector);
        self.set_dst(inst.dst(0)?, result)
    }

    fn v_cvt_f32_i32(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src(inst.src(0)?)?;
        let result = self.ir.convert_f32_s32(a);
        self.set_dst(inst.dst(0)?, result)
    }

    fn v_cvt_f32_u32(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src(inst.src(0)?)?;
        let result = self.ir.convert_f32_u32(a);
        self.set_dst(inst.dst(0)?, result)
    }

    fn v_cvt_u32_f32(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src_f32(inst.src(0)?)?;
        let result = self.ir.convert_u32_f32(a);
        self.set_dst(inst.dst(0)?, result)
    }

    /// Low four bits as a signed offset in sixteenths
    fn v_cvt_off_f32_i4(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src(inst.src(0)?)?;
        let high = self.ir.shift_left_logical(a, Value::U32(28));
        let nibble = self.ir.shift_right_arithmetic(high, Value::U32(28));
        let float = self.ir.convert_f32_s32(nibble);
        let result = self.ir.fp_mul(float, Value::imm_f32(0.0625));
        self.set_dst(inst.dst(0)?, result)
    }

    fn v_cmp_f32(&mut self, cond: ConditionOp, inst: &GcnInst) -> Result<(), TranslateError> {
        let a = self.get_src_f32(inst.src(0)?)?;
        let b = self.get_src_f32(inst.src(1)?)?;
        let pred = match cond {
            ConditionOp::False => Value::U1(false),
            ConditionOp::Eq => self.ir.fp_equal(a, b),
            ConditionOp::Lg => self.ir.fp_not_equal(a, b),
            ConditionOp::Gt => self.ir.fp_greater_than(a, b),
            ConditionOp::Ge => self.ir.fp_greater_than_equal(a, b),
            ConditionOp::Lt => self.ir.fp_less_than(a, b),
            ConditionOp::Le => self.ir.fp_less_than_equal(a, b),
        };
        let mask = self.mask_by_exec(pred)?;
        self.commit_mask(inst.dst.first(), mask)
    }

    /// Integer compare into VCC (or `dst[0]`), zero in inactive lanes; the
    /// `X` forms also narrow EXEC
    fn v_cmp_int(
        &mut self,
        cond: ConditionOp,
        is_signed: bool,
        set_exec: bool,
        inst: &GcnInst,
    ) -> Result<(), TranslateError> {
        let a = self.get_src(inst.src(0)?)?;
        let b = self.get_src(inst.src(1)?)?;
        let pred = self.emit_int_compare(cond, is_signed, a, b);
        let mask = if set_exec {
            self.narrow_exec(pred)?.value()
        } else {
            self.mask_by_exec(pred)?
        };
        self.commit_mask(inst.dst.first(), mask)
    }
}
