//! Properties that hold for every translated block

use gr_core::config::TranslatorConfig;
use gr_gcn::{translate, ConditionOp, GcnInst, InstOperand, Opcode, ShaderInfo, Translator};
use gr_ir::{Block, Evaluator, ExecMask, Reg, Type, Value};
use proptest::prelude::*;
use std::collections::HashSet;

const LANES: usize = 4;

const SCALAR_COMPARES: [(Opcode, ConditionOp, bool); 12] = [
    (Opcode::S_CMP_EQ_I32, ConditionOp::Eq, true),
    (Opcode::S_CMP_LG_I32, ConditionOp::Lg, true),
    (Opcode::S_CMP_GT_I32, ConditionOp::Gt, true),
    (Opcode::S_CMP_GE_I32, ConditionOp::Ge, true),
    (Opcode::S_CMP_LT_I32, ConditionOp::Lt, true),
    (Opcode::S_CMP_LE_I32, ConditionOp::Le, true),
    (Opcode::S_CMP_EQ_U32, ConditionOp::Eq, false),
    (Opcode::S_CMP_LG_U32, ConditionOp::Lg, false),
    (Opcode::S_CMP_GT_U32, ConditionOp::Gt, false),
    (Opcode::S_CMP_GE_U32, ConditionOp::Ge, false),
    (Opcode::S_CMP_LT_U32, ConditionOp::Lt, false),
    (Opcode::S_CMP_LE_U32, ConditionOp::Le, false),
];

const VECTOR_COMPARES: [(Opcode, ConditionOp, bool); 14] = [
    (Opcode::V_CMP_F_I32, ConditionOp::False, true),
    (Opcode::V_CMP_LT_I32, ConditionOp::Lt, true),
    (Opcode::V_CMP_EQ_I32, ConditionOp::Eq, true),
    (Opcode::V_CMP_LE_I32, ConditionOp::Le, true),
    (Opcode::V_CMP_GT_I32, ConditionOp::Gt, true),
    (Opcode::V_CMP_NE_I32, ConditionOp::Lg, true),
    (Opcode::V_CMP_GE_I32, ConditionOp::Ge, true),
    (Opcode::V_CMP_F_U32, ConditionOp::False, false),
    (Opcode::V_CMP_LT_U32, ConditionOp::Lt, false),
    (Opcode::V_CMP_EQ_U32, ConditionOp::Eq, false),
    (Opcode::V_CMP_LE_U32, ConditionOp::Le, false),
    (Opcode::V_CMP_GT_U32, ConditionOp::Gt, false),
    (Opcode::V_CMP_NE_U32, ConditionOp::Lg, false),
    (Opcode::V_CMP_GE_U32, ConditionOp::Ge, false),
];

fn run(insts: &[GcnInst]) -> Block {
    let mut block = Block::new(0);
    let mut info = ShaderInfo::default();
    translate(&mut block, insts, &mut info, &TranslatorConfig::default()).unwrap();
    block
}

/// Translate a block entered with every lane enabled
fn run_full(insts: &[GcnInst]) -> Block {
    let mut block = Block::new(0);
    let mut info = ShaderInfo::default();
    let config = TranslatorConfig::default();
    Translator::new(&mut block, &mut info, &config)
        .with_entry_exec(ExecMask::full())
        .translate(insts)
        .unwrap();
    block
}

fn s(n: u32) -> InstOperand {
    InstOperand::sgpr(n)
}

fn v(n: u32) -> InstOperand {
    InstOperand::vgpr(n)
}

/// Integers biased towards equal and sign-boundary values
fn word() -> impl Strategy<Value = u32> {
    prop_oneof![
        0u32..4,
        (i32::MAX as u32 - 1)..=(i32::MAX as u32 + 2),
        (u32::MAX - 2)..=u32::MAX,
        any::<u32>(),
    ]
}

fn lanes() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(word(), LANES)
}

fn inst() -> impl Strategy<Value = GcnInst> {
    let reg = || 0u32..4;
    prop_oneof![
        (reg(), -16i32..=64).prop_map(|(d, k)| GcnInst::op(Opcode::S_MOV_B32, s(d), &[InstOperand::int(k)])),
        (reg(), reg()).prop_map(|(d, a)| GcnInst::op(Opcode::S_MOV_B32, s(d), &[s(a)])),
        (reg(), reg(), reg()).prop_map(|(d, a, b)| GcnInst::op(Opcode::S_MUL_I32, s(d), &[s(a), s(b)])),
        (reg(), reg(), reg()).prop_map(|(d, a, b)| GcnInst::op(Opcode::S_ADD_U32, s(d), &[s(a), s(b)])),
        (reg(), reg()).prop_map(|(d, a)| GcnInst::op(Opcode::V_MOV_B32, v(d), &[v(a)])),
        (reg(), reg(), reg()).prop_map(|(d, a, b)| GcnInst::op(Opcode::V_ADD_F32, v(d), &[v(a), v(b)])),
        (reg(), reg()).prop_map(|(a, b)| GcnInst::new(Opcode::V_CMP_GT_U32).with_src(v(a)).with_src(v(b))),
        (reg(), reg(), reg()).prop_map(|(d, a, b)| GcnInst::op(Opcode::V_CNDMASK_B32, v(d), &[v(a), v(b)])),
        (reg(), 0i32..=64).prop_map(|(a, k)| {
            GcnInst::new(Opcode::V_CMPX_GT_U32)
                .with_src(v(a))
                .with_src(InstOperand::int(k))
        }),
    ]
}

fn program() -> impl Strategy<Value = Vec<GcnInst>> {
    prop::collection::vec(inst(), 1..24)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_translation_is_deterministic(insts in program()) {
        let first = run(&insts);
        let second = run(&insts);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn prop_every_write_commits_a_new_value(insts in program()) {
        let block = run(&insts);
        let mut seen = HashSet::new();
        for (reg, value) in block.live_outs() {
            if *reg == Reg::ExecLo || value.is_immediate() {
                continue;
            }
            prop_assert!(seen.insert(*value), "{} shares {} with another register", reg, value);
        }
    }

    #[test]
    fn prop_scalar_compare_matches_reference(
        index in 0..SCALAR_COMPARES.len(),
        a in word(),
        b in word(),
    ) {
        let (opcode, cond, is_signed) = SCALAR_COMPARES[index];
        let block = run(&[GcnInst::new(opcode).with_src(s(0)).with_src(s(1))]);
        let eval = Evaluator::new(1)
            .with_uniform(Reg::Sgpr(0), a)
            .with_uniform(Reg::Sgpr(1), b)
            .run(&block)
            .unwrap();
        let scc = block.live_out(Reg::Scc).unwrap();
        prop_assert_eq!(eval.value(scc), vec![u32::from(cond.holds(a, b, is_signed))]);
    }

    #[test]
    fn prop_vector_compare_matches_reference(
        index in 0..VECTOR_COMPARES.len(),
        entry_mask in 0u64..(1 << LANES),
        a in lanes(),
        b in lanes(),
    ) {
        let (opcode, cond, is_signed) = VECTOR_COMPARES[index];
        let block = run(&[GcnInst::new(opcode).with_src(v(0)).with_src(v(1))]);
        let eval = Evaluator::new(LANES)
            .with_mask(Reg::ExecLo, entry_mask)
            .with_register(Reg::Vgpr(0), a.clone())
            .with_register(Reg::Vgpr(1), b.clone())
            .run(&block)
            .unwrap();
        // Lanes outside EXEC read 0
        let expected = (0..LANES)
            .filter(|&lane| entry_mask & (1 << lane) != 0)
            .filter(|&lane| cond.holds(a[lane], b[lane], is_signed))
            .fold(0u64, |mask, lane| mask | (1 << lane));
        prop_assert_eq!(eval.mask(block.live_out(Reg::VccLo).unwrap()), expected);
    }

    #[test]
    fn prop_cndmask_selects_per_lane(
        entry_mask in 0u64..(1 << LANES),
        flags in 0u64..(1 << LANES),
        false_values in lanes(),
        true_values in lanes(),
        old_values in lanes(),
    ) {
        let block = run(&[GcnInst::op(Opcode::V_CNDMASK_B32, v(2), &[v(0), v(1), s(10)])]);
        let eval = Evaluator::new(LANES)
            .with_mask(Reg::ExecLo, entry_mask)
            .with_mask(Reg::Sgpr(10), flags)
            .with_register(Reg::Vgpr(0), false_values.clone())
            .with_register(Reg::Vgpr(1), true_values.clone())
            .with_register(Reg::Vgpr(2), old_values.clone())
            .run(&block)
            .unwrap();
        let selected = eval.value(block.live_out(Reg::Vgpr(2)).unwrap());
        for lane in 0..LANES {
            let expected = if entry_mask & (1 << lane) == 0 {
                old_values[lane]
            } else if flags & (1 << lane) != 0 {
                true_values[lane]
            } else {
                false_values[lane]
            };
            prop_assert_eq!(selected[lane], expected);
        }
    }

    #[test]
    fn prop_exec_only_narrows(
        entry_mask in 0u64..(1 << LANES),
        thresholds in prop::collection::vec(0i32..=8, 1..6),
        values in prop::collection::vec(0u32..10, LANES),
    ) {
        let mut insts = Vec::new();
        for (i, k) in thresholds.iter().enumerate() {
            insts.push(GcnInst::new(Opcode::V_CMPX_GT_U32).with_src(v(0)).with_src(InstOperand::int(*k)));
            insts.push(GcnInst::op(Opcode::V_MOV_B32, v(1 + i as u32), &[v(0)]));
        }
        let block = run(&insts);
        let eval = (0..thresholds.len() as u32)
            .fold(Evaluator::new(LANES), |eval, i| eval.with_uniform(Reg::Vgpr(1 + i), 0))
            .with_mask(Reg::ExecLo, entry_mask)
            .with_register(Reg::Vgpr(0), values)
            .run(&block)
            .unwrap();

        let mut previous = entry_mask;
        for inst in block.insts() {
            if let Some(exec) = inst.exec {
                let current = eval.mask(exec);
                prop_assert_eq!(current & !previous, 0, "mask gained lanes");
                previous = current;
            }
        }
        let final_mask = eval.mask(block.live_out(Reg::ExecLo).unwrap());
        prop_assert_eq!(final_mask & !previous, 0);
    }

    #[test]
    fn prop_pair_updates_are_atomic(
        a_lo in any::<u32>(),
        a_hi in any::<u32>(),
        b_lo in any::<u32>(),
        b_hi in any::<u32>(),
    ) {
        let block = run(&[
            GcnInst::op(Opcode::S_MOV_B32, s(0), &[InstOperand::literal(a_lo)]),
            GcnInst::op(Opcode::S_MOV_B32, s(1), &[InstOperand::literal(a_hi)]),
            GcnInst::op(Opcode::S_MOV_B32, s(2), &[InstOperand::literal(b_lo)]),
            GcnInst::op(Opcode::S_MOV_B32, s(3), &[InstOperand::literal(b_hi)]),
            GcnInst::op(Opcode::S_ANDN2_B64, s(4), &[s(0), s(2)]),
            GcnInst::op(Opcode::S_MOV_B64, s(6), &[s(4)]),
        ]);
        let eval = Evaluator::new(1).run(&block).unwrap();
        let read = |reg| eval.value(block.live_out(reg).unwrap())[0];

        let (lo, hi) = (a_lo & !b_lo, a_hi & !b_hi);
        prop_assert_eq!((read(Reg::Sgpr(4)), read(Reg::Sgpr(5))), (lo, hi));
        prop_assert_eq!((read(Reg::Sgpr(6)), read(Reg::Sgpr(7))), (lo, hi));
        prop_assert_eq!(read(Reg::Scc), u32::from(lo | hi != 0));
    }
}

#[test]
fn test_live_out_values_are_typed() {
    let mov = [GcnInst::op(Opcode::V_MOV_B32, v(0), &[InstOperand::float_const(0.5)])];
    let block = run_full(&mov);
    assert_eq!(block.live_out(Reg::Vgpr(0)), Some(Value::imm_f32(0.5)));

    // Under a live-in mask the constant is merged into the old contents
    let block = run(&mov);
    let v0 = block.live_out(Reg::Vgpr(0)).unwrap();
    assert_eq!(v0.ty(), Type::F32);
    let eval = Evaluator::new(2)
        .with_mask(Reg::ExecLo, 0b10)
        .with_uniform(Reg::Vgpr(0), 3)
        .run(&block)
        .unwrap();
    assert_eq!(eval.value(v0), vec![3, 0.5f32.to_bits()]);
}
