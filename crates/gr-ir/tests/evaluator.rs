//! Emitter and evaluator working together

use gr_ir::eval::f32_to_f16_rtz;
use gr_ir::{Block, Evaluator, ExecMask, IrEmitter, Reg, Type, Value};
use half::f16;
use proptest::prelude::*;

#[test]
fn test_masked_block_dump_is_stable() {
    let mut block = Block::new(7);
    let mut ir = IrEmitter::new(&mut block);
    let exec = ExecMask::live_in(&mut ir);
    ir.set_exec(Some(exec));
    let v0 = ir.get_register(Reg::Vgpr(0), Type::F32);
    let doubled = ir.fp_mul(v0, Value::imm_f32(2.0));
    ir.set_exec(None);
    block.set_live_out(Reg::Vgpr(1), doubled);

    let dump = block.to_string();
    assert!(dump.starts_with("block 7:"));
    assert!(dump.contains("live-outs:"));
    assert_eq!(dump, block.clone().to_string());
}

proptest! {
    #[test]
    fn prop_narrowing_is_intersection(
        entry in any::<u16>(),
        preds in prop::collection::vec(any::<u16>(), 1..8),
    ) {
        let mut block = Block::new(0);
        let mut ir = IrEmitter::new(&mut block);
        let mut exec = ExecMask::live_in(&mut ir);
        for i in 0..preds.len() {
            let pred = ir.get_register(Reg::Sgpr(2 * i as u32), Type::U1);
            exec = exec.narrow(&mut ir, pred);
        }
        let mask = exec.value();

        let mut eval = Evaluator::new(16).with_mask(Reg::ExecLo, u64::from(entry));
        for (i, pred) in preds.iter().enumerate() {
            eval = eval.with_mask(Reg::Sgpr(2 * i as u32), u64::from(*pred));
        }
        let result = eval.run(&block).unwrap();

        let expected = preds.iter().fold(entry, |acc, pred| acc & pred);
        prop_assert_eq!(result.mask(mask), u64::from(expected));
    }

    #[test]
    fn prop_half_rtz_never_grows(value in -65504.0f32..65504.0) {
        let half = f16::from_bits(f32_to_f16_rtz(value)).to_f32();
        prop_assert!(half.abs() <= value.abs());
        prop_assert_eq!(half.is_sign_negative(), value.is_sign_negative());
    }

    #[test]
    fn prop_half_rtz_exact_on_halves(bits in 0u16..0x7c00) {
        let value = f16::from_bits(bits).to_f32();
        prop_assert_eq!(f32_to_f16_rtz(value), bits);
    }
}
