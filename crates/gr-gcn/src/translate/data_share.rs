//! Local data share handlers (DS)
//!
//! `src[0]` holds the per-lane byte address, `src[1]`/`src[2]` the data of
//! writes and `dst[0]` the first VGPR of reads. Pair forms access two
//! elements at `offset0` and `offset1`, each scaled by the element size.

use super::operand::register_index;
use super::{HandlerTable, Translator};
use crate::info::ShaderUsage;
use crate::instruction::{GcnInst, InstOperand, OperandField};
use crate::opcode::Opcode;
use gr_core::error::TranslateError;
use gr_ir::Value;

pub(super) fn register(table: &mut HandlerTable) {
    table.add(Opcode::DS_READ_B32, "ds_read", |t, i| t.ds_read(32, false, false, i));
    table.add(Opcode::DS_READ2_B32, "ds_read", |t, i| t.ds_read(32, false, true, i));
    table.add(Opcode::DS_READ_U8, "ds_read", |t, i| t.ds_read(8, false, false, i));
    table.add(Opcode::DS_READ_I8, "ds_read", |t, i| t.ds_read(8, true, false, i));
    table.add(Opcode::DS_READ_U16, "ds_read", |t, i| t.ds_read(16, false, false, i));
    table.add(Opcode::DS_READ_I16, "ds_read", |t, i| t.ds_read(16, true, false, i));
    table.add(Opcode::DS_READ_B64, "ds_read", |t, i| t.ds_read(64, false, false, i));
    table.add(Opcode::DS_WRITE_B32, "ds_write", |t, i| t.ds_write(32, false, i));
    table.add(Opcode::DS_WRITE2_B32, "ds_write", |t, i| t.ds_write(32, true, i));
    table.add(Opcode::DS_WRITE_B8, "ds_write", |t, i| t.ds_write(8, false, i));
    table.add(Opcode::DS_WRITE_B16, "ds_write", |t, i| t.ds_write(16, false, i));
    table.add(Opcode::DS_WRITE_B64, "ds_write", |t, i| t.ds_write(64, false, i));
}

fn check_bit_size(handler: &'static str, bit_size: u32) -> Result<(), TranslateError> {
    if matches!(bit_size, 8 | 16 | 32 | 64) {
        Ok(())
    } else {
        Err(TranslateError::InvalidParameter {
            handler,
            detail: format!("{bit_size}-bit access"),
        })
    }
}

/// Byte offsets of the accessed elements
fn element_offsets(inst: &GcnInst, bit_size: u32, is_pair: bool) -> Result<Vec<u32>, TranslateError> {
    let control = inst.ds()?;
    if is_pair {
        let size = bit_size / 8;
        Ok(vec![control.offset0 * size, control.offset1 * size])
    } else {
        Ok(vec![(control.offset1 << 8) | control.offset0])
    }
}

fn vgpr_index(operand: &InstOperand) -> Result<u32, TranslateError> {
    match operand.field {
        OperandField::VectorGpr => Ok(operand.code),
        field => Err(TranslateError::UnsupportedOperand {
            field: format!("{field:?}"),
            reason: "data share data must be a VGPR".to_string(),
        }),
    }
}

impl<'a> Translator<'a> {
    fn lds_address(&mut self, base: Value, offset: u32) -> Value {
        if offset == 0 {
            base
        } else {
            self.ir.iadd(base, Value::U32(offset))
        }
    }

    fn ds_read(&mut self, bit_size: u32, is_signed: bool, is_pair: bool, inst: &GcnInst) -> Result<(), TranslateError> {
        check_bit_size("ds_read", bit_size)?;
        let offsets = element_offsets(inst, bit_size, is_pair)?;
        let base = self.get_src(inst.src(0)?)?;
        let dst = inst.dst(0)?;
        vgpr_index(dst)?;
        self.info.usage |= ShaderUsage::SHARED_MEMORY;

        let mut slot = 0;
        for offset in offsets {
            let address = self.lds_address(base, offset);
            let value = self.ir.load_shared(bit_size, is_signed, address);
            if bit_size == 64 {
                for half in 0..2 {
                    let word = self.ir.composite_extract(value, half);
                    self.set_dst(&InstOperand::vgpr(register_index(dst, 1, slot)?), word)?;
                    slot += 1;
                }
            } else {
                self.set_dst(&InstOperand::vgpr(register_index(dst, 1, slot)?), value)?;
                slot += 1;
            }
        }
        Ok(())
    }

    fn ds_write(&mut self, bit_size: u32, is_pair: bool, inst: &GcnInst) -> Result<(), TranslateError> {
        check_bit_size("ds_write", bit_size)?;
        let offsets = element_offsets(inst, bit_size, is_pair)?;
        let base = self.get_src(inst.src(0)?)?;
        self.info.usage |= ShaderUsage::SHARED_MEMORY;

        for (i, offset) in offsets.into_iter().enumerate() {
            let data_operand = inst.src(1 + i)?;
            let data = if bit_size == 64 {
                let lo = vgpr_index(data_operand)?;
                let low = self.get_src(&InstOperand::vgpr(lo))?;
                let high = self.get_src(&InstOperand::vgpr(register_index(data_operand, 1, 1)?))?;
                self.ir.composite_construct(&[low, high])
            } else {
                self.get_src(data_operand)?
            };
            let address = self.lds_address(base, offset);
            self.ir.write_shared(bit_size, address, data);
        }
        Ok(())
    }
}
