//! Scalar memory handlers (SMRD)

use super::operand::{register_index, Pair};
use super::{HandlerTable, Translator};
use crate::instruction::{GcnInst, InstOperand, OperandField};
use crate::opcode::Opcode;
use gr_core::error::{ResourceKind, TranslateError};
use gr_ir::Value;

pub(super) fn register(table: &mut HandlerTable) {
    table.add(Opcode::S_LOAD_DWORD, "s_load_dword", |t, i| t.s_load_dword(1, i));
    table.add(Opcode::S_LOAD_DWORDX2, "s_load_dword", |t, i| t.s_load_dword(2, i));
    table.add(Opcode::S_LOAD_DWORDX4, "s_load_dword", |t, i| t.s_load_dword(4, i));
    table.add(Opcode::S_LOAD_DWORDX8, "s_load_dword", |t, i| t.s_load_dword(8, i));
    table.add(Opcode::S_LOAD_DWORDX16, "s_load_dword", |t, i| t.s_load_dword(16, i));
    table.add(Opcode::S_BUFFER_LOAD_DWORD, "s_buffer_load_dword", |t, i| t.s_buffer_load_dword(1, i));
    table.add(Opcode::S_BUFFER_LOAD_DWORDX2, "s_buffer_load_dword", |t, i| t.s_buffer_load_dword(2, i));
    table.add(Opcode::S_BUFFER_LOAD_DWORDX4, "s_buffer_load_dword", |t, i| t.s_buffer_load_dword(4, i));
    table.add(Opcode::S_BUFFER_LOAD_DWORDX8, "s_buffer_load_dword", |t, i| t.s_buffer_load_dword(8, i));
    table.add(Opcode::S_BUFFER_LOAD_DWORDX16, "s_buffer_load_dword", |t, i| t.s_buffer_load_dword(16, i));
}

fn check_count(handler: &'static str, num_dwords: u32) -> Result<(), TranslateError> {
    if matches!(num_dwords, 1 | 2 | 4 | 8 | 16) {
        Ok(())
    } else {
        Err(TranslateError::InvalidParameter {
            handler,
            detail: format!("{num_dwords} dwords"),
        })
    }
}

impl<'a> Translator<'a> {
    /// Dword offset of the access: an immediate, or an SGPR holding bytes
    fn smrd_dword_offset(&mut self, inst: &GcnInst) -> Result<Value, TranslateError> {
        let smrd = inst.smrd()?;
        if smrd.imm {
            return Ok(Value::U32(smrd.offset));
        }
        let bytes = self.get_src(&InstOperand::sgpr(smrd.offset))?;
        Ok(self.ir.shift_right_logical(bytes, Value::U32(2)))
    }

    fn dword_index(&mut self, base: Value, i: u32) -> Value {
        match base {
            Value::U32(offset) => Value::U32(offset.wrapping_add(i)),
            _ if i == 0 => base,
            _ => self.ir.iadd(base, Value::U32(i)),
        }
    }

    /// Commit the loaded dwords to consecutive SGPRs
    fn commit_sgprs(&mut self, dst: &InstOperand, values: Vec<Value>) -> Result<(), TranslateError> {
        if dst.field != OperandField::ScalarGpr {
            return Err(TranslateError::UnsupportedOperand {
                field: format!("{:?}", dst.field),
                reason: "scalar loads write SGPRs".to_string(),
            });
        }
        for (i, value) in (0u32..).zip(values) {
            self.set_dst(&InstOperand::sgpr(register_index(dst, 1, i)?), value)?;
        }
        Ok(())
    }

    fn s_load_dword(&mut self, num_dwords: u32, inst: &GcnInst) -> Result<(), TranslateError> {
        check_count("s_load_dword", num_dwords)?;
        let sbase = InstOperand::sgpr(register_index(inst.src(0)?, 2, 0)?);
        let Pair::Halves(lo, hi) = self.read_pair(&sbase, false)? else {
            return Err(TranslateError::UnsupportedOperand {
                field: format!("s{}", sbase.code),
                reason: "lane mask used as an address".to_string(),
            });
        };
        let base = self.ir.composite_construct(&[lo, hi]);
        let offset = self.smrd_dword_offset(inst)?;

        let values = (0..num_dwords)
            .map(|i| {
                let index = self.dword_index(offset, i);
                self.ir.read_const(base, index)
            })
            .collect();
        self.commit_sgprs(inst.dst(0)?, values)
    }

    fn s_buffer_load_dword(&mut self, num_dwords: u32, inst: &GcnInst) -> Result<(), TranslateError> {
        check_count("s_buffer_load_dword", num_dwords)?;
        let sgpr_base = register_index(inst.src(0)?, 2, 0)?;
        let binding = self
            .info
            .buffer_mut(sgpr_base)
            .map(|buffer| buffer.binding)
            .ok_or(TranslateError::UnboundResource {
                kind: ResourceKind::Buffer,
                sgpr: sgpr_base,
            })?;
        let offset = self.smrd_dword_offset(inst)?;

        let values = (0..num_dwords)
            .map(|i| {
                let index = self.dword_index(offset, i);
                self.ir.read_const_buffer(binding, index)
            })
            .collect();
        self.commit_sgprs(inst.dst(0)?, values)
    }
}
