//! Parameter interpolation handlers (VINTRP)

use super::{HandlerTable, Translator};
use crate::instruction::GcnInst;
use crate::opcode::Opcode;
use gr_core::error::TranslateError;
use gr_ir::Attribute;

pub(super) fn register(table: &mut HandlerTable) {
    // P1 only feeds P2, which reads the interpolated attribute itself
    table.add(Opcode::V_INTERP_P1_F32, "v_interp_p1_f32", |_, _| Ok(()));
    table.add(Opcode::V_INTERP_P2_F32, "v_interp_p2_f32", |t, i| t.v_interp_p2_f32(i));
}

impl<'a> Translator<'a> {
    fn v_interp_p2_f32(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let control = inst.vintrp()?;
        let param = self
            .info
            .ps_inputs
            .get(control.attr as usize)
            .map_or(control.attr, |input| input.param_index);
        if param >= Attribute::MAX_PARAMS || control.chan >= 4 {
            return Err(TranslateError::InvalidParameter {
                handler: "v_interp_p2_f32",
                detail: format!("attribute {} channel {}", param, control.chan),
            });
        }

        let value = self.ir.get_attribute(Attribute::Param(param), control.chan);
        self.info.loaded_params |= 1 << param;
        self.set_dst(inst.dst(0)?, value)
    }
}
