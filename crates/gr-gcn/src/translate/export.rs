//! Export handler (EXP)

use super::{HandlerTable, Translator};
use crate::info::ShaderUsage;
use crate::instruction::GcnInst;
use crate::opcode::Opcode;
use gr_core::error::TranslateError;
use gr_ir::Attribute;

const TARGET_DEPTH: u32 = 8;
const TARGET_NULL: u32 = 9;

pub(super) fn register(table: &mut HandlerTable) {
    table.add(Opcode::EXP, "exp", |t, i| t.exp(i));
}

impl<'a> Translator<'a> {
    /// Attribute written by export target `target`, `None` for the null target
    fn export_attribute(&mut self, target: u32) -> Result<Option<Attribute>, TranslateError> {
        let attr = match target {
            0..=7 => Attribute::RenderTarget(target),
            TARGET_DEPTH => {
                self.info.usage |= ShaderUsage::DEPTH_EXPORT;
                Attribute::Depth
            }
            TARGET_NULL => return Ok(None),
            12..=15 => Attribute::Position(target - 12),
            32..=63 => {
                let param = target - 32;
                self.info.exported_params |= 1 << param;
                Attribute::Param(param)
            }
            other => {
                return Err(TranslateError::UnsupportedFeature(format!(
                    "export target {other}"
                )))
            }
        };
        Ok(Some(attr))
    }

    fn exp(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let control = inst.exp()?;
        let Some(attr) = self.export_attribute(control.target)? else {
            return Ok(());
        };

        if control.compr {
            // Each source packs two half-precision components, enabled by
            // either of its two `en` bits
            for (src, en_bits) in [(0u32, 0b0011), (1, 0b1100)] {
                if control.en & en_bits == 0 {
                    continue;
                }
                let packed = self.get_src(inst.src(src as usize)?)?;
                let unpacked = self.ir.unpack_half_2x16(packed);
                for half in 0..2 {
                    let value = self.ir.composite_extract(unpacked, half);
                    self.ir.set_attribute(attr, src * 2 + half, value);
                }
            }
            return Ok(());
        }

        for comp in (0..4u32).filter(|comp| control.en & (1 << comp) != 0) {
            let value = self.get_src_f32(inst.src(comp as usize)?)?;
            self.ir.set_attribute(attr, comp, value);
        }
        Ok(())
    }
}
