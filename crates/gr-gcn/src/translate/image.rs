//! Image handlers (MIMG)
//!
//! `src[0]` is the first address VGPR, `src[2]` the image descriptor and
//! `src[3]` the sampler descriptor, both in SGPR quads. Results go to
//! consecutive VGPRs from `dst[0]`, one per component enabled in `dmask`.

use super::operand::register_index;
use super::{HandlerTable, Translator};
use crate::info::ImageKind;
use crate::instruction::{GcnInst, InstOperand, MimgModifiers, OperandField};
use crate::opcode::Opcode;
use gr_core::error::{ResourceKind, TranslateError};
use gr_ir::{TextureInstInfo, Value};
use tracing::warn;

pub(super) fn register(table: &mut HandlerTable) {
    for opcode in [
        Opcode::IMAGE_SAMPLE,
        Opcode::IMAGE_SAMPLE_L,
        Opcode::IMAGE_SAMPLE_B,
        Opcode::IMAGE_SAMPLE_LZ,
        Opcode::IMAGE_SAMPLE_C,
        Opcode::IMAGE_SAMPLE_C_LZ,
        Opcode::IMAGE_SAMPLE_O,
        Opcode::IMAGE_SAMPLE_D,
    ] {
        table.add(opcode, "image_sample", |t, i| t.image_sample(i));
    }
    table.add(Opcode::IMAGE_GET_RESINFO, "image_get_resinfo", |t, i| t.image_get_resinfo(i));
}

fn vgpr_index(operand: &InstOperand, role: &str) -> Result<u32, TranslateError> {
    match operand.field {
        OperandField::VectorGpr => Ok(operand.code),
        field => Err(TranslateError::UnsupportedOperand {
            field: format!("{field:?}"),
            reason: format!("image {role} must be a VGPR"),
        }),
    }
}

impl<'a> Translator<'a> {
    /// Binding and kind of the image whose descriptor starts at `src[2]`
    fn bound_image(&mut self, inst: &GcnInst) -> Result<(u32, ImageKind), TranslateError> {
        let sgpr = register_index(inst.src(2)?, 4, 0)?;
        self.info
            .image_mut(sgpr)
            .map(|image| (image.binding, image.kind))
            .ok_or(TranslateError::UnboundResource {
                kind: ResourceKind::Image,
                sgpr,
            })
    }

    fn bound_sampler(&self, inst: &GcnInst) -> Result<u32, TranslateError> {
        let sgpr = register_index(inst.src(3)?, 4, 0)?;
        self.info
            .sampler(sgpr)
            .map(|sampler| sampler.binding)
            .ok_or(TranslateError::UnboundResource {
                kind: ResourceKind::Sampler,
                sgpr,
            })
    }

    /// Commit the components selected by `dmask` to consecutive VGPRs
    fn commit_dmask(
        &mut self,
        dst: &InstOperand,
        dmask: u32,
        mut component: impl FnMut(&mut Self, u32) -> Value,
    ) -> Result<(), TranslateError> {
        vgpr_index(dst, "destination")?;
        let enabled = (0..4).filter(|comp| dmask & (1 << comp) != 0);
        for (slot, comp) in (0u32..).zip(enabled) {
            let value = component(self, comp);
            self.set_dst(&InstOperand::vgpr(register_index(dst, 1, slot)?), value)?;
        }
        Ok(())
    }

    fn image_sample(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let control = inst.mimg()?;
        let flags = control.modifiers | inst.opcode.implied_mimg_modifiers();
        if flags.contains(MimgModifiers::DERIVATIVE) {
            return Err(TranslateError::UnsupportedFeature(
                "sampling with user derivatives".to_string(),
            ));
        }

        let (image_binding, kind) = self.bound_image(inst)?;
        let sampler_binding = self.bound_sampler(inst)?;
        if control.da && !kind.is_array() {
            warn!("array sample of non-array image {:?} at binding {}", kind, image_binding);
        }

        let addr = *inst.src(0)?;
        vgpr_index(&addr, "address")?;
        let mut slot = 0;
        let mut next = |t: &mut Self, float: bool| -> Result<Value, TranslateError> {
            let operand = InstOperand::vgpr(register_index(&addr, 1, slot)?);
            slot += 1;
            if float {
                t.get_src_f32(&operand)
            } else {
                t.get_src(&operand)
            }
        };

        let offset = if flags.contains(MimgModifiers::OFFSET) {
            Some(next(self, false)?)
        } else {
            None
        };
        let bias = if flags.contains(MimgModifiers::LOD_BIAS) {
            Some(next(self, true)?)
        } else {
            None
        };
        let is_depth = flags.contains(MimgModifiers::PCF);
        let dref = if is_depth {
            Some(next(self, true)?)
        } else {
            None
        };
        let coords = (0..kind.coord_components())
            .map(|_| next(self, true))
            .collect::<Result<Vec<_>, _>>()?;
        let lod = if flags.contains(MimgModifiers::LOD) {
            Some(next(self, true)?)
        } else if flags.contains(MimgModifiers::LEVEL0) {
            Some(Value::imm_f32(0.0))
        } else {
            None
        };
        let lod_clamp = if flags.contains(MimgModifiers::LOD_CLAMP) {
            Some(next(self, true)?)
        } else {
            None
        };

        let info = TextureInstInfo {
            image_binding,
            sampler_binding,
            coord_components: kind.coord_components(),
            is_depth,
            has_bias: bias.is_some(),
            has_lod_clamp: lod_clamp.is_some(),
            force_level0: flags.contains(MimgModifiers::LEVEL0),
            explicit_lod: flags.contains(MimgModifiers::LOD),
            has_offset: offset.is_some(),
        };
        let coords = self.ir.composite_construct(&coords);
        let texel = self.ir.image_sample(info, coords, bias.or(lod), dref, offset, lod_clamp);

        if is_depth {
            if let Some(image) = self.info.image_mut(register_index(inst.src(2)?, 4, 0)?) {
                image.is_depth = true;
            }
            // Depth comparisons yield one value, replicated to the color channels
            return self.commit_dmask(inst.dst(0)?, control.dmask, |_, comp| {
                if comp < 3 {
                    texel
                } else {
                    Value::imm_f32(1.0)
                }
            });
        }
        self.commit_dmask(inst.dst(0)?, control.dmask, |t, comp| {
            t.ir.composite_extract(texel, comp)
        })
    }

    /// Width, height, depth and mip count, per `dmask`
    fn image_get_resinfo(&mut self, inst: &GcnInst) -> Result<(), TranslateError> {
        let control = inst.mimg()?;
        let (image_binding, kind) = self.bound_image(inst)?;
        let lod = self.get_src(inst.src(0)?)?;
        let info = TextureInstInfo {
            image_binding,
            coord_components: kind.coord_components(),
            ..Default::default()
        };
        let has_mips = control.dmask & 0b1000 != 0;
        let dims = self.ir.image_query_dimensions(info, lod, has_mips);
        self.commit_dmask(inst.dst(0)?, control.dmask, |t, comp| {
            t.ir.composite_extract(dims, comp)
        })
    }
}
