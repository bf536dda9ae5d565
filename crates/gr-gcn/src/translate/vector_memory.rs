//! Vector memory handlers (MUBUF, MTBUF)
//!
//! Operand layout: `src[0]` address VGPR, `src[1]` first data VGPR,
//! `src[2]` resource descriptor (in SGPR quads) and `src[3]` scalar offset.

use super::operand::register_index;
use super::{HandlerTable, Translator};
use crate::instruction::{BufferControl, GcnInst, InstOperand, OperandField};
use crate::opcode::Opcode;
use gr_core::error::{ResourceKind, TranslateError};
use gr_ir::{BufferFormat, BufferInstInfo, DataFormat, NumberFormat, Value};

pub(super) fn register(table: &mut HandlerTable) {
    table.add(Opcode::BUFFER_LOAD_FORMAT_X, "buffer_load_format", |t, i| t.buffer_load(1, false, i));
    table.add(Opcode::BUFFER_LOAD_FORMAT_XY, "buffer_load_format", |t, i| t.buffer_load(2, false, i));
    table.add(Opcode::BUFFER_LOAD_FORMAT_XYZ, "buffer_load_format", |t, i| t.buffer_load(3, false, i));
    table.add(Opcode::BUFFER_LOAD_FORMAT_XYZW, "buffer_load_format", |t, i| t.buffer_load(4, false, i));
    table.add(Opcode::TBUFFER_LOAD_FORMAT_X, "tbuffer_load_format", |t, i| t.buffer_load(1, true, i));
    table.add(Opcode::TBUFFER_LOAD_FORMAT_XY, "tbuffer_load_format", |t, i| t.buffer_load(2, true, i));
    table.add(Opcode::TBUFFER_LOAD_FORMAT_XYZ, "tbuffer_load_format", |t, i| t.buffer_load(3, true, i));
    table.add(Opcode::TBUFFER_LOAD_FORMAT_XYZW, "tbuffer_load_format", |t, i| t.buffer_load(4, true, i));
    table.add(Opcode::BUFFER_STORE_FORMAT_X, "buffer_store_format", |t, i| t.buffer_store(1, false, i));
    table.add(Opcode::BUFFER_STORE_FORMAT_XY, "buffer_store_format", |t, i| t.buffer_store(2, false, i));
    table.add(Opcode::BUFFER_STORE_FORMAT_XYZ, "buffer_store_format", |t, i| t.buffer_store(3, false, i));
    table.add(Opcode::BUFFER_STORE_FORMAT_XYZW, "buffer_store_format", |t, i| t.buffer_store(4, false, i));
    table.add(Opcode::TBUFFER_STORE_FORMAT_X, "tbuffer_store_format", |t, i| t.buffer_store(1, true, i));
    table.add(Opcode::TBUFFER_STORE_FORMAT_XY, "tbuffer_store_format", |t, i| t.buffer_store(2, true, i));
    table.add(Opcode::TBUFFER_STORE_FORMAT_XYZ, "tbuffer_store_format", |t, i| t.buffer_store(3, true, i));
    table.add(Opcode::TBUFFER_STORE_FORMAT_XYZW, "tbuffer_store_format", |t, i| t.buffer_store(4, true, i));
}

/// Element format of a typed access
fn typed_format(control: &BufferControl) -> Result<BufferFormat, TranslateError> {
    match (DataFormat::from_raw(control.dfmt), NumberFormat::from_raw(control.nfmt)) {
        (Some(data), Some(number)) => Ok(BufferFormat { data, number }),
        _ => Err(TranslateError::UnsupportedFeature(format!(
            "buffer format dfmt={} nfmt={}",
            control.dfmt, control.nfmt
        ))),
    }
}

fn vgpr_base(operand: &InstOperand, role: &str) -> Result<u32, TranslateError> {
    if operand.field == OperandField::VectorGpr {
        Ok(operand.code)
    } else {
        Err(TranslateError::UnsupportedOperand {
            field: format!("{:?}", operand.field),
            reason: format!("buffer {role} must be a VGPR"),
        })
    }
}

impl<'a> Translator<'a> {
    /// Resolve the descriptor and describe the access
    fn buffer_info(&mut self, num_dwords: u32, typed: bool, inst: &GcnInst) -> Result<BufferInstInfo, TranslateError> {
        if !(1..=4).contains(&num_dwords) {
            return Err(TranslateError::InvalidParameter {
                handler: "buffer_format",
                detail: format!("{num_dwords} components"),
            });
        }
        let control = inst.buffer()?;
        let sgpr_base = register_index(inst.src(2)?, 4, 0)?;
        let binding = self
            .info
            .buffer_mut(sgpr_base)
            .map(|buffer| buffer.binding)
            .ok_or(TranslateError::UnboundResource {
                kind: ResourceKind::Buffer,
                sgpr: sgpr_base,
            })?;
        let format = if typed { Some(typed_format(&control)?) } else { None };

        Ok(BufferInstInfo {
            binding,
            num_dwords,
            index_enable: control.idxen,
            offset_enable: control.offen,
            inst_offset: control.offset,
            format,
        })
    }

    /// Per-lane address: index and offset VGPRs as selected by `idxen`/`offen`
    fn buffer_address(&mut self, info: &BufferInstInfo, inst: &GcnInst) -> Result<Value, TranslateError> {
        if !info.index_enable && !info.offset_enable {
            return Ok(Value::U32(0));
        }
        let addr = inst.src(0)?;
        let base = vgpr_base(addr, "address")?;
        let first = self.get_src(&InstOperand::vgpr(base))?;
        if info.index_enable && info.offset_enable {
            let second = self.get_src(&InstOperand::vgpr(register_index(addr, 1, 1)?))?;
            Ok(self.ir.composite_construct(&[first, second]))
        } else {
            Ok(first)
        }
    }

    fn buffer_load(&mut self, num_dwords: u32, typed: bool, inst: &GcnInst) -> Result<(), TranslateError> {
        let info = self.buffer_info(num_dwords, typed, inst)?;
        let data = inst.src(1)?;
        vgpr_base(data, "data")?;
        let address = self.buffer_address(&info, inst)?;
        let soffset = self.get_src(inst.src(3)?)?;

        let value = self.ir.load_buffer(info, address, soffset);
        for i in 0..num_dwords {
            let comp = if num_dwords == 1 {
                value
            } else {
                self.ir.composite_extract(value, i)
            };
            self.set_dst(&InstOperand::vgpr(register_index(data, 1, i)?), comp)?;
        }
        Ok(())
    }

    fn buffer_store(&mut self, num_dwords: u32, typed: bool, inst: &GcnInst) -> Result<(), TranslateError> {
        let info = self.buffer_info(num_dwords, typed, inst)?;
        let data = inst.src(1)?;
        vgpr_base(data, "data")?;
        let address = self.buffer_address(&info, inst)?;
        let soffset = self.get_src(inst.src(3)?)?;

        let comps = (0..num_dwords)
            .map(|i| self.get_src_f32(&InstOperand::vgpr(register_index(data, 1, i)?)))
            .collect::<Result<Vec<_>, _>>()?;
        let data = self.ir.composite_construct(&comps);
        self.ir.store_buffer(info, address, soffset, data);

        if let Some(buffer) = self.info.buffer_mut(register_index(inst.src(2)?, 4, 0)?) {
            buffer.is_written = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;
    use crate::info::ShaderInfo;
    use crate::instruction::InstControl;
    use gr_ir::{InstFlags, Opcode as IrOp, Reg, Type};

    fn mubuf(opcode: Opcode, vaddr: u32, vdata: u32, control: BufferControl) -> GcnInst {
        GcnInst::new(opcode)
            .with_src(InstOperand::vgpr(vaddr))
            .with_src(InstOperand::vgpr(vdata))
            .with_src(InstOperand::sgpr(2))
            .with_src(InstOperand::int(0))
            .with_control(InstControl::Buffer(control))
    }

    fn buffer_flags(flags: InstFlags) -> BufferInstInfo {
        match flags {
            InstFlags::Buffer(info) => info,
            other => panic!("expected buffer flags, got {other:?}"),
        }
    }

    #[test]
    fn test_load_components_to_consecutive_vgprs() {
        let mut info = ShaderInfo::default().with_buffer(8, 5);
        let control = BufferControl {
            idxen: true,
            offen: true,
            offset: 16,
            ..Default::default()
        };
        let block = translate_info(&mut info, &[mubuf(Opcode::BUFFER_LOAD_FORMAT_XYZW, 0, 4, control)]).unwrap();

        let (id, load) = block.filter_op(IrOp::LoadBuffer).next().unwrap();
        assert_eq!(load.ty, Type::F32x4);
        assert!(load.exec.is_some());
        let flags = buffer_flags(load.flags);
        assert_eq!(flags.binding, 5);
        assert_eq!(flags.inst_offset, 16);
        assert!(flags.index_enable && flags.offset_enable);
        assert_eq!(flags.format, None);

        let address = block.def(load.args[0]).unwrap();
        assert_eq!(address.op, IrOp::CompositeConstruct);
        assert_eq!(address.args.len(), 2);

        for i in 0..4 {
            let extract = block.def(block.live_out(Reg::Vgpr(4 + i)).unwrap()).unwrap();
            assert_eq!(extract.op, IrOp::CompositeExtract);
            assert_eq!(extract.args, vec![Value::Inst(id, Type::F32x4), Value::U32(i)]);
        }
        assert!(!info.buffers[0].is_written);
    }

    #[test]
    fn test_single_component_without_address() {
        let mut info = ShaderInfo::default().with_buffer(8, 0);
        let block = translate_info(
            &mut info,
            &[mubuf(Opcode::BUFFER_LOAD_FORMAT_X, 0, 1, BufferControl::default())],
        )
        .unwrap();
        let v1 = block.live_out(Reg::Vgpr(1)).unwrap();
        let load = block.def(v1).unwrap();
        assert_eq!(load.op, IrOp::LoadBuffer);
        assert_eq!(load.args[0], Value::U32(0));
        assert_eq!(block.filter_op(IrOp::CompositeExtract).count(), 0);
    }

    #[test]
    fn test_typed_load_format() {
        let mut info = ShaderInfo::default().with_buffer(8, 0);
        let control = BufferControl {
            offen: true,
            dfmt: 14,
            nfmt: 7,
            ..Default::default()
        };
        let block = translate_info(&mut info, &[mubuf(Opcode::TBUFFER_LOAD_FORMAT_XY, 0, 2, control)]).unwrap();
        let (_, load) = block.filter_op(IrOp::LoadBuffer).next().unwrap();
        assert_eq!(
            buffer_flags(load.flags).format,
            Some(BufferFormat {
                data: DataFormat::Format32_32_32_32,
                number: NumberFormat::Float,
            })
        );
    }

    #[test]
    fn test_invalid_typed_format() {
        let mut info = ShaderInfo::default().with_buffer(8, 0);
        let control = BufferControl {
            dfmt: 0,
            nfmt: 7,
            ..Default::default()
        };
        let err = translate_info(&mut info, &[mubuf(Opcode::TBUFFER_LOAD_FORMAT_X, 0, 2, control)]).unwrap_err();
        assert!(matches!(err.root(), TranslateError::UnsupportedFeature(_)));
    }

    #[test]
    fn test_store_marks_buffer_written() {
        let mut info = ShaderInfo::default().with_buffer(8, 1);
        let control = BufferControl {
            offen: true,
            ..Default::default()
        };
        let block = translate_info(&mut info, &[mubuf(Opcode::BUFFER_STORE_FORMAT_XY, 0, 6, control)]).unwrap();

        let (_, store) = block.filter_op(IrOp::StoreBuffer).next().unwrap();
        assert_eq!(store.ty, Type::Void);
        let data = block.def(store.args[2]).unwrap();
        assert_eq!(data.ty, Type::F32x2);
        assert!(info.buffers[0].is_written);
    }

    #[test]
    fn test_unbound_buffer() {
        let err = try_translate(&[mubuf(Opcode::BUFFER_LOAD_FORMAT_X, 0, 1, BufferControl::default())]).unwrap_err();
        assert_eq!(
            err.root(),
            &TranslateError::UnboundResource {
                kind: ResourceKind::Buffer,
                sgpr: 8
            }
        );
    }

    #[test]
    fn test_data_register_overflow_rejected() {
        let mut info = ShaderInfo::default().with_buffer(8, 0);
        let load = mubuf(Opcode::BUFFER_LOAD_FORMAT_XY, 0, u32::MAX, BufferControl::default());
        let err = translate_info(&mut info, &[load]).unwrap_err();
        assert!(matches!(err.root(), TranslateError::UnsupportedOperand { .. }));
    }
}
