//! Typed instruction builder

use crate::attribute::Attribute;
use crate::block::{Block, BufferInstInfo, Inst, InstFlags, SharedInstInfo, TextureInstInfo};
use crate::exec::ExecMask;
use crate::opcode::Opcode;
use crate::reg::Reg;
use crate::types::{Type, Value};

/// Appends instructions to a block in program order.
///
/// While an execution mask is set, every appended instruction carries it.
pub struct IrEmitter<'a> {
    block: &'a mut Block,
    exec: Option<ExecMask>,
}

impl<'a> IrEmitter<'a> {
    pub fn new(block: &'a mut Block) -> Self {
        Self { block, exec: None }
    }

    pub fn block(&self) -> &Block {
        &*self.block
    }

    pub fn block_mut(&mut self) -> &mut Block {
        &mut *self.block
    }

    pub fn set_exec(&mut self, exec: Option<ExecMask>) {
        self.exec = exec;
    }

    pub fn exec(&self) -> Option<ExecMask> {
        self.exec
    }

    fn push(&mut self, op: Opcode, ty: Type, args: Vec<Value>, flags: InstFlags) -> Value {
        let inst = Inst {
            op,
            ty,
            args,
            exec: self.exec.map(ExecMask::value),
            flags,
        };
        let id = self.block.push(inst);
        Value::Inst(id, ty)
    }

    fn push_void(&mut self, op: Opcode, args: Vec<Value>, flags: InstFlags) {
        self.push(op, Type::Void, args, flags);
    }

    fn unary(&mut self, op: Opcode, ty: Type, a: Value) -> Value {
        self.push(op, ty, vec![a], InstFlags::None)
    }

    fn binary(&mut self, op: Opcode, ty: Type, a: Value, b: Value) -> Value {
        self.push(op, ty, vec![a, b], InstFlags::None)
    }

    pub fn prologue(&mut self) {
        self.push_void(Opcode::Prologue, Vec::new(), InstFlags::None);
    }

    pub fn barrier(&mut self) {
        self.push_void(Opcode::Barrier, Vec::new(), InstFlags::None);
    }

    /// Value of `reg` on entry to the block
    pub fn get_register(&mut self, reg: Reg, ty: Type) -> Value {
        self.push(Opcode::GetRegister, ty, Vec::new(), InstFlags::Register(reg))
    }

    pub fn copy(&mut self, value: Value) -> Value {
        self.unary(Opcode::Copy, value.ty(), value)
    }

    pub fn get_attribute(&mut self, attr: Attribute, comp: u32) -> Value {
        self.push(
            Opcode::GetAttribute,
            Type::F32,
            Vec::new(),
            InstFlags::Attribute { attr, comp },
        )
    }

    pub fn get_attribute_u32(&mut self, attr: Attribute, comp: u32) -> Value {
        self.push(
            Opcode::GetAttributeU32,
            Type::U32,
            Vec::new(),
            InstFlags::Attribute { attr, comp },
        )
    }

    pub fn set_attribute(&mut self, attr: Attribute, comp: u32, value: Value) {
        self.push_void(
            Opcode::SetAttribute,
            vec![value],
            InstFlags::Attribute { attr, comp },
        );
    }

    /// Reinterpret a float as its bits
    pub fn bitcast_to_u32(&mut self, value: Value) -> Value {
        match value {
            Value::F32(bits) => Value::U32(bits),
            _ => self.unary(Opcode::BitCastU32F32, Type::U32, value),
        }
    }

    /// Reinterpret bits as a float
    pub fn bitcast_to_f32(&mut self, value: Value) -> Value {
        match value {
            Value::U32(bits) => Value::F32(bits),
            _ => self.unary(Opcode::BitCastF32U32, Type::F32, value),
        }
    }

    /// Build a vector from scalars of one type; a single element is returned as is
    pub fn composite_construct(&mut self, elements: &[Value]) -> Value {
        if elements.len() == 1 {
            return elements[0];
        }
        let scalar = elements.first().map_or(Type::U32, Value::ty);
        let ty = Type::vector(scalar, elements.len()).unwrap_or(Type::Void);
        self.push(
            Opcode::CompositeConstruct,
            ty,
            elements.to_vec(),
            InstFlags::None,
        )
    }

    pub fn composite_extract(&mut self, vector: Value, index: u32) -> Value {
        self.push(
            Opcode::CompositeExtract,
            vector.ty().scalar(),
            vec![vector, Value::U32(index)],
            InstFlags::None,
        )
    }

    pub fn iadd(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::IAdd, Type::U32, a, b)
    }

    pub fn isub(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::ISub, Type::U32, a, b)
    }

    pub fn imul(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::IMul, Type::U32, a, b)
    }

    pub fn umin(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::UMin, Type::U32, a, b)
    }

    pub fn umax(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::UMax, Type::U32, a, b)
    }

    pub fn bitwise_and(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::BitwiseAnd, Type::U32, a, b)
    }

    pub fn bitwise_or(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::BitwiseOr, Type::U32, a, b)
    }

    pub fn bitwise_xor(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::BitwiseXor, Type::U32, a, b)
    }

    pub fn bitwise_not(&mut self, a: Value) -> Value {
        self.unary(Opcode::BitwiseNot, Type::U32, a)
    }

    pub fn shift_left_logical(&mut self, base: Value, shift: Value) -> Value {
        self.binary(Opcode::ShiftLeftLogical, Type::U32, base, shift)
    }

    pub fn shift_right_logical(&mut self, base: Value, shift: Value) -> Value {
        self.binary(Opcode::ShiftRightLogical, Type::U32, base, shift)
    }

    pub fn shift_right_arithmetic(&mut self, base: Value, shift: Value) -> Value {
        self.binary(Opcode::ShiftRightArithmetic, Type::U32, base, shift)
    }

    pub fn i_equal(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::IEqual, Type::U1, a, b)
    }

    pub fn i_not_equal(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::INotEqual, Type::U1, a, b)
    }

    pub fn i_less_than(&mut self, a: Value, b: Value, is_signed: bool) -> Value {
        let op = if is_signed { Opcode::SLessThan } else { Opcode::ULessThan };
        self.binary(op, Type::U1, a, b)
    }

    pub fn i_less_than_equal(&mut self, a: Value, b: Value, is_signed: bool) -> Value {
        let op = if is_signed {
            Opcode::SLessThanEqual
        } else {
            Opcode::ULessThanEqual
        };
        self.binary(op, Type::U1, a, b)
    }

    pub fn i_greater_than(&mut self, a: Value, b: Value, is_signed: bool) -> Value {
        let op = if is_signed {
            Opcode::SGreaterThan
        } else {
            Opcode::UGreaterThan
        };
        self.binary(op, Type::U1, a, b)
    }

    pub fn i_greater_than_equal(&mut self, a: Value, b: Value, is_signed: bool) -> Value {
        let op = if is_signed {
            Opcode::SGreaterThanEqual
        } else {
            Opcode::UGreaterThanEqual
        };
        self.binary(op, Type::U1, a, b)
    }

    pub fn logical_and(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::LogicalAnd, Type::U1, a, b)
    }

    pub fn logical_or(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::LogicalOr, Type::U1, a, b)
    }

    pub fn logical_not(&mut self, a: Value) -> Value {
        self.unary(Opcode::LogicalNot, Type::U1, a)
    }

    /// True in every lane if any lane of `pred` is true
    pub fn vote_any(&mut self, pred: Value) -> Value {
        self.unary(Opcode::VoteAny, Type::U1, pred)
    }

    pub fn select(&mut self, cond: Value, true_value: Value, false_value: Value) -> Value {
        self.push(
            Opcode::Select,
            true_value.ty(),
            vec![cond, true_value, false_value],
            InstFlags::None,
        )
    }

    pub fn fp_add(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::FpAdd, Type::F32, a, b)
    }

    pub fn fp_sub(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::FpSub, Type::F32, a, b)
    }

    pub fn fp_mul(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::FpMul, Type::F32, a, b)
    }

    pub fn fp_fma(&mut self, a: Value, b: Value, c: Value) -> Value {
        self.push(Opcode::FpFma, Type::F32, vec![a, b, c], InstFlags::None)
    }

    pub fn fp_min(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::FpMin, Type::F32, a, b)
    }

    pub fn fp_max(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::FpMax, Type::F32, a, b)
    }

    pub fn fp_neg(&mut self, a: Value) -> Value {
        self.unary(Opcode::FpNeg, Type::F32, a)
    }

    pub fn fp_abs(&mut self, a: Value) -> Value {
        self.unary(Opcode::FpAbs, Type::F32, a)
    }

    pub fn fp_floor(&mut self, a: Value) -> Value {
        self.unary(Opcode::FpFloor, Type::F32, a)
    }

    pub fn fp_fract(&mut self, a: Value) -> Value {
        self.unary(Opcode::FpFract, Type::F32, a)
    }

    pub fn fp_recip(&mut self, a: Value) -> Value {
        self.unary(Opcode::FpRecip, Type::F32, a)
    }

    pub fn fp_recip_sqrt(&mut self, a: Value) -> Value {
        self.unary(Opcode::FpRecipSqrt, Type::F32, a)
    }

    pub fn fp_saturate(&mut self, a: Value) -> Value {
        self.unary(Opcode::FpSaturate, Type::F32, a)
    }

    pub fn fp_equal(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::FpOrdEqual, Type::U1, a, b)
    }

    pub fn fp_not_equal(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::FpOrdNotEqual, Type::U1, a, b)
    }

    pub fn fp_less_than(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::FpOrdLessThan, Type::U1, a, b)
    }

    pub fn fp_less_than_equal(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::FpOrdLessThanEqual, Type::U1, a, b)
    }

    pub fn fp_greater_than(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::FpOrdGreaterThan, Type::U1, a, b)
    }

    pub fn fp_greater_than_equal(&mut self, a: Value, b: Value) -> Value {
        self.binary(Opcode::FpOrdGreaterThanEqual, Type::U1, a, b)
    }

    pub fn convert_f32_s32(&mut self, a: Value) -> Value {
        self.unary(Opcode::ConvertF32S32, Type::F32, a)
    }

    pub fn convert_f32_u32(&mut self, a: Value) -> Value {
        self.unary(Opcode::ConvertF32U32, Type::F32, a)
    }

    pub fn convert_u32_f32(&mut self, a: Value) -> Value {
        self.unary(Opcode::ConvertU32F32, Type::U32, a)
    }

    /// Pack an `f32x2` into two halves, rounding toward zero
    pub fn pack_half_2x16_rtz(&mut self, vector: Value) -> Value {
        self.unary(Opcode::PackHalf2x16Rtz, Type::U32, vector)
    }

    pub fn unpack_half_2x16(&mut self, packed: Value) -> Value {
        self.unary(Opcode::UnpackHalf2x16, Type::F32x2, packed)
    }

    /// Load the dword at `base + dword_offset * 4` from constant memory
    pub fn read_const(&mut self, base: Value, dword_offset: Value) -> Value {
        self.binary(Opcode::ReadConst, Type::U32, base, dword_offset)
    }

    pub fn read_const_buffer(&mut self, binding: u32, dword_index: Value) -> Value {
        self.push(
            Opcode::ReadConstBuffer,
            Type::U32,
            vec![dword_index],
            InstFlags::ConstBuffer { binding },
        )
    }

    pub fn load_buffer(&mut self, info: BufferInstInfo, address: Value, soffset: Value) -> Value {
        let ty = Type::vector(Type::F32, info.num_dwords as usize).unwrap_or(Type::Void);
        self.push(
            Opcode::LoadBuffer,
            ty,
            vec![address, soffset],
            InstFlags::Buffer(info),
        )
    }

    pub fn store_buffer(&mut self, info: BufferInstInfo, address: Value, soffset: Value, data: Value) {
        self.push_void(
            Opcode::StoreBuffer,
            vec![address, soffset, data],
            InstFlags::Buffer(info),
        );
    }

    /// Load from shared memory; 64-bit loads produce `u32x2`
    pub fn load_shared(&mut self, bit_size: u32, is_signed: bool, address: Value) -> Value {
        let ty = if bit_size == 64 { Type::U32x2 } else { Type::U32 };
        self.push(
            Opcode::LoadShared,
            ty,
            vec![address],
            InstFlags::Shared(SharedInstInfo { bit_size, is_signed }),
        )
    }

    pub fn write_shared(&mut self, bit_size: u32, address: Value, data: Value) {
        self.push_void(
            Opcode::WriteShared,
            vec![address, data],
            InstFlags::Shared(SharedInstInfo {
                bit_size,
                is_signed: false,
            }),
        );
    }

    /// Sample an image.
    ///
    /// Arguments are laid out as coordinates, lod or bias, depth reference,
    /// offset and lod clamp, omitting absent ones.
    pub fn image_sample(
        &mut self,
        info: TextureInstInfo,
        coords: Value,
        lod_or_bias: Option<Value>,
        dref: Option<Value>,
        offset: Option<Value>,
        lod_clamp: Option<Value>,
    ) -> Value {
        let explicit = info.explicit_lod || info.force_level0;
        let op = match (dref.is_some(), explicit) {
            (false, false) => Opcode::ImageSampleImplicitLod,
            (false, true) => Opcode::ImageSampleExplicitLod,
            (true, false) => Opcode::ImageSampleDrefImplicitLod,
            (true, true) => Opcode::ImageSampleDrefExplicitLod,
        };
        let mut args = vec![coords];
        args.extend(lod_or_bias);
        args.extend(dref);
        args.extend(offset);
        args.extend(lod_clamp);
        let ty = if dref.is_some() { Type::F32 } else { Type::F32x4 };
        self.push(op, ty, args, InstFlags::Texture(info))
    }

    /// Width, height, depth and mip count of an image at `lod`
    pub fn image_query_dimensions(&mut self, info: TextureInstInfo, lod: Value, has_mips: bool) -> Value {
        self.push(
            Opcode::ImageQueryDimensions,
            Type::U32x4,
            vec![lod, Value::U1(has_mips)],
            InstFlags::Texture(info),
        )
    }
}
