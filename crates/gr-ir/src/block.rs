//! Basic blocks and IR instructions

use crate::attribute::Attribute;
use crate::opcode::Opcode;
use crate::reg::Reg;
use crate::types::{Type, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Index of an instruction within its block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstId(pub u32);

impl InstId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Buffer element data format (MTBUF `dfmt`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFormat {
    Format8,
    Format16,
    Format8_8,
    Format32,
    Format16_16,
    Format10_11_11,
    Format11_11_10,
    Format10_10_10_2,
    Format2_10_10_10,
    Format8_8_8_8,
    Format32_32,
    Format16_16_16_16,
    Format32_32_32,
    Format32_32_32_32,
}

impl DataFormat {
    /// Decode the 4-bit field; 0 (invalid) and 15 (reserved) have no format
    pub fn from_raw(raw: u32) -> Option<Self> {
        let format = match raw {
            1 => DataFormat::Format8,
            2 => DataFormat::Format16,
            3 => DataFormat::Format8_8,
            4 => DataFormat::Format32,
            5 => DataFormat::Format16_16,
            6 => DataFormat::Format10_11_11,
            7 => DataFormat::Format11_11_10,
            8 => DataFormat::Format10_10_10_2,
            9 => DataFormat::Format2_10_10_10,
            10 => DataFormat::Format8_8_8_8,
            11 => DataFormat::Format32_32,
            12 => DataFormat::Format16_16_16_16,
            13 => DataFormat::Format32_32_32,
            14 => DataFormat::Format32_32_32_32,
            _ => return None,
        };
        Some(format)
    }

    pub fn components(self) -> u32 {
        match self {
            DataFormat::Format8 | DataFormat::Format16 | DataFormat::Format32 => 1,
            DataFormat::Format8_8 | DataFormat::Format16_16 | DataFormat::Format32_32 => 2,
            DataFormat::Format10_11_11
            | DataFormat::Format11_11_10
            | DataFormat::Format32_32_32 => 3,
            DataFormat::Format10_10_10_2
            | DataFormat::Format2_10_10_10
            | DataFormat::Format8_8_8_8
            | DataFormat::Format16_16_16_16
            | DataFormat::Format32_32_32_32 => 4,
        }
    }
}

/// Buffer element number format (MTBUF `nfmt`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberFormat {
    Unorm,
    Snorm,
    Uscaled,
    Sscaled,
    Uint,
    Sint,
    SnormNz,
    Float,
}

impl NumberFormat {
    pub fn from_raw(raw: u32) -> Option<Self> {
        let format = match raw {
            0 => NumberFormat::Unorm,
            1 => NumberFormat::Snorm,
            2 => NumberFormat::Uscaled,
            3 => NumberFormat::Sscaled,
            4 => NumberFormat::Uint,
            5 => NumberFormat::Sint,
            6 => NumberFormat::SnormNz,
            7 => NumberFormat::Float,
            _ => return None,
        };
        Some(format)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferFormat {
    pub data: DataFormat,
    pub number: NumberFormat,
}

/// Addressing of a buffer access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferInstInfo {
    pub binding: u32,
    pub num_dwords: u32,
    pub index_enable: bool,
    pub offset_enable: bool,
    pub inst_offset: u32,
    /// Present for typed (MTBUF) accesses
    pub format: Option<BufferFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SharedInstInfo {
    pub bit_size: u32,
    pub is_signed: bool,
}

/// Bindings and operand layout of an image operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureInstInfo {
    pub image_binding: u32,
    pub sampler_binding: u32,
    pub coord_components: u32,
    pub is_depth: bool,
    pub has_bias: bool,
    pub has_lod_clamp: bool,
    pub force_level0: bool,
    pub explicit_lod: bool,
    pub has_offset: bool,
}

/// Extra per-opcode data attached to an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InstFlags {
    #[default]
    None,
    Register(Reg),
    Attribute { attr: Attribute, comp: u32 },
    ConstBuffer { binding: u32 },
    Buffer(BufferInstInfo),
    Shared(SharedInstInfo),
    Texture(TextureInstInfo),
}

/// A single IR instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Inst {
    pub op: Opcode,
    pub ty: Type,
    pub args: Vec<Value>,
    /// Lane mask predicating the instruction; `None` for wave-uniform work
    pub exec: Option<Value>,
    pub flags: InstFlags,
}

/// Straight-line sequence of IR instructions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    id: u32,
    insts: Vec<Inst>,
    live_outs: BTreeMap<Reg, Value>,
}

impl Block {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            insts: Vec::new(),
            live_outs: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn insts(&self) -> &[Inst] {
        &self.insts
    }

    pub fn inst(&self, id: InstId) -> Option<&Inst> {
        self.insts.get(id.index())
    }

    /// Instruction producing `value`, if it is not an immediate
    pub fn def(&self, value: Value) -> Option<&Inst> {
        value.inst().and_then(|id| self.inst(id))
    }

    pub fn len(&self) -> usize {
        self.insts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    /// Instructions with the given opcode, in program order
    pub fn filter_op(&self, op: Opcode) -> impl Iterator<Item = (InstId, &Inst)> + '_ {
        self.insts
            .iter()
            .enumerate()
            .filter(move |(_, inst)| inst.op == op)
            .map(|(i, inst)| (InstId(i as u32), inst))
    }

    pub(crate) fn push(&mut self, inst: Inst) -> InstId {
        let id = InstId(self.insts.len() as u32);
        self.insts.push(inst);
        id
    }

    pub fn live_outs(&self) -> &BTreeMap<Reg, Value> {
        &self.live_outs
    }

    pub fn live_out(&self, reg: Reg) -> Option<Value> {
        self.live_outs.get(&reg).copied()
    }

    pub fn set_live_out(&mut self, reg: Reg, value: Value) {
        self.live_outs.insert(reg, value);
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op, self.ty)?;
        match &self.flags {
            InstFlags::None => {}
            InstFlags::Register(reg) => write!(f, " {reg}")?,
            InstFlags::Attribute { attr, comp } => write!(f, " {attr}.{comp}")?,
            InstFlags::ConstBuffer { binding } => write!(f, " cb{binding}")?,
            InstFlags::Buffer(info) => write!(f, " buf{} x{}", info.binding, info.num_dwords)?,
            InstFlags::Shared(info) => {
                let sign = if info.is_signed { "s" } else { "u" };
                write!(f, " {sign}{}", info.bit_size)?
            }
            InstFlags::Texture(info) => {
                write!(f, " img{} smp{}", info.image_binding, info.sampler_binding)?
            }
        }
        for (i, arg) in self.args.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{arg}")?;
        }
        if let Some(exec) = self.exec {
            write!(f, " [exec {exec}]")?;
        }
        Ok(())
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "block {}:", self.id)?;
        for (i, inst) in self.insts.iter().enumerate() {
            if inst.ty == Type::Void {
                writeln!(f, "  {inst}")?;
            } else {
                writeln!(f, "  {} = {inst}", InstId(i as u32))?;
            }
        }
        if !self.live_outs.is_empty() {
            writeln!(f, "live-outs:")?;
            for (reg, value) in &self.live_outs {
                writeln!(f, "  {reg} = {value}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_format_decode() {
        assert_eq!(DataFormat::from_raw(0), None);
        assert_eq!(DataFormat::from_raw(15), None);
        assert_eq!(DataFormat::from_raw(14), Some(DataFormat::Format32_32_32_32));
        assert_eq!(DataFormat::Format32_32.components(), 2);
        assert_eq!(NumberFormat::from_raw(7), Some(NumberFormat::Float));
        assert_eq!(NumberFormat::from_raw(8), None);
    }

    #[test]
    fn test_block_push_and_lookup() {
        let mut block = Block::new(3);
        let id = block.push(Inst {
            op: Opcode::IAdd,
            ty: Type::U32,
            args: vec![Value::U32(1), Value::U32(2)],
            exec: None,
            flags: InstFlags::None,
        });
        assert_eq!(id, InstId(0));
        assert_eq!(block.len(), 1);
        assert_eq!(block.def(Value::Inst(id, Type::U32)).map(|i| i.op), Some(Opcode::IAdd));
        assert!(block.def(Value::U32(5)).is_none());
        assert_eq!(block.filter_op(Opcode::IAdd).count(), 1);
    }

    #[test]
    fn test_block_display() {
        let mut block = Block::new(0);
        let id = block.push(Inst {
            op: Opcode::IMul,
            ty: Type::U32,
            args: vec![Value::U32(5), Value::U32(5)],
            exec: None,
            flags: InstFlags::None,
        });
        block.set_live_out(Reg::Sgpr(1), Value::Inst(id, Type::U32));

        let text = block.to_string();
        assert!(text.contains("block 0:"));
        assert!(text.contains("%0 = IMul u32 #0x5, #0x5"));
        assert!(text.contains("s1 = %0"));
    }
}
