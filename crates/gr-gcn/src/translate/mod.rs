//! GCN to IR translation
//!
//! A [`Translator`] rewrites the instructions of one basic block, in order,
//! into IR appended to that block. Handlers are looked up by opcode in a
//! lazily built dispatch table; each family of handlers lives in its own
//! module and registers itself there.
//!
//! Translation state is explicit and per block:
//! - the register file maps each physical register to the latest value
//!   committed in the block
//! - the execution mask is an [`ExecMask`] value that only ever narrows
//! - shader-wide metadata is borrowed from the caller's [`ShaderInfo`]

mod data_share;
mod export;
mod image;
mod interpolation;
mod operand;
mod registers;
mod scalar_alu;
mod scalar_memory;
mod vector_alu;
mod vector_memory;

#[cfg(test)]
mod test_util;

use crate::info::{ShaderInfo, ShaderUsage, Stage};
use crate::instruction::GcnInst;
use crate::opcode::{InstCategory, Opcode};
use gr_core::config::{TranslatorConfig, UndefinedReadPolicy};
use gr_core::error::TranslateError;
use gr_ir::{Attribute, Block, ExecMask, IrEmitter, Reg, Value};
use once_cell::sync::Lazy;
use registers::RegisterFile;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Handler signature shared by every instruction family
pub(crate) type HandlerFn = for<'a> fn(&mut Translator<'a>, &GcnInst) -> Result<(), TranslateError>;

/// Dispatch table entry
#[derive(Clone, Copy)]
pub(crate) struct HandlerInfo {
    /// Handler name (for tracing)
    pub name: &'static str,
    /// Family, deciding whether the handler runs under EXEC
    pub family: InstCategory,
    pub handler: HandlerFn,
}

#[derive(Default)]
pub(crate) struct HandlerTable {
    handlers: HashMap<Opcode, HandlerInfo>,
}

impl HandlerTable {
    pub(crate) fn add(&mut self, opcode: Opcode, name: &'static str, handler: HandlerFn) {
        self.handlers.insert(
            opcode,
            HandlerInfo {
                name,
                family: opcode.category(),
                handler,
            },
        );
    }

    fn get(&self, opcode: Opcode) -> Option<&HandlerInfo> {
        self.handlers.get(&opcode)
    }
}

static HANDLERS: Lazy<HandlerTable> = Lazy::new(|| {
    let mut table = HandlerTable::default();
    register_flow(&mut table);
    scalar_alu::register(&mut table);
    scalar_memory::register(&mut table);
    vector_alu::register(&mut table);
    vector_memory::register(&mut table);
    interpolation::register(&mut table);
    data_share::register(&mut table);
    image::register(&mut table);
    export::register(&mut table);
    table
});

/// Branching and waits are the block builder's concern
fn register_flow(table: &mut HandlerTable) {
    for opcode in [
        Opcode::S_NOP,
        Opcode::S_WAITCNT,
        Opcode::S_ENDPGM,
        Opcode::S_BRANCH,
        Opcode::S_CBRANCH_SCC0,
        Opcode::S_CBRANCH_SCC1,
        Opcode::S_CBRANCH_VCCZ,
        Opcode::S_CBRANCH_VCCNZ,
        Opcode::S_CBRANCH_EXECZ,
        Opcode::S_CBRANCH_EXECNZ,
        Opcode::S_SENDMSG,
    ] {
        table.add(opcode, "nop", |_, _| Ok(()));
    }
    table.add(Opcode::S_BARRIER, "s_barrier", |t, _| {
        t.ir.barrier();
        t.info.usage |= ShaderUsage::BARRIER;
        Ok(())
    });
    table.add(Opcode::S_SWAPPC_B64, "emit_fetch", |t, i| t.emit_fetch(i));
}

/// Whether `opcode` has a registered handler
pub fn has_handler(opcode: Opcode) -> bool {
    HANDLERS.get(opcode).is_some()
}

/// Comparison predicate shared by scalar and vector compares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionOp {
    /// Always false
    False,
    Eq,
    /// Less or greater, i.e. not equal
    Lg,
    Gt,
    Ge,
    Lt,
    Le,
}

impl ConditionOp {
    pub const ALL: [ConditionOp; 7] = [
        ConditionOp::False,
        ConditionOp::Eq,
        ConditionOp::Lg,
        ConditionOp::Gt,
        ConditionOp::Ge,
        ConditionOp::Lt,
        ConditionOp::Le,
    ];

    /// Reference result for two 32-bit integers
    pub fn holds(self, a: u32, b: u32, is_signed: bool) -> bool {
        let ord = if is_signed {
            (a as i32).cmp(&(b as i32))
        } else {
            a.cmp(&b)
        };
        match self {
            ConditionOp::False => false,
            ConditionOp::Eq => ord.is_eq(),
            ConditionOp::Lg => ord.is_ne(),
            ConditionOp::Gt => ord.is_gt(),
            ConditionOp::Ge => ord.is_ge(),
            ConditionOp::Lt => ord.is_lt(),
            ConditionOp::Le => ord.is_le(),
        }
    }
}

/// Rewrites one basic block of GCN instructions into IR
pub struct Translator<'a> {
    ir: IrEmitter<'a>,
    info: &'a mut ShaderInfo,
    config: &'a TranslatorConfig,
    regs: RegisterFile,
    /// Resolved on first use
    exec: Option<ExecMask>,
}

impl<'a> Translator<'a> {
    pub fn new(block: &'a mut Block, info: &'a mut ShaderInfo, config: &'a TranslatorConfig) -> Self {
        Self {
            ir: IrEmitter::new(block),
            info,
            config,
            regs: RegisterFile::new(),
            exec: None,
        }
    }

    /// Enter the block under a known mask instead of reading EXEC live-in
    pub fn with_entry_exec(mut self, exec: ExecMask) -> Self {
        self.exec = Some(exec);
        self
    }

    pub fn info(&self) -> &ShaderInfo {
        &*self.info
    }

    pub fn block(&self) -> &Block {
        self.ir.block()
    }

    /// Emit the shader-wide setup: implicit inputs and the initial mask.
    ///
    /// Only valid once per shader, before the entry block is translated.
    pub fn emit_prologue(&mut self) -> Result<(), TranslateError> {
        if self.info.prologue_emitted {
            return Err(TranslateError::PrologueAlreadyEmitted);
        }
        self.info.prologue_emitted = true;
        self.ir.prologue();
        self.exec = Some(ExecMask::full());

        if self.config.inline_user_data {
            for (i, &word) in self.info.user_data.iter().enumerate() {
                self.regs.set_word(Reg::Sgpr(i as u32), Value::U32(word));
            }
        }

        match self.info.stage {
            Stage::Vertex => {
                let inputs = [
                    (Attribute::VertexId, ShaderUsage::VERTEX_ID),
                    (Attribute::InstanceId, ShaderUsage::INSTANCE_ID),
                    (Attribute::PrimitiveId, ShaderUsage::PRIMITIVE_ID),
                ];
                for (vgpr, (attr, usage)) in inputs.into_iter().enumerate() {
                    let value = self.ir.get_attribute_u32(attr, 0);
                    self.regs.set_word(Reg::Vgpr(vgpr as u32), value);
                    self.info.usage |= usage;
                }
            }
            Stage::Fragment => {
                for comp in 0..4 {
                    let value = self.ir.get_attribute(Attribute::FragCoord, comp);
                    self.regs.set_word(Reg::Vgpr(2 + comp), value);
                }
                let front_facing = self.ir.get_attribute_u32(Attribute::FrontFacing, 0);
                self.regs.set_word(Reg::Vgpr(6), front_facing);
                self.info.usage |= ShaderUsage::FRAG_COORD | ShaderUsage::FRONT_FACING;
            }
            Stage::Compute => {
                for comp in 0..3 {
                    let value = self.ir.get_attribute_u32(Attribute::LocalInvocationId, comp);
                    self.regs.set_word(Reg::Vgpr(comp), value);
                }
                let base = self.info.user_data.len() as u32;
                for comp in 0..3 {
                    let value = self.ir.get_attribute_u32(Attribute::WorkgroupId, comp);
                    self.regs.set_word(Reg::Sgpr(base + comp), value);
                }
                self.info.usage |= ShaderUsage::LOCAL_INVOCATION_ID | ShaderUsage::WORKGROUP_ID;
            }
        }

        debug!("Emitted {:?} prologue", self.info.stage);
        Ok(())
    }

    /// Load every vertex input into its destination VGPRs
    fn emit_fetch(&mut self, _inst: &GcnInst) -> Result<(), TranslateError> {
        for input in &self.info.vs_inputs {
            if input.num_components > 4 {
                return Err(TranslateError::InvalidParameter {
                    handler: "emit_fetch",
                    detail: format!("{} components for semantic {}", input.num_components, input.semantic),
                });
            }
            for comp in 0..input.num_components {
                let value = self.ir.get_attribute(Attribute::Param(input.semantic), comp);
                self.regs.set_word(Reg::Vgpr(input.dest_vgpr + comp), value);
            }
        }
        self.info.usage |= ShaderUsage::FETCH_SHADER;
        Ok(())
    }

    /// Translate `insts` in program order
    pub fn translate(&mut self, insts: &[GcnInst]) -> Result<(), TranslateError> {
        let block_id = self.ir.block().id();
        debug!("Translating block {} ({} instructions)", block_id, insts.len());

        for (index, inst) in insts.iter().enumerate() {
            let Some(entry) = HANDLERS.get(inst.opcode) else {
                return Err(TranslateError::UnsupportedOpcode {
                    opcode: inst.opcode.to_string(),
                    block: block_id,
                    index,
                });
            };
            trace!("{:4}: {} -> {}", index, inst.opcode, entry.name);
            self.dispatch(entry, inst)
                .map_err(|e| e.at(inst.opcode.to_string(), block_id, index))?;
        }

        self.write_live_outs();
        debug!(
            "Translated block {} into {} IR instructions",
            block_id,
            self.ir.block().len()
        );
        Ok(())
    }

    fn dispatch(&mut self, entry: &HandlerInfo, inst: &GcnInst) -> Result<(), TranslateError> {
        if entry.family.is_per_lane() {
            let exec = self.current_exec()?;
            self.ir.set_exec(Some(exec));
        }
        let result = (entry.handler)(self, inst);
        self.ir.set_exec(None);
        result
    }

    fn write_live_outs(&mut self) {
        let outputs: Vec<_> = self.regs.outputs().collect();
        let block = self.ir.block_mut();
        for (reg, value) in outputs {
            block.set_live_out(reg, value);
        }
        if let Some(exec) = self.exec {
            block.set_live_out(Reg::ExecLo, exec.value());
        }
    }

    /// The mask vector instructions run under
    pub(crate) fn current_exec(&mut self) -> Result<ExecMask, TranslateError> {
        if let Some(exec) = self.exec {
            return Ok(exec);
        }
        let exec = match self.config.undefined_reads {
            UndefinedReadPolicy::LiveIn => {
                let saved = self.ir.exec();
                self.ir.set_exec(None);
                let exec = ExecMask::live_in(&mut self.ir);
                self.ir.set_exec(saved);
                exec
            }
            UndefinedReadPolicy::Zero => ExecMask::full(),
            UndefinedReadPolicy::Error => {
                return Err(TranslateError::UndefinedRegister(Reg::ExecLo.to_string()))
            }
        };
        self.exec = Some(exec);
        Ok(exec)
    }

    /// Restrict EXEC to lanes where `pred` holds
    pub(crate) fn narrow_exec(&mut self, pred: Value) -> Result<ExecMask, TranslateError> {
        let exec = self.current_exec()?.narrow(&mut self.ir, pred);
        self.exec = Some(exec);
        Ok(exec)
    }

    /// Clear `pred` in lanes outside EXEC, as lane-mask results are written
    pub(crate) fn mask_by_exec(&mut self, pred: Value) -> Result<Value, TranslateError> {
        Ok(self.current_exec()?.narrow(&mut self.ir, pred).value())
    }
}

/// Translate one block without a prologue
pub fn translate(
    block: &mut Block,
    insts: &[GcnInst],
    info: &mut ShaderInfo,
    config: &TranslatorConfig,
) -> Result<(), TranslateError> {
    Translator::new(block, info, config).translate(insts)
}

/// Emit the prologue into `block`, then translate it as the entry block
pub fn translate_entry(
    block: &mut Block,
    insts: &[GcnInst],
    info: &mut ShaderInfo,
    config: &TranslatorConfig,
) -> Result<(), TranslateError> {
    let mut translator = Translator::new(block, info, config);
    translator.emit_prologue()?;
    translator.translate(insts)
}

/// Translate every block of a shader; the first block is the entry block
pub fn translate_shader(
    blocks: &[Vec<GcnInst>],
    info: &mut ShaderInfo,
    config: &TranslatorConfig,
) -> Result<Vec<Block>, TranslateError> {
    let mut translated = Vec::with_capacity(blocks.len());
    for (id, insts) in blocks.iter().enumerate() {
        let mut block = Block::new(id as u32);
        if id == 0 {
            translate_entry(&mut block, insts, info, config)?;
        } else {
            translate(&mut block, insts, info, config)?;
        }
        translated.push(block);
    }
    debug!("Translated {} blocks, usage {:?}", translated.len(), info.usage);
    Ok(translated)
}
