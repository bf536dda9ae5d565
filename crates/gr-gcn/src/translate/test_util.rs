//! Shared helpers for handler tests

use super::{translate, translate_entry, Translator};
use crate::info::ShaderInfo;
use crate::instruction::GcnInst;
use gr_core::config::TranslatorConfig;
use gr_core::error::TranslateError;
use gr_ir::{Block, Evaluator, ExecMask, Reg};

/// Evaluator over `lanes` lanes with every lane live in EXEC
pub(crate) fn wave(lanes: usize) -> Evaluator {
    Evaluator::new(lanes).with_mask(Reg::ExecLo, u64::MAX)
}

/// Translate with EXEC read live-in under `config`
pub(crate) fn translate_with(insts: &[GcnInst], config: &TranslatorConfig) -> Result<Block, TranslateError> {
    let mut block = Block::new(0);
    let mut info = ShaderInfo::default();
    translate(&mut block, insts, &mut info, config)?;
    Ok(block)
}

/// Translate with EXEC read live-in, so lanes can be masked off on entry
pub(crate) fn translate_masked(info: &mut ShaderInfo, insts: &[GcnInst]) -> Result<Block, TranslateError> {
    let mut block = Block::new(0);
    translate(&mut block, insts, info, &TranslatorConfig::default())?;
    Ok(block)
}

pub(crate) fn translate_live_exec(insts: &[GcnInst]) -> Block {
    translate_masked(&mut ShaderInfo::default(), insts).unwrap()
}

/// Translate a block entered with every lane enabled
pub(crate) fn translate_info(info: &mut ShaderInfo, insts: &[GcnInst]) -> Result<Block, TranslateError> {
    let mut block = Block::new(0);
    let config = TranslatorConfig::default();
    Translator::new(&mut block, info, &config)
        .with_entry_exec(ExecMask::full())
        .translate(insts)?;
    Ok(block)
}

pub(crate) fn try_translate(insts: &[GcnInst]) -> Result<Block, TranslateError> {
    translate_info(&mut ShaderInfo::default(), insts)
}

pub(crate) fn translate_ok(insts: &[GcnInst]) -> Block {
    try_translate(insts).unwrap()
}

pub(crate) fn translate_entry_with(info: &mut ShaderInfo, insts: &[GcnInst]) -> Block {
    let mut block = Block::new(0);
    translate_entry(&mut block, insts, info, &TranslatorConfig::default()).unwrap();
    block
}
