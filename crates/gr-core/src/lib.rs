//! Core support crate for the GCN recompiler
//!
//! This crate provides the error taxonomy, configuration, and logging
//! setup shared by the IR and translator crates.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, DebugConfig, LogLevel, TranslatorConfig, UndefinedReadPolicy};
pub use error::{IrError, RecompilerError, ResourceKind, Result, TranslateError};
