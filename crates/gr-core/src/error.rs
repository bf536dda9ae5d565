//! Error types for the GCN recompiler

use std::fmt;
use thiserror::Error;

/// Main error type for the recompiler
#[derive(Error, Debug)]
pub enum RecompilerError {
    #[error("Translation error: {0}")]
    Translate(#[from] TranslateError),

    #[error("IR error: {0}")]
    Ir(#[from] IrError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// Kind of resource descriptor a handler tried to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Buffer,
    Image,
    Sampler,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Buffer => "buffer",
            ResourceKind::Image => "image",
            ResourceKind::Sampler => "sampler",
        };
        f.write_str(name)
    }
}

/// Errors raised while rewriting GCN instructions into IR
///
/// Every variant is fatal for the block being translated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("Unsupported opcode {opcode} in block {block} at instruction {index}")]
    UnsupportedOpcode {
        opcode: String,
        block: u32,
        index: usize,
    },

    #[error("Unsupported operand {field}: {reason}")]
    UnsupportedOperand { field: String, reason: String },

    #[error("No {kind} descriptor bound at s{sgpr}")]
    UnboundResource { kind: ResourceKind, sgpr: u32 },

    #[error("Missing {role} operand {index}")]
    MissingOperand { role: &'static str, index: usize },

    #[error("Missing {0} control fields")]
    MissingControl(&'static str),

    #[error("Invalid parameter for {handler}: {detail}")]
    InvalidParameter {
        handler: &'static str,
        detail: String,
    },

    #[error("Read of undefined register {0}")]
    UndefinedRegister(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("Prologue already emitted for this shader")]
    PrologueAlreadyEmitted,

    #[error("{opcode} in block {block} at instruction {index}: {source}")]
    AtInstruction {
        opcode: String,
        block: u32,
        index: usize,
        #[source]
        source: Box<TranslateError>,
    },
}

impl TranslateError {
    /// Attach the failing instruction's position, unless already present.
    pub fn at(self, opcode: impl Into<String>, block: u32, index: usize) -> Self {
        match self {
            TranslateError::UnsupportedOpcode { .. } | TranslateError::AtInstruction { .. } => self,
            other => TranslateError::AtInstruction {
                opcode: opcode.into(),
                block,
                index,
                source: Box::new(other),
            },
        }
    }

    /// The error with any position wrapper removed.
    pub fn root(&self) -> &TranslateError {
        match self {
            TranslateError::AtInstruction { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Errors raised by the IR reference evaluator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("No input provided for live-in {0}")]
    MissingInput(String),

    #[error("Cannot evaluate {0}")]
    Unevaluable(String),

    #[error("Type mismatch at %{index}: {detail}")]
    TypeMismatch { index: u32, detail: String },

    #[error("Shared memory access out of bounds: 0x{addr:x}")]
    SharedOutOfBounds { addr: u32 },
}

/// Result type alias using RecompilerError
pub type Result<T> = std::result::Result<T, RecompilerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TranslateError::UnsupportedOpcode {
            opcode: "V_MUL_HI_U32".to_string(),
            block: 2,
            index: 7,
        };
        assert_eq!(
            err.to_string(),
            "Unsupported opcode V_MUL_HI_U32 in block 2 at instruction 7"
        );

        let err = TranslateError::UnboundResource {
            kind: ResourceKind::Buffer,
            sgpr: 8,
        };
        assert_eq!(err.to_string(), "No buffer descriptor bound at s8");
    }

    #[test]
    fn test_error_position() {
        let err = TranslateError::UnboundResource {
            kind: ResourceKind::Image,
            sgpr: 4,
        }
        .at("IMAGE_SAMPLE", 0, 3);
        assert!(err.to_string().contains("IMAGE_SAMPLE in block 0 at instruction 3"));
        assert_eq!(
            err.root(),
            &TranslateError::UnboundResource {
                kind: ResourceKind::Image,
                sgpr: 4
            }
        );

        // Already positioned errors are not wrapped twice
        let wrapped = err.clone().at("S_NOP", 1, 1);
        assert_eq!(wrapped, err);
    }

    #[test]
    fn test_error_conversion() {
        let err: RecompilerError = TranslateError::PrologueAlreadyEmitted.into();
        assert!(matches!(err, RecompilerError::Translate(_)));

        let err: RecompilerError = IrError::MissingInput("v0".to_string()).into();
        assert!(matches!(err, RecompilerError::Ir(_)));
    }
}
