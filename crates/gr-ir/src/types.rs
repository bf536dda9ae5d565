//! IR value types and value handles

use crate::block::InstId;
use std::fmt;

/// Type of an IR value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    /// Per-lane boolean
    U1,
    U32,
    F32,
    U32x2,
    U32x3,
    U32x4,
    F32x2,
    F32x3,
    F32x4,
}

impl Type {
    /// Vector type with `count` components of `scalar` (1 gives the scalar itself)
    pub fn vector(scalar: Type, count: usize) -> Option<Type> {
        match (scalar, count) {
            (Type::U32, 1) => Some(Type::U32),
            (Type::U32, 2) => Some(Type::U32x2),
            (Type::U32, 3) => Some(Type::U32x3),
            (Type::U32, 4) => Some(Type::U32x4),
            (Type::F32, 1) => Some(Type::F32),
            (Type::F32, 2) => Some(Type::F32x2),
            (Type::F32, 3) => Some(Type::F32x3),
            (Type::F32, 4) => Some(Type::F32x4),
            (Type::U1, 1) => Some(Type::U1),
            _ => None,
        }
    }

    /// Component type
    pub fn scalar(self) -> Type {
        match self {
            Type::U32x2 | Type::U32x3 | Type::U32x4 => Type::U32,
            Type::F32x2 | Type::F32x3 | Type::F32x4 => Type::F32,
            other => other,
        }
    }

    pub fn components(self) -> usize {
        match self {
            Type::Void => 0,
            Type::U1 | Type::U32 | Type::F32 => 1,
            Type::U32x2 | Type::F32x2 => 2,
            Type::U32x3 | Type::F32x3 => 3,
            Type::U32x4 | Type::F32x4 => 4,
        }
    }

    pub fn is_float(self) -> bool {
        self.scalar() == Type::F32
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Void => "void",
            Type::U1 => "u1",
            Type::U32 => "u32",
            Type::F32 => "f32",
            Type::U32x2 => "u32x2",
            Type::U32x3 => "u32x3",
            Type::U32x4 => "u32x4",
            Type::F32x2 => "f32x2",
            Type::F32x3 => "f32x3",
            Type::F32x4 => "f32x4",
        };
        f.write_str(name)
    }
}

/// Handle to an IR value: an instruction result or an immediate.
///
/// Float immediates are kept as raw bits so that values compare and hash by
/// bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Inst(InstId, Type),
    U1(bool),
    U32(u32),
    F32(u32),
}

impl Value {
    pub fn imm_f32(value: f32) -> Self {
        Value::F32(value.to_bits())
    }

    pub fn ty(&self) -> Type {
        match self {
            Value::Inst(_, ty) => *ty,
            Value::U1(_) => Type::U1,
            Value::U32(_) => Type::U32,
            Value::F32(_) => Type::F32,
        }
    }

    pub fn is_immediate(&self) -> bool {
        !matches!(self, Value::Inst(..))
    }

    pub fn inst(&self) -> Option<InstId> {
        match self {
            Value::Inst(id, _) => Some(*id),
            _ => None,
        }
    }

    pub fn as_u1(&self) -> Option<bool> {
        match self {
            Value::U1(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(bits) => Some(f32::from_bits(*bits)),
            _ => None,
        }
    }

    /// Raw bits of a 32-bit immediate
    pub fn imm_bits(&self) -> Option<u32> {
        match self {
            Value::U1(v) => Some(u32::from(*v)),
            Value::U32(v) | Value::F32(v) => Some(*v),
            Value::Inst(..) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Inst(id, _) => write!(f, "{id}"),
            Value::U1(v) => write!(f, "#{v}"),
            Value::U32(v) => write!(f, "#{v:#x}"),
            Value::F32(bits) => write!(f, "#{:?}f", f32::from_bits(*bits)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_types() {
        assert_eq!(Type::vector(Type::F32, 4), Some(Type::F32x4));
        assert_eq!(Type::vector(Type::U32, 1), Some(Type::U32));
        assert_eq!(Type::vector(Type::U32, 5), None);
        assert_eq!(Type::F32x3.scalar(), Type::F32);
        assert_eq!(Type::U32x2.components(), 2);
        assert!(Type::F32x2.is_float());
        assert!(!Type::U1.is_float());
    }

    #[test]
    fn test_float_immediates_compare_by_bits() {
        assert_eq!(Value::imm_f32(1.5), Value::imm_f32(1.5));
        assert_ne!(Value::imm_f32(0.0), Value::imm_f32(-0.0));
        assert_eq!(Value::imm_f32(f32::NAN).ty(), Type::F32);
        assert_eq!(Value::imm_f32(2.0).as_f32(), Some(2.0));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::U32(25).to_string(), "#0x19");
        assert_eq!(Value::imm_f32(0.5).to_string(), "#0.5f");
        assert_eq!(Value::U1(true).to_string(), "#true");
    }
}
