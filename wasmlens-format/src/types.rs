//! Type definitions shared by the decoder and encoder
//!
//! Value types, external kinds, section ids, limits, and the numeric values
//! produced by initializer expressions.

use core::fmt;

use wasmlens_error::{Error, Result};

use crate::binary_constants::*;

/// Value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    /// 32-bit integer
    #[default]
    I32,
    /// 64-bit integer
    I64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// 128-bit vector
    V128,
    /// Function reference
    FuncRef,
    /// Host reference
    ExternRef,
}

impl ValueType {
    /// Parse a value type from a byte
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            I32_TYPE => Ok(ValueType::I32),
            I64_TYPE => Ok(ValueType::I64),
            F32_TYPE => Ok(ValueType::F32),
            F64_TYPE => Ok(ValueType::F64),
            V128_TYPE => Ok(ValueType::V128),
            FUNCREF_TYPE => Ok(ValueType::FuncRef),
            EXTERNREF_TYPE => Ok(ValueType::ExternRef),
            _ => Err(Error::invalid_tag("Invalid value type")),
        }
    }

    /// Convert a value type to its byte representation
    pub fn to_byte(self) -> u8 {
        match self {
            ValueType::I32 => I32_TYPE,
            ValueType::I64 => I64_TYPE,
            ValueType::F32 => F32_TYPE,
            ValueType::F64 => F64_TYPE,
            ValueType::V128 => V128_TYPE,
            ValueType::FuncRef => FUNCREF_TYPE,
            ValueType::ExternRef => EXTERNREF_TYPE,
        }
    }

    /// True for the two reference types allowed as table elements
    pub fn is_reference(self) -> bool {
        matches!(self, ValueType::FuncRef | ValueType::ExternRef)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::I32 => write!(f, "i32"),
            ValueType::I64 => write!(f, "i64"),
            ValueType::F32 => write!(f, "f32"),
            ValueType::F64 => write!(f, "f64"),
            ValueType::V128 => write!(f, "v128"),
            ValueType::FuncRef => write!(f, "funcref"),
            ValueType::ExternRef => write!(f, "externref"),
        }
    }
}

/// Import / export descriptor kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalKind {
    /// Function
    Func,
    /// Table
    Table,
    /// Linear memory
    Memory,
    /// Global
    Global,
}

impl ExternalKind {
    /// Parse a descriptor tag
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            EXTERNAL_FUNC => Ok(ExternalKind::Func),
            EXTERNAL_TABLE => Ok(ExternalKind::Table),
            EXTERNAL_MEMORY => Ok(ExternalKind::Memory),
            EXTERNAL_GLOBAL => Ok(ExternalKind::Global),
            _ => Err(Error::invalid_tag("Invalid external kind")),
        }
    }

    /// Convert to the descriptor tag byte
    pub fn to_byte(self) -> u8 {
        match self {
            ExternalKind::Func => EXTERNAL_FUNC,
            ExternalKind::Table => EXTERNAL_TABLE,
            ExternalKind::Memory => EXTERNAL_MEMORY,
            ExternalKind::Global => EXTERNAL_GLOBAL,
        }
    }
}

impl fmt::Display for ExternalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalKind::Func => write!(f, "func"),
            ExternalKind::Table => write!(f, "table"),
            ExternalKind::Memory => write!(f, "memory"),
            ExternalKind::Global => write!(f, "global"),
        }
    }
}

/// Standard section IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum SectionId {
    /// Custom section (0)
    Custom    = CUSTOM_SECTION_ID,
    /// Type section (1)
    Type      = TYPE_SECTION_ID,
    /// Import section (2)
    Import    = IMPORT_SECTION_ID,
    /// Function section (3)
    Function  = FUNCTION_SECTION_ID,
    /// Table section (4)
    Table     = TABLE_SECTION_ID,
    /// Memory section (5)
    Memory    = MEMORY_SECTION_ID,
    /// Global section (6)
    Global    = GLOBAL_SECTION_ID,
    /// Export section (7)
    Export    = EXPORT_SECTION_ID,
    /// Start section (8)
    Start     = START_SECTION_ID,
    /// Element section (9)
    Element   = ELEMENT_SECTION_ID,
    /// Code section (10)
    Code      = CODE_SECTION_ID,
    /// Data section (11)
    Data      = DATA_SECTION_ID,
    /// Data count section (12)
    DataCount = DATA_COUNT_SECTION_ID,
}

impl SectionId {
    /// Convert a kind byte to a `SectionId`
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            CUSTOM_SECTION_ID => Some(Self::Custom),
            TYPE_SECTION_ID => Some(Self::Type),
            IMPORT_SECTION_ID => Some(Self::Import),
            FUNCTION_SECTION_ID => Some(Self::Function),
            TABLE_SECTION_ID => Some(Self::Table),
            MEMORY_SECTION_ID => Some(Self::Memory),
            GLOBAL_SECTION_ID => Some(Self::Global),
            EXPORT_SECTION_ID => Some(Self::Export),
            START_SECTION_ID => Some(Self::Start),
            ELEMENT_SECTION_ID => Some(Self::Element),
            CODE_SECTION_ID => Some(Self::Code),
            DATA_SECTION_ID => Some(Self::Data),
            DATA_COUNT_SECTION_ID => Some(Self::DataCount),
            _ => None,
        }
    }

    /// Human-readable section name
    pub fn name(self) -> &'static str {
        match self {
            Self::Custom => "Custom",
            Self::Type => "Type",
            Self::Import => "Import",
            Self::Function => "Function",
            Self::Table => "Table",
            Self::Memory => "Memory",
            Self::Global => "Global",
            Self::Export => "Export",
            Self::Start => "Start",
            Self::Element => "Element",
            Self::Code => "Code",
            Self::Data => "Data",
            Self::DataCount => "DataCount",
        }
    }

    /// Look a section id up by name, ignoring ASCII case
    pub fn from_name(name: &str) -> Option<Self> {
        (CUSTOM_SECTION_ID..=DATA_COUNT_SECTION_ID)
            .filter_map(Self::from_u8)
            .find(|id| id.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Memory and table limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Limits {
    /// Initial size
    pub min: u32,
    /// Maximum size, if bounded
    pub max: Option<u32>,
}

impl fmt::Display for Limits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "min={} max={}", self.min, max),
            None => write!(f, "min={}", self.min),
        }
    }
}

/// Table type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableType {
    /// Reference type of the elements
    pub element_type: ValueType,
    /// Size limits in elements
    pub limits: Limits,
}

/// Global type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    /// Type of the stored value
    pub value_type: ValueType,
    /// Whether `global.set` may change it
    pub mutable: bool,
}

/// A numeric value produced by the interpreter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// 32-bit integer
    I32(i32),
    /// 64-bit integer
    I64(i64),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
}

impl Value {
    /// The zero value of a numeric type; `None` for vector and reference types
    pub fn zero(value_type: ValueType) -> Option<Self> {
        match value_type {
            ValueType::I32 => Some(Value::I32(0)),
            ValueType::I64 => Some(Value::I64(0)),
            ValueType::F32 => Some(Value::F32(0.0)),
            ValueType::F64 => Some(Value::F64(0.0)),
            ValueType::V128 | ValueType::FuncRef | ValueType::ExternRef => None,
        }
    }

    /// Type of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
        }
    }

    /// The value as a linear-memory offset. Floats have no offset meaning.
    pub fn as_offset(&self) -> Option<u64> {
        match *self {
            Value::I32(v) => Some(u64::from(v as u32)),
            Value::I64(v) => Some(v as u64),
            Value::F32(_) | Value::F64(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "i32:{v}"),
            Value::I64(v) => write!(f, "i64:{v}"),
            Value::F32(v) => write!(f, "f32:{v}"),
            Value::F64(v) => write!(f, "f64:{v}"),
        }
    }
}
