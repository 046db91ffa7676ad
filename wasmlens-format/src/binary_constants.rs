//! Module binary format constants
//!
//! Magic number, version, section ids, type encodings and the opcodes the
//! initializer-expression interpreter understands.

/// Magic bytes for modules: \0asm
pub const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6D];

/// The magic bytes read as a little-endian u32
pub const WASM_MAGIC_U32: u32 = u32::from_le_bytes(WASM_MAGIC);

/// The single supported binary format version
pub const WASM_VERSION: u32 = 1;

/// Length of the magic + version header
pub const HEADER_LEN: usize = 8;

// Section IDs
/// Custom section
pub const CUSTOM_SECTION_ID: u8 = 0x00;
/// Type section
pub const TYPE_SECTION_ID: u8 = 0x01;
/// Import section
pub const IMPORT_SECTION_ID: u8 = 0x02;
/// Function section
pub const FUNCTION_SECTION_ID: u8 = 0x03;
/// Table section
pub const TABLE_SECTION_ID: u8 = 0x04;
/// Memory section
pub const MEMORY_SECTION_ID: u8 = 0x05;
/// Global section
pub const GLOBAL_SECTION_ID: u8 = 0x06;
/// Export section
pub const EXPORT_SECTION_ID: u8 = 0x07;
/// Start section
pub const START_SECTION_ID: u8 = 0x08;
/// Element section
pub const ELEMENT_SECTION_ID: u8 = 0x09;
/// Code section
pub const CODE_SECTION_ID: u8 = 0x0A;
/// Data section
pub const DATA_SECTION_ID: u8 = 0x0B;
/// Data count section
pub const DATA_COUNT_SECTION_ID: u8 = 0x0C;

// Value types
/// `i32`
pub const I32_TYPE: u8 = 0x7F;
/// `i64`
pub const I64_TYPE: u8 = 0x7E;
/// `f32`
pub const F32_TYPE: u8 = 0x7D;
/// `f64`
pub const F64_TYPE: u8 = 0x7C;
/// `v128`
pub const V128_TYPE: u8 = 0x7B;
/// `funcref`
pub const FUNCREF_TYPE: u8 = 0x70;
/// `externref`
pub const EXTERNREF_TYPE: u8 = 0x6F;

/// Leading tag of every function type entry
pub const FUNC_TYPE_FORM: u8 = 0x60;

// Limits flags
/// Limits with a minimum only
pub const LIMITS_NO_MAX: u8 = 0x00;
/// Limits with a minimum and a maximum
pub const LIMITS_HAS_MAX: u8 = 0x01;

// External kinds (import / export descriptors)
/// Function import/export
pub const EXTERNAL_FUNC: u8 = 0x00;
/// Table import/export
pub const EXTERNAL_TABLE: u8 = 0x01;
/// Memory import/export
pub const EXTERNAL_MEMORY: u8 = 0x02;
/// Global import/export
pub const EXTERNAL_GLOBAL: u8 = 0x03;

// Global mutability
/// Immutable global
pub const GLOBAL_CONST: u8 = 0x00;
/// Mutable global
pub const GLOBAL_MUT: u8 = 0x01;

// Block types
/// Block without parameters or results
pub const BLOCK_TYPE_EMPTY: u8 = 0x40;

// Control instructions
/// `unreachable`
pub const UNREACHABLE: u8 = 0x00;
/// `nop`
pub const NOP: u8 = 0x01;
/// `block`
pub const BLOCK: u8 = 0x02;
/// `loop`
pub const LOOP: u8 = 0x03;
/// `end`
pub const END: u8 = 0x0B;
/// `call`
pub const CALL: u8 = 0x10;

// Variable instructions
/// `local.get`
pub const LOCAL_GET: u8 = 0x20;
/// `local.set`
pub const LOCAL_SET: u8 = 0x21;
/// `local.tee`
pub const LOCAL_TEE: u8 = 0x22;
/// `global.get`
pub const GLOBAL_GET: u8 = 0x23;
/// `global.set`
pub const GLOBAL_SET: u8 = 0x24;

// Numeric instructions - constants
/// `i32.const`
pub const I32_CONST: u8 = 0x41;
/// `i64.const`
pub const I64_CONST: u8 = 0x42;
/// `f32.const`
pub const F32_CONST: u8 = 0x43;
/// `f64.const`
pub const F64_CONST: u8 = 0x44;

// Numeric instructions - arithmetic
/// `i32.add`
pub const I32_ADD: u8 = 0x6A;

/// Default cap on the size of a buffer handed to the codec (64 MiB)
pub const MAX_MODULE_SIZE: usize = 64 * 1024 * 1024;

/// Most locals one function frame may declare, parameters excluded
pub const MAX_FUNCTION_LOCALS: usize = 50_000;
