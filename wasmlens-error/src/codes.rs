// WasmLens - wasmlens-error
// Module: Error Codes
//
// Copyright (c) 2025 The WasmLens Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Error codes for wasmlens

// Parse error codes (1100-1199)
/// Read past the end of the buffer
pub const OUT_OF_DATA: u16 = 1100;
/// Magic number does not match `\0asm`
pub const BAD_MAGIC: u16 = 1101;
/// Version field is not the single supported value
pub const UNSUPPORTED_VERSION: u16 = 1102;
/// An enum-like byte (value type, section kind, descriptor) is out of range
pub const INVALID_TAG: u16 = 1103;
/// Declared section length disagrees with the bytes its decoder consumed
pub const SECTION_LENGTH_MISMATCH: u16 = 1104;
/// An item count cannot fit in the bytes that remain
pub const MALFORMED_COUNT: u16 = 1105;
/// A variable-length integer exceeds its target width
pub const INTEGER_TOO_LARGE: u16 = 1106;
/// Input buffer exceeds the configured size limit
pub const MODULE_TOO_LARGE: u16 = 1107;

// Evaluation error codes (2100-2199)
/// Opcode outside the interpreter's allowlist
pub const UNSUPPORTED_OPCODE: u16 = 2100;
/// `local.*` index outside the current frame
pub const INVALID_LOCAL_INDEX: u16 = 2101;
/// `global.*` index outside the evaluation context
pub const INVALID_GLOBAL_INDEX: u16 = 2102;
/// Operand stack did not hold enough values
pub const STACK_UNDERFLOW: u16 = 2103;
/// Operand had the wrong numeric type
pub const TYPE_MISMATCH: u16 = 2104;
/// `unreachable` was executed
pub const UNREACHABLE_EXECUTED: u16 = 2105;

// Resource error codes (3000-3099)
/// Function index does not name an imported or defined function
pub const INVALID_FUNCTION_INDEX: u16 = 3000;

// Validation error codes (5000-5099)
/// Cross-section consistency check failed
pub const VALIDATION_ERROR: u16 = 5000;

// System error codes (8000-8099)
/// Formatting error
pub const SYSTEM_ERROR: u16 = 8000;
