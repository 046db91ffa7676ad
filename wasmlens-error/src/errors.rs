// WasmLens - wasmlens-error
// Module: Error Types
//
// Copyright (c) 2025 The WasmLens Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Unified error type for the codec crates.

use core::fmt;

use crate::codes;

/// `Error` categories for WasmLens operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCategory {
    /// Binary format errors raised while decoding
    Parse      = 1,
    /// Initializer expression / stepping errors
    Runtime    = 2,
    /// Index lookups into the decoded model
    Resource   = 3,
    /// Type errors
    Type       = 4,
    /// Cross-section validation errors
    Validation = 5,
    /// System errors
    System     = 8,
}

/// WasmLens `Error` type
///
/// Categorized error with a numeric code, a static message and the byte
/// offset at which it was detected (when it came from a decode).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Error {
    /// `Error` category
    pub category: ErrorCategory,
    /// `Error` code
    pub code:     u16,
    /// `Error` message
    pub message:  &'static str,
    /// Byte offset of the failure, if known
    pub offset:   Option<usize>,
}

impl Error {
    /// Create a new error.
    #[must_use]
    pub const fn new(category: ErrorCategory, code: u16, message: &'static str) -> Self {
        Self {
            category,
            code,
            message,
            offset: None,
        }
    }

    /// Attach the byte offset at which the error occurred.
    ///
    /// An offset that is already set is kept; the innermost reader knows
    /// the exact faulty byte better than its callers.
    #[must_use]
    pub const fn with_offset(mut self, offset: usize) -> Self {
        if self.offset.is_none() {
            self.offset = Some(offset);
        }
        self
    }

    // Factory methods

    /// Create an out-of-data error
    #[must_use]
    pub const fn out_of_data(message: &'static str) -> Self {
        Self::new(ErrorCategory::Parse, codes::OUT_OF_DATA, message)
    }

    /// Create a bad magic number error
    #[must_use]
    pub const fn bad_magic(message: &'static str) -> Self {
        Self::new(ErrorCategory::Parse, codes::BAD_MAGIC, message)
    }

    /// Create an unsupported version error
    #[must_use]
    pub const fn unsupported_version(message: &'static str) -> Self {
        Self::new(ErrorCategory::Parse, codes::UNSUPPORTED_VERSION, message)
    }

    /// Create an invalid tag error
    #[must_use]
    pub const fn invalid_tag(message: &'static str) -> Self {
        Self::new(ErrorCategory::Parse, codes::INVALID_TAG, message)
    }

    /// Create a section length mismatch error
    #[must_use]
    pub const fn section_length_mismatch(message: &'static str) -> Self {
        Self::new(ErrorCategory::Parse, codes::SECTION_LENGTH_MISMATCH, message)
    }

    /// Create a malformed count error
    #[must_use]
    pub const fn malformed_count(message: &'static str) -> Self {
        Self::new(ErrorCategory::Parse, codes::MALFORMED_COUNT, message)
    }

    /// Create an integer-too-large error
    #[must_use]
    pub const fn integer_too_large(message: &'static str) -> Self {
        Self::new(ErrorCategory::Parse, codes::INTEGER_TOO_LARGE, message)
    }

    /// Create a module-too-large error
    #[must_use]
    pub const fn module_too_large(message: &'static str) -> Self {
        Self::new(ErrorCategory::Parse, codes::MODULE_TOO_LARGE, message)
    }

    /// Create an unsupported opcode error
    #[must_use]
    pub const fn unsupported_opcode(message: &'static str) -> Self {
        Self::new(ErrorCategory::Runtime, codes::UNSUPPORTED_OPCODE, message)
    }

    /// Create an invalid local index error
    #[must_use]
    pub const fn invalid_local_index(message: &'static str) -> Self {
        Self::new(ErrorCategory::Runtime, codes::INVALID_LOCAL_INDEX, message)
    }

    /// Create an invalid global index error
    #[must_use]
    pub const fn invalid_global_index(message: &'static str) -> Self {
        Self::new(ErrorCategory::Runtime, codes::INVALID_GLOBAL_INDEX, message)
    }

    /// Create a stack underflow error
    #[must_use]
    pub const fn stack_underflow(message: &'static str) -> Self {
        Self::new(ErrorCategory::Runtime, codes::STACK_UNDERFLOW, message)
    }

    /// Create a type mismatch error
    #[must_use]
    pub const fn type_mismatch(message: &'static str) -> Self {
        Self::new(ErrorCategory::Type, codes::TYPE_MISMATCH, message)
    }

    /// Create an unreachable-executed error
    #[must_use]
    pub const fn unreachable_executed(message: &'static str) -> Self {
        Self::new(ErrorCategory::Runtime, codes::UNREACHABLE_EXECUTED, message)
    }

    /// Create an invalid function index error
    #[must_use]
    pub const fn invalid_function_index(message: &'static str) -> Self {
        Self::new(ErrorCategory::Resource, codes::INVALID_FUNCTION_INDEX, message)
    }

    /// Create a validation error
    #[must_use]
    pub const fn validation_error(message: &'static str) -> Self {
        Self::new(ErrorCategory::Validation, codes::VALIDATION_ERROR, message)
    }

    /// Check if this is a parse error
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        self.category == ErrorCategory::Parse
    }

    /// Check if this is a runtime (evaluation) error
    #[must_use]
    pub fn is_runtime_error(&self) -> bool {
        self.category == ErrorCategory::Runtime
    }

    /// Check if this is a validation error
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        self.category == ErrorCategory::Validation
    }

    /// Check if this error reports truncated input
    #[must_use]
    pub fn is_truncation(&self) -> bool {
        self.code == codes::OUT_OF_DATA || self.code == codes::SECTION_LENGTH_MISMATCH
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}][E{:04X}] {}", self.category, self.code, self.message)?;
        if let Some(offset) = self.offset {
            write!(f, " at offset 0x{offset:x}")?;
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl From<core::fmt::Error> for Error {
    fn from(_: core::fmt::Error) -> Self {
        Self::new(ErrorCategory::System, codes::SYSTEM_ERROR, "Formatting error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_offset_keeps_innermost() {
        let error = Error::out_of_data("eof").with_offset(10).with_offset(2);
        assert_eq!(error.offset, Some(10));
    }

    #[test]
    fn test_display_includes_offset() {
        let error = Error::bad_magic("Invalid magic number").with_offset(0);
        assert_eq!(error.to_string(), "[Parse][E044D] Invalid magic number at offset 0x0");

        let error = Error::stack_underflow("Stack underflow");
        assert_eq!(error.to_string(), "[Runtime][E0837] Stack underflow");
    }

    #[test]
    fn test_truncation_codes() {
        assert!(Error::out_of_data("eof").is_truncation());
        assert!(Error::section_length_mismatch("len").is_truncation());
        assert!(!Error::invalid_tag("tag").is_truncation());
    }
}
