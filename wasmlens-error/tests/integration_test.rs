// Copyright (c) 2025 The WasmLens Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![allow(clippy::unwrap_used)]
//! Integration tests for the wasmlens-error crate.

#[cfg(test)]
mod tests {
    use wasmlens_error::{codes, Error, ErrorCategory, Result};

    #[test]
    fn test_error_creation() {
        let error = Error::new(ErrorCategory::Parse, codes::INVALID_TAG, "Test error");
        assert!(error.is_parse_error());
        assert_eq!(error.code, codes::INVALID_TAG);
        assert_eq!(error.offset, None);
    }

    #[test]
    fn test_result_with_error() {
        let result: Result<i32> = Err(Error::invalid_global_index("Global doesn't exist"));
        assert!(result.is_err());

        let error = result.err().unwrap();
        assert!(error.is_runtime_error());
        assert_eq!(error.code, codes::INVALID_GLOBAL_INDEX);
    }

    #[test]
    fn test_factory_categories() {
        assert_eq!(Error::type_mismatch("x").category, ErrorCategory::Type);
        assert_eq!(Error::validation_error("x").category, ErrorCategory::Validation);
        assert_eq!(Error::invalid_function_index("x").category, ErrorCategory::Resource);
        assert_eq!(Error::malformed_count("x").code, codes::MALFORMED_COUNT);
    }

    #[test]
    fn test_error_is_std_error() {
        fn takes_std_error(_: &dyn std::error::Error) {}
        takes_std_error(&Error::out_of_data("eof"));
    }
}
