// WasmLens - wasmlens-error
// Module: Error Handling
//
// Copyright (c) 2025 The WasmLens Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! WasmLens error handling library
//!
//! Every failure the codec can report is an [`Error`]: a category, a numeric
//! code from [`codes`], a static message and, for decode failures, the byte
//! offset at which the problem was detected.
//!
//! # Error Categories
//!
//! ## Parse Errors (1100-1199)
//! - Reading past the end of the buffer
//! - Bad magic number / unsupported version
//! - Tags outside their allowed range
//! - Section length and item count inconsistencies
//!
//! ## Evaluation Errors (2100-2199)
//! - Unsupported opcodes in initializer expressions
//! - Invalid local / global indices
//! - Operand stack underflow and type mismatches
//!
//! ## Validation Errors (5000-5099)
//! - Cross-section consistency checks run after decode
//!
//! # Usage
//!
//! ```
//! use wasmlens_error::{codes, Error};
//!
//! let error = Error::out_of_data("Unexpected end of data while reading LEB128").with_offset(42);
//! assert_eq!(error.code, codes::OUT_OF_DATA);
//! assert_eq!(error.offset, Some(42));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Error codes for wasmlens
pub mod codes;
/// Error and error handling types
pub mod errors;

pub use errors::{Error, ErrorCategory};

/// A specialized `Result` type for WasmLens operations.
pub type Result<T> = core::result::Result<T, Error>;
