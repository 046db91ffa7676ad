// WasmLens - wasmlens-format
// Module: Binary Format Primitives
//
// Copyright (c) 2025 The WasmLens Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)]

//! Binary format primitives for the WasmLens module codec.
//!
//! This crate holds everything below the module level:
//!
//! - [`binary_constants`]: magic number, section ids, type tags, opcodes
//! - [`leb128`]: variable-length integer encoding and decoding
//! - [`types`]: value types, limits, section ids and numeric values
//! - [`cursor`]: [`ByteCursor`], the owned read position over a buffer
//! - [`writer`]: [`ByteWriter`], the mirror-image encoder
//! - [`annotation`]: [`AnnotationIndex`], labeled byte ranges for inspection

/// Labeled byte ranges
pub mod annotation;
/// Binary format constants
pub mod binary_constants;
/// Read position over a buffer
pub mod cursor;
/// LEB128 integers
pub mod leb128;
/// Shared format types
pub mod types;
/// Output buffer
pub mod writer;

pub use annotation::{Annotation, AnnotationIndex, RangeHandle};
pub use cursor::ByteCursor;
pub use types::{ExternalKind, GlobalType, Limits, SectionId, TableType, Value, ValueType};
pub use wasmlens_error::{codes, Error, ErrorCategory, Result};
pub use writer::ByteWriter;
