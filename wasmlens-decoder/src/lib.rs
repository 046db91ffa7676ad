// WasmLens - wasmlens-decoder
// Module: Module Codec
//
// Copyright (c) 2025 The WasmLens Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)]

//! Module codec for WasmLens
//!
//! Decodes a module binary into a [`Module`], lets callers edit it, and
//! encodes it back. Unedited modules re-encode to the exact input bytes.
//!
//! - [`decoder`]: [`ModuleCodec`], decoding with byte-range annotations
//! - [`encoder`]: the mirror-image encoder
//! - [`module`]: the section model and cross-section queries
//! - [`const_expr`]: the initializer expression interpreter
//! - [`validation`]: consistency checks run after decode
//!
//! ```
//! use wasmlens_decoder::{encode_module, ModuleCodec};
//!
//! let bytes = vec![0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];
//! let mut codec = ModuleCodec::new(bytes.clone());
//! let module = codec.decode()?;
//! assert!(module.sections.is_empty());
//! assert_eq!(encode_module(&module), bytes);
//! # Ok::<(), wasmlens_decoder::Error>(())
//! ```

/// Initializer interpreter and function stepping
pub mod const_expr;
/// [`ModuleCodec`] and decoding
pub mod decoder;
/// Module encoding
pub mod encoder;
/// The decoded module model
pub mod module;
/// Cross-section consistency checks
pub mod validation;

pub use const_expr::{evaluate, EvalContext, Evaluation, Instruction, Interpreter, Step};
pub use decoder::{decode_module, CodecConfig, ModuleCodec};
pub use encoder::{encode_module, encode_section};
pub use module::{
    CodeEntry, ConstExpr, CustomSection, DataEntry, ExportEntry, FunctionRef, GlobalEntry,
    ImportDesc, ImportEntry, LocalDecl, Module, PaddedSize, Section, TypeEntry, PAGE_SIZE,
};
pub use validation::{validate, ValidationIssue};
pub use wasmlens_error::{codes, Error, ErrorCategory, Result};
pub use wasmlens_format::{Annotation, AnnotationIndex, SectionId, Value, ValueType};
