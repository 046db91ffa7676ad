//! Structural checks run on demand after decode.
//!
//! Decoding never range-checks indices, because the model is expected to be
//! edited in between. [`validate`] reports what would trip a consumer:
//! function/code count parity and dangling indices.

use core::fmt;

use wasmlens_format::ExternalKind;

use crate::module::{ImportDesc, Module};

/// One problem found by [`validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// Function and code sections declare different numbers of functions
    FunctionCodeMismatch {
        /// Entries in the function section
        functions: usize,
        /// Entries in the code section
        bodies: usize,
    },
    /// A function declares a type index past the type section
    UnknownType {
        /// Position in the function section
        function: usize,
        /// The missing type index
        type_index: u32,
    },
    /// An imported function declares a type index past the type section
    UnknownImportType {
        /// Position in the import section
        import: usize,
        /// The missing type index
        type_index: u32,
    },
    /// An export refers past the index space of its kind
    DanglingExport {
        /// Export name
        name: String,
        /// Index space the export refers into
        kind: ExternalKind,
        /// The missing index
        index: u32,
    },
    /// The start section names a function that does not exist
    UnknownStart {
        /// The missing function index
        index: u32,
    },
    /// A data segment targets a memory that does not exist
    UnknownMemory {
        /// Position in the data section
        segment: usize,
        /// The missing memory index
        memory_index: u32,
    },
    /// A global's initializer produced a value of the wrong type
    GlobalTypeMismatch {
        /// Global index, imports included
        global: usize,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FunctionCodeMismatch { functions, bodies } => {
                write!(f, "{functions} functions declared but {bodies} bodies present")
            }
            Self::UnknownType { function, type_index } => {
                write!(f, "function {function} uses unknown type {type_index}")
            }
            Self::UnknownImportType { import, type_index } => {
                write!(f, "import {import} uses unknown type {type_index}")
            }
            Self::DanglingExport { name, kind, index } => {
                write!(f, "export \"{name}\" refers to missing {kind} {index}")
            }
            Self::UnknownStart { index } => write!(f, "start function {index} does not exist"),
            Self::UnknownMemory { segment, memory_index } => {
                write!(f, "data segment {segment} targets missing memory {memory_index}")
            }
            Self::GlobalTypeMismatch { global } => {
                write!(f, "global {global} initializer does not match its declared type")
            }
        }
    }
}

/// Check cross-section consistency. An empty result means no issues.
pub fn validate(module: &Module) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let type_count = module.types().len();

    let functions = module.functions().len();
    let bodies = module.code().len();
    if functions != bodies {
        issues.push(ValidationIssue::FunctionCodeMismatch { functions, bodies });
    }

    for (function, &type_index) in module.functions().iter().enumerate() {
        if type_index as usize >= type_count {
            issues.push(ValidationIssue::UnknownType { function, type_index });
        }
    }

    for (import, entry) in module.imports().iter().enumerate() {
        if let ImportDesc::Func(type_index) = entry.desc {
            if type_index as usize >= type_count {
                issues.push(ValidationIssue::UnknownImportType { import, type_index });
            }
        }
    }

    let space = |kind: ExternalKind| {
        module.imported_count(kind)
            + match kind {
                ExternalKind::Func => module.functions().len(),
                ExternalKind::Table => module.tables().len(),
                ExternalKind::Memory => module.memories().len(),
                ExternalKind::Global => module.globals().len(),
            }
    };

    for export in module.exports() {
        if export.index as usize >= space(export.kind) {
            issues.push(ValidationIssue::DanglingExport {
                name: export.name.clone(),
                kind: export.kind,
                index: export.index,
            });
        }
    }

    if let Some(index) = module.start() {
        if index as usize >= space(ExternalKind::Func) {
            issues.push(ValidationIssue::UnknownStart { index });
        }
    }

    let memories = space(ExternalKind::Memory);
    for (segment, entry) in module.data().iter().enumerate() {
        if entry.memory_index as usize >= memories {
            issues.push(ValidationIssue::UnknownMemory { segment, memory_index: entry.memory_index });
        }
    }

    let imported_globals = module.imported_count(ExternalKind::Global);
    for (position, global) in module.globals().iter().enumerate() {
        let matches = global
            .init
            .value
            .is_some_and(|value| value.value_type() == global.global_type.value_type);
        if !matches {
            issues.push(ValidationIssue::GlobalTypeMismatch { global: imported_globals + position });
        }
    }

    issues
}

impl Module {
    /// See [`validate`]
    pub fn validate(&self) -> Vec<ValidationIssue> {
        validate(self)
    }
}
