//! Decoded module model.
//!
//! A [`Module`] is an ordered list of [`Section`]s. Order is kept exactly as
//! read, duplicates included, so that re-encoding an untouched module gives
//! back the original bytes. Callers edit the model in place between decode
//! and encode.

use wasmlens_error::{Error, Result};
use wasmlens_format::{ExternalKind, GlobalType, Limits, SectionId, TableType, Value, ValueType};

/// Size of one linear memory page
pub const PAGE_SIZE: usize = 65_536;

/// A decoded module
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    /// Sections in file order
    pub sections: Vec<Section>,
    /// Section size prefixes that were written wider than necessary
    pub padded_sizes: Vec<PaddedSize>,
}

/// A section size prefix encoded with more bytes than its minimal form.
///
/// The encoder writes the prefix at `width` bytes again as long as the
/// section at position `section` still has kind `id` and its new size fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaddedSize {
    /// Position in [`Module::sections`]
    pub section: usize,
    /// Kind byte of the section the width was read from
    pub id: u8,
    /// Encoded width of the size prefix in bytes
    pub width: usize,
}

impl From<Vec<Section>> for Module {
    fn from(sections: Vec<Section>) -> Self {
        Self { sections, padded_sizes: Vec::new() }
    }
}

/// One section, discriminated by its kind byte
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    /// Named section with an uninterpreted payload
    Custom(CustomSection),
    /// Function signatures
    Type(Vec<TypeEntry>),
    Import(Vec<ImportEntry>),
    /// Type index of every defined function
    Function(Vec<u32>),
    Table(Vec<TableType>),
    /// Limits of every defined memory
    Memory(Vec<Limits>),
    Global(Vec<GlobalEntry>),
    Export(Vec<ExportEntry>),
    /// Index of the start function
    Start(u32),
    /// Function bodies, parallel to the function section
    Code(Vec<CodeEntry>),
    Data(Vec<DataEntry>),
    /// A section kept as raw payload bytes and re-emitted verbatim
    Opaque {
        /// Kind byte
        id: u8,
        /// Payload without the id and size prefix
        bytes: Vec<u8>,
    },
}

impl Section {
    /// The kind byte written before the section length
    pub fn id(&self) -> u8 {
        match self {
            Section::Custom(_) => SectionId::Custom as u8,
            Section::Type(_) => SectionId::Type as u8,
            Section::Import(_) => SectionId::Import as u8,
            Section::Function(_) => SectionId::Function as u8,
            Section::Table(_) => SectionId::Table as u8,
            Section::Memory(_) => SectionId::Memory as u8,
            Section::Global(_) => SectionId::Global as u8,
            Section::Export(_) => SectionId::Export as u8,
            Section::Start(_) => SectionId::Start as u8,
            Section::Code(_) => SectionId::Code as u8,
            Section::Data(_) => SectionId::Data as u8,
            Section::Opaque { id, .. } => *id,
        }
    }

    /// Known section kind, `None` for unassigned ids
    pub fn section_id(&self) -> Option<SectionId> {
        SectionId::from_u8(self.id())
    }

    /// Display name of the section kind
    pub fn name(&self) -> &'static str {
        self.section_id().map_or("Unknown", SectionId::name)
    }

    /// Number of entries for list-shaped sections
    pub fn entry_count(&self) -> Option<usize> {
        match self {
            Section::Type(v) => Some(v.len()),
            Section::Import(v) => Some(v.len()),
            Section::Function(v) => Some(v.len()),
            Section::Table(v) => Some(v.len()),
            Section::Memory(v) => Some(v.len()),
            Section::Global(v) => Some(v.len()),
            Section::Export(v) => Some(v.len()),
            Section::Code(v) => Some(v.len()),
            Section::Data(v) => Some(v.len()),
            Section::Custom(_) | Section::Start(_) | Section::Opaque { .. } => None,
        }
    }
}

/// Custom section: a name followed by uninterpreted bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomSection {
    /// Section name, one char per byte
    pub name: String,
    /// Bytes after the name up to the end of the section
    pub payload: Vec<u8>,
}

/// Function signature
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeEntry {
    /// Parameter types in order
    pub params: Vec<ValueType>,
    /// Result types in order
    pub returns: Vec<ValueType>,
}

impl core::fmt::Display for TypeEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let join = |types: &[ValueType]| types.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        write!(f, "({}) -> ({})", join(&self.params), join(&self.returns))
    }
}

/// An imported item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    /// Module namespace the item is imported from
    pub module: String,
    /// Field name within that module
    pub name: String,
    /// Kind and type of the imported item
    pub desc: ImportDesc,
}

/// What an import brings in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportDesc {
    /// A function with the given type index
    Func(u32),
    /// A table of the given type
    Table(TableType),
    /// A memory with the given limits
    Memory(Limits),
    /// A global of the given type
    Global(GlobalType),
}

impl ImportDesc {
    /// External kind byte written for this descriptor
    pub fn kind(&self) -> ExternalKind {
        match self {
            ImportDesc::Func(_) => ExternalKind::Func,
            ImportDesc::Table(_) => ExternalKind::Table,
            ImportDesc::Memory(_) => ExternalKind::Memory,
            ImportDesc::Global(_) => ExternalKind::Global,
        }
    }
}

/// An initializer expression in both raw and evaluated form.
///
/// `bytes` include the terminating `end` and are what the encoder writes.
/// `value` is what the expression evaluated to at decode time; editing it
/// alone does not change the encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstExpr {
    /// Encoded instructions, terminating `end` included
    pub bytes: Vec<u8>,
    /// Result of evaluating `bytes` during decode
    pub value: Option<Value>,
}

impl ConstExpr {
    /// `i32.const value; end`, already evaluated
    pub fn i32(value: i32) -> Self {
        let mut bytes = vec![wasmlens_format::binary_constants::I32_CONST];
        wasmlens_format::leb128::write_leb128_i32(value, &mut bytes);
        bytes.push(wasmlens_format::binary_constants::END);
        Self { bytes, value: Some(Value::I32(value)) }
    }
}

/// A defined global
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalEntry {
    /// Value type and mutability
    pub global_type: GlobalType,
    /// Initializer expression
    pub init: ConstExpr,
}

/// An exported item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    /// Export name
    pub name: String,
    /// Index space `index` refers to
    pub kind: ExternalKind,
    /// Index within the space of `kind`, imports first
    pub index: u32,
}

/// Run of `count` locals sharing one type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalDecl {
    /// Number of locals declared
    pub count: u32,
    /// Their shared type
    pub value_type: ValueType,
}

/// A function body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeEntry {
    /// Local declarations, parameters excluded
    pub locals: Vec<LocalDecl>,
    /// Instruction bytes, including the final `end`
    pub body: Vec<u8>,
    /// Encoded width of the entry size when it was padded past its
    /// minimal form; `None` writes the minimal form
    pub size_width: Option<usize>,
}

/// An active data segment
#[derive(Debug, Clone, PartialEq)]
pub struct DataEntry {
    /// Target memory; always 0 for segments read from a binary
    pub memory_index: u32,
    /// Offset expression
    pub offset: ConstExpr,
    /// Bytes copied into memory
    pub init: Vec<u8>,
}

/// A function index resolved against the import, function, type and code
/// sections
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionRef<'a> {
    /// Index in the function index space
    pub index: u32,
    /// Declared type index
    pub type_index: u32,
    /// The type entry at `type_index`, if it exists
    pub signature: Option<&'a TypeEntry>,
    /// Body of a defined function; `None` for imports
    pub body: Option<&'a CodeEntry>,
    /// The import entry of an imported function
    pub import: Option<&'a ImportEntry>,
}

impl FunctionRef<'_> {
    /// Whether the function comes from the import section
    pub fn is_imported(&self) -> bool {
        self.import.is_some()
    }
}

macro_rules! section_accessors {
    ($($get:ident, $get_mut:ident, $variant:ident, $item:ty;)*) => {
        $(
            #[doc = concat!("Entries of the first ", stringify!($variant), " section, empty when absent")]
            pub fn $get(&self) -> &[$item] {
                self.sections
                    .iter()
                    .find_map(|s| match s {
                        Section::$variant(items) => Some(items.as_slice()),
                        _ => None,
                    })
                    .unwrap_or(&[])
            }

            #[doc = concat!("Mutable entries of the first ", stringify!($variant), " section")]
            pub fn $get_mut(&mut self) -> Option<&mut Vec<$item>> {
                self.sections.iter_mut().find_map(|s| match s {
                    Section::$variant(items) => Some(items),
                    _ => None,
                })
            }
        )*
    };
}

impl Module {
    /// Empty module; encodes to just the header
    pub fn new() -> Self {
        Self::default()
    }

    /// First section of the given kind
    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| s.id() == id as u8)
    }

    /// Mutable access to the first section of the given kind
    pub fn section_mut(&mut self, id: SectionId) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.id() == id as u8)
    }

    /// Look a section up by kind name, ignoring case. Names that are not a
    /// section kind match custom sections by their own name.
    pub fn section_by_name(&self, name: &str) -> Option<&Section> {
        match SectionId::from_name(name) {
            Some(id) => self.section(id),
            None => self.sections.iter().find(|s| matches!(s, Section::Custom(c) if c.name == name)),
        }
    }

    /// Width to write the size prefix of the section at `index` with, if
    /// it was padded when read
    pub fn size_width(&self, index: usize) -> Option<usize> {
        let id = self.sections.get(index)?.id();
        self.padded_sizes
            .iter()
            .find(|p| p.section == index && p.id == id)
            .map(|p| p.width)
    }

    /// All custom sections in order
    pub fn custom_sections(&self) -> impl Iterator<Item = &CustomSection> {
        self.sections.iter().filter_map(|s| match s {
            Section::Custom(custom) => Some(custom),
            _ => None,
        })
    }

    section_accessors! {
        types, types_mut, Type, TypeEntry;
        imports, imports_mut, Import, ImportEntry;
        functions, functions_mut, Function, u32;
        tables, tables_mut, Table, TableType;
        memories, memories_mut, Memory, Limits;
        globals, globals_mut, Global, GlobalEntry;
        exports, exports_mut, Export, ExportEntry;
        code, code_mut, Code, CodeEntry;
        data, data_mut, Data, DataEntry;
    }

    /// Index of the start function, if declared
    pub fn start(&self) -> Option<u32> {
        self.sections.iter().find_map(|s| match s {
            Section::Start(index) => Some(*index),
            _ => None,
        })
    }

    /// Number of imports of the given kind
    pub fn imported_count(&self, kind: ExternalKind) -> usize {
        self.imports().iter().filter(|i| i.desc.kind() == kind).count()
    }

    /// Imported functions come first in the function index space
    pub fn imported_function_count(&self) -> usize {
        self.imported_count(ExternalKind::Func)
    }

    /// Size of the function index space
    pub fn function_count(&self) -> usize {
        self.imported_function_count() + self.functions().len()
    }

    /// Resolve a function index to its signature and body
    pub fn resolve_function(&self, index: u32) -> Result<FunctionRef<'_>> {
        let imported = self.imported_function_count();
        let position = index as usize;

        if position < imported {
            let import = self
                .imports()
                .iter()
                .filter(|i| i.desc.kind() == ExternalKind::Func)
                .nth(position)
                .ok_or_else(|| Error::invalid_function_index("Function index out of range"))?;
            let ImportDesc::Func(type_index) = import.desc else {
                return Err(Error::invalid_function_index("Function index out of range"));
            };
            return Ok(FunctionRef {
                index,
                type_index,
                signature: self.types().get(type_index as usize),
                body: None,
                import: Some(import),
            });
        }

        let defined = position - imported;
        let type_index = *self
            .functions()
            .get(defined)
            .ok_or_else(|| Error::invalid_function_index("Function index out of range"))?;
        Ok(FunctionRef {
            index,
            type_index,
            signature: self.types().get(type_index as usize),
            body: self.code().get(defined),
            import: None,
        })
    }

    /// Every function export with its resolved function
    pub fn function_exports(&self) -> Vec<(&ExportEntry, Result<FunctionRef<'_>>)> {
        self.exports()
            .iter()
            .filter(|e| e.kind == ExternalKind::Func)
            .map(|e| (e, self.resolve_function(e.index)))
            .collect()
    }

    /// Evaluated value of every global in index order, imports first.
    /// Imported globals read as the zero value of their type.
    pub fn global_values(&self) -> Vec<Option<Value>> {
        self.imports()
            .iter()
            .filter_map(|i| match i.desc {
                ImportDesc::Global(global_type) => Some(Value::zero(global_type.value_type)),
                _ => None,
            })
            .chain(self.globals().iter().map(|g| g.init.value))
            .collect()
    }

    /// Initial limits of memory 0, imported or defined
    pub fn memory_limits(&self) -> Option<Limits> {
        self.imports()
            .iter()
            .find_map(|i| match i.desc {
                ImportDesc::Memory(limits) => Some(limits),
                _ => None,
            })
            .or_else(|| self.memories().first().copied())
    }

    /// Contents of memory 0 after applying every data segment at its
    /// evaluated offset. The image ends at the last initialised byte; gaps
    /// are zero.
    pub fn initial_memory(&self) -> Result<Vec<u8>> {
        let mut image = Vec::new();
        let segments: Vec<&DataEntry> = self.data().iter().filter(|d| d.memory_index == 0).collect();
        if segments.is_empty() {
            return Ok(image);
        }

        let limits = self
            .memory_limits()
            .ok_or_else(|| Error::validation_error("Data segment targets a module without memory"))?;
        let capacity = (limits.min as usize).saturating_mul(PAGE_SIZE);

        for segment in segments {
            let offset = segment
                .offset
                .value
                .and_then(|v| v.as_offset())
                .ok_or_else(|| Error::type_mismatch("Data offset is not an integer"))?;
            let start = usize::try_from(offset)
                .map_err(|_| Error::validation_error("Data segment outside initial memory"))?;
            let end = start
                .checked_add(segment.init.len())
                .filter(|&end| end <= capacity)
                .ok_or_else(|| Error::validation_error("Data segment outside initial memory"))?;
            if image.len() < end {
                image.resize(end, 0);
            }
            image[start..end].copy_from_slice(&segment.init);
        }
        Ok(image)
    }
}
