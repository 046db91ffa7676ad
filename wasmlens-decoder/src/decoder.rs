//! Module decoding.
//!
//! [`ModuleCodec`] owns the buffer being inspected (through a
//! [`ByteCursor`]) together with the [`AnnotationIndex`] describing it. A
//! decode rebuilds the annotations from scratch; every byte of a
//! successfully decoded buffer ends up inside at least one range.
//!
//! Item counts are checked against the bytes left in their section before
//! any item is read, and each section must consume exactly its declared
//! length. Initializer expressions are evaluated against the globals read
//! so far in the same decode; that context does not outlive the call.

use core::fmt;

use log::{debug, warn};
use wasmlens_error::{Error, Result};
use wasmlens_format::{
    binary_constants::{
        FUNC_TYPE_FORM, GLOBAL_CONST, GLOBAL_MUT, LIMITS_HAS_MAX, LIMITS_NO_MAX, MAX_MODULE_SIZE,
        WASM_MAGIC_U32, WASM_VERSION,
    },
    leb128, AnnotationIndex, ByteCursor, ExternalKind, GlobalType, Limits, RangeHandle, SectionId,
    TableType, Value, ValueType,
};

use crate::{
    const_expr::{evaluate, EvalContext},
    module::{
        CodeEntry, ConstExpr, CustomSection, DataEntry, ExportEntry, GlobalEntry, ImportDesc,
        ImportEntry, LocalDecl, Module, PaddedSize, Section, TypeEntry,
    },
};

// Smallest encodings of one item, used to reject impossible counts early
const MIN_TYPE_ENTRY: usize = 3;
const MIN_VALUE_TYPE: usize = 1;
const MIN_IMPORT_ENTRY: usize = 4;
const MIN_FUNCTION_ENTRY: usize = 1;
const MIN_TABLE_ENTRY: usize = 3;
const MIN_MEMORY_ENTRY: usize = 2;
const MIN_GLOBAL_ENTRY: usize = 3;
const MIN_EXPORT_ENTRY: usize = 3;
const MIN_CODE_ENTRY: usize = 2;
const MIN_LOCAL_DECL: usize = 2;
const MIN_DATA_ENTRY: usize = 3;

/// Codec settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Record byte-range annotations while decoding
    pub annotate: bool,
    /// Largest buffer accepted by [`ModuleCodec::decode`]
    pub max_module_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self { annotate: true, max_module_size: MAX_MODULE_SIZE }
    }
}

/// Decoder/encoder bound to one buffer
#[derive(Debug, Clone, Default)]
pub struct ModuleCodec {
    pub(crate) cursor: ByteCursor,
    pub(crate) annotations: AnnotationIndex,
    config: CodecConfig,
}

impl ModuleCodec {
    /// Codec over `bytes` with the default configuration
    pub fn new(bytes: Vec<u8>) -> Self {
        Self::with_config(bytes, CodecConfig::default())
    }

    /// Codec over `bytes` with explicit settings
    pub fn with_config(bytes: Vec<u8>, config: CodecConfig) -> Self {
        Self { cursor: ByteCursor::new(bytes), annotations: AnnotationIndex::new(), config }
    }

    /// Settings this codec was created with
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// The buffer the next decode will read
    pub fn bytes(&self) -> &[u8] {
        self.cursor.bytes()
    }

    /// Give the buffer back, dropping the annotations
    pub fn into_bytes(self) -> Vec<u8> {
        self.cursor.into_inner()
    }

    /// Annotations from the last decode
    pub fn annotations(&self) -> &AnnotationIndex {
        &self.annotations
    }

    /// Insert raw bytes into the buffer, bypassing the model.
    ///
    /// Annotations describe the old layout afterwards and are dropped; call
    /// [`decode`](Self::decode) again to rebuild them.
    pub fn splice(&mut self, bytes: &[u8], at: usize) -> Result<()> {
        self.cursor.splice(bytes, at)?;
        self.annotations.clear();
        Ok(())
    }

    /// Decode the whole buffer.
    ///
    /// On failure no module is returned. Ranges that were open when the
    /// error occurred are closed just past the faulty byte and flagged as
    /// incomplete.
    pub fn decode(&mut self) -> Result<Module> {
        self.annotations.clear();
        self.cursor.set_position(0);

        if self.cursor.len() > self.config.max_module_size {
            return Err(Error::module_too_large("Module exceeds the configured size limit")
                .with_offset(self.config.max_module_size));
        }

        match self.decode_module() {
            Ok(module) => {
                debug_assert!(self.annotations.is_balanced());
                debug!("decoded {} sections from {} bytes", module.sections.len(), self.cursor.len());
                Ok(module)
            }
            Err(error) => {
                let error = error.with_offset(self.cursor.position());
                let fault = error.offset.unwrap_or_default();
                self.annotations.abandon_open((fault + 1).min(self.cursor.len()));
                debug!("decode failed: {error}");
                Err(error)
            }
        }
    }

    fn decode_module(&mut self) -> Result<Module> {
        let magic = self.field("magic", ByteCursor::read_u32_le)?;
        if magic != WASM_MAGIC_U32 {
            return Err(Error::bad_magic("Invalid magic number").with_offset(0));
        }
        let version = self.field("version", ByteCursor::read_u32_le)?;
        if version != WASM_VERSION {
            return Err(Error::unsupported_version("Unsupported binary version").with_offset(4));
        }

        let mut globals = EvalContext::new();
        let mut module = Module::new();
        while !self.cursor.is_eof() {
            let (section, size_width) = self.decode_section(&mut globals)?;
            if let Some(width) = size_width {
                module.padded_sizes.push(PaddedSize { section: module.sections.len(), id: section.id(), width });
            }
            module.sections.push(section);
        }
        Ok(module)
    }

    /// Decode one section. Also returns the width of its size prefix when
    /// that prefix was longer than its minimal encoding.
    fn decode_section(&mut self, globals: &mut EvalContext) -> Result<(Section, Option<usize>)> {
        let start = self.cursor.position();
        let range = self.begin("Section");
        let id = self.field("id", ByteCursor::read_u8)?;
        let (size, size_width) = self.size_prefix("size")?;

        let payload_start = self.cursor.position();
        let end = payload_start
            .checked_add(size)
            .filter(|&end| end <= self.cursor.len())
            .ok_or_else(|| {
                Error::out_of_data("Section extends past end of buffer").with_offset(self.cursor.len())
            })?;

        let section = match SectionId::from_u8(id) {
            Some(SectionId::Custom) => self.decode_custom(end)?,
            Some(SectionId::Type) => {
                Section::Type(self.decode_vec(end, MIN_TYPE_ENTRY, |c, i| c.decode_type_entry(i, end))?)
            }
            Some(SectionId::Import) => Section::Import(
                self.decode_vec(end, MIN_IMPORT_ENTRY, |c, i| c.decode_import_entry(i, globals))?,
            ),
            Some(SectionId::Function) => Section::Function(self.decode_vec(end, MIN_FUNCTION_ENTRY, |c, _| {
                c.field("type index", ByteCursor::read_var_u32)
            })?),
            Some(SectionId::Table) => {
                Section::Table(self.decode_vec(end, MIN_TABLE_ENTRY, |c, _| c.decode_table_type())?)
            }
            Some(SectionId::Memory) => {
                Section::Memory(self.decode_vec(end, MIN_MEMORY_ENTRY, |c, _| c.decode_limits())?)
            }
            Some(SectionId::Global) => Section::Global(
                self.decode_vec(end, MIN_GLOBAL_ENTRY, |c, i| c.decode_global_entry(i, end, globals))?,
            ),
            Some(SectionId::Export) => {
                Section::Export(self.decode_vec(end, MIN_EXPORT_ENTRY, Self::decode_export_entry)?)
            }
            Some(SectionId::Start) => Section::Start(self.field("function index", ByteCursor::read_var_u32)?),
            Some(SectionId::Code) => Section::Code(self.decode_vec(end, MIN_CODE_ENTRY, Self::decode_code_entry)?),
            Some(SectionId::Data) if self.has_unsupported_segments(end, globals) => {
                debug!("keeping Data section raw: segment encoding other than active memory 0");
                self.decode_opaque(id, end)?
            }
            Some(SectionId::Data) => Section::Data(
                self.decode_vec(end, MIN_DATA_ENTRY, |c, i| c.decode_data_entry(i, end, globals))?,
            ),
            Some(kind @ (SectionId::Element | SectionId::DataCount)) => {
                debug!("keeping {kind} section raw");
                self.decode_opaque(id, end)?
            }
            None => {
                warn!("unknown section id {id} at {start:#x}, keeping it raw");
                self.decode_opaque(id, end)?
            }
        };

        if self.cursor.position() != end {
            return Err(Error::section_length_mismatch("Section size does not match its contents")
                .with_offset(self.cursor.position().min(end)));
        }

        let name = section.name();
        self.end(range, || name.to_string());
        debug!("{name} section at {start:#x}: {size} payload bytes");
        Ok((section, size_width))
    }

    /// Read a size prefix, returning the size and, when the prefix was
    /// padded, its width
    fn size_prefix(&mut self, label: &'static str) -> Result<(usize, Option<usize>)> {
        let at = self.cursor.position();
        let size = self.field(label, ByteCursor::read_var_u32)?;
        let width = self.cursor.position() - at;
        let padded = (width > leb128::leb128_u32_len(size)).then_some(width);
        Ok((size as usize, padded))
    }

    /// Whether any data segment uses an encoding other than the active,
    /// memory 0 form the model holds. Malformed segments report `false` and
    /// are left to the regular decode to diagnose.
    fn has_unsupported_segments(&self, end: usize, globals: &EvalContext) -> bool {
        let bytes = self.cursor.bytes();
        let bytes = bytes.get(..end).unwrap_or(bytes);
        let mut scratch = globals.clone();
        let Ok((count, len)) = leb128::read_leb128_u32(bytes, self.cursor.position()) else {
            return false;
        };
        let mut at = self.cursor.position() + len;
        for _ in 0..count {
            let Ok((flag, len)) = leb128::read_leb128_u32(bytes, at) else {
                return false;
            };
            if flag != 0 {
                return true;
            }
            let Ok(offset) = evaluate(bytes, at + len, &[], &mut scratch) else {
                return false;
            };
            at += len + offset.consumed;
            let Ok((size, len)) = leb128::read_leb128_u32(bytes, at) else {
                return false;
            };
            at = at.saturating_add(len).saturating_add(size as usize);
        }
        false
    }

    /// Read a count, reject it if `min_item` bytes per item cannot fit before
    /// `end`, then read that many items
    fn decode_vec<T, F>(&mut self, end: usize, min_item: usize, mut item: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self, usize) -> Result<T>,
    {
        let at = self.cursor.position();
        let count = self.field("count", ByteCursor::read_var_u32)? as usize;
        let available = end.saturating_sub(self.cursor.position());
        if count.saturating_mul(min_item) > available {
            return Err(Error::malformed_count("Item count cannot fit in the remaining bytes").with_offset(at));
        }

        let mut items = Vec::with_capacity(count);
        for index in 0..count {
            items.push(item(self, index)?);
        }
        Ok(items)
    }

    fn decode_custom(&mut self, end: usize) -> Result<Section> {
        let name = self.field("name", ByteCursor::read_name)?;
        let range = self.begin("payload");
        let payload = self.cursor.read_bytes(end.saturating_sub(self.cursor.position()))?;
        self.end(range, || format!("{} bytes", payload.len()));
        Ok(Section::Custom(CustomSection { name, payload }))
    }

    fn decode_opaque(&mut self, id: u8, end: usize) -> Result<Section> {
        let range = self.begin("raw");
        let bytes = self.cursor.read_bytes(end - self.cursor.position())?;
        self.end(range, || format!("{} bytes", bytes.len()));
        Ok(Section::Opaque { id, bytes })
    }

    fn decode_type_entry(&mut self, index: usize, end: usize) -> Result<TypeEntry> {
        let range = self.begin("Type entry");
        let at = self.cursor.position();
        let form = self.field("form", ByteCursor::read_u8)?;
        if form != FUNC_TYPE_FORM {
            return Err(Error::invalid_tag("Type entry is not a function type").with_offset(at));
        }
        let params_range = self.begin("params");
        let params = self.decode_vec(end, MIN_VALUE_TYPE, |c, _| c.value_type("param"))?;
        self.end(params_range, || type_list(&params));
        let returns_range = self.begin("returns");
        let returns = self.decode_vec(end, MIN_VALUE_TYPE, |c, _| c.value_type("result"))?;
        self.end(returns_range, || type_list(&returns));

        let entry = TypeEntry { params, returns };
        self.end(range, || format!("{index}: {entry}"));
        Ok(entry)
    }

    fn decode_import_entry(&mut self, index: usize, globals: &mut EvalContext) -> Result<ImportEntry> {
        let range = self.begin("Import entry");
        let module = self.field("module", ByteCursor::read_name)?;
        let name = self.field("name", ByteCursor::read_name)?;
        let kind = self.tag("kind", ExternalKind::from_byte)?;
        let desc = match kind {
            ExternalKind::Func => ImportDesc::Func(self.field("type index", ByteCursor::read_var_u32)?),
            ExternalKind::Table => ImportDesc::Table(self.decode_table_type()?),
            ExternalKind::Memory => ImportDesc::Memory(self.decode_limits()?),
            ExternalKind::Global => ImportDesc::Global(self.decode_global_type()?),
        };

        if let ImportDesc::Global(global_type) = desc {
            // Imported globals have no value until instantiation
            let placeholder = Value::zero(global_type.value_type).unwrap_or(Value::I32(0));
            globals.push_global(placeholder);
        }

        self.end(range, || format!("{index}: {module}.{name} ({kind})"));
        Ok(ImportEntry { module, name, desc })
    }

    fn decode_table_type(&mut self) -> Result<TableType> {
        let element_type = self.value_type("element type")?;
        let limits = self.decode_limits()?;
        Ok(TableType { element_type, limits })
    }

    fn decode_limits(&mut self) -> Result<Limits> {
        let range = self.begin("Limits");
        let flag = self.tag("flags", |byte| match byte {
            LIMITS_NO_MAX | LIMITS_HAS_MAX => Ok(byte),
            _ => Err(Error::invalid_tag("Invalid limits flag")),
        })?;
        let min = self.field("min", ByteCursor::read_var_u32)?;
        let max = if flag == LIMITS_HAS_MAX { Some(self.field("max", ByteCursor::read_var_u32)?) } else { None };
        let limits = Limits { min, max };
        self.end(range, || limits.to_string());
        Ok(limits)
    }

    fn decode_global_type(&mut self) -> Result<GlobalType> {
        let value_type = self.value_type("value type")?;
        let mutable = self.tag("mutable", |byte| match byte {
            GLOBAL_CONST => Ok(false),
            GLOBAL_MUT => Ok(true),
            _ => Err(Error::invalid_tag("Invalid global mutability flag")),
        })?;
        Ok(GlobalType { value_type, mutable })
    }

    fn decode_global_entry(&mut self, index: usize, end: usize, globals: &mut EvalContext) -> Result<GlobalEntry> {
        let range = self.begin("Global entry");
        let global_type = self.decode_global_type()?;
        let init = self.decode_const_expr("init expr", end, globals)?;
        globals.extend(init.value);
        self.end(range, || format!("{index}: {}", global_type.value_type));
        Ok(GlobalEntry { global_type, init })
    }

    fn decode_export_entry(&mut self, index: usize) -> Result<ExportEntry> {
        let range = self.begin("Export entry");
        let name = self.field("name", ByteCursor::read_name)?;
        let kind = self.tag("kind", ExternalKind::from_byte)?;
        let target = self.field("index", ByteCursor::read_var_u32)?;
        self.end(range, || format!("{index}: {name} -> {kind} {target}"));
        Ok(ExportEntry { name, kind, index: target })
    }

    fn decode_code_entry(&mut self, index: usize) -> Result<CodeEntry> {
        let range = self.begin("Code entry");
        let (size, size_width) = self.size_prefix("entry size")?;
        let body_start = self.cursor.position();
        let body_end = body_start
            .checked_add(size)
            .filter(|&end| end <= self.cursor.len())
            .ok_or_else(|| Error::out_of_data("Function body extends past end of buffer").with_offset(self.cursor.len()))?;

        let locals_range = self.begin("Locals");
        let locals = self.decode_vec(body_end, MIN_LOCAL_DECL, |c, _| {
            let count = c.field("local count", ByteCursor::read_var_u32)?;
            let value_type = c.value_type("local type")?;
            Ok(LocalDecl { count, value_type })
        })?;
        self.end(locals_range, || format!("{} declarations", locals.len()));

        let Some(body_len) = body_end.checked_sub(self.cursor.position()) else {
            return Err(Error::section_length_mismatch("Local declarations overrun the function body")
                .with_offset(body_end));
        };
        let body_range = self.begin("body");
        let body = self.cursor.read_bytes(body_len)?;
        self.end(body_range, || format!("{body_len} bytes"));

        self.end(range, || format!("function body {index}"));
        Ok(CodeEntry { locals, body, size_width })
    }

    fn decode_data_entry(&mut self, index: usize, end: usize, globals: &mut EvalContext) -> Result<DataEntry> {
        let range = self.begin("Data entry");
        let memory_index = self.field("memory index", ByteCursor::read_var_u32)?;
        let at = self.cursor.position();
        let offset = self.decode_const_expr("offset expr", end, globals)?;
        if offset.value.and_then(|v| v.as_offset()).is_none() {
            return Err(Error::type_mismatch("Data segment offset is not an integer").with_offset(at));
        }
        let init = self.field("init", |c| c.read_byte_vec().map(ByteCount))?.0;
        self.end(range, || format!("{index}: {} bytes", init.len()));
        Ok(DataEntry { memory_index, offset, init })
    }

    /// Evaluate the initializer at the cursor and keep its raw bytes. The
    /// expression must end before `end`, the end of its section.
    fn decode_const_expr(&mut self, label: &'static str, end: usize, globals: &mut EvalContext) -> Result<ConstExpr> {
        let range = self.begin(label);
        let start = self.cursor.position();
        let bytes = self.cursor.bytes();
        let evaluation = evaluate(bytes.get(..end).unwrap_or(bytes), start, &[], globals)?;
        let value = evaluation
            .value
            .ok_or_else(|| Error::stack_underflow("Initializer expression left no value").with_offset(start))?;
        let bytes = self.cursor.read_bytes(evaluation.consumed)?;
        self.end(range, || value.to_string());
        Ok(ConstExpr { bytes, value: Some(value) })
    }

    fn value_type(&mut self, label: &'static str) -> Result<ValueType> {
        self.tag(label, ValueType::from_byte)
    }

    /// Read one tag byte and map it, pinning parse errors to the byte
    fn tag<T, F>(&mut self, label: &'static str, parse: F) -> Result<T>
    where
        T: fmt::Debug,
        F: FnOnce(u8) -> Result<T>,
    {
        let at = self.cursor.position();
        self.field(label, |c| {
            let byte = c.read_u8()?;
            parse(byte).map(Debugged).map_err(|e| e.with_offset(at))
        })
        .map(|d| d.0)
    }

    /// Read one field and record it as a range labeled `label`
    fn field<T, F>(&mut self, label: &'static str, read: F) -> Result<T>
    where
        T: fmt::Display,
        F: FnOnce(&mut ByteCursor) -> Result<T>,
    {
        let range = self.begin(label);
        let value = read(&mut self.cursor)?;
        self.end(range, || value.to_string());
        Ok(value)
    }

    fn begin(&mut self, label: &'static str) -> Option<RangeHandle> {
        self.config
            .annotate
            .then(|| self.annotations.open(self.cursor.position(), Some(label)))
    }

    fn end<F: FnOnce() -> String>(&mut self, range: Option<RangeHandle>, describe: F) {
        if let Some(handle) = range {
            self.annotations.close(handle, self.cursor.position(), Some(describe()), None);
        }
    }
}

/// Renders a tag through its `Debug` form in annotations
struct Debugged<T>(T);

impl<T: fmt::Debug> fmt::Display for Debugged<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Renders a byte vector by its length in annotations
struct ByteCount(Vec<u8>);

impl fmt::Display for ByteCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes", self.0.len())
    }
}

fn type_list(types: &[ValueType]) -> String {
    let names: Vec<String> = types.iter().map(ToString::to_string).collect();
    format!("[{}]", names.join(", "))
}

/// Decode `bytes` without keeping annotations
pub fn decode_module(bytes: &[u8]) -> Result<Module> {
    let config = CodecConfig { annotate: false, ..CodecConfig::default() };
    ModuleCodec::with_config(bytes.to_vec(), config).decode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmlens_error::codes;

    const HEADER: [u8; 8] = [0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];

    fn with_sections(sections: &[u8]) -> Vec<u8> {
        let mut bytes = HEADER.to_vec();
        bytes.extend_from_slice(sections);
        bytes
    }

    #[test]
    fn test_header_only() {
        let module = decode_module(&HEADER).unwrap();
        assert!(module.sections.is_empty());
    }

    #[test]
    fn test_bad_header() {
        let err = decode_module(&[0x00, 0x61, 0x73, 0x6E, 0x01, 0, 0, 0]).unwrap_err();
        assert_eq!(err.code, codes::BAD_MAGIC);
        let err = decode_module(&[0x00, 0x61, 0x73, 0x6D, 0x02, 0, 0, 0]).unwrap_err();
        assert_eq!(err.code, codes::UNSUPPORTED_VERSION);
        assert_eq!(err.offset, Some(4));
        let err = decode_module(&HEADER[..6]).unwrap_err();
        assert_eq!(err.code, codes::OUT_OF_DATA);
    }

    #[test]
    fn test_type_section() {
        let module = decode_module(&with_sections(&[0x01, 0x05, 0x01, 0x60, 0x01, 0x7F, 0x00])).unwrap();
        assert_eq!(
            module.types(),
            &[TypeEntry { params: vec![ValueType::I32], returns: vec![] }]
        );
    }

    #[test]
    fn test_invalid_value_type_points_at_byte() {
        let err = decode_module(&with_sections(&[0x01, 0x05, 0x01, 0x60, 0x01, 0x55, 0x00])).unwrap_err();
        assert_eq!(err.code, codes::INVALID_TAG);
        assert_eq!(err.offset, Some(13));
    }

    #[test]
    fn test_malformed_count_detected_eagerly() {
        let err = decode_module(&with_sections(&[0x03, 0x02, 0x7F, 0x00])).unwrap_err();
        assert_eq!(err.code, codes::MALFORMED_COUNT);
        assert_eq!(err.offset, Some(10));
    }

    #[test]
    fn test_section_length_mismatch() {
        // Function section declares 3 payload bytes but its one entry uses 2
        let err = decode_module(&with_sections(&[0x03, 0x03, 0x01, 0x00, 0x00])).unwrap_err();
        assert_eq!(err.code, codes::SECTION_LENGTH_MISMATCH);
    }

    #[test]
    fn test_section_past_end() {
        let err = decode_module(&with_sections(&[0x01, 0x09, 0x00])).unwrap_err();
        assert_eq!(err.code, codes::OUT_OF_DATA);
    }

    #[test]
    fn test_unknown_section_kept_raw() {
        let module = decode_module(&with_sections(&[0x2A, 0x02, 0xDE, 0xAD])).unwrap();
        assert_eq!(module.sections, vec![Section::Opaque { id: 0x2A, bytes: vec![0xDE, 0xAD] }]);
    }

    #[test]
    fn test_globals_feed_later_initializers() {
        let sections = [
            0x06, 0x0B, 0x02, // global section, two entries
            0x7F, 0x00, 0x41, 0x05, 0x0B, // i32 const = 5
            0x7F, 0x01, 0x23, 0x00, 0x0B, // i32 mut = global.get 0
        ];
        let module = decode_module(&with_sections(&sections)).unwrap();
        let values: Vec<_> = module.globals().iter().map(|g| g.init.value).collect();
        assert_eq!(values, vec![Some(Value::I32(5)), Some(Value::I32(5))]);
        assert_eq!(module.globals()[1].init.bytes, vec![0x23, 0x00, 0x0B]);
    }

    #[test]
    fn test_initializer_stops_at_section_end() {
        let sections = [
            0x06, 0x04, 0x01, 0x7F, 0x00, 0x41, // global whose i32.const has no immediate
            0x05, 0x03, 0x01, 0x00, 0x01, // memory section right after
        ];
        let err = decode_module(&with_sections(&sections)).unwrap_err();
        assert_eq!(err.code, codes::OUT_OF_DATA);
        assert_eq!(err.offset, Some(14));
    }

    #[test]
    fn test_repeated_decode_starts_with_no_globals() {
        let sections = [
            0x06, 0x0B, 0x02, 0x7F, 0x00, 0x41, 0x05, 0x0B, 0x7F, 0x01, 0x23, 0x00, 0x0B,
        ];
        let mut codec = ModuleCodec::new(with_sections(&sections));
        let first = codec.decode().unwrap();
        let second = codec.decode().unwrap();
        assert_eq!(first, second);
        assert_eq!(second.globals()[1].init.value, Some(Value::I32(5)));

        // global.get 0 with nothing defined before it
        let mut codec = ModuleCodec::new(with_sections(&[0x06, 0x06, 0x01, 0x7F, 0x00, 0x23, 0x00, 0x0B]));
        assert!(codec.decode().is_err());
    }

    #[test]
    fn test_data_with_other_segment_kinds_kept_raw() {
        let payload = [
            0x02, // two segments
            0x00, 0x41, 0x00, 0x0B, 0x01, 0xCC, // active, memory 0
            0x01, 0x01, 0xDD, // passive
        ];
        let mut sections = vec![0x0B, payload.len() as u8];
        sections.extend_from_slice(&payload);
        let bytes = with_sections(&sections);
        let module = decode_module(&bytes).unwrap();
        assert_eq!(module.sections, vec![Section::Opaque { id: 11, bytes: payload.to_vec() }]);
        assert!(module.data().is_empty());
        assert_eq!(crate::encode_module(&module), bytes);

        let bytes = with_sections(&[0x0B, 0x05, 0x01, 0x01, 0x02, 0xAA, 0xBB]);
        let module = decode_module(&bytes).unwrap();
        assert!(matches!(module.sections[0], Section::Opaque { id: 11, .. }));
        assert_eq!(crate::encode_module(&module), bytes);
    }

    #[test]
    fn test_active_data_still_decoded() {
        let module = decode_module(&with_sections(&[0x0B, 0x07, 0x01, 0x00, 0x41, 0x02, 0x0B, 0x01, 0xEE])).unwrap();
        assert_eq!(module.data().len(), 1);
        assert_eq!(module.data()[0].init, vec![0xEE]);
    }

    #[test]
    fn test_too_large() {
        let config = CodecConfig { annotate: false, max_module_size: 4 };
        let err = ModuleCodec::with_config(HEADER.to_vec(), config).decode().unwrap_err();
        assert_eq!(err.code, codes::MODULE_TOO_LARGE);
    }

    #[test]
    fn test_failure_leaves_incomplete_ranges() {
        let mut codec = ModuleCodec::new(with_sections(&[0x01, 0x05, 0x01, 0x61, 0x01, 0x7F, 0x00]));
        assert!(codec.decode().is_err());
        let hits = codec.annotations().query(11);
        assert!(hits.iter().any(|r| r.incomplete && r.label.as_deref() == Some("Section")));
        assert!(codec.annotations().is_balanced());
    }

    #[test]
    fn test_annotations_cover_every_byte() {
        let mut codec = ModuleCodec::new(with_sections(&[0x01, 0x05, 0x01, 0x60, 0x01, 0x7F, 0x00]));
        codec.decode().unwrap();
        for offset in 0..codec.bytes().len() {
            assert!(!codec.annotations().query(offset).is_empty(), "offset {offset}");
        }
        let top: Vec<_> = codec.annotations().top_level().map(|r| r.label.clone().unwrap()).collect();
        assert_eq!(top, vec!["magic", "version", "Section"]);
    }
}
