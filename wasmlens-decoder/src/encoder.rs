//! Module encoding.
//!
//! Encoding reads the model and never fails. Section sizes, entry counts and
//! function body sizes are recomputed from the content, so edits to the
//! model show up in the prefixes. Size prefixes that were padded in the
//! input keep their width while the new size fits. Nothing checks that the
//! result decodes: a model left inconsistent by an edit produces bytes the
//! decoder rejects.

use wasmlens_format::{
    binary_constants::{
        FUNC_TYPE_FORM, GLOBAL_CONST, GLOBAL_MUT, LIMITS_HAS_MAX, LIMITS_NO_MAX, WASM_MAGIC, WASM_VERSION,
    },
    ByteWriter, GlobalType, Limits, TableType,
};

use crate::{
    decoder::ModuleCodec,
    module::{CodeEntry, DataEntry, ImportDesc, Module, Section},
};

/// Encode a module to a fresh buffer
pub fn encode_module(module: &Module) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    writer.write_bytes(&WASM_MAGIC);
    writer.write_u32_le(WASM_VERSION);
    for (index, section) in module.sections.iter().enumerate() {
        write_section(section, module.size_width(index), &mut writer);
    }
    log::debug!("encoded {} sections into {} bytes", module.sections.len(), writer.len());
    writer.into_inner()
}

/// Append `[id][size][payload]` for one section, size in minimal form
pub fn encode_section(section: &Section, writer: &mut ByteWriter) {
    write_section(section, None, writer);
}

fn write_section(section: &Section, size_width: Option<usize>, writer: &mut ByteWriter) {
    writer.write_u8(section.id());
    writer.write_length_prefixed_padded(size_width, |w| encode_payload(section, w));
}

fn encode_payload(section: &Section, w: &mut ByteWriter) {
    match section {
        Section::Custom(custom) => {
            w.write_name(&custom.name);
            w.write_bytes(&custom.payload);
        }
        Section::Type(entries) => write_vec(w, entries, |w, entry| {
            w.write_u8(FUNC_TYPE_FORM);
            write_vec(w, &entry.params, |w, t| w.write_u8(t.to_byte()));
            write_vec(w, &entry.returns, |w, t| w.write_u8(t.to_byte()));
        }),
        Section::Import(entries) => write_vec(w, entries, |w, entry| {
            w.write_name(&entry.module);
            w.write_name(&entry.name);
            w.write_u8(entry.desc.kind().to_byte());
            match entry.desc {
                ImportDesc::Func(type_index) => w.write_var_u32(type_index),
                ImportDesc::Table(table) => write_table_type(w, table),
                ImportDesc::Memory(limits) => write_limits(w, limits),
                ImportDesc::Global(global) => write_global_type(w, global),
            }
        }),
        Section::Function(indices) => write_vec(w, indices, |w, &index| w.write_var_u32(index)),
        Section::Table(tables) => write_vec(w, tables, |w, &table| write_table_type(w, table)),
        Section::Memory(memories) => write_vec(w, memories, |w, &limits| write_limits(w, limits)),
        Section::Global(globals) => write_vec(w, globals, |w, global| {
            write_global_type(w, global.global_type);
            w.write_bytes(&global.init.bytes);
        }),
        Section::Export(exports) => write_vec(w, exports, |w, export| {
            w.write_name(&export.name);
            w.write_u8(export.kind.to_byte());
            w.write_var_u32(export.index);
        }),
        Section::Start(index) => w.write_var_u32(*index),
        Section::Code(entries) => write_vec(w, entries, write_code_entry),
        Section::Data(entries) => write_vec(w, entries, write_data_entry),
        Section::Opaque { bytes, .. } => w.write_bytes(bytes),
    }
}

fn write_vec<T>(w: &mut ByteWriter, items: &[T], mut item: impl FnMut(&mut ByteWriter, &T)) {
    w.write_var_u32(items.len() as u32);
    for entry in items {
        item(w, entry);
    }
}

fn write_limits(w: &mut ByteWriter, limits: Limits) {
    match limits.max {
        Some(max) => {
            w.write_u8(LIMITS_HAS_MAX);
            w.write_var_u32(limits.min);
            w.write_var_u32(max);
        }
        None => {
            w.write_u8(LIMITS_NO_MAX);
            w.write_var_u32(limits.min);
        }
    }
}

fn write_table_type(w: &mut ByteWriter, table: TableType) {
    w.write_u8(table.element_type.to_byte());
    write_limits(w, table.limits);
}

fn write_global_type(w: &mut ByteWriter, global: GlobalType) {
    w.write_u8(global.value_type.to_byte());
    w.write_u8(if global.mutable { GLOBAL_MUT } else { GLOBAL_CONST });
}

fn write_code_entry(w: &mut ByteWriter, entry: &CodeEntry) {
    w.write_length_prefixed_padded(entry.size_width, |body| {
        write_vec(body, &entry.locals, |body, decl| {
            body.write_var_u32(decl.count);
            body.write_u8(decl.value_type.to_byte());
        });
        body.write_bytes(&entry.body);
    });
}

fn write_data_entry(w: &mut ByteWriter, entry: &DataEntry) {
    w.write_var_u32(entry.memory_index);
    w.write_bytes(&entry.offset.bytes);
    w.write_byte_vec(&entry.init);
}

impl ModuleCodec {
    /// Encode `module`. With `replace_buffer` the result also becomes the
    /// buffer for the next [`decode`](Self::decode), and the now stale
    /// annotations are dropped.
    pub fn encode(&mut self, module: &Module, replace_buffer: bool) -> Vec<u8> {
        let bytes = encode_module(module);
        if replace_buffer {
            self.cursor.replace(bytes.clone());
            self.annotations.clear();
        }
        bytes
    }
}
