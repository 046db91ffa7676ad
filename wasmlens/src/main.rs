//! # WasmLens
//!
//! Command-line inspector for module binaries.
//!
//! ## Usage
//!
//! ```bash
//! wasmlens sections <file>
//! wasmlens inspect <file> --offset <n>
//! wasmlens dump <file> [--offset <n>] [--length <n>]
//! wasmlens roundtrip <file> [--output <path>]
//! wasmlens validate <file>
//! wasmlens run <file> --func <index> [args...]
//! wasmlens splice <file> --at <n> --hex <bytes> --output <path>
//! ```
//!
//! Offsets accept decimal or `0x`-prefixed hex. Diagnostics go to stderr,
//! filtered by `RUST_LOG` and formatted by `RUST_LOG_FORMAT`
//! (`pretty`, `compact` or `json`).

#![warn(missing_docs)]

use std::{
    env, fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use wasmlens_decoder::{encode_module, EvalContext, Interpreter, Module, ModuleCodec, Section, Value, ValueType};

const DUMP_COLUMNS: usize = 16;

/// Module binary inspector
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List top-level sections with their offsets and sizes
    Sections {
        /// Module file to read
        file: PathBuf,
    },
    /// Show every annotated range covering a byte
    Inspect {
        file: PathBuf,
        /// Byte offset to look up
        #[arg(short, long, value_parser = parse_number)]
        offset: usize,
    },
    /// Hex dump a region of the file
    Dump {
        file: PathBuf,
        #[arg(short, long, value_parser = parse_number, default_value = "0")]
        offset: usize,
        /// Number of bytes; defaults to the rest of the file
        #[arg(short, long, value_parser = parse_number)]
        length: Option<usize>,
    },
    /// Decode and re-encode, reporting whether the bytes are unchanged
    Roundtrip {
        file: PathBuf,
        /// Write the re-encoded module here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run cross-section consistency checks
    Validate { file: PathBuf },
    /// Step a function through the interpreter
    Run {
        file: PathBuf,
        /// Function index, imports included
        #[arg(short, long)]
        func: u32,
        /// Arguments, parsed according to the function's parameter types
        #[arg(allow_negative_numbers = true)]
        args: Vec<String>,
    },
    /// Insert raw bytes at an offset, bypassing the decoded model
    Splice {
        file: PathBuf,
        /// Offset to insert at
        #[arg(long, value_parser = parse_number)]
        at: usize,
        /// Bytes to insert, as hex
        #[arg(long)]
        hex: String,
        /// Where to write the result
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    initialize_tracing();
    let args = Args::parse();

    match execute(args.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing system, bridging `log` records from the codec crates
fn initialize_tracing() {
    let format = env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match format.as_str() {
        "json" => subscriber.json().init(),
        "compact" => subscriber.compact().init(),
        _ => subscriber.pretty().init(),
    }
}

fn execute(command: Command) -> Result<ExitCode> {
    match command {
        Command::Sections { file } => sections(&file),
        Command::Inspect { file, offset } => inspect(&file, offset),
        Command::Dump { file, offset, length } => dump(&file, offset, length),
        Command::Roundtrip { file, output } => roundtrip(&file, output.as_deref()),
        Command::Validate { file } => validate(&file),
        Command::Run { file, func, args } => run(&file, func, &args),
        Command::Splice { file, at, hex, output } => splice(&file, at, &hex, &output),
    }
}

fn parse_number(text: &str) -> Result<usize, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("invalid number `{text}`: {e}"))
}

fn load(file: &Path) -> Result<ModuleCodec> {
    let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    info!(path = %file.display(), size = bytes.len(), "loaded module");
    Ok(ModuleCodec::new(bytes))
}

fn decode(codec: &mut ModuleCodec, file: &Path) -> Result<Module> {
    codec.decode().with_context(|| format!("Failed to decode {}", file.display()))
}

fn sections(file: &Path) -> Result<ExitCode> {
    let mut codec = load(file)?;
    let module = decode(&mut codec, file)?;
    let ranges = codec.annotations().top_level().filter(|r| r.label.as_deref() == Some("Section"));

    println!("{:>10}  {:>8}  {:<10} entries", "offset", "size", "kind");
    for (range, section) in ranges.zip(&module.sections) {
        let entries = section.entry_count().map_or_else(|| "-".to_string(), |n| n.to_string());
        let kind = match section {
            Section::Custom(custom) => format!("Custom \"{}\"", custom.name),
            Section::Opaque { id, .. } if section.section_id().is_none() => format!("id {id}"),
            _ => section.name().to_string(),
        };
        println!("{:#010x}  {:>8}  {:<10} {}", range.start, range.len, kind, entries);
    }
    Ok(ExitCode::SUCCESS)
}

fn inspect(file: &Path, offset: usize) -> Result<ExitCode> {
    let mut codec = load(file)?;
    if offset >= codec.bytes().len() {
        bail!("offset {offset:#x} is past the end of the file ({} bytes)", codec.bytes().len());
    }
    if let Err(e) = codec.decode() {
        warn!("decode failed, showing partial annotations: {e}");
        println!("decode failed: {e}");
    }

    let hits = codec.annotations().query(offset);
    if hits.is_empty() {
        println!("no annotation covers {offset:#x}");
    }
    for range in hits {
        let end = range.end().unwrap_or(range.start);
        println!(
            "{:indent$}{:#08x}..={:#08x} ({:>4} bytes)  {}",
            "",
            range.start,
            end,
            range.len,
            range,
            indent = range.depth * 2
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn dump(file: &Path, offset: usize, length: Option<usize>) -> Result<ExitCode> {
    let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let start = offset.min(bytes.len());
    let end = length.map_or(bytes.len(), |len| start.saturating_add(len).min(bytes.len()));
    for line in hex_dump(&bytes[start..end], start) {
        println!("{line}");
    }
    Ok(ExitCode::SUCCESS)
}

/// Format `bytes` as 16-column hex dump lines addressed from `base`
fn hex_dump(bytes: &[u8], base: usize) -> Vec<String> {
    bytes
        .chunks(DUMP_COLUMNS)
        .enumerate()
        .map(|(row, chunk)| {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
            let ascii: String = chunk
                .iter()
                .map(|&b| if b.is_ascii_graphic() || b == b' ' { char::from(b) } else { '.' })
                .collect();
            format!("{:08x}  {:<width$}  |{}|", base + row * DUMP_COLUMNS, hex.join(" "), ascii, width = DUMP_COLUMNS * 3 - 1)
        })
        .collect()
}

fn roundtrip(file: &Path, output: Option<&Path>) -> Result<ExitCode> {
    let mut codec = load(file)?;
    let module = decode(&mut codec, file)?;
    let encoded = encode_module(&module);

    let original = codec.bytes();
    match original.iter().zip(&encoded).position(|(a, b)| a != b) {
        None if original.len() == encoded.len() => println!("identical: {} bytes", encoded.len()),
        None => println!(
            "differs: lengths {} and {} share a common prefix",
            original.len(),
            encoded.len()
        ),
        Some(at) => println!("differs: first difference at {at:#x}"),
    }

    if let Some(path) = output {
        fs::write(path, &encoded).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(path = %path.display(), "wrote re-encoded module");
    }
    Ok(ExitCode::SUCCESS)
}

fn validate(file: &Path) -> Result<ExitCode> {
    let mut codec = load(file)?;
    let module = decode(&mut codec, file)?;
    let issues = module.validate();
    if issues.is_empty() {
        println!("ok");
        return Ok(ExitCode::SUCCESS);
    }
    for issue in &issues {
        println!("{issue}");
    }
    Ok(ExitCode::FAILURE)
}

fn parse_arg(text: &str, value_type: ValueType) -> Result<Value> {
    let value = match value_type {
        ValueType::I32 => Value::I32(text.parse()?),
        ValueType::I64 => Value::I64(text.parse()?),
        ValueType::F32 => Value::F32(text.parse()?),
        ValueType::F64 => Value::F64(text.parse()?),
        other => bail!("cannot pass a {other} argument"),
    };
    Ok(value)
}

fn run(file: &Path, func: u32, args: &[String]) -> Result<ExitCode> {
    let mut codec = load(file)?;
    let module = decode(&mut codec, file)?;
    let function = module.resolve_function(func)?;
    let signature = function
        .signature
        .ok_or_else(|| anyhow!("function {func} has an unknown type {}", function.type_index))?;
    let body = function
        .body
        .ok_or_else(|| anyhow!("function {func} is imported and has no body"))?;
    if args.len() != signature.params.len() {
        bail!("function {func} takes {} arguments, got {}", signature.params.len(), args.len());
    }
    let values = args
        .iter()
        .zip(&signature.params)
        .map(|(text, &ty)| parse_arg(text, ty).with_context(|| format!("invalid {ty} argument `{text}`")))
        .collect::<Result<Vec<_>>>()?;

    let mut globals = EvalContext::with_globals(module.global_values().into_iter().flatten().collect());
    let mut interpreter = Interpreter::for_function(body, signature, &values, &mut globals)?;
    println!("function {func}: {signature}");
    while let Some(step) = interpreter.step()? {
        let stack: Vec<String> = interpreter.stack().iter().map(ToString::to_string).collect();
        println!("{:#06x}  {:<20} [{}]", step.offset, step.instruction.to_string(), stack.join(", "));
    }
    match interpreter.stack().last() {
        Some(value) => println!("result: {value}"),
        None => println!("result: none"),
    }
    Ok(ExitCode::SUCCESS)
}

fn splice(file: &Path, at: usize, hex_bytes: &str, output: &Path) -> Result<ExitCode> {
    let mut codec = load(file)?;
    let bytes = hex::decode(hex_bytes.replace([' ', '_'], "")).context("Invalid hex byte string")?;
    codec.splice(&bytes, at)?;
    match codec.decode() {
        Ok(module) => println!("spliced {} bytes at {at:#x}; module decodes with {} sections", bytes.len(), module.sections.len()),
        Err(e) => println!("spliced {} bytes at {at:#x}; module no longer decodes: {e}", bytes.len()),
    }
    fs::write(output, codec.bytes()).with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("16"), Ok(16));
        assert_eq!(parse_number("0x10"), Ok(16));
        assert!(parse_number("ten").is_err());
    }

    #[test]
    fn test_hex_dump_layout() {
        let lines = hex_dump(b"\0asm\x01\0\0\0", 0);
        assert_eq!(lines, vec![format!("00000000  00 61 73 6d 01 00 00 00{}  |.asm....|", " ".repeat(24))]);
    }

    #[test]
    fn test_parse_arg() {
        assert_eq!(parse_arg("-5", ValueType::I32).unwrap(), Value::I32(-5));
        assert_eq!(parse_arg("1.5", ValueType::F64).unwrap(), Value::F64(1.5));
        assert!(parse_arg("x", ValueType::I64).is_err());
    }
}
