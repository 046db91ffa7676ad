//! Constant expression interpreter.
//!
//! Initializer expressions (global values, data segment offsets) are short
//! instruction sequences terminated by `end`. They are evaluated here with a
//! single operand stack over a fixed opcode set:
//!
//! `unreachable nop block loop end call local.get local.set local.tee
//! global.get global.set i32.const i64.const f32.const f64.const i32.add`
//!
//! Evaluation starts inside an implicit outer block and stops once the `end`
//! closing that block has been consumed. The value left on top of the stack
//! is the result. Function bodies using only these opcodes can be stepped
//! with [`Interpreter::for_function`].

use core::fmt;

use log::trace;
use wasmlens_error::{Error, Result};
use wasmlens_format::{binary_constants::*, leb128, ByteWriter, Value};

use crate::module::{CodeEntry, TypeEntry};

/// One decoded instruction of the supported subset
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instruction {
    /// Traps unconditionally
    Unreachable,
    Nop,
    /// `block` with its block type byte
    Block(u8),
    /// `loop` with its block type byte
    Loop(u8),
    /// Closes the innermost block
    End,
    /// Call to a function index; recorded, not executed
    Call(u32),
    /// Push a local
    LocalGet(u32),
    /// Pop into a local
    LocalSet(u32),
    /// Copy the top of the stack into a local
    LocalTee(u32),
    /// Push a global
    GlobalGet(u32),
    /// Pop into a global
    GlobalSet(u32),
    /// Push an `i32`
    I32Const(i32),
    /// Push an `i64`
    I64Const(i64),
    /// Push an `f32`
    F32Const(f32),
    /// Push an `f64`
    F64Const(f64),
    /// Wrapping `i32` addition
    I32Add,
}

impl Instruction {
    /// Decode the instruction at `offset`, returning it with its encoded size
    pub fn decode(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let Some(&opcode) = data.get(offset) else {
            return Err(Error::out_of_data("Expression ended without an end opcode").with_offset(offset));
        };
        let at = offset + 1;
        let (instruction, immediate_len) = match opcode {
            UNREACHABLE => (Instruction::Unreachable, 0),
            NOP => (Instruction::Nop, 0),
            BLOCK | LOOP => {
                let Some(&block_type) = data.get(at) else {
                    return Err(Error::out_of_data("Missing block type").with_offset(at));
                };
                if opcode == BLOCK {
                    (Instruction::Block(block_type), 1)
                } else {
                    (Instruction::Loop(block_type), 1)
                }
            }
            END => (Instruction::End, 0),
            CALL | LOCAL_GET | LOCAL_SET | LOCAL_TEE | GLOBAL_GET | GLOBAL_SET => {
                let (index, len) = leb128::read_leb128_u32(data, at)?;
                let instruction = match opcode {
                    CALL => Instruction::Call(index),
                    LOCAL_GET => Instruction::LocalGet(index),
                    LOCAL_SET => Instruction::LocalSet(index),
                    LOCAL_TEE => Instruction::LocalTee(index),
                    GLOBAL_GET => Instruction::GlobalGet(index),
                    _ => Instruction::GlobalSet(index),
                };
                (instruction, len)
            }
            I32_CONST => {
                let (value, len) = leb128::read_leb128_i32(data, at)?;
                (Instruction::I32Const(value), len)
            }
            I64_CONST => {
                let (value, len) = leb128::read_leb128_i64(data, at)?;
                (Instruction::I64Const(value), len)
            }
            F32_CONST => {
                let bytes = fixed::<4>(data, at)?;
                (Instruction::F32Const(f32::from_le_bytes(bytes)), 4)
            }
            F64_CONST => {
                let bytes = fixed::<8>(data, at)?;
                (Instruction::F64Const(f64::from_le_bytes(bytes)), 8)
            }
            I32_ADD => (Instruction::I32Add, 0),
            _ => {
                return Err(Error::unsupported_opcode("Opcode not supported by the interpreter")
                    .with_offset(offset));
            }
        };
        Ok((instruction, 1 + immediate_len))
    }

    /// The opcode byte
    pub fn opcode(&self) -> u8 {
        match self {
            Instruction::Unreachable => UNREACHABLE,
            Instruction::Nop => NOP,
            Instruction::Block(_) => BLOCK,
            Instruction::Loop(_) => LOOP,
            Instruction::End => END,
            Instruction::Call(_) => CALL,
            Instruction::LocalGet(_) => LOCAL_GET,
            Instruction::LocalSet(_) => LOCAL_SET,
            Instruction::LocalTee(_) => LOCAL_TEE,
            Instruction::GlobalGet(_) => GLOBAL_GET,
            Instruction::GlobalSet(_) => GLOBAL_SET,
            Instruction::I32Const(_) => I32_CONST,
            Instruction::I64Const(_) => I64_CONST,
            Instruction::F32Const(_) => F32_CONST,
            Instruction::F64Const(_) => F64_CONST,
            Instruction::I32Add => I32_ADD,
        }
    }

    /// Append the binary encoding
    pub fn encode(&self, writer: &mut ByteWriter) {
        writer.write_u8(self.opcode());
        match *self {
            Instruction::Block(block_type) | Instruction::Loop(block_type) => writer.write_u8(block_type),
            Instruction::Call(index)
            | Instruction::LocalGet(index)
            | Instruction::LocalSet(index)
            | Instruction::LocalTee(index)
            | Instruction::GlobalGet(index)
            | Instruction::GlobalSet(index) => writer.write_var_u32(index),
            Instruction::I32Const(value) => writer.write_var_i32(value),
            Instruction::I64Const(value) => writer.write_var_i64(value),
            Instruction::F32Const(value) => writer.write_f32(value),
            Instruction::F64Const(value) => writer.write_f64(value),
            Instruction::Unreachable | Instruction::Nop | Instruction::End | Instruction::I32Add => {}
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Unreachable => write!(f, "unreachable"),
            Instruction::Nop => write!(f, "nop"),
            Instruction::Block(t) => write!(f, "block 0x{t:02x}"),
            Instruction::Loop(t) => write!(f, "loop 0x{t:02x}"),
            Instruction::End => write!(f, "end"),
            Instruction::Call(i) => write!(f, "call {i}"),
            Instruction::LocalGet(i) => write!(f, "local.get {i}"),
            Instruction::LocalSet(i) => write!(f, "local.set {i}"),
            Instruction::LocalTee(i) => write!(f, "local.tee {i}"),
            Instruction::GlobalGet(i) => write!(f, "global.get {i}"),
            Instruction::GlobalSet(i) => write!(f, "global.set {i}"),
            Instruction::I32Const(v) => write!(f, "i32.const {v}"),
            Instruction::I64Const(v) => write!(f, "i64.const {v}"),
            Instruction::F32Const(v) => write!(f, "f32.const {v}"),
            Instruction::F64Const(v) => write!(f, "f64.const {v}"),
            Instruction::I32Add => write!(f, "i32.add"),
        }
    }
}

fn fixed<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N]> {
    data.get(offset..offset + N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| Error::out_of_data("Truncated float immediate").with_offset(data.len()))
}

/// Globals visible to expressions during one decode
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalContext {
    globals: Vec<Value>,
}

impl EvalContext {
    /// Context without any globals
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from existing global values
    pub fn with_globals(globals: Vec<Value>) -> Self {
        Self { globals }
    }

    /// Define the next global index
    pub fn push_global(&mut self, value: Value) {
        self.globals.push(value);
    }

    /// Current value of a global
    pub fn global(&self, index: u32) -> Option<Value> {
        self.globals.get(index as usize).copied()
    }

    /// Overwrite a defined global
    pub fn set_global(&mut self, index: u32, value: Value) -> Result<()> {
        let slot = self
            .globals
            .get_mut(index as usize)
            .ok_or_else(|| Error::invalid_global_index("Global index out of range"))?;
        *slot = value;
        Ok(())
    }

    /// Number of defined globals
    pub fn len(&self) -> usize {
        self.globals.len()
    }

    /// Whether no global is defined
    pub fn is_empty(&self) -> bool {
        self.globals.is_empty()
    }

    /// Every global value in index order
    pub fn values(&self) -> &[Value] {
        &self.globals
    }
}

impl Extend<Value> for EvalContext {
    fn extend<I: IntoIterator<Item = Value>>(&mut self, values: I) {
        self.globals.extend(values);
    }
}

/// Outcome of a completed evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Top of the operand stack once evaluation ended, if any
    pub value: Option<Value>,
    /// Bytes consumed, including the final `end`
    pub consumed: usize,
    /// Targets of every `call` executed, in order
    pub calls: Vec<u32>,
}

/// One executed instruction, as reported by [`Interpreter::step`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Absolute offset of the opcode byte
    pub offset: usize,
    /// What was executed
    pub instruction: Instruction,
    /// Block depth after the instruction ran
    pub depth: usize,
}

/// Evaluate the expression starting at `bytes[start]`.
///
/// `locals` seed the frame for `local.*` opcodes; initializer expressions
/// pass an empty slice. `global.set` writes through to `globals`.
pub fn evaluate(bytes: &[u8], start: usize, locals: &[Value], globals: &mut EvalContext) -> Result<Evaluation> {
    Interpreter::new(bytes, start, locals.to_vec(), globals).run()
}

/// Single-stepping stack machine
#[derive(Debug)]
pub struct Interpreter<'a> {
    code: &'a [u8],
    start: usize,
    pc: usize,
    stack: Vec<Value>,
    locals: Vec<Value>,
    globals: &'a mut EvalContext,
    depth: usize,
    calls: Vec<u32>,
}

impl<'a> Interpreter<'a> {
    /// Interpreter positioned at `start` with the given frame locals
    pub fn new(code: &'a [u8], start: usize, locals: Vec<Value>, globals: &'a mut EvalContext) -> Self {
        Self { code, start, pc: start, stack: Vec::new(), locals, globals, depth: 1, calls: Vec::new() }
    }

    /// Interpreter over a function body.
    ///
    /// The frame holds `args` for the parameters followed by every declared
    /// local at its zero value. More than [`MAX_FUNCTION_LOCALS`] declared
    /// locals is rejected before anything is allocated.
    pub fn for_function(
        entry: &'a CodeEntry,
        signature: &TypeEntry,
        args: &[Value],
        globals: &'a mut EvalContext,
    ) -> Result<Self> {
        if args.len() != signature.params.len() {
            return Err(Error::type_mismatch("Argument count does not match the function signature"));
        }
        if args.iter().zip(&signature.params).any(|(arg, ty)| arg.value_type() != *ty) {
            return Err(Error::type_mismatch("Argument type does not match the function signature"));
        }

        let declared = entry
            .locals
            .iter()
            .try_fold(0usize, |total, decl| total.checked_add(decl.count as usize))
            .filter(|&total| total <= MAX_FUNCTION_LOCALS)
            .ok_or_else(|| Error::malformed_count("Function declares too many locals"))?;

        let mut locals = Vec::with_capacity(args.len() + declared);
        locals.extend_from_slice(args);
        for decl in &entry.locals {
            let zero = Value::zero(decl.value_type)
                .ok_or_else(|| Error::type_mismatch("Local type has no numeric zero value"))?;
            locals.extend(core::iter::repeat_n(zero, decl.count as usize));
        }
        Ok(Self::new(&entry.body, 0, locals, globals))
    }

    /// Position of the next opcode
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Current block depth; 0 once evaluation has finished
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Operand stack, bottom first
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /// Frame locals, parameters first
    pub fn locals(&self) -> &[Value] {
        &self.locals
    }

    /// Whether the outer block has ended
    pub fn is_finished(&self) -> bool {
        self.depth == 0
    }

    /// Execute one instruction. Returns `None` once the outer block has
    /// ended.
    pub fn step(&mut self) -> Result<Option<Step>> {
        if self.is_finished() {
            return Ok(None);
        }
        let offset = self.pc;
        let (instruction, len) = Instruction::decode(self.code, offset)?;
        trace!("{offset:#06x}: {instruction}");
        self.execute(instruction).map_err(|e| e.with_offset(offset))?;
        self.pc += len;
        Ok(Some(Step { offset, instruction, depth: self.depth }))
    }

    /// Step until the outer block ends
    pub fn run(mut self) -> Result<Evaluation> {
        while self.step()?.is_some() {}
        Ok(Evaluation { value: self.stack.last().copied(), consumed: self.pc - self.start, calls: self.calls })
    }

    fn execute(&mut self, instruction: Instruction) -> Result<()> {
        match instruction {
            Instruction::Unreachable => return Err(Error::unreachable_executed("Unreachable executed")),
            Instruction::Nop => {}
            Instruction::Block(_) | Instruction::Loop(_) => self.depth += 1,
            Instruction::End => self.depth -= 1,
            Instruction::Call(index) => {
                trace!("call to function {index} recorded");
                self.calls.push(index);
            }
            Instruction::LocalGet(index) => {
                let value = *self.local_mut(index)?;
                self.stack.push(value);
            }
            Instruction::LocalSet(index) => {
                let value = self.pop()?;
                *self.local_mut(index)? = value;
            }
            Instruction::LocalTee(index) => {
                let value = self.pop()?;
                *self.local_mut(index)? = value;
                self.stack.push(value);
            }
            Instruction::GlobalGet(index) => {
                let value = self
                    .globals
                    .global(index)
                    .ok_or_else(|| Error::invalid_global_index("Global index out of range"))?;
                self.stack.push(value);
            }
            Instruction::GlobalSet(index) => {
                let value = self.pop()?;
                self.globals.set_global(index, value)?;
            }
            Instruction::I32Const(v) => self.stack.push(Value::I32(v)),
            Instruction::I64Const(v) => self.stack.push(Value::I64(v)),
            Instruction::F32Const(v) => self.stack.push(Value::F32(v)),
            Instruction::F64Const(v) => self.stack.push(Value::F64(v)),
            Instruction::I32Add => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                match (lhs, rhs) {
                    (Value::I32(a), Value::I32(b)) => self.stack.push(Value::I32(a.wrapping_add(b))),
                    _ => return Err(Error::type_mismatch("i32.add expects two i32 operands")),
                }
            }
        }
        Ok(())
    }

    fn pop(&mut self) -> Result<Value> {
        self.stack.pop().ok_or_else(|| Error::stack_underflow("Operand stack is empty"))
    }

    fn local_mut(&mut self, index: u32) -> Result<&mut Value> {
        self.locals
            .get_mut(index as usize)
            .ok_or_else(|| Error::invalid_local_index("Local index out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmlens_error::codes;

    fn eval(bytes: &[u8]) -> Result<Evaluation> {
        evaluate(bytes, 0, &[], &mut EvalContext::new())
    }

    #[test]
    fn test_single_constant() {
        let result = eval(&[I32_CONST, 0x2A, END]).unwrap();
        assert_eq!(result.value, Some(Value::I32(42)));
        assert_eq!(result.consumed, 3);
    }

    #[test]
    fn test_negative_constant_is_signed() {
        let result = eval(&[I32_CONST, 0x7F, END]).unwrap();
        assert_eq!(result.value, Some(Value::I32(-1)));
    }

    #[test]
    fn test_add_wraps() {
        let mut bytes = vec![I32_CONST];
        leb128::write_leb128_i32(i32::MAX, &mut bytes);
        bytes.extend_from_slice(&[I32_CONST, 0x01, I32_ADD, END]);
        assert_eq!(eval(&bytes).unwrap().value, Some(Value::I32(i32::MIN)));
    }

    #[test]
    fn test_nested_block_ends_at_outer_end() {
        let bytes = [BLOCK, BLOCK_TYPE_EMPTY, NOP, END, I64_CONST, 0x05, END, 0xFF];
        let result = eval(&bytes).unwrap();
        assert_eq!(result.value, Some(Value::I64(5)));
        assert_eq!(result.consumed, 7);
    }

    #[test]
    fn test_starts_at_offset() {
        let bytes = [0xAA, 0xBB, F32_CONST, 0x00, 0x00, 0x80, 0x3F, END];
        let result = evaluate(&bytes, 2, &[], &mut EvalContext::new()).unwrap();
        assert_eq!(result.value, Some(Value::F32(1.0)));
        assert_eq!(result.consumed, 6);
    }

    #[test]
    fn test_globals() {
        let mut globals = EvalContext::with_globals(vec![Value::I32(7)]);
        let result = evaluate(&[GLOBAL_GET, 0x00, END], 0, &[], &mut globals).unwrap();
        assert_eq!(result.value, Some(Value::I32(7)));

        evaluate(&[I32_CONST, 0x09, GLOBAL_SET, 0x00, END], 0, &[], &mut globals).unwrap();
        assert_eq!(globals.global(0), Some(Value::I32(9)));

        let err = evaluate(&[GLOBAL_GET, 0x01, END], 0, &[], &mut globals).unwrap_err();
        assert_eq!(err.code, codes::INVALID_GLOBAL_INDEX);
        assert_eq!(err.offset, Some(0));
    }

    #[test]
    fn test_locals() {
        let bytes = [LOCAL_GET, 0x00, LOCAL_TEE, 0x01, LOCAL_GET, 0x01, I32_ADD, END];
        let result = evaluate(&bytes, 0, &[Value::I32(3), Value::I32(0)], &mut EvalContext::new()).unwrap();
        assert_eq!(result.value, Some(Value::I32(6)));

        let err = eval(&[LOCAL_GET, 0x00, END]).unwrap_err();
        assert_eq!(err.code, codes::INVALID_LOCAL_INDEX);
    }

    #[test]
    fn test_calls_are_recorded() {
        let result = eval(&[CALL, 0x03, I32_CONST, 0x00, END]).unwrap();
        assert_eq!(result.calls, vec![3]);
    }

    #[test]
    fn test_errors() {
        assert_eq!(eval(&[0xFC, END]).unwrap_err().code, codes::UNSUPPORTED_OPCODE);
        assert_eq!(eval(&[I32_ADD, END]).unwrap_err().code, codes::STACK_UNDERFLOW);
        assert_eq!(eval(&[UNREACHABLE]).unwrap_err().code, codes::UNREACHABLE_EXECUTED);
        assert_eq!(eval(&[I32_CONST, 0x01]).unwrap_err().code, codes::OUT_OF_DATA);
        let err = eval(&[I64_CONST, 0x01, I32_CONST, 0x01, I32_ADD, END]).unwrap_err();
        assert_eq!(err.code, codes::TYPE_MISMATCH);
        assert_eq!(err.offset, Some(4));
    }

    #[test]
    fn test_encode_matches_decode() {
        let bytes = [I32_CONST, 0xC0, 0xBB, 0x78, LOOP, BLOCK_TYPE_EMPTY, GLOBAL_SET, 0x81, 0x01, END];
        let mut writer = ByteWriter::new();
        let mut offset = 0;
        while offset < bytes.len() {
            let (instruction, len) = Instruction::decode(&bytes, offset).unwrap();
            instruction.encode(&mut writer);
            offset += len;
        }
        assert_eq!(writer.as_slice(), &bytes);
    }
}
