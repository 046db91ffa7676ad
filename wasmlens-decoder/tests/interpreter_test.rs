// Copyright (c) 2025 The WasmLens Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![allow(clippy::unwrap_used)]
//! Stepping function bodies through the initializer interpreter.

use wasmlens_decoder::{codes, decode_module, EvalContext, Instruction, Interpreter, Module, Value};

fn module(text: &str) -> Module {
    decode_module(&wat::parse_str(text).unwrap()).unwrap()
}

fn run(module: &Module, index: u32, args: &[Value]) -> wasmlens_decoder::Result<Option<Value>> {
    let function = module.resolve_function(index)?;
    let mut globals = EvalContext::with_globals(module.global_values().into_iter().flatten().collect());
    let interpreter = Interpreter::for_function(function.body.unwrap(), function.signature.unwrap(), args, &mut globals)?;
    Ok(interpreter.run()?.value)
}

#[test]
fn runs_locals_and_addition() {
    let module = module(
        r#"(module
            (func (param i32) (result i32) (local i32)
              local.get 0
              i32.const 5
              i32.add
              local.tee 1
              local.get 1
              i32.add))"#,
    );
    assert_eq!(run(&module, 0, &[Value::I32(10)]).unwrap(), Some(Value::I32(30)));
}

#[test]
fn steps_report_each_instruction() {
    let module = module(
        r#"(module
            (global $g (mut i32) (i32.const 2))
            (func (result i32)
              (block
                nop)
              global.get $g
              i32.const 40
              i32.add
              global.set $g
              global.get $g))"#,
    );
    let function = module.resolve_function(0).unwrap();
    let mut globals = EvalContext::with_globals(vec![Value::I32(2)]);
    let mut interpreter =
        Interpreter::for_function(function.body.unwrap(), function.signature.unwrap(), &[], &mut globals).unwrap();

    let mut trace = Vec::new();
    while let Some(step) = interpreter.step().unwrap() {
        trace.push(step.instruction);
    }
    assert_eq!(
        trace,
        vec![
            Instruction::Block(0x40),
            Instruction::Nop,
            Instruction::End,
            Instruction::GlobalGet(0),
            Instruction::I32Const(40),
            Instruction::I32Add,
            Instruction::GlobalSet(0),
            Instruction::GlobalGet(0),
            Instruction::End,
        ]
    );
    assert_eq!(interpreter.stack(), &[Value::I32(42)]);
    assert!(interpreter.is_finished());
    assert!(interpreter.step().unwrap().is_none());
    assert_eq!(globals.global(0), Some(Value::I32(42)));
}

#[test]
fn calls_are_recorded_not_followed() {
    let module = module(
        r#"(module
            (import "env" "tick" (func $tick))
            (func (result i32)
              call $tick
              i32.const 1))"#,
    );
    let function = module.resolve_function(1).unwrap();
    let mut globals = EvalContext::new();
    let evaluation = Interpreter::for_function(function.body.unwrap(), function.signature.unwrap(), &[], &mut globals)
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(evaluation.calls, vec![0]);
    assert_eq!(evaluation.value, Some(Value::I32(1)));
}

#[test]
fn unsupported_opcode_fails_at_its_offset() {
    let module = module(
        r#"(module
            (func (result i32)
              i32.const 1
              i32.const 2
              i32.sub))"#,
    );
    let err = run(&module, 0, &[]).unwrap_err();
    assert_eq!(err.code, codes::UNSUPPORTED_OPCODE);
    // offsets are relative to the instruction bytes of the body
    assert_eq!(err.offset, Some(4));
}

#[test]
fn arguments_must_match_signature() {
    let module = module(r#"(module (func (param i64)))"#);
    assert_eq!(run(&module, 0, &[]).unwrap_err().code, codes::TYPE_MISMATCH);
    assert_eq!(run(&module, 0, &[Value::I32(1)]).unwrap_err().code, codes::TYPE_MISMATCH);
    assert_eq!(run(&module, 0, &[Value::I64(1)]).unwrap(), None);
}

#[test]
fn oversized_local_declaration_is_rejected() {
    let bytes = hex::decode(concat!(
        "0061736d01000000",
        "010401600000",             // () -> ()
        "03020100",
        "0a0a010801ffffffff0f7e0b", // (local i64) declared u32::MAX times
    ))
    .unwrap();
    let module = decode_module(&bytes).unwrap();
    let function = module.resolve_function(0).unwrap();
    let mut globals = EvalContext::new();
    let err = Interpreter::for_function(function.body.unwrap(), function.signature.unwrap(), &[], &mut globals)
        .unwrap_err();
    assert_eq!(err.code, codes::MALFORMED_COUNT);
}

#[test]
fn local_limit_counts_every_declaration() {
    use wasmlens_decoder::{CodeEntry, LocalDecl, TypeEntry};
    use wasmlens_format::{binary_constants::MAX_FUNCTION_LOCALS, ValueType};

    let half = (MAX_FUNCTION_LOCALS / 2) as u32;
    let entry = |extra: u32| CodeEntry {
        locals: vec![
            LocalDecl { count: half, value_type: ValueType::I32 },
            LocalDecl { count: half + extra, value_type: ValueType::I64 },
        ],
        body: vec![0x0B],
        size_width: None,
    };
    let signature = TypeEntry::default();

    let at_limit = entry(0);
    let mut globals = EvalContext::new();
    let interpreter = Interpreter::for_function(&at_limit, &signature, &[], &mut globals).unwrap();
    assert_eq!(interpreter.locals().len(), MAX_FUNCTION_LOCALS);

    let over = entry(1);
    let mut globals = EvalContext::new();
    let err = Interpreter::for_function(&over, &signature, &[], &mut globals).unwrap_err();
    assert_eq!(err.code, codes::MALFORMED_COUNT);
}
