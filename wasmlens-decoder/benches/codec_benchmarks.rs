// Copyright (c) 2025 The WasmLens Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![allow(clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wasmlens_decoder::{decode_module, encode_module, ModuleCodec};

fn sample_module() -> Vec<u8> {
    let mut text = String::from("(module (memory 1)\n");
    for i in 0..200 {
        text.push_str(&format!(
            "(global (mut i32) (i32.const {i}))\n(func (export \"f{i}\") (param i32) (result i32) local.get 0 i32.const {i} i32.add)\n(data (i32.const {}) \"payload\")\n",
            i * 8
        ));
    }
    text.push(')');
    wat::parse_str(&text).unwrap()
}

fn bench_codec(c: &mut Criterion) {
    let bytes = sample_module();
    let module = decode_module(&bytes).unwrap();

    c.bench_function("decode", |b| b.iter(|| decode_module(black_box(&bytes)).unwrap()));
    c.bench_function("decode_annotated", |b| {
        b.iter(|| ModuleCodec::new(black_box(bytes.clone())).decode().unwrap())
    });
    c.bench_function("encode", |b| b.iter(|| encode_module(black_box(&module))));
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
