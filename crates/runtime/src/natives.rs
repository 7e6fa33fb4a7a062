// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// the standard native function table: the console and string
// built-ins callable through 'invokenative'.
//
// the native pool of a module refers to table slots by index, so the
// index of each entry is part of the contract between the compiler
// and this table; the assignments below are fixed. natives that
// return nothing interesting push Int(0).

use std::io::{BufRead, Write};

use c0vm_program::{
    heap::Heap,
    native::{NativeFunction, NativeTable},
};
use c0vm_types::{fault::Fault, Value};

pub const NATIVE_PRINT: u16 = 0;
pub const NATIVE_PRINTLN: u16 = 1;
pub const NATIVE_PRINTINT: u16 = 2;
pub const NATIVE_PRINTBOOL: u16 = 3;
pub const NATIVE_PRINTCHAR: u16 = 4;
pub const NATIVE_FLUSH: u16 = 5;
pub const NATIVE_READLINE: u16 = 6;
pub const NATIVE_STRING_LENGTH: u16 = 7;
pub const NATIVE_STRING_JOIN: u16 = 8;
pub const NATIVE_STRING_EQUAL: u16 = 9;
pub const NATIVE_STRING_FROMINT: u16 = 10;

pub fn standard_native_table() -> NativeTable {
    let functions: Vec<NativeFunction> = vec![
        native_print,
        native_println,
        native_printint,
        native_printbool,
        native_printchar,
        native_flush,
        native_readline,
        native_string_length,
        native_string_join,
        native_string_equal,
        native_string_fromint,
    ];
    NativeTable::new(functions)
}

fn arg(args: &[Value], index: usize) -> Result<Value, Fault> {
    args.get(index)
        .copied()
        .ok_or_else(|| Fault::memory("native: missing argument"))
}

fn string_arg(heap: &Heap, args: &[Value], index: usize) -> Result<String, Fault> {
    heap.read_cstr(arg(args, index)?.as_ref()?)
}

fn native_print(heap: &mut Heap, args: &[Value]) -> Result<Value, Fault> {
    print!("{}", string_arg(heap, args, 0)?);
    Ok(Value::Int(0))
}

fn native_println(heap: &mut Heap, args: &[Value]) -> Result<Value, Fault> {
    println!("{}", string_arg(heap, args, 0)?);
    Ok(Value::Int(0))
}

fn native_printint(_heap: &mut Heap, args: &[Value]) -> Result<Value, Fault> {
    print!("{}", arg(args, 0)?.as_int()?);
    Ok(Value::Int(0))
}

fn native_printbool(_heap: &mut Heap, args: &[Value]) -> Result<Value, Fault> {
    let x = arg(args, 0)?.as_int()?;
    print!("{}", if x == 0 { "false" } else { "true" });
    Ok(Value::Int(0))
}

fn native_printchar(_heap: &mut Heap, args: &[Value]) -> Result<Value, Fault> {
    let x = arg(args, 0)?.as_int()?;
    print!("{}", (x & 0x7f) as u8 as char);
    Ok(Value::Int(0))
}

fn native_flush(_heap: &mut Heap, _args: &[Value]) -> Result<Value, Fault> {
    std::io::stdout()
        .flush()
        .map_err(|e| Fault::user_error(format!("flush: {}", e)))?;
    Ok(Value::Int(0))
}

fn native_readline(heap: &mut Heap, _args: &[Value]) -> Result<Value, Fault> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| Fault::user_error(format!("readline: {}", e)))?;
    // the newline is not part of the result
    if line.ends_with('\n') {
        line.pop();
    }
    Ok(Value::Ref(heap.alloc_string(&line)))
}

fn native_string_length(heap: &mut Heap, args: &[Value]) -> Result<Value, Fault> {
    let string = string_arg(heap, args, 0)?;
    Ok(Value::Int(string.len() as i32))
}

fn native_string_join(heap: &mut Heap, args: &[Value]) -> Result<Value, Fault> {
    let mut joined = string_arg(heap, args, 0)?;
    joined.push_str(&string_arg(heap, args, 1)?);
    Ok(Value::Ref(heap.alloc_string(&joined)))
}

fn native_string_equal(heap: &mut Heap, args: &[Value]) -> Result<Value, Fault> {
    let a = string_arg(heap, args, 0)?;
    let b = string_arg(heap, args, 1)?;
    Ok(Value::Int(if a == b { 1 } else { 0 }))
}

fn native_string_fromint(heap: &mut Heap, args: &[Value]) -> Result<Value, Fault> {
    let x = arg(args, 0)?.as_int()?;
    Ok(Value::Ref(heap.alloc_string(&x.to_string())))
}
