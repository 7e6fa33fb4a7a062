// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// for the binary operations, the first value popped from the operand
// stack is the right-hand side, e.g.
//
// |       | --> stack end
// |   y   | --> 1st pop: RHS
// |   x   | --> 2nd pop: LHS
// \-------/ --> stack start
//
// 'iadd', 'isub' and 'imul' wrap around on overflow (two's-complement
// modulo 2^32), only 'idiv', 'irem' and the shifts can fault.

use c0vm_program::thread_context::ThreadContext;
use c0vm_types::{fault::Fault, Value};

use super::HandleResult;

fn pop_operands(thread_context: &mut ThreadContext) -> Result<(i32, i32), Fault> {
    let y = thread_context.operand_stack.pop()?.as_int()?;
    let x = thread_context.operand_stack.pop()?.as_int()?;
    Ok((x, y))
}

fn push_result(thread_context: &mut ThreadContext, value: i32) -> Result<HandleResult, Fault> {
    thread_context.operand_stack.push(Value::Int(value));
    Ok(HandleResult::Move(1))
}

pub fn iadd(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let (x, y) = pop_operands(thread_context)?;
    push_result(thread_context, x.wrapping_add(y))
}

pub fn isub(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let (x, y) = pop_operands(thread_context)?;
    push_result(thread_context, x.wrapping_sub(y))
}

pub fn imul(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let (x, y) = pop_operands(thread_context)?;
    push_result(thread_context, x.wrapping_mul(y))
}

pub fn idiv(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let (x, y) = pop_operands(thread_context)?;
    // the zero check comes first, then the overflow case
    if y == 0 {
        return Err(Fault::arithmetic("division error: y is 0"));
    }
    if x == i32::MIN && y == -1 {
        return Err(Fault::arithmetic("division error: overflow"));
    }
    // Rust's division truncates toward zero, as required
    push_result(thread_context, x / y)
}

pub fn irem(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let (x, y) = pop_operands(thread_context)?;
    if y == 0 {
        return Err(Fault::arithmetic("modulus error: y is 0"));
    }
    if x == i32::MIN && y == -1 {
        return Err(Fault::arithmetic("modulus error: overflow"));
    }
    // the remainder takes the sign of the dividend
    push_result(thread_context, x % y)
}

pub fn iand(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let (x, y) = pop_operands(thread_context)?;
    push_result(thread_context, x & y)
}

pub fn ior(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let (x, y) = pop_operands(thread_context)?;
    push_result(thread_context, x | y)
}

pub fn ixor(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let (x, y) = pop_operands(thread_context)?;
    push_result(thread_context, x ^ y)
}

pub fn ishl(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let (x, y) = pop_operands(thread_context)?;
    if !(0..32).contains(&y) {
        return Err(Fault::arithmetic("left shift error: shift out of range"));
    }
    push_result(thread_context, x << y)
}

pub fn ishr(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let (x, y) = pop_operands(thread_context)?;
    if !(0..32).contains(&y) {
        return Err(Fault::arithmetic("right shift error: shift out of range"));
    }
    // arithmetic shift, the sign bit is preserved
    push_result(thread_context, x >> y)
}
