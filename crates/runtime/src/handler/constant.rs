// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use c0vm_program::{heap::Heap, thread_context::ThreadContext};
use c0vm_types::{fault::Fault, Value};

use super::HandleResult;

pub fn bipush(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    // the operand byte is sign extended
    let x = thread_context.get_param_i8()? as i32;
    thread_context.operand_stack.push(Value::Int(x));
    Ok(HandleResult::Move(2))
}

pub fn ildc(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let index = thread_context.get_param_u16()? as usize;
    let int_pool = &thread_context.image.int_pool;
    if index >= int_pool.len() {
        return Err(Fault::memory("ildc: constant pool index out of range"));
    }
    thread_context.operand_stack.push(Value::Int(int_pool[index]));
    Ok(HandleResult::Move(3))
}

pub fn aldc(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let offset = thread_context.get_param_u16()? as usize;
    if offset >= thread_context.image.string_pool.len() {
        return Err(Fault::memory("aldc: string pool index out of range"));
    }
    thread_context
        .operand_stack
        .push(Value::Ref(Heap::string_pool_ref(offset as u32)));
    Ok(HandleResult::Move(3))
}

pub fn aconst_null(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    thread_context.operand_stack.push(Value::NULL);
    Ok(HandleResult::Move(1))
}
