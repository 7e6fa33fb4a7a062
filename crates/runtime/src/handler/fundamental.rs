// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use c0vm_program::thread_context::ThreadContext;
use c0vm_types::fault::Fault;

use super::HandleResult;

pub fn nop(_thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    Ok(HandleResult::Move(1))
}

pub fn pop(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    thread_context.operand_stack.pop()?;
    Ok(HandleResult::Move(1))
}

pub fn dup(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let v = thread_context.operand_stack.pop()?;
    thread_context.operand_stack.push(v);
    thread_context.operand_stack.push(v);
    Ok(HandleResult::Move(1))
}

pub fn swap(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let v2 = thread_context.operand_stack.pop()?;
    let v1 = thread_context.operand_stack.pop()?;
    thread_context.operand_stack.push(v2);
    thread_context.operand_stack.push(v1);
    Ok(HandleResult::Move(1))
}
