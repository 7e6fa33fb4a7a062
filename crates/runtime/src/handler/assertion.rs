// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use c0vm_program::thread_context::ThreadContext;
use c0vm_types::fault::Fault;

use super::HandleResult;

pub fn athrow(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let reference = thread_context.operand_stack.pop()?.as_ref()?;
    if reference.is_null() {
        return Err(Fault::memory("athrow: null message string"));
    }
    let message = thread_context.heap.read_cstr(reference)?;
    Err(Fault::user_error(message))
}

pub fn assert(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let reference = thread_context.operand_stack.pop()?.as_ref()?;
    let x = thread_context.operand_stack.pop()?.as_int()?;
    if x == 0 {
        if reference.is_null() {
            return Err(Fault::memory("assert: null message string"));
        }
        let message = thread_context.heap.read_cstr(reference)?;
        return Err(Fault::assertion_failure(message));
    }
    Ok(HandleResult::Move(1))
}
