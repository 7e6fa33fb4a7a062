// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// locals are zero-initialised to Int(0) when the frame is created, so
// loading a variable that was never stored is well defined (and not a
// fault). the index operand of well-formed bytecode is always inside
// the frame's local area; a stray index is still checked.

use c0vm_program::thread_context::ThreadContext;
use c0vm_types::fault::Fault;

use super::HandleResult;

pub fn vload(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let index = thread_context.get_param_u8()? as usize;
    if index >= thread_context.locals.len() {
        return Err(Fault::memory("vload: local variable index out of range"));
    }
    let v = thread_context.locals[index];
    thread_context.operand_stack.push(v);
    Ok(HandleResult::Move(2))
}

pub fn vstore(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let index = thread_context.get_param_u8()? as usize;
    if index >= thread_context.locals.len() {
        return Err(Fault::memory("vstore: local variable index out of range"));
    }
    thread_context.locals[index] = thread_context.operand_stack.pop()?;
    Ok(HandleResult::Move(2))
}
