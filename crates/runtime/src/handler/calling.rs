// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use c0vm_program::{
    operand_stack::OperandStack,
    thread_context::{Frame, ProgramCounter, ThreadContext},
    MAX_CALL_STACK_DEPTH,
};
use c0vm_types::{fault::Fault, Value};

use super::HandleResult;

pub fn invokestatic(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let index = thread_context.get_param_u16()? as usize;
    if index >= thread_context.image.function_pool.len() {
        return Err(Fault::memory("invokestatic: function index out of range"));
    }
    if thread_context.call_stack.len() >= MAX_CALL_STACK_DEPTH {
        return Err(Fault::call_stack_overflow("maximum call depth exceeded"));
    }

    let target = &thread_context.image.function_pool[index];
    let num_args = target.num_args as usize;

    // the last value popped becomes the first argument
    let mut locals = vec![Value::Int(0); target.num_vars as usize];
    for j in (0..num_args).rev() {
        locals[j] = thread_context.operand_stack.pop()?;
    }

    // suspend the caller, resuming past the 3-byte instruction
    let return_pc = ProgramCounter {
        function_index: thread_context.pc.function_index,
        instruction_address: thread_context.pc.instruction_address + 3,
    };
    let operands = std::mem::replace(&mut thread_context.operand_stack, OperandStack::new());
    let caller_locals = std::mem::replace(&mut thread_context.locals, locals);
    thread_context.call_stack.push(Frame {
        operands,
        locals: caller_locals,
        return_pc,
    });

    Ok(HandleResult::Jump(ProgramCounter {
        function_index: index,
        instruction_address: 0,
    }))
}

pub fn return_(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let return_value = thread_context.operand_stack.pop()?;

    match thread_context.call_stack.pop() {
        None => {
            // returning from the entry function ends the program
            Ok(HandleResult::End(return_value))
        }
        Some(frame) => {
            // the callee's operand stack and locals are dropped here
            thread_context.operand_stack = frame.operands;
            thread_context.locals = frame.locals;
            thread_context.operand_stack.push(return_value);
            Ok(HandleResult::Jump(frame.return_pc))
        }
    }
}

pub fn invokenative(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let index = thread_context.get_param_u16()? as usize;
    if index >= thread_context.image.native_pool.len() {
        return Err(Fault::memory("invokenative: native index out of range"));
    }

    let native_info = thread_context.image.native_pool[index];
    let num_args = native_info.num_args as usize;

    let mut args = vec![Value::Int(0); num_args];
    for j in (0..num_args).rev() {
        args[j] = thread_context.operand_stack.pop()?;
    }

    let function = thread_context
        .natives
        .get(native_info.function_table_index as usize)
        .ok_or_else(|| Fault::memory("invokenative: native function table index out of range"))?;

    // the host call blocks the interpreter until it completes
    let result = function(&mut thread_context.heap, &args)?;
    thread_context.operand_stack.push(result);
    Ok(HandleResult::Move(3))
}
