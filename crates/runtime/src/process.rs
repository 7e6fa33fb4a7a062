// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use c0vm_binary::program_image::ProgramImage;
use c0vm_program::{native::NativeTable, thread_context::ThreadContext};
use c0vm_types::{fault::Fault, Value};

use crate::handler::{HandleResult, Handler};

pub fn process_next_instruction(
    handler: &Handler,
    thread_context: &mut ThreadContext,
) -> Result<HandleResult, Fault> {
    let opcode = thread_context
        .opcode_byte()
        .ok_or_else(|| Fault::memory("instruction address out of range"))?;

    log::trace!(
        "function {} pc 0x{:04x} opcode 0x{:02x} operand stack size {}",
        thread_context.pc.function_index,
        thread_context.pc.instruction_address,
        opcode,
        thread_context.operand_stack.size()
    );

    let function = handler.handlers[opcode as usize];
    function(thread_context)
}

pub fn process_continuous_instructions(
    handler: &Handler,
    thread_context: &mut ThreadContext,
) -> Result<Value, Fault> {
    loop {
        match process_next_instruction(handler, thread_context)? {
            HandleResult::Move(increment) => {
                thread_context.pc.instruction_address += increment;
            }
            HandleResult::Jump(pc) => {
                thread_context.pc = pc;
            }
            HandleResult::End(value) => {
                return Ok(value);
            }
        }
    }
}

/// execute a loaded program image from its entry function (function 0,
/// zero arguments) to completion, yielding the final return value as a
/// 32-bit integer.
///
/// execution is deterministic: the same image and native-table
/// semantics always produce the same return value or the same fault.
pub fn process_program(image: &ProgramImage, natives: &NativeTable) -> Result<i32, Fault> {
    let handler = Handler::new();
    let mut thread_context = ThreadContext::new(image, natives);
    let value = process_continuous_instructions(&handler, &mut thread_context)?;
    value.as_int()
}
