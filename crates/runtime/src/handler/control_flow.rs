// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// branch offsets are signed 16-bit values measured from the address
// of the branch opcode itself. a taken branch sets
// pc = pc_opcode + offset, a fall-through advances past the 3-byte
// instruction. a target outside the current function's code is a
// detected memory fault rather than undefined behaviour.

use c0vm_program::thread_context::{ProgramCounter, ThreadContext};
use c0vm_types::fault::Fault;

use super::HandleResult;

fn branch(thread_context: &mut ThreadContext, taken: bool) -> Result<HandleResult, Fault> {
    if !taken {
        return Ok(HandleResult::Move(3));
    }

    let offset = thread_context.get_param_i16()?;
    let target = thread_context.pc.instruction_address as i64 + offset as i64;
    if target < 0 || target >= thread_context.function_code().len() as i64 {
        return Err(Fault::memory("branch target out of range"));
    }

    Ok(HandleResult::Jump(ProgramCounter {
        function_index: thread_context.pc.function_index,
        instruction_address: target as usize,
    }))
}

fn pop_ints(thread_context: &mut ThreadContext) -> Result<(i32, i32), Fault> {
    let y = thread_context.operand_stack.pop()?.as_int()?;
    let x = thread_context.operand_stack.pop()?.as_int()?;
    Ok((x, y))
}

pub fn goto(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    branch(thread_context, true)
}

// 'if_cmpeq'/'if_cmpne' compare whole tagged values, so they work on
// references (including null) as well as integers; values of
// different tags are never equal.

pub fn if_cmpeq(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let v2 = thread_context.operand_stack.pop()?;
    let v1 = thread_context.operand_stack.pop()?;
    branch(thread_context, v1 == v2)
}

pub fn if_cmpne(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let v2 = thread_context.operand_stack.pop()?;
    let v1 = thread_context.operand_stack.pop()?;
    branch(thread_context, v1 != v2)
}

pub fn if_icmplt(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let (x, y) = pop_ints(thread_context)?;
    branch(thread_context, x < y)
}

pub fn if_icmpge(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let (x, y) = pop_ints(thread_context)?;
    branch(thread_context, x >= y)
}

pub fn if_icmpgt(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let (x, y) = pop_ints(thread_context)?;
    branch(thread_context, x > y)
}

pub fn if_icmple(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let (x, y) = pop_ints(thread_context)?;
    branch(thread_context, x <= y)
}

#[cfg(test)]
mod tests {
    use crate::process::process_program;
    use c0vm_binary::{bytecode_writer::BytecodeWriter, utils::build_image_with_single_function};
    use c0vm_program::native::NativeTable;
    use c0vm_types::{fault::FaultKind, opcode::Opcode};

    #[test]
    fn test_process_control_flow_conditional_branch() {
        // 1 < 2 takes the branch to the second return path
        //
        // 0x0000 bipush 1
        // 0x0002 bipush 2
        // 0x0004 if_icmplt +8     ;; 1 < 2, taken -> 0x000c
        // 0x0007 bipush 0
        // 0x0009 return
        // 0x000a nop
        // 0x000b nop
        // 0x000c bipush 9
        // 0x000e return           ;; -> 9
        let code0 = BytecodeWriter::new()
            .write_opcode_i8(Opcode::bipush, 1)
            .write_opcode_i8(Opcode::bipush, 2)
            .write_opcode_i16(Opcode::if_icmplt, 8)
            .write_opcode_i8(Opcode::bipush, 0)
            .write_opcode(Opcode::return_)
            .write_opcode(Opcode::nop)
            .write_opcode(Opcode::nop)
            .write_opcode_i8(Opcode::bipush, 9)
            .write_opcode(Opcode::return_)
            .to_bytes();

        let image0 = build_image_with_single_function(0, code0);
        assert_eq!(process_program(&image0, &NativeTable::empty()).unwrap(), 9);
    }

    #[test]
    fn test_process_control_flow_fall_through() {
        // 0x0000 bipush 5
        // 0x0002 bipush 2
        // 0x0004 if_icmplt +8     ;; 5 < 2 is false, fall through
        // 0x0007 bipush 3
        // 0x0009 return           ;; -> 3
        // 0x000a nop
        // 0x000b nop
        // 0x000c bipush 9
        // 0x000e return
        let code0 = BytecodeWriter::new()
            .write_opcode_i8(Opcode::bipush, 5)
            .write_opcode_i8(Opcode::bipush, 2)
            .write_opcode_i16(Opcode::if_icmplt, 8)
            .write_opcode_i8(Opcode::bipush, 3)
            .write_opcode(Opcode::return_)
            .write_opcode(Opcode::nop)
            .write_opcode(Opcode::nop)
            .write_opcode_i8(Opcode::bipush, 9)
            .write_opcode(Opcode::return_)
            .to_bytes();

        let image0 = build_image_with_single_function(0, code0);
        assert_eq!(process_program(&image0, &NativeTable::empty()).unwrap(), 3);
    }

    #[test]
    fn test_process_control_flow_backward_goto() {
        // count down from 3 to 0 by looping backward
        let code0 = BytecodeWriter::new()
            .write_opcode_i8(Opcode::bipush, 3) // 0x0000
            .write_opcode_u8(Opcode::vstore, 0) // 0x0002
            .write_opcode_u8(Opcode::vload, 0) // 0x0004, loop head
            .write_opcode_i8(Opcode::bipush, 0) // 0x0006
            .write_opcode_i16(Opcode::if_icmple, 12) // 0x0008 -> 0x0014
            .write_opcode_u8(Opcode::vload, 0) // 0x000b
            .write_opcode_i8(Opcode::bipush, 1) // 0x000d
            .write_opcode(Opcode::isub) // 0x000f
            .write_opcode_u8(Opcode::vstore, 0) // 0x0010
            .write_opcode_i16(Opcode::goto, -14) // 0x0012 -> 0x0004
            .write_opcode_u8(Opcode::vload, 0) // 0x0014
            .write_opcode(Opcode::return_) // 0x0016, -> 0
            .to_bytes();

        let image0 = build_image_with_single_function(1, code0);
        assert_eq!(process_program(&image0, &NativeTable::empty()).unwrap(), 0);
    }

    #[test]
    fn test_process_control_flow_cmpne_mixed_tags() {
        // an integer never equals a reference, so if_cmpne is taken
        //
        // 0x0000 bipush 0
        // 0x0002 aconst_null
        // 0x0003 if_cmpne +8      ;; -> 0x000b
        // 0x0006 bipush 0
        // 0x0008 return
        // 0x0009 nop
        // 0x000a nop
        // 0x000b bipush 1
        // 0x000d return           ;; -> 1
        let code0 = BytecodeWriter::new()
            .write_opcode_i8(Opcode::bipush, 0)
            .write_opcode(Opcode::aconst_null)
            .write_opcode_i16(Opcode::if_cmpne, 8)
            .write_opcode_i8(Opcode::bipush, 0)
            .write_opcode(Opcode::return_)
            .write_opcode(Opcode::nop)
            .write_opcode(Opcode::nop)
            .write_opcode_i8(Opcode::bipush, 1)
            .write_opcode(Opcode::return_)
            .to_bytes();

        let image0 = build_image_with_single_function(0, code0);
        assert_eq!(process_program(&image0, &NativeTable::empty()).unwrap(), 1);
    }

    #[test]
    fn test_process_control_flow_comparison_table() {
        // each comparison against the pair (2, 3)
        let cases = [
            (Opcode::if_icmplt, true),
            (Opcode::if_icmpge, false),
            (Opcode::if_icmpgt, false),
            (Opcode::if_icmple, true),
        ];

        for (opcode, expected_taken) in cases {
            // 0x0000 bipush 2
            // 0x0002 bipush 3
            // 0x0004 if_* +8       ;; -> 0x000c
            // 0x0007 bipush 0
            // 0x0009 return
            // 0x000a nop
            // 0x000b nop
            // 0x000c bipush 1
            // 0x000e return
            let code0 = BytecodeWriter::new()
                .write_opcode_i8(Opcode::bipush, 2)
                .write_opcode_i8(Opcode::bipush, 3)
                .write_opcode_i16(opcode, 8)
                .write_opcode_i8(Opcode::bipush, 0)
                .write_opcode(Opcode::return_)
                .write_opcode(Opcode::nop)
                .write_opcode(Opcode::nop)
                .write_opcode_i8(Opcode::bipush, 1)
                .write_opcode(Opcode::return_)
                .to_bytes();

            let image0 = build_image_with_single_function(0, code0);
            let result0 = process_program(&image0, &NativeTable::empty()).unwrap();
            assert_eq!(result0 == 1, expected_taken, "opcode {:?}", opcode);
        }
    }

    #[test]
    fn test_process_control_flow_branch_target_out_of_range() {
        // 0x0000 goto -8          ;; before the function start
        let code0 = BytecodeWriter::new()
            .write_opcode_i16(Opcode::goto, -8)
            .write_opcode(Opcode::return_)
            .to_bytes();

        let image0 = build_image_with_single_function(0, code0);
        let fault0 = process_program(&image0, &NativeTable::empty()).unwrap_err();
        assert_eq!(fault0.kind, FaultKind::Memory);
    }
}
