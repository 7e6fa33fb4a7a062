// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// allocation, address computation and memory access.
//
// every access instruction checks for null before anything else; for
// 'aadds' the null check comes before the bounds check, and for
// 'newarray' the negative-count check comes before the allocation.

use c0vm_program::thread_context::ThreadContext;
use c0vm_types::{fault::Fault, HeapRef, Value};

use super::HandleResult;

fn pop_non_null(thread_context: &mut ThreadContext, message: &str) -> Result<HeapRef, Fault> {
    let reference = thread_context.operand_stack.pop()?.as_ref()?;
    if reference.is_null() {
        return Err(Fault::memory(message));
    }
    Ok(reference)
}

pub fn new(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let size = thread_context.get_param_u8()? as usize;
    let reference = thread_context.heap.alloc_block(size);
    thread_context.operand_stack.push(Value::Ref(reference));
    Ok(HandleResult::Move(2))
}

pub fn newarray(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let elt_size = thread_context.get_param_u8()? as usize;
    let count = thread_context.operand_stack.pop()?.as_int()?;
    if count < 0 {
        return Err(Fault::memory("newarray: negative array size"));
    }
    let reference = thread_context.heap.alloc_array(elt_size, count);
    thread_context.operand_stack.push(Value::Ref(reference));
    Ok(HandleResult::Move(2))
}

pub fn arraylength(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let reference = pop_non_null(thread_context, "arraylength: null pointer")?;
    let (_elt_size, count) = thread_context.heap.array_info(reference)?;
    thread_context.operand_stack.push(Value::Int(count));
    Ok(HandleResult::Move(1))
}

pub fn aaddf(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let field_offset = thread_context.get_param_u8()?;
    let reference = pop_non_null(thread_context, "aaddf: null pointer")?;
    thread_context
        .operand_stack
        .push(Value::Ref(reference.add_offset(field_offset as u32)));
    Ok(HandleResult::Move(2))
}

pub fn aadds(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let index = thread_context.operand_stack.pop()?.as_int()?;
    let reference = pop_non_null(thread_context, "aadds: null pointer")?;
    let (elt_size, count) = thread_context.heap.array_info(reference)?;
    if index < 0 || index >= count {
        return Err(Fault::memory("aadds: array index out of bounds"));
    }
    // element references are offsets from the start of the element
    // buffer, whatever the offset of the incoming reference was
    thread_context.operand_stack.push(Value::Ref(HeapRef::new(
        reference.handle,
        elt_size as u32 * index as u32,
    )));
    Ok(HandleResult::Move(1))
}

pub fn imload(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let reference = pop_non_null(thread_context, "imload: null pointer")?;
    let x = thread_context.heap.read_i32(reference)?;
    thread_context.operand_stack.push(Value::Int(x));
    Ok(HandleResult::Move(1))
}

pub fn imstore(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let x = thread_context.operand_stack.pop()?.as_int()?;
    let reference = pop_non_null(thread_context, "imstore: null pointer")?;
    thread_context.heap.write_i32(reference, x)?;
    Ok(HandleResult::Move(1))
}

pub fn amload(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let reference = pop_non_null(thread_context, "amload: null pointer")?;
    let target = thread_context.heap.read_ref(reference)?;
    thread_context.operand_stack.push(Value::Ref(target));
    Ok(HandleResult::Move(1))
}

pub fn amstore(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    // the stored reference may be null, the cell address may not
    let target = thread_context.operand_stack.pop()?.as_ref()?;
    let reference = pop_non_null(thread_context, "amstore: null pointer")?;
    thread_context.heap.write_ref(reference, target)?;
    Ok(HandleResult::Move(1))
}

pub fn cmload(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let reference = pop_non_null(thread_context, "cmload: null pointer")?;
    // one byte, zero extended; stored characters are 7-bit
    let x = thread_context.heap.read_u8(reference)? as i32;
    thread_context.operand_stack.push(Value::Int(x));
    Ok(HandleResult::Move(1))
}

pub fn cmstore(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    let x = thread_context.operand_stack.pop()?.as_int()?;
    let reference = pop_non_null(thread_context, "cmstore: null pointer")?;
    thread_context.heap.write_u8(reference, (x & 0x7f) as u8)?;
    Ok(HandleResult::Move(1))
}

#[cfg(test)]
mod tests {
    use crate::process::process_program;
    use c0vm_binary::{bytecode_writer::BytecodeWriter, utils::build_image_with_single_function};
    use c0vm_program::native::NativeTable;
    use c0vm_types::{fault::FaultKind, opcode::Opcode};

    #[test]
    fn test_process_heap_block_store_load() {
        // a two-field struct { int a; int b; }, b at byte offset 4
        //
        // 0x0000 new 8
        // 0x0002 vstore 0
        // 0x0004 vload 0
        // 0x0006 aaddf 4
        // 0x0008 bipush 37
        // 0x000a imstore
        // 0x000b vload 0
        // 0x000d aaddf 4
        // 0x000f imload
        // 0x0010 return           ;; -> 37
        let code0 = BytecodeWriter::new()
            .write_opcode_u8(Opcode::new, 8)
            .write_opcode_u8(Opcode::vstore, 0)
            .write_opcode_u8(Opcode::vload, 0)
            .write_opcode_u8(Opcode::aaddf, 4)
            .write_opcode_i8(Opcode::bipush, 37)
            .write_opcode(Opcode::imstore)
            .write_opcode_u8(Opcode::vload, 0)
            .write_opcode_u8(Opcode::aaddf, 4)
            .write_opcode(Opcode::imload)
            .write_opcode(Opcode::return_)
            .to_bytes();

        let image0 = build_image_with_single_function(1, code0);
        assert_eq!(process_program(&image0, &NativeTable::empty()).unwrap(), 37);
    }

    #[test]
    fn test_process_heap_new_zero_initialised() {
        // 0x0000 new 4
        // 0x0002 imload
        // 0x0003 return           ;; -> 0
        let code0 = BytecodeWriter::new()
            .write_opcode_u8(Opcode::new, 4)
            .write_opcode(Opcode::imload)
            .write_opcode(Opcode::return_)
            .to_bytes();

        let image0 = build_image_with_single_function(0, code0);
        assert_eq!(process_program(&image0, &NativeTable::empty()).unwrap(), 0);
    }

    #[test]
    fn test_process_heap_array_element_access() {
        // arr = alloc_array(int, 3); arr[2] = 11; return arr[2] + arr[0]
        //
        // 0x0000 bipush 3
        // 0x0002 newarray 4
        // 0x0004 vstore 0
        // 0x0006 vload 0
        // 0x0008 bipush 2
        // 0x000a aadds
        // 0x000b bipush 11
        // 0x000d imstore
        // 0x000e vload 0
        // 0x0010 bipush 2
        // 0x0012 aadds
        // 0x0013 imload
        // 0x0014 vload 0
        // 0x0016 bipush 0
        // 0x0018 aadds
        // 0x0019 imload
        // 0x001a iadd
        // 0x001b return           ;; -> 11
        let code0 = BytecodeWriter::new()
            .write_opcode_i8(Opcode::bipush, 3)
            .write_opcode_u8(Opcode::newarray, 4)
            .write_opcode_u8(Opcode::vstore, 0)
            .write_opcode_u8(Opcode::vload, 0)
            .write_opcode_i8(Opcode::bipush, 2)
            .write_opcode(Opcode::aadds)
            .write_opcode_i8(Opcode::bipush, 11)
            .write_opcode(Opcode::imstore)
            .write_opcode_u8(Opcode::vload, 0)
            .write_opcode_i8(Opcode::bipush, 2)
            .write_opcode(Opcode::aadds)
            .write_opcode(Opcode::imload)
            .write_opcode_u8(Opcode::vload, 0)
            .write_opcode_i8(Opcode::bipush, 0)
            .write_opcode(Opcode::aadds)
            .write_opcode(Opcode::imload)
            .write_opcode(Opcode::iadd)
            .write_opcode(Opcode::return_)
            .to_bytes();

        let image0 = build_image_with_single_function(1, code0);
        assert_eq!(process_program(&image0, &NativeTable::empty()).unwrap(), 11);
    }

    #[test]
    fn test_process_heap_arraylength() {
        // 0x0000 bipush 5
        // 0x0002 newarray 4
        // 0x0004 arraylength
        // 0x0005 return           ;; -> 5
        let code0 = BytecodeWriter::new()
            .write_opcode_i8(Opcode::bipush, 5)
            .write_opcode_u8(Opcode::newarray, 4)
            .write_opcode(Opcode::arraylength)
            .write_opcode(Opcode::return_)
            .to_bytes();

        let image0 = build_image_with_single_function(0, code0);
        assert_eq!(process_program(&image0, &NativeTable::empty()).unwrap(), 5);
    }

    #[test]
    fn test_process_heap_array_bounds() {
        // index 3 of a 3-element array is one past the end
        //
        // 0x0000 bipush 3
        // 0x0002 newarray 4
        // 0x0004 bipush 3
        // 0x0006 aadds            ;; index == count, memory fault
        let code0 = BytecodeWriter::new()
            .write_opcode_i8(Opcode::bipush, 3)
            .write_opcode_u8(Opcode::newarray, 4)
            .write_opcode_i8(Opcode::bipush, 3)
            .write_opcode(Opcode::aadds)
            .write_opcode(Opcode::return_)
            .to_bytes();

        let image0 = build_image_with_single_function(0, code0);
        let fault0 = process_program(&image0, &NativeTable::empty()).unwrap_err();
        assert_eq!(fault0.kind, FaultKind::Memory);
    }

    #[test]
    fn test_process_heap_negative_array_size() {
        // 0x0000 bipush -1
        // 0x0002 newarray 4       ;; memory fault before allocating
        let code0 = BytecodeWriter::new()
            .write_opcode_i8(Opcode::bipush, -1)
            .write_opcode_u8(Opcode::newarray, 4)
            .write_opcode(Opcode::return_)
            .to_bytes();

        let image0 = build_image_with_single_function(0, code0);
        let fault0 = process_program(&image0, &NativeTable::empty()).unwrap_err();
        assert_eq!(fault0.kind, FaultKind::Memory);
    }

    #[test]
    fn test_process_heap_null_dereference() {
        // 0x0000 aconst_null
        // 0x0001 arraylength      ;; memory fault
        let code0 = BytecodeWriter::new()
            .write_opcode(Opcode::aconst_null)
            .write_opcode(Opcode::arraylength)
            .write_opcode(Opcode::return_)
            .to_bytes();

        let image0 = build_image_with_single_function(0, code0);
        let fault0 = process_program(&image0, &NativeTable::empty()).unwrap_err();
        assert_eq!(fault0.kind, FaultKind::Memory);
        assert_eq!(fault0.message, "arraylength: null pointer");
    }

    #[test]
    fn test_process_heap_null_field_access() {
        // 0x0000 aconst_null
        // 0x0001 aaddf 4          ;; memory fault
        let code0 = BytecodeWriter::new()
            .write_opcode(Opcode::aconst_null)
            .write_opcode_u8(Opcode::aaddf, 4)
            .write_opcode(Opcode::return_)
            .to_bytes();

        let image0 = build_image_with_single_function(0, code0);
        let fault0 = process_program(&image0, &NativeTable::empty()).unwrap_err();
        assert_eq!(fault0.kind, FaultKind::Memory);
    }

    #[test]
    fn test_process_heap_reference_cells() {
        // a struct holding a pointer to an array:
        // p = new(8); *p = arr; return arraylength(*p)
        //
        // 0x0000 new 8
        // 0x0002 vstore 0
        // 0x0004 vload 0
        // 0x0006 bipush 7
        // 0x0008 newarray 1
        // 0x000a amstore          ;; *p = arr
        // 0x000b vload 0
        // 0x000d amload           ;; *p
        // 0x000e arraylength
        // 0x000f return           ;; -> 7
        let code0 = BytecodeWriter::new()
            .write_opcode_u8(Opcode::new, 8)
            .write_opcode_u8(Opcode::vstore, 0)
            .write_opcode_u8(Opcode::vload, 0)
            .write_opcode_i8(Opcode::bipush, 7)
            .write_opcode_u8(Opcode::newarray, 1)
            .write_opcode(Opcode::amstore)
            .write_opcode_u8(Opcode::vload, 0)
            .write_opcode(Opcode::amload)
            .write_opcode(Opcode::arraylength)
            .write_opcode(Opcode::return_)
            .to_bytes();

        let image0 = build_image_with_single_function(1, code0);
        assert_eq!(process_program(&image0, &NativeTable::empty()).unwrap(), 7);
    }

    #[test]
    fn test_process_heap_amload_null_cell() {
        // a fresh block reads back a null reference, and null can be
        // compared but not dereferenced
        //
        // 0x0000 new 8
        // 0x0002 amload
        // 0x0003 aconst_null
        // 0x0004 if_cmpeq +8      ;; -> 0x000c
        // 0x0007 bipush 0
        // 0x0009 return
        // 0x000a nop
        // 0x000b nop
        // 0x000c bipush 1
        // 0x000e return           ;; -> 1
        let code0 = BytecodeWriter::new()
            .write_opcode_u8(Opcode::new, 8)
            .write_opcode(Opcode::amload)
            .write_opcode(Opcode::aconst_null)
            .write_opcode_i16(Opcode::if_cmpeq, 8)
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
    fn test_process_heap_char_store_masks_seven_bits() {
        // 0x0000 new 1
        // 0x0002 vstore 0
        // 0x0004 vload 0
        // 0x0006 bipush -1        ;; 0xffffffff, stored as 0x7f
        // 0x0008 cmstore
        // 0x0009 vload 0
        // 0x000b cmload
        // 0x000c return           ;; -> 127
        let code0 = BytecodeWriter::new()
            .write_opcode_u8(Opcode::new, 1)
            .write_opcode_u8(Opcode::vstore, 0)
            .write_opcode_u8(Opcode::vload, 0)
            .write_opcode_i8(Opcode::bipush, -1)
            .write_opcode(Opcode::cmstore)
            .write_opcode_u8(Opcode::vload, 0)
            .write_opcode(Opcode::cmload)
            .write_opcode(Opcode::return_)
            .to_bytes();

        let image0 = build_image_with_single_function(1, code0);
        assert_eq!(process_program(&image0, &NativeTable::empty()).unwrap(), 127);
    }
}
