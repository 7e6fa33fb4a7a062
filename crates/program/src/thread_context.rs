// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use c0vm_binary::program_image::ProgramImage;
use c0vm_types::{fault::Fault, Value};

use crate::{heap::Heap, native::NativeTable, operand_stack::OperandStack};

/// the position of the next executing instruction.
///
/// the code of each function is a separate byte array, so the complete
/// program counter is the pair of the function index and the byte
/// address inside that function's code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramCounter {
    pub function_index: usize,
    pub instruction_address: usize,
}

/// a suspended activation record.
///
/// when 'invokestatic' transfers control, the caller's operand stack,
/// locals and resume position are moved into a frame and pushed onto
/// the call stack; 'return' pops the frame and puts them back. the
/// frame is dropped at that point, so per-call state never outlives
/// the call.
#[derive(Debug)]
pub struct Frame {
    pub operands: OperandStack,
    pub locals: Vec<Value>,
    pub return_pc: ProgramCounter,
}

/// the complete execution state of one program run: the live operand
/// stack and locals, the call stack of suspended frames, the managed
/// heap, and the (immutable) program image and native table.
///
/// the machine is strictly single threaded; one ThreadContext drives
/// one run from entry to return-or-fault.
pub struct ThreadContext<'a> {
    pub operand_stack: OperandStack,
    pub locals: Vec<Value>,
    pub pc: ProgramCounter,
    pub call_stack: Vec<Frame>,
    pub heap: Heap,
    pub image: &'a ProgramImage,
    pub natives: &'a NativeTable,
}

impl<'a> ThreadContext<'a> {
    /// the initial state: an activation of function 0 (the entry
    /// function, zero arguments) with zero-initialised locals
    pub fn new(image: &'a ProgramImage, natives: &'a NativeTable) -> Self {
        let entry = &image.function_pool[0];
        let locals = vec![Value::Int(0); entry.num_vars as usize];

        Self {
            operand_stack: OperandStack::new(),
            locals,
            pc: ProgramCounter {
                function_index: 0,
                instruction_address: 0,
            },
            call_stack: Vec::new(),
            heap: Heap::new(&image.string_pool),
            image,
            natives,
        }
    }

    /// the code of the function the pc currently points into
    pub fn function_code(&self) -> &[u8] {
        &self.image.function_pool[self.pc.function_index].code
    }

    /// the instruction byte at the pc, or None when the pc has run
    /// off the end of the function
    pub fn opcode_byte(&self) -> Option<u8> {
        self.function_code()
            .get(self.pc.instruction_address)
            .copied()
    }

    fn immediate(&self, index: usize) -> Result<u8, Fault> {
        self.function_code()
            .get(self.pc.instruction_address + index)
            .copied()
            .ok_or_else(|| Fault::memory("unexpected end of bytecode"))
    }

    /// the unsigned byte immediately after the opcode
    pub fn get_param_u8(&self) -> Result<u8, Fault> {
        self.immediate(1)
    }

    /// the signed byte immediately after the opcode ('bipush')
    pub fn get_param_i8(&self) -> Result<i8, Fault> {
        Ok(self.immediate(1)? as i8)
    }

    /// the big-endian unsigned two-byte immediate (pool and function
    /// indexes)
    pub fn get_param_u16(&self) -> Result<u16, Fault> {
        let c1 = self.immediate(1)?;
        let c2 = self.immediate(2)?;
        Ok(u16::from_be_bytes([c1, c2]))
    }

    /// the big-endian signed two-byte immediate (branch offsets)
    pub fn get_param_i16(&self) -> Result<i16, Fault> {
        Ok(self.get_param_u16()? as i16)
    }
}
