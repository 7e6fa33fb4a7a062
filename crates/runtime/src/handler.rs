// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use c0vm_program::thread_context::{ProgramCounter, ThreadContext};
use c0vm_types::{
    fault::Fault,
    opcode::{Opcode, MAX_OPCODE_NUMBER},
    Value,
};

mod arithmetic;
mod assertion;
mod calling;
mod constant;
mod control_flow;
mod fundamental;
mod heap;
mod local;

pub type HandleFunc = fn(&mut ThreadContext) -> Result<HandleResult, Fault>;

pub enum HandleResult {
    // advance the pc by the instruction length in bytes
    Move(usize),

    // transfer control: a branch within the current function, a call
    // into another function, or a return to the suspended caller
    Jump(ProgramCounter),

    // a 'return' with an empty call stack, carrying the final value
    // of the program
    End(Value),
}

fn invalid_opcode(thread_context: &mut ThreadContext) -> Result<HandleResult, Fault> {
    // the dispatch loop has already fetched this byte, so it exists
    let opcode = thread_context.opcode_byte().unwrap_or_default();
    Err(Fault::invalid_opcode(opcode))
}

/// the dispatch table, one entry per possible instruction byte.
///
/// the opcode numbering is sparse; unassigned bytes resolve to the
/// invalid-opcode handler.
pub struct Handler {
    pub handlers: [HandleFunc; MAX_OPCODE_NUMBER],
}

impl Handler {
    pub fn new() -> Self {
        let mut handlers: [HandleFunc; MAX_OPCODE_NUMBER] = [invalid_opcode; MAX_OPCODE_NUMBER];

        // operand stack
        handlers[Opcode::nop as usize] = fundamental::nop;
        handlers[Opcode::pop as usize] = fundamental::pop;
        handlers[Opcode::dup as usize] = fundamental::dup;
        handlers[Opcode::swap as usize] = fundamental::swap;

        // arithmetic
        handlers[Opcode::iadd as usize] = arithmetic::iadd;
        handlers[Opcode::isub as usize] = arithmetic::isub;
        handlers[Opcode::imul as usize] = arithmetic::imul;
        handlers[Opcode::idiv as usize] = arithmetic::idiv;
        handlers[Opcode::irem as usize] = arithmetic::irem;
        handlers[Opcode::iand as usize] = arithmetic::iand;
        handlers[Opcode::ior as usize] = arithmetic::ior;
        handlers[Opcode::ixor as usize] = arithmetic::ixor;
        handlers[Opcode::ishl as usize] = arithmetic::ishl;
        handlers[Opcode::ishr as usize] = arithmetic::ishr;

        // constants
        handlers[Opcode::bipush as usize] = constant::bipush;
        handlers[Opcode::ildc as usize] = constant::ildc;
        handlers[Opcode::aldc as usize] = constant::aldc;
        handlers[Opcode::aconst_null as usize] = constant::aconst_null;

        // local variables
        handlers[Opcode::vload as usize] = local::vload;
        handlers[Opcode::vstore as usize] = local::vstore;

        // assertions and errors
        handlers[Opcode::athrow as usize] = assertion::athrow;
        handlers[Opcode::assert as usize] = assertion::assert;

        // control flow
        handlers[Opcode::goto as usize] = control_flow::goto;
        handlers[Opcode::if_cmpeq as usize] = control_flow::if_cmpeq;
        handlers[Opcode::if_cmpne as usize] = control_flow::if_cmpne;
        handlers[Opcode::if_icmplt as usize] = control_flow::if_icmplt;
        handlers[Opcode::if_icmpge as usize] = control_flow::if_icmpge;
        handlers[Opcode::if_icmpgt as usize] = control_flow::if_icmpgt;
        handlers[Opcode::if_icmple as usize] = control_flow::if_icmple;

        // function calls
        handlers[Opcode::invokestatic as usize] = calling::invokestatic;
        handlers[Opcode::invokenative as usize] = calling::invokenative;
        handlers[Opcode::return_ as usize] = calling::return_;

        // allocation and memory access
        handlers[Opcode::new as usize] = heap::new;
        handlers[Opcode::newarray as usize] = heap::newarray;
        handlers[Opcode::arraylength as usize] = heap::arraylength;
        handlers[Opcode::aaddf as usize] = heap::aaddf;
        handlers[Opcode::aadds as usize] = heap::aadds;
        handlers[Opcode::imload as usize] = heap::imload;
        handlers[Opcode::imstore as usize] = heap::imstore;
        handlers[Opcode::amload as usize] = heap::amload;
        handlers[Opcode::amstore as usize] = heap::amstore;
        handlers[Opcode::cmload as usize] = heap::cmload;
        handlers[Opcode::cmstore as usize] = heap::cmstore;

        Self { handlers }
    }
}

impl Default for Handler {
    fn default() -> Self {
        Self::new()
    }
}
