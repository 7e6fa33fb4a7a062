// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

pub mod fault;
pub mod opcode;

use crate::fault::Fault;

/// the data type of
/// - operand stack slots
/// - local variable slots
/// - native function arguments and results
///
/// every value the machine moves around is either a 32-bit signed
/// integer or a reference into the managed heap. the tag is part of
/// the value and is checked whenever an instruction extracts the
/// payload, so an integer can never be dereferenced and a reference
/// can never take part in arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Ref(HeapRef),
}

impl Value {
    /// the null reference, i.e. the value pushed by instruction 'aconst_null'
    pub const NULL: Value = Value::Ref(HeapRef::NULL);

    pub fn as_int(self) -> Result<i32, Fault> {
        match self {
            Value::Int(i) => Ok(i),
            Value::Ref(_) => Err(Fault::memory("value is not an integer")),
        }
    }

    pub fn as_ref(self) -> Result<HeapRef, Fault> {
        match self {
            Value::Ref(r) => Ok(r),
            Value::Int(_) => Err(Fault::memory("value is not a reference")),
        }
    }

    pub fn is_null(self) -> bool {
        matches!(self, Value::Ref(r) if r.is_null())
    }
}

/// a reference into the managed heap.
///
/// instead of a raw host pointer, a reference is the pair of a heap
/// object handle and a byte offset into that object's storage. interior
/// references (produced by the field/element addressing instructions)
/// are simply references with a non-zero offset, and they stay valid as
/// long as the containing object, that is, for the whole run.
///
/// handle 0 is reserved for the null reference, so a reference cell
/// that is stored into zero-initialised heap memory and read back
/// decodes to null. the handle of the first real object is 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapRef {
    pub handle: u32,
    pub offset: u32,
}

impl HeapRef {
    pub const NULL: HeapRef = HeapRef {
        handle: 0,
        offset: 0,
    };

    pub fn new(handle: u32, offset: u32) -> Self {
        Self { handle, offset }
    }

    pub fn is_null(self) -> bool {
        self.handle == 0
    }

    /// the reference `offset` bytes further into the same object,
    /// i.e. the result of instruction 'aaddf'
    pub fn add_offset(self, offset: u32) -> Self {
        Self {
            handle: self.handle,
            offset: self.offset + offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{fault::FaultKind, HeapRef, Value};

    #[test]
    fn test_value_tag_check() {
        assert_eq!(Value::Int(11).as_int().unwrap(), 11);
        assert_eq!(
            Value::Ref(HeapRef::new(1, 0)).as_ref().unwrap(),
            HeapRef::new(1, 0)
        );

        let fault0 = Value::Int(11).as_ref().unwrap_err();
        assert_eq!(fault0.kind, FaultKind::Memory);

        let fault1 = Value::Ref(HeapRef::NULL).as_int().unwrap_err();
        assert_eq!(fault1.kind, FaultKind::Memory);
    }

    #[test]
    fn test_value_equality() {
        // within a tag
        assert_eq!(Value::Int(13), Value::Int(13));
        assert_ne!(Value::Int(13), Value::Int(17));
        assert_eq!(
            Value::Ref(HeapRef::new(1, 4)),
            Value::Ref(HeapRef::new(1, 4))
        );
        assert_ne!(
            Value::Ref(HeapRef::new(1, 4)),
            Value::Ref(HeapRef::new(2, 4))
        );

        // both null
        assert_eq!(Value::NULL, Value::Ref(HeapRef::NULL));

        // across tags, always unequal
        assert_ne!(Value::Int(0), Value::NULL);
    }

    #[test]
    fn test_heap_ref_offset() {
        let r0 = HeapRef::new(3, 8);
        let r1 = r0.add_offset(4);
        assert_eq!(r1.handle, 3);
        assert_eq!(r1.offset, 12);

        assert!(HeapRef::NULL.is_null());
        assert!(!r0.is_null());
        assert!(Value::NULL.is_null());
        assert!(!Value::Int(0).is_null());
    }
}
