// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use c0vm_types::{fault::Fault, Value};

use crate::heap::Heap;

/// a host function callable from bytecode via 'invokenative'.
///
/// arguments arrive in declaration order (args[0] is the first
/// argument). the heap is passed in so a native can read VM strings
/// and allocate new objects; a native that has no interesting result
/// returns Int(0). natives may raise any fault.
pub type NativeFunction = fn(&mut Heap, &[Value]) -> Result<Value, Fault>;

/// the process-wide table of host callables.
///
/// the native pool of a program image refers to entries of this table
/// by index ('function_table_index'); the table itself is fixed for
/// the lifetime of the run.
pub struct NativeTable {
    functions: Vec<NativeFunction>,
}

impl NativeTable {
    pub fn new(functions: Vec<NativeFunction>) -> Self {
        Self { functions }
    }

    pub fn empty() -> Self {
        Self {
            functions: Vec::new(),
        }
    }

    pub fn get(&self, index: usize) -> Option<NativeFunction> {
        self.functions.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::{heap::Heap, native::NativeTable};
    use c0vm_types::{fault::Fault, Value};

    fn native_forty_two(_heap: &mut Heap, _args: &[Value]) -> Result<Value, Fault> {
        Ok(Value::Int(42))
    }

    #[test]
    fn test_native_table_lookup() {
        let table0 = NativeTable::new(vec![native_forty_two]);
        assert_eq!(table0.len(), 1);

        let function0 = table0.get(0).unwrap();
        let mut heap0 = Heap::new(&[]);
        assert_eq!(function0(&mut heap0, &[]).unwrap(), Value::Int(42));

        assert!(table0.get(1).is_none());
        assert!(NativeTable::empty().is_empty());
    }
}
