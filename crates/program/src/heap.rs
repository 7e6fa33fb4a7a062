// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// the managed heap is a table of objects addressed by handle. a
// reference value carries (handle, byte offset), and every load/store
// goes through this table, so the machine stays memory safe no matter
// what the bytecode does.
//
// object layout:
//
// - block: an untyped byte buffer, produced by instruction 'new'.
//   field access ('aaddf') is plain offset arithmetic on the
//   reference.
// - array: an element size, an element count and the element buffer,
//   produced by instruction 'newarray'. element access ('aadds') is
//   bounds checked against the count.
// - the string pool of the program image is installed as the first
//   object (handle 1) when the heap is created, which makes
//   string-pool references ('aldc') ordinary heap references.
//
// nothing is ever freed: allocations live until the machine itself is
// dropped, and interior references therefore stay valid for the whole
// run.
//
// reference cells inside heap memory ('amload'/'amstore') occupy
// 8 bytes: the handle and the offset words, little-endian. the null
// reference encodes as all zero bytes, so zero-initialised memory
// reads back as null.

use c0vm_types::{fault::Fault, HeapRef};

/// the object handle of the string pool
pub const STRING_POOL_HANDLE: u32 = 1;

const REF_CELL_SIZE: usize = 8;

#[derive(Debug)]
enum HeapObject {
    Block {
        data: Vec<u8>,
    },
    Array {
        elt_size: usize,
        count: i32,
        data: Vec<u8>,
    },
}

impl HeapObject {
    fn data(&self) -> &[u8] {
        match self {
            HeapObject::Block { data } => data,
            HeapObject::Array { data, .. } => data,
        }
    }

    fn data_mut(&mut self) -> &mut [u8] {
        match self {
            HeapObject::Block { data } => data,
            HeapObject::Array { data, .. } => data,
        }
    }
}

#[derive(Debug)]
pub struct Heap {
    objects: Vec<HeapObject>,
}

impl Heap {
    pub fn new(string_pool: &[u8]) -> Self {
        // handle 0 is the null reference, handles start at 1
        let objects = vec![HeapObject::Block {
            data: string_pool.to_vec(),
        }];
        Self { objects }
    }

    /// a reference to the string at `offset` in the string pool
    pub fn string_pool_ref(offset: u32) -> HeapRef {
        HeapRef::new(STRING_POOL_HANDLE, offset)
    }

    fn install(&mut self, object: HeapObject) -> HeapRef {
        let size = object.data().len();
        self.objects.push(object);
        let handle = self.objects.len() as u32;
        log::trace!("heap alloc: handle {}, {} bytes", handle, size);
        HeapRef::new(handle, 0)
    }

    /// a zero-initialised untyped block, instruction 'new'
    pub fn alloc_block(&mut self, size: usize) -> HeapRef {
        self.install(HeapObject::Block {
            data: vec![0u8; size],
        })
    }

    /// a zero-initialised array, instruction 'newarray'.
    /// the caller has already rejected negative counts.
    pub fn alloc_array(&mut self, elt_size: usize, count: i32) -> HeapRef {
        self.install(HeapObject::Array {
            elt_size,
            count,
            data: vec![0u8; elt_size * count as usize],
        })
    }

    /// a NUL-terminated copy of a host string, for natives that
    /// produce strings
    pub fn alloc_string(&mut self, string: &str) -> HeapRef {
        let mut data = string.as_bytes().to_vec();
        data.push(0);
        self.install(HeapObject::Block { data })
    }

    fn object(&self, reference: HeapRef) -> Result<&HeapObject, Fault> {
        if reference.is_null() {
            return Err(Fault::memory("null pointer dereference"));
        }
        self.objects
            .get(reference.handle as usize - 1)
            .ok_or_else(|| Fault::memory("dangling heap reference"))
    }

    fn object_mut(&mut self, reference: HeapRef) -> Result<&mut HeapObject, Fault> {
        if reference.is_null() {
            return Err(Fault::memory("null pointer dereference"));
        }
        self.objects
            .get_mut(reference.handle as usize - 1)
            .ok_or_else(|| Fault::memory("dangling heap reference"))
    }

    fn target<'a>(object: &'a HeapObject, reference: HeapRef, length: usize) -> Result<&'a [u8], Fault> {
        let offset = reference.offset as usize;
        let data = object.data();
        if offset + length > data.len() {
            return Err(Fault::memory("heap access out of bounds"));
        }
        Ok(&data[offset..(offset + length)])
    }

    fn target_mut<'a>(
        object: &'a mut HeapObject,
        reference: HeapRef,
        length: usize,
    ) -> Result<&'a mut [u8], Fault> {
        let offset = reference.offset as usize;
        let data = object.data_mut();
        if offset + length > data.len() {
            return Err(Fault::memory("heap access out of bounds"));
        }
        Ok(&mut data[offset..(offset + length)])
    }

    /// the (element size, element count) header of an array object
    pub fn array_info(&self, reference: HeapRef) -> Result<(usize, i32), Fault> {
        match self.object(reference)? {
            HeapObject::Array {
                elt_size, count, ..
            } => Ok((*elt_size, *count)),
            HeapObject::Block { .. } => Err(Fault::memory("reference is not an array")),
        }
    }

    /// a 32-bit integer cell, little-endian, instruction 'imload'
    pub fn read_i32(&self, reference: HeapRef) -> Result<i32, Fault> {
        let bytes = Self::target(self.object(reference)?, reference, 4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn write_i32(&mut self, reference: HeapRef, value: i32) -> Result<(), Fault> {
        let bytes = Self::target_mut(self.object_mut(reference)?, reference, 4)?;
        bytes.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// a single byte cell, instruction 'cmload'
    pub fn read_u8(&self, reference: HeapRef) -> Result<u8, Fault> {
        let bytes = Self::target(self.object(reference)?, reference, 1)?;
        Ok(bytes[0])
    }

    pub fn write_u8(&mut self, reference: HeapRef, value: u8) -> Result<(), Fault> {
        let bytes = Self::target_mut(self.object_mut(reference)?, reference, 1)?;
        bytes[0] = value;
        Ok(())
    }

    /// an 8-byte reference cell, instruction 'amload'
    pub fn read_ref(&self, reference: HeapRef) -> Result<HeapRef, Fault> {
        let bytes = Self::target(self.object(reference)?, reference, REF_CELL_SIZE)?;
        let handle = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let offset = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Ok(HeapRef::new(handle, offset))
    }

    pub fn write_ref(&mut self, reference: HeapRef, target: HeapRef) -> Result<(), Fault> {
        let bytes = Self::target_mut(self.object_mut(reference)?, reference, REF_CELL_SIZE)?;
        bytes[0..4].copy_from_slice(&target.handle.to_le_bytes());
        bytes[4..8].copy_from_slice(&target.offset.to_le_bytes());
        Ok(())
    }

    /// the NUL-terminated string starting at the reference, for the
    /// diagnostic message of 'athrow'/'assert' and for string natives
    pub fn read_cstr(&self, reference: HeapRef) -> Result<String, Fault> {
        let object = self.object(reference)?;
        let data = object.data();
        let offset = reference.offset as usize;
        if offset > data.len() {
            return Err(Fault::memory("heap access out of bounds"));
        }
        let tail = &data[offset..];
        let end = tail.iter().position(|byte| *byte == 0).unwrap_or(tail.len());
        Ok(String::from_utf8_lossy(&tail[..end]).into_owned())
    }
}
