// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// the binary layout of a compiled module, all integers big-endian:
//
// |--------------------------------------------------|
// | magic number (4 bytes) "C0 C0 FF EE"             |
// | version (u16)                                    |
// |--------------------------------------------------|
// | int_count (u16)                                  |
// | int pool, int_count x i32                        |
// |--------------------------------------------------|
// | string_count (u16), the POOL SIZE in bytes       |
// | string pool, NUL-terminated strings concatenated |
// |--------------------------------------------------|
// | function_count (u16)                             |
// | function_count x function record:                |
// |   num_args (u8) | num_vars (u8)                  |
// |   code_length (u16) | code, code_length bytes    |
// |--------------------------------------------------|
// | native_count (u16)                               |
// | native_count x native record:                    |
// |   num_args (u16) | function_table_index (u16)    |
// |--------------------------------------------------|
//
// the entry point of a module is always function 0, invoked with
// zero arguments.

use crate::ImageError;

pub const IMAGE_MAGIC: u32 = 0xc0c0ffee;

/// one callable unit of bytecode
#[derive(Debug, PartialEq, Eq)]
pub struct FunctionInfo {
    pub num_args: u8,
    pub num_vars: u8,
    pub code: Vec<u8>,
}

/// one entry of the native pool: how many arguments to pop and which
/// slot of the process-wide native function table to invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeInfo {
    pub num_args: u16,
    pub function_table_index: u16,
}

/// the in-memory form of a compiled module.
///
/// the image is immutable once loaded and outlives every activation
/// frame; instructions index into the pools but never modify them.
#[derive(Debug, PartialEq, Eq)]
pub struct ProgramImage {
    pub version: u16,
    pub int_pool: Vec<i32>,
    pub string_pool: Vec<u8>,
    pub function_pool: Vec<FunctionInfo>,
    pub native_pool: Vec<NativeInfo>,
}

impl ProgramImage {
    pub fn load(data: &[u8]) -> Result<Self, ImageError> {
        let mut reader = ImageReader::new(data);

        let magic = reader.read_u32()?;
        if magic != IMAGE_MAGIC {
            return Err(ImageError::BadMagic(magic));
        }

        let version = reader.read_u16()?;

        let int_count = reader.read_u16()? as usize;
        let mut int_pool: Vec<i32> = Vec::with_capacity(int_count);
        for _ in 0..int_count {
            int_pool.push(reader.read_i32()?);
        }

        let string_count = reader.read_u16()? as usize;
        let string_pool = reader.read_bytes(string_count)?.to_vec();

        let function_count = reader.read_u16()? as usize;
        let mut function_pool: Vec<FunctionInfo> = Vec::with_capacity(function_count);
        for _ in 0..function_count {
            let num_args = reader.read_u8()?;
            let num_vars = reader.read_u8()?;
            let code_length = reader.read_u16()? as usize;
            let code = reader.read_bytes(code_length)?.to_vec();
            function_pool.push(FunctionInfo {
                num_args,
                num_vars,
                code,
            });
        }

        if function_pool.is_empty() {
            return Err(ImageError::EmptyFunctionPool);
        }

        let native_count = reader.read_u16()? as usize;
        let mut native_pool: Vec<NativeInfo> = Vec::with_capacity(native_count);
        for _ in 0..native_count {
            let num_args = reader.read_u16()?;
            let function_table_index = reader.read_u16()?;
            native_pool.push(NativeInfo {
                num_args,
                function_table_index,
            });
        }

        let remaining = reader.remaining();
        if remaining != 0 {
            return Err(ImageError::TrailingData(remaining));
        }

        log::debug!(
            "loaded module image: version {}, {} ints, {} string bytes, {} functions, {} natives",
            version,
            int_pool.len(),
            string_pool.len(),
            function_pool.len(),
            native_pool.len()
        );

        Ok(Self {
            version,
            int_pool,
            string_pool,
            function_pool,
            native_pool,
        })
    }
}

struct ImageReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ImageReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn read_bytes(&mut self, length: usize) -> Result<&'a [u8], ImageError> {
        if self.offset + length > self.data.len() {
            return Err(ImageError::UnexpectedEnd);
        }
        let bytes = &self.data[self.offset..(self.offset + length)];
        self.offset += length;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8, ImageError> {
        let bytes = self.read_bytes(1)?;
        Ok(bytes[0])
    }

    fn read_u16(&mut self) -> Result<u16, ImageError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, ImageError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_i32(&mut self) -> Result<i32, ImageError> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }
}
