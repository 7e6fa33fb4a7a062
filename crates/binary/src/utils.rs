// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

//! helper functions for building in-memory program images, mainly
//! for unit tests.

use crate::program_image::{FunctionInfo, NativeInfo, ProgramImage};

pub struct HelperFunctionEntry {
    pub num_args: u8,
    pub num_vars: u8,
    pub code: Vec<u8>,
}

/// an image whose only function is the entry function (no arguments)
pub fn build_image_with_single_function(num_vars: u8, code: Vec<u8>) -> ProgramImage {
    build_image_with_functions(vec![HelperFunctionEntry {
        num_args: 0,
        num_vars,
        code,
    }])
}

/// an image with the specified functions and empty pools;
/// function 0 is the entry
pub fn build_image_with_functions(entries: Vec<HelperFunctionEntry>) -> ProgramImage {
    build_image(vec![], vec![], entries, vec![])
}

pub fn build_image(
    int_pool: Vec<i32>,
    string_pool: Vec<u8>,
    entries: Vec<HelperFunctionEntry>,
    native_pool: Vec<NativeInfo>,
) -> ProgramImage {
    let function_pool = entries
        .into_iter()
        .map(|entry| FunctionInfo {
            num_args: entry.num_args,
            num_vars: entry.num_vars,
            code: entry.code,
        })
        .collect::<Vec<_>>();

    ProgramImage {
        version: 0,
        int_pool,
        string_pool,
        function_pool,
        native_pool,
    }
}

/// concatenate NUL-terminated strings into a pool, returning the pool
/// and the byte offset of each string (the operand of 'aldc')
pub fn build_string_pool(strings: &[&str]) -> (Vec<u8>, Vec<u16>) {
    let mut pool: Vec<u8> = Vec::new();
    let mut offsets: Vec<u16> = Vec::with_capacity(strings.len());

    for string in strings {
        offsets.push(pool.len() as u16);
        pool.extend_from_slice(string.as_bytes());
        pool.push(0);
    }

    (pool, offsets)
}
