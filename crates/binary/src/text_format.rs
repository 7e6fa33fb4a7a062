// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// compiled modules are shipped as text rather than raw bytes: a
// sequence of two-digit hexadecimal byte pairs separated by
// whitespace, with '#' comments running to the end of the line, e.g.
//
// ```text
// C0 C0 FF EE    # magic number
// 00 09          # version
// 00 00          # int pool count
// ...
// ```
//
// decoding the container yields the byte stream that
// `ProgramImage::load` parses.

use crate::ImageError;

pub fn decode_text(source: &str) -> Result<Vec<u8>, ImageError> {
    let mut bytes: Vec<u8> = Vec::new();

    for line in source.lines() {
        let content = match line.split_once('#') {
            Some((content, _comment)) => content,
            None => line,
        };

        for token in content.split_whitespace() {
            // exactly two hex digits; from_str_radix alone would also
            // accept a sign character
            if token.len() != 2 || !token.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ImageError::InvalidHexToken(token.to_owned()));
            }
            let byte = u8::from_str_radix(token, 16)
                .map_err(|_| ImageError::InvalidHexToken(token.to_owned()))?;
            bytes.push(byte);
        }
    }

    Ok(bytes)
}
