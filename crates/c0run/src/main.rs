// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// the driver: read a compiled module, execute it, print the final
// return value as a decimal integer.
//
// exit status:
// - 0 on a normal return, the value goes to stdout
// - 1 on an i/o or module-loading problem
// - a category-specific code on a runtime fault, with the category
//   and diagnostic message on stderr
//
// set RUST_LOG=trace for the per-instruction execution log.

use std::{fmt::Display, fs::File, path::PathBuf, process::exit};

use clap::Parser;
use memmap2::Mmap;

use c0vm_binary::{program_image::ProgramImage, text_format::decode_text, ImageError};
use c0vm_runtime::{natives::standard_native_table, process::process_program};
use c0vm_types::fault::{Fault, FaultKind};

/// Execute a compiled C0 bytecode module.
#[derive(Parser)]
#[command(name = "c0run", version)]
struct Cli {
    /// path to the compiled module (.bc0)
    module: PathBuf,
}

#[derive(Debug)]
enum CliError {
    Io(std::io::Error),
    Image(ImageError),
    Fault(Fault),
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Io(e) => write!(f, "{}", e),
            CliError::Image(e) => write!(f, "{}", e),
            CliError::Fault(e) => write!(f, "{}", e),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<ImageError> for CliError {
    fn from(e: ImageError) -> Self {
        CliError::Image(e)
    }
}

fn fault_exit_code(kind: FaultKind) -> i32 {
    match kind {
        FaultKind::Arithmetic => 2,
        FaultKind::Memory => 3,
        FaultKind::AssertionFailure => 4,
        FaultKind::UserError => 5,
        FaultKind::InvalidOpcode => 6,
        FaultKind::StackUnderflow => 7,
        FaultKind::CallStackOverflow => 8,
    }
}

fn run(module_path: &PathBuf) -> Result<i32, CliError> {
    let file = File::open(module_path)?;
    let mmap = unsafe { Mmap::map(&file)? };

    // non-UTF-8 bytes can only occur inside invalid tokens, which the
    // decoder rejects anyway
    let source = String::from_utf8_lossy(&mmap);
    let data = decode_text(&source)?;
    let image = ProgramImage::load(&data)?;

    let natives = standard_native_table();
    process_program(&image, &natives).map_err(CliError::Fault)
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli.module) {
        Ok(value) => {
            println!("{}", value);
        }
        Err(CliError::Fault(fault)) => {
            eprintln!("c0run: {}", fault);
            exit(fault_exit_code(fault.kind));
        }
        Err(error) => {
            eprintln!("c0run: {}", error);
            exit(1);
        }
    }
}
