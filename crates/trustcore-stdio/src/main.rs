// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! Stdio entry point: reads [`trustcore_stdio::ShimCommand`] lines from real
//! stdin and writes [`trustcore_stdio::ShimDecision`] lines to real stdout
//! until stdin closes.

use std::io::{self, BufReader};
use std::process::ExitCode;

use trustcore_stdio::StdioGovernanceShim;

fn main() -> ExitCode {
    let stdin = BufReader::new(io::stdin());
    let stdout = io::stdout();

    let mut shim = StdioGovernanceShim::new();
    match shim.run(stdin, stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("trustcore-stdio: {error}");
            ExitCode::FAILURE
        }
    }
}
