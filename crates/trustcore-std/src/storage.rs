// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! Storage backend implementations.

pub mod file;
