// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! Common variables.

/// The project name from Cargo.
pub const PROJECT_NAME: &str = env!("CARGO_PKG_NAME");

/// The project description from Cargo.
pub const PROJECT_DESC: &str = env!("CARGO_PKG_DESCRIPTION");

/// The project author from Cargo.
pub const PROJECT_AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// The project version from Cargo.
pub const PROJECT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The environment variable naming the public key file used by `verify` when `--key` is not given.
pub const CLIENT_KEY_ENV_VAR: &str = "WPK_CLIENT_KEY";
