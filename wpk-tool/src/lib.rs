// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! wpk-tool: a tool for inspecting, extracting and verifying web packages.

pub mod cli;
pub mod common;
pub mod error;
pub mod subcommands;
pub mod util;
