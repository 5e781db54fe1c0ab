// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! The wpk crate contains the functionality required to build, encode, decode, sign and verify files that
//! adopt the Web Package (.wpk) file format.

#[cfg(feature = "key-management")]
pub mod keys;

pub mod package;
