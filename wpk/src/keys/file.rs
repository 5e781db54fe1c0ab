// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! This module loads package keys from PEM files on the local filesystem. Key files would normally be
//! provisioned by an admin; the `wpk-tool keygen` subcommand can produce a pair for development use.

use super::local::{ClientKey, ServerKey};
use super::Result;

use std::fs;
use std::path::Path;

/// Reads a private key from a PKCS#1 or PKCS#8 PEM file.
pub fn read_server_key<P: AsRef<Path>>(path: P) -> Result<ServerKey> {
    let pem = fs::read_to_string(path)?;
    ServerKey::from_pem(&pem)
}

/// Reads a public key from a PKCS#1 or SubjectPublicKeyInfo PEM file.
pub fn read_client_key<P: AsRef<Path>>(path: P) -> Result<ClientKey> {
    let pem = fs::read_to_string(path)?;
    ClientKey::from_pem(&pem)
}
