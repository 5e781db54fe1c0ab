// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! This module provides the error definitions for errors that can occur while handling the key material
//! used to sign and verify web packages.

use thiserror::Error;

/// Specific error types for errors that can occur within key handling.
#[derive(Error, Debug)]
pub enum KeyError {
    /// Error emanating from standard I/O, such as when reading a key file.
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Error coming from the RSA crate, which can happen during key generation, signing or the OAEP
    /// encryption and decryption of small blobs.
    #[error(transparent)]
    RsaError(#[from] rsa::errors::Error),

    /// Error coming from the PKCS1 crate, when an `RSA PRIVATE KEY` or `RSA PUBLIC KEY` document cannot be
    /// parsed or produced.
    #[error(transparent)]
    Pkcs1Error(#[from] pkcs1::Error),

    /// Error coming from the PKCS8 crate, when a `PRIVATE KEY` or `PUBLIC KEY` document cannot be parsed or
    /// produced.
    #[error(transparent)]
    Pkcs8Error(#[from] pkcs8::Error),

    /// The key produces signatures that do not fit into the one-byte length of the signature frame.
    #[error("A {0}-bit key is too large. Package signatures are limited to 255 bytes, so keys can have at most 2040 bits.")]
    KeyTooLarge(usize),

    /// The text given as a key is not a PEM document of a supported kind.
    #[error("Unsupported key format. Expected a PKCS#1 or PKCS#8 PEM document.")]
    UnsupportedKeyFormat,
}
