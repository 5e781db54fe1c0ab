// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! Error definitions/handling.

use thiserror::Error;

/// Errors in wpk-tool
#[derive(Error, Debug)]
pub enum Error {
    /// Error emanating from standard I/O.
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Errors coming from the package processing, due to the package being unreadable, malformed, or
    /// failing its signature check.
    #[error(transparent)]
    PackageProcessingError(#[from] wpk::package::error::Error),

    /// Errors relating to the key material used for verification.
    #[error(transparent)]
    #[cfg(any(feature = "verify", feature = "keygen"))]
    KeyError(#[from] wpk::keys::error::KeyError),

    /// The package was read, but does not check out against the given key.
    #[error(transparent)]
    VerificationError(#[from] wpk::package::error::VerificationError),

    /// Errors relating to JSON processing.
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// Error emanating from the wpk-tool itself.
    #[error(transparent)]
    ToolError(#[from] ToolErrorKind),
}

/// Errors originating in the wpk-tool itself.
#[derive(Error, Debug)]
pub enum ToolErrorKind {
    /// There is some missing configuration for a command, such as a required environment variable or
    /// configuration file/option.
    #[error("Missing configuration")]
    MissingConfiguration,

    /// The output directory for `extract` exists, but is not a directory.
    #[error("The output path is not a directory")]
    NotADirectory,
}

/// A Result type with the Err variant set as a ToolError
pub type Result<T> = std::result::Result<T, Error>;
