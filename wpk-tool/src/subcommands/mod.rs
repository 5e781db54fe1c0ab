// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! Subcommand implementations.

mod extract;
mod inspect;

#[cfg(feature = "keygen")]
mod keygen;

#[cfg(feature = "verify")]
mod verify;

use crate::error::Result;

use crate::subcommands::extract::Extract;
use crate::subcommands::inspect::Inspect;

#[cfg(feature = "keygen")]
use crate::subcommands::keygen::KeyGen;

#[cfg(feature = "verify")]
use crate::subcommands::verify::Verify;

use structopt::StructOpt;

/// Command-line interface to wpk-tool operations.
#[derive(Debug, StructOpt)]
pub enum Subcommand {
    /// Lists the metadata and files of a web package without loading file content into memory.
    Inspect(Inspect),

    /// Writes the files of a web package below an output directory.
    Extract(Extract),

    /// Checks the signature of a web package, and the content hashes of its files, against a public key.
    #[cfg(feature = "verify")]
    Verify(Verify),

    /// Generates an RSA key pair suitable for signing packages, and writes both halves to the console
    /// as PEM.
    #[cfg(feature = "keygen")]
    KeyGen(KeyGen),
}

impl Subcommand {
    /// Runs the command.
    pub fn run(&self) -> Result<()> {
        match &self {
            Subcommand::Inspect(cmd) => cmd.run(),
            Subcommand::Extract(cmd) => cmd.run(),
            #[cfg(feature = "verify")]
            Subcommand::Verify(cmd) => cmd.run(),
            #[cfg(feature = "keygen")]
            Subcommand::KeyGen(cmd) => cmd.run(),
        }
    }
}
