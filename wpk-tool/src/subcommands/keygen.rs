// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! Generates a key pair for signing web packages, and writes it to the console.

use crate::error::Result;

use log::info;
use structopt::StructOpt;
use wpk::keys::local::DEFAULT_KEY_BITS;
use wpk::keys::ServerKey;

/// Models the options required by the keygen command.
#[derive(Debug, StructOpt)]
pub struct KeyGen {
    /// The modulus size in bits. Signatures must fit the 255-byte signature frame, so at most 2040 bits
    /// are accepted.
    #[structopt(short = "b", long = "bits")]
    bits: Option<usize>,
}

impl KeyGen {
    /// Generates the key pair and prints the private key (PKCS#8) followed by the public key
    /// (SubjectPublicKeyInfo), both PEM-encoded.
    pub fn run(&self) -> Result<()> {
        let bits = self.bits.unwrap_or(DEFAULT_KEY_BITS);
        info!("Generating a {}-bit RSA key pair. This can take a while.", bits);

        let server_key = ServerKey::generate(bits)?;

        // Just the PEM blocks, so that the output can be split with standard tools.
        print!("{}", server_key.to_pem()?);
        print!("{}", server_key.client_key().to_pem()?);

        Ok(())
    }
}
