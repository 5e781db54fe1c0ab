// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! Verifies the signature of a web package.

use crate::common::CLIENT_KEY_ENV_VAR;
use crate::error::Result;
use crate::util::{get_config_from_command_or_env, open_package};

use log::info;
use structopt::StructOpt;
use wpk::keys::file::read_client_key;
use wpk::package::read_from_stream;

/// Models the options required by the verify command.
#[derive(Debug, StructOpt)]
pub struct Verify {
    /// The input file, which must be a web package (.wpk) file.
    #[structopt(short = "p", long = "package")]
    package_path: String,

    /// The public key file, in PEM format. If not supplied, the path is taken from the
    /// WPK_CLIENT_KEY environment variable.
    #[structopt(short = "k", long = "key")]
    key_path: Option<String>,
}

impl Verify {
    /// Loads the whole package, then checks its signature and every file's content hash.
    pub fn run(&self) -> Result<()> {
        let key_path = get_config_from_command_or_env(&self.key_path, CLIENT_KEY_ENV_VAR, "public key file")?;
        let key = read_client_key(&key_path)?;

        let mut stream = open_package(&self.package_path)?;
        let package = read_from_stream(&mut stream)?;
        package.verify(&key)?;

        info!(
            "{} is signed by the holder of {} ({} files).",
            self.package_path,
            key_path,
            package.files().len()
        );
        Ok(())
    }
}
