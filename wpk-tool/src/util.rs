// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! General-purpose utilities used throughout the wpk-tool crate.

use crate::error::{Error, Result, ToolErrorKind};
use log::error;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Utility to get a string value either from a command-line option or a named environment variable.
pub fn get_config_from_command_or_env(
    config_option: &Option<String>,
    env_var_name: &str,
    purpose: &str,
) -> Result<String> {
    if let Some(option) = config_option {
        return Ok(option.clone());
    }

    // The option isn't on the command-line, so examine the environment variable instead
    std::env::var(env_var_name).map_err(|_| {
        error!(
            "No {} specified. Please specify on the command-line or by setting the `{}` environment variable.",
            purpose, env_var_name
        );
        Error::ToolError(ToolErrorKind::MissingConfiguration)
    })
}

/// Opens a package file for buffered streaming.
pub fn open_package(path: &str) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

/// Maps a package file name onto a path below `root`. Directory names (`/`, `/docs/`) map onto their
/// `index.html`.
pub fn output_path(root: &Path, file_name: &str) -> PathBuf {
    let relative = file_name.trim_start_matches('/');
    let mut path = root.join(relative);
    if relative.is_empty() || relative.ends_with('/') {
        path.push("index.html");
    }
    path
}
