// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! Writes the files of a web package to a directory on the local filesystem.

use crate::error::{Error, Result, ToolErrorKind};
use crate::util::{open_package, output_path};

use log::{error, info};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use structopt::StructOpt;
use wpk::package::reader::{read_from_stream_with_sink, ContentSink};
use wpk::package::Content;

/// Models the options required by the extract command.
#[derive(Debug, StructOpt)]
pub struct Extract {
    /// The input file, which must be a web package (.wpk) file.
    #[structopt(short = "p", long = "package")]
    package_path: String,

    /// The directory to extract into. It is created if it does not exist.
    #[structopt(short = "o", long = "output")]
    output_dir: String,
}

impl Extract {
    /// Streams the package from disk, writing each file as its content arrives.
    pub fn run(&self) -> Result<()> {
        let root = Path::new(&self.output_dir);
        if root.exists() && !root.is_dir() {
            error!("{} exists and is not a directory.", self.output_dir);
            return Err(Error::ToolError(ToolErrorKind::NotADirectory));
        }
        fs::create_dir_all(root)?;

        let mut stream = open_package(&self.package_path)?;
        let package = read_from_stream_with_sink(&mut stream, FileSink::new(root))?;

        info!(
            "Extracted {} files from {} into {}.",
            package.files().len(),
            self.package_path,
            self.output_dir
        );
        Ok(())
    }
}

/// Writes each file of the package below a root directory.
pub struct FileSink {
    root: PathBuf,
    current: Option<(PathBuf, BufWriter<File>)>,
}

impl FileSink {
    pub fn new(root: impl Into<PathBuf>) -> FileSink {
        FileSink {
            root: root.into(),
            current: None,
        }
    }
}

impl ContentSink for FileSink {
    fn start(&mut self, file_name: &str, content_length: u32) -> io::Result<()> {
        let path = output_path(&self.root, file_name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        info!("Extracting {} ({} bytes)", path.display(), content_length);
        let file = File::create(&path)?;
        self.current = Some((path, BufWriter::new(file)));
        Ok(())
    }

    fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        match &mut self.current {
            Some((_, writer)) => writer.write_all(chunk),
            None => Err(io::Error::new(io::ErrorKind::Other, "No file has been started.")),
        }
    }

    fn finish(&mut self) -> io::Result<Content> {
        if let Some((_, mut writer)) = self.current.take() {
            writer.flush()?;
        }
        Ok(Content::Detached)
    }

    fn discard(&mut self) {
        if let Some((path, writer)) = self.current.take() {
            drop(writer);
            if let Err(e) = fs::remove_file(&path) {
                error!("Could not remove partial file {}: {}", path.display(), e);
            }
        }
    }
}
