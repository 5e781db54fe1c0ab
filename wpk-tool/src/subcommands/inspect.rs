// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! Lists the contents of a web package.

use crate::error::Result;
use crate::util::open_package;

use serde::Serialize;
use std::io;
use structopt::StructOpt;
use wpk::package::reader::{read_from_stream_with_sink, ContentSink};
use wpk::package::{Content, Package};

/// Models the options required by the inspect command.
#[derive(Debug, StructOpt)]
pub struct Inspect {
    /// The input file, which must be a web package (.wpk) file.
    #[structopt(short = "p", long = "package")]
    package_path: String,

    /// Writes the listing as JSON instead of plain text.
    #[structopt(long = "json")]
    json: bool,
}

impl Inspect {
    /// Reads the package header and file list, skipping over file content, and prints them.
    pub fn run(&self) -> Result<()> {
        let mut stream = open_package(&self.package_path)?;
        let package = read_from_stream_with_sink(&mut stream, SkipSink)?;
        let summary = PackageSummary::from(&package);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print!("{}", summary.to_text());
        }

        Ok(())
    }
}

/// Drops content as it streams past.
struct SkipSink;

impl ContentSink for SkipSink {
    fn start(&mut self, _file_name: &str, _content_length: u32) -> io::Result<()> {
        Ok(())
    }

    fn write(&mut self, _chunk: &[u8]) -> io::Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> io::Result<Content> {
        Ok(Content::Detached)
    }
}

#[derive(Debug, Serialize)]
struct PackageSummary {
    signed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<String>,
    build_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    certificate_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_encoding: Option<String>,
    encoded_length: u64,
    files: Vec<FileSummary>,
}

#[derive(Debug, Serialize)]
struct FileSummary {
    name: String,
    content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_hash: Option<String>,
    content_length: u32,
}

impl From<&Package> for PackageSummary {
    fn from(package: &Package) -> Self {
        PackageSummary {
            signed: package.is_signed(),
            signature: package.signature().map(base64::encode),
            domain: package.domain().map(str::to_owned),
            build_date: package.build_date().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            certificate_length: package.certificate().map(|c| c.len()),
            content_encoding: package.content_encoding().map(|e| e.to_string()),
            encoded_length: package.encoded_length(),
            files: package
                .files()
                .iter()
                .map(|file| FileSummary {
                    name: file.file_name().to_owned(),
                    content_type: file.content_type().to_owned(),
                    content_hash: file.content_hash().map(|h| base64::encode(h)),
                    content_length: file.content_length(),
                })
                .collect(),
        }
    }
}

impl PackageSummary {
    fn to_text(&self) -> String {
        let mut text = String::new();
        text.push_str(&format!("Signed:           {}\n", if self.signed { "yes" } else { "no" }));
        if let Some(domain) = &self.domain {
            text.push_str(&format!("Domain:           {}\n", domain));
        }
        text.push_str(&format!("Build date:       {}\n", self.build_date));
        if let Some(length) = self.certificate_length {
            text.push_str(&format!("Certificate:      {} bytes\n", length));
        }
        if let Some(encoding) = &self.content_encoding {
            text.push_str(&format!("Content encoding: {}\n", encoding));
        }
        text.push_str(&format!("Encoded length:   {} bytes\n", self.encoded_length));
        text.push_str(&format!("Files:            {}\n", self.files.len()));
        for file in &self.files {
            text.push_str(&format!(
                "  {} ({}, {} bytes){}\n",
                file.name,
                file.content_type,
                file.content_length,
                if file.content_hash.is_some() { "" } else { " [no hash]" }
            ));
        }
        text
    }
}
