// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! The canonical package hash, which is what a package signature signs.
//!
//! The hash is a SHA-256 digest over the formatted frames of the package, in wire order: the domain (if
//! any), the build date, the content encoding (if any), and then per file the file name, content type,
//! content hash (if any), content length and start-content marker. Content bytes are covered indirectly
//! through each file's content hash. The signature and certificate frames are excluded, as is the
//! end-of-files marker.

use super::format;
use super::token::CONTENT_HASH_LENGTH;
use super::{FileEntry, Package, Result};
use sha2::{Digest, Sha256};

/// A SHA-256 digest.
pub type Digest256 = [u8; CONTENT_HASH_LENGTH];

/// Computes the canonical hash of a package. Fails only if a field of the package cannot be formatted.
pub fn canonical_hash(package: &Package) -> Result<Digest256> {
    let mut context = Sha256::new();

    if let Some(domain) = package.domain() {
        context.update(format::format_domain(domain)?);
    }
    context.update(format::format_build_date(package.build_date())?);
    if let Some(content_encoding) = package.content_encoding() {
        context.update(format::format_content_encoding(content_encoding));
    }
    for file in package.files() {
        hash_file_head(&mut context, file)?;
    }

    Ok(finish(context))
}

/// Computes the SHA-256 digest of a file's content.
pub fn content_hash(content: &[u8]) -> Digest256 {
    let mut context = Sha256::new();
    context.update(content);
    finish(context)
}

fn hash_file_head(context: &mut Sha256, file: &FileEntry) -> Result<()> {
    context.update(format::format_file_name(file.file_name())?);
    context.update(format::format_content_type(file.content_type())?);
    if let Some(hash) = file.content_hash() {
        context.update(format::format_content_hash(hash));
    }
    context.update(format::format_content_length(file.content_length())?);
    context.update(format::format_start_content());
    Ok(())
}

fn finish(context: Sha256) -> Digest256 {
    let mut digest = [0u8; CONTENT_HASH_LENGTH];
    digest.copy_from_slice(&context.finalize());
    digest
}
