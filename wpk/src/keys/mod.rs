// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! This module defines how web packages are signed and verified.
//!
//! A package producer holds a private key, and signs the canonical hash of each package it builds (see
//! [canonical_hash](crate::package::hash::canonical_hash)). The signature travels in the signature frame at
//! the start of the package. Clients hold the matching public key and check the signature before they trust
//! any of the package's files.
//!
//! The canonical hash covers each file's content hash rather than the content itself, so a signature only
//! protects content that is hashed. Signing therefore requires every file to carry a content hash, and
//! verification checks in-memory content against those hashes.
//!
//! The traits in this module are the seams between packages and key material. The [local] sub-module
//! implements them with RSA keys held in process memory, and [file] loads such keys from PEM files.

pub mod error;
pub mod file;
pub mod local;

pub use local::{ClientKey, ServerKey};

use crate::package::error::{FormatError, VerificationError};
use crate::package::hash::{canonical_hash, Digest256};
use crate::package::{self, Package};

/// Convenient result alias for this module, where errors are of type [KeyError](error::KeyError).
pub type Result<T> = std::result::Result<T, error::KeyError>;

/// Something that can sign the canonical hash of a package, such as a private key.
pub trait PackageSigner {
    /// Signs a SHA-256 digest. The signature must be at most 255 bytes long.
    fn sign_digest(&self, digest: &Digest256) -> Result<Vec<u8>>;
}

/// Something that can check a package signature, such as a public key.
pub trait PackageVerifier {
    /// Whether `signature` is a valid signature of the SHA-256 digest.
    fn verify_digest(&self, digest: &Digest256, signature: &[u8]) -> bool;
}

/// Computes the signature of a package. Every file must carry a content hash.
pub fn sign(package: &Package, signer: &dyn PackageSigner) -> package::Result<Vec<u8>> {
    if let Some(file) = package.files().iter().find(|f| f.content_hash().is_none()) {
        return Err(FormatError::MissingContentHash(file.file_name().to_string()).into());
    }
    let digest = canonical_hash(package)?;
    Ok(signer.sign_digest(&digest)?)
}

/// Checks a signature against a package. Any existing signature in the package is ignored.
pub fn verify(package: &Package, signature: &[u8], verifier: &dyn PackageVerifier) -> bool {
    match canonical_hash(package) {
        Ok(digest) => verifier.verify_digest(&digest, signature),
        Err(_) => false,
    }
}

impl Package {
    /// Signs the package, replacing any previous signature.
    pub fn signed(self, signer: &dyn PackageSigner) -> package::Result<Package> {
        let signature = sign(&self, signer)?;
        self.with_signature(signature)
    }

    /// Checks the package signature, and the in-memory content of every file against its content hash.
    pub fn verify(&self, verifier: &dyn PackageVerifier) -> std::result::Result<(), VerificationError> {
        let signature = self.signature().ok_or(VerificationError::Unsigned)?;
        if !verify(self, signature, verifier) {
            return Err(VerificationError::SignatureMismatch);
        }
        for file in self.files() {
            file.verify_content()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::local::tests::{TEST_PRIVATE_KEY, TEST_PUBLIC_KEY};
    use super::*;
    use crate::package::error::Error;
    use crate::package::{decode, encode, Content, FileEntry};
    use chrono::{TimeZone, Utc};

    const INDEX: &[u8] = b"<!doctype html><html></html>";

    fn package() -> Package {
        Package::new(Utc.ymd(2021, 11, 19).and_hms(16, 41, 23))
            .with_domain("example.com")
            .unwrap()
            .with_file(FileEntry::from_bytes("/index.html", "text/html", INDEX.to_vec()).unwrap())
            .unwrap()
    }

    fn keys() -> (ServerKey, ClientKey) {
        (
            ServerKey::from_pem(TEST_PRIVATE_KEY).unwrap(),
            ClientKey::from_pem(TEST_PUBLIC_KEY).unwrap(),
        )
    }

    #[test]
    fn test_signed_package_survives_encoding() {
        let (server, client) = keys();
        let bytes = encode(package().signed(&server).unwrap()).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.signature().unwrap().len(), 128);
        assert!(decoded.verify(&client).is_ok());
    }

    #[test]
    fn test_every_flipped_byte_is_detected() {
        // Flipping any single byte after the signature must not yield a verified package.
        let (server, client) = keys();
        let bytes = encode(package().signed(&server).unwrap()).unwrap();
        let signature_end = 9 + 128;

        for position in signature_end..bytes.len() {
            let mut tampered = bytes.clone();
            tampered[position] ^= 0x01;
            if let Ok(decoded) = decode(&tampered) {
                assert!(
                    decoded.verify(&client).is_err(),
                    "flip at {} went unnoticed",
                    position
                );
            }
        }
    }

    #[test]
    fn test_tampered_content_is_reported() {
        let (server, client) = keys();
        let mut bytes = encode(package().signed(&server).unwrap()).unwrap();
        // The last content byte sits right before the end-of-files marker.
        let position = bytes.len() - 2;
        bytes[position] = b'!';

        assert_eq!(
            decode(&bytes).unwrap().verify(&client).unwrap_err(),
            VerificationError::ContentHashMismatch("/index.html".to_string())
        );
    }

    #[test]
    fn test_unsigned_package() {
        let (_, client) = keys();
        assert_eq!(package().verify(&client).unwrap_err(), VerificationError::Unsigned);
    }

    #[test]
    fn test_wrong_key() {
        let (server, _) = keys();
        let other = ServerKey::generate(512).unwrap().client_key();
        let signed = package().signed(&server).unwrap();
        assert_eq!(signed.verify(&other).unwrap_err(), VerificationError::SignatureMismatch);
    }

    #[test]
    fn test_signing_requires_content_hashes() {
        let (server, _) = keys();
        let file = FileEntry::new("/a.txt", "text/plain", 1, Content::Bytes(vec![b'a'])).unwrap();
        let unhashed = package().with_file(file).unwrap();
        match unhashed.signed(&server).unwrap_err() {
            Error::FormatError(FormatError::MissingContentHash(name)) => assert_eq!(name, "/a.txt"),
            _ => panic!("Unexpected error type."),
        }
    }

    #[test]
    fn test_signature_ignores_certificate() {
        let (server, client) = keys();
        let signature = sign(&package(), &server).unwrap();
        let with_certificate = package().with_certificate(vec![1, 2, 3]).unwrap();
        assert!(verify(&with_certificate, &signature, &client));
        assert!(!verify(&package().with_domain("example.org").unwrap(), &signature, &client));
    }
}
