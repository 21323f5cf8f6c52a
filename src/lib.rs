/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

//! # mail-dkim-core
//!
//! The message-integrity core used by DKIM signers and verifiers:
//!
//! - Streaming body canonicalization (`simple` and `relaxed`, RFC 6376 section 3.4)
//!   that produces the same bytes no matter how the body is split into chunks.
//! - Key material loading from PEM files, DKIM DNS records and parameter sets
//!   exported by other cryptography providers.
//! - Signature contexts binding a key and an algorithm (`rsa-sha1`, `rsa-sha256`,
//!   `ed25519-sha256`) to an incremental digest.
//!
//! Header selection, message parsing and DNS resolution are left to the caller.
//!
//! ## Usage example
//!
//! ```rust,ignore
//! let key = KeyMaterial::load_private_key_file("dkim.pem")?;
//!
//! let mut body = Canonicalization::Relaxed.body_canonicalizer();
//! let mut canonical = Vec::new();
//! for chunk in chunks {
//!     body.filter(chunk, &mut canonical);
//! }
//! body.flush(&mut canonical);
//!
//! let mut ctx = SignatureContext::new(&key, Algorithm::RsaSha256, Mode::Sign)?;
//! ctx.update(&header_bytes);
//! let signature = ctx.generate_signature()?;
//! ```

use std::fmt::Display;

pub mod common;
pub mod dkim;

pub use common::crypto::{
    Algorithm, DsaParameters, ForeignKey, HashAlgorithm, KeyAlgorithm, KeyMaterial,
    RsaParameters,
};
pub use dkim::{
    canonicalize::{BodyCanonicalizer, BodyFilter, BodyHasher, RelaxedBody, SimpleBody},
    context::SignatureContext,
    locator::{MemoryLocator, PublicKeyLocator},
    Canonicalization, DomainKey, Mode,
};

#[derive(Debug)]
pub enum Error {
    UnsupportedAlgorithm,
    UnsupportedCanonicalization,
    MalformedKey(String),
    CryptoError(String),
    InvalidMode,
    AlreadyFinalized,
    Base64,
    InvalidRecordType,
    RevokedPublicKey,
    DnsRecordNotFound,

    /// I/O error, carried unchanged.
    Io(std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnsupportedAlgorithm => {
                write!(f, "Unsupported algorithm or key type for this operation.")
            }
            Error::UnsupportedCanonicalization => write!(f, "Unsupported canonicalization method."),
            Error::MalformedKey(err) => write!(f, "Malformed key: {}", err),
            Error::CryptoError(err) => write!(f, "Cryptography layer error: {}", err),
            Error::InvalidMode => write!(f, "Operation not permitted in this context mode."),
            Error::AlreadyFinalized => write!(f, "Signature context already finalized."),
            Error::Base64 => write!(f, "Base64 encode or decode error."),
            Error::InvalidRecordType => write!(f, "Invalid DKIM DNS record."),
            Error::RevokedPublicKey => write!(f, "Public key for this selector has been revoked."),
            Error::DnsRecordNotFound => write!(f, "DNS record not found."),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<rsa::errors::Error> for Error {
    fn from(err: rsa::errors::Error) -> Self {
        Error::MalformedKey(err.to_string())
    }
}

impl From<rsa::pkcs1::Error> for Error {
    fn from(err: rsa::pkcs1::Error) -> Self {
        Error::MalformedKey(err.to_string())
    }
}

impl From<rsa::pkcs8::Error> for Error {
    fn from(err: rsa::pkcs8::Error) -> Self {
        Error::MalformedKey(err.to_string())
    }
}

impl From<rsa::pkcs8::spki::Error> for Error {
    fn from(err: rsa::pkcs8::spki::Error) -> Self {
        Error::MalformedKey(err.to_string())
    }
}

impl From<rsa::pkcs8::der::Error> for Error {
    fn from(err: rsa::pkcs8::der::Error) -> Self {
        Error::MalformedKey(err.to_string())
    }
}

impl From<pem::PemError> for Error {
    fn from(err: pem::PemError) -> Self {
        Error::MalformedKey(err.to_string())
    }
}

impl From<ed25519_dalek::SignatureError> for Error {
    fn from(err: ed25519_dalek::SignatureError) -> Self {
        Error::MalformedKey(err.to_string())
    }
}
