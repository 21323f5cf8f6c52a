/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use std::{fmt::Display, str::FromStr};

use sha1::{digest::Output, Digest};

use crate::Error;

use super::headers::Writer;

mod foreign;
mod key;
mod rust_crypto;

pub use foreign::{DsaParameters, DsaValidation, ForeignKey, RsaParameters};
pub use key::{KeyAlgorithm, KeyMaterial};
pub(crate) use key::Key;

pub trait HashContext: Writer + Sized {
    fn complete(self) -> HashOutput;
}

pub trait HashImpl {
    type Context: HashContext;

    fn hasher() -> Self::Context;
}

#[derive(Clone, Copy)]
pub struct Sha1;

#[derive(Clone, Copy)]
pub struct Sha256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    /// Creates a running digest for this hash algorithm.
    pub fn hasher(&self) -> Hasher {
        match self {
            HashAlgorithm::Sha1 => Hasher::Sha1(sha1::Sha1::new()),
            HashAlgorithm::Sha256 => Hasher::Sha256(sha2::Sha256::new()),
        }
    }

    pub fn hash(&self, data: &[u8]) -> HashOutput {
        let mut hasher = self.hasher();
        hasher.write(data);
        hasher.complete()
    }

    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
        }
    }
}

/// Running digest selected at runtime.
#[derive(Clone)]
pub enum Hasher {
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
}

impl Hasher {
    pub fn algorithm(&self) -> HashAlgorithm {
        match self {
            Hasher::Sha1(_) => HashAlgorithm::Sha1,
            Hasher::Sha256(_) => HashAlgorithm::Sha256,
        }
    }
}

impl Writer for Hasher {
    fn write(&mut self, buf: &[u8]) {
        match self {
            Hasher::Sha1(hasher) => hasher.update(buf),
            Hasher::Sha256(hasher) => hasher.update(buf),
        }
    }
}

impl HashContext for Hasher {
    fn complete(self) -> HashOutput {
        match self {
            Hasher::Sha1(hasher) => HashOutput::RustCryptoSha1(hasher.finalize()),
            Hasher::Sha256(hasher) => HashOutput::RustCryptoSha256(hasher.finalize()),
        }
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashOutput {
    RustCryptoSha1(Output<sha1::Sha1>),
    RustCryptoSha256(Output<sha2::Sha256>),
}

impl HashOutput {
    pub fn algorithm(&self) -> HashAlgorithm {
        match self {
            HashOutput::RustCryptoSha1(_) => HashAlgorithm::Sha1,
            HashOutput::RustCryptoSha256(_) => HashAlgorithm::Sha256,
        }
    }
}

impl AsRef<[u8]> for HashOutput {
    fn as_ref(&self) -> &[u8] {
        match self {
            Self::RustCryptoSha1(output) => output.as_ref(),
            Self::RustCryptoSha256(output) => output.as_ref(),
        }
    }
}

/// Signature algorithm, named as in the DKIM `a=` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    RsaSha1,
    RsaSha256,
    Ed25519Sha256,
}

impl Algorithm {
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        match self {
            Algorithm::RsaSha1 => HashAlgorithm::Sha1,
            Algorithm::RsaSha256 | Algorithm::Ed25519Sha256 => HashAlgorithm::Sha256,
        }
    }

    /// Key family this algorithm signs with.
    pub fn key_algorithm(&self) -> KeyAlgorithm {
        match self {
            Algorithm::RsaSha1 | Algorithm::RsaSha256 => KeyAlgorithm::Rsa,
            Algorithm::Ed25519Sha256 => KeyAlgorithm::Ed25519,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::RsaSha1 => "rsa-sha1",
            Algorithm::RsaSha256 => "rsa-sha256",
            Algorithm::Ed25519Sha256 => "ed25519-sha256",
        }
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("rsa-sha256") {
            Ok(Algorithm::RsaSha256)
        } else if s.eq_ignore_ascii_case("rsa-sha1") {
            Ok(Algorithm::RsaSha1)
        } else if s.eq_ignore_ascii_case("ed25519-sha256") {
            Ok(Algorithm::Ed25519Sha256)
        } else {
            Err(Error::UnsupportedAlgorithm)
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Writer for sha1::Sha1 {
    fn write(&mut self, buf: &[u8]) {
        self.update(buf);
    }
}

impl Writer for sha2::Sha256 {
    fn write(&mut self, buf: &[u8]) {
        self.update(buf);
    }
}

impl HashImpl for Sha1 {
    type Context = sha1::Sha1;

    fn hasher() -> Self::Context {
        <Self::Context as Digest>::new()
    }
}

impl HashImpl for Sha256 {
    type Context = sha2::Sha256;

    fn hasher() -> Self::Context {
        <Self::Context as Digest>::new()
    }
}

impl HashContext for sha1::Sha1 {
    fn complete(self) -> HashOutput {
        HashOutput::RustCryptoSha1(self.finalize())
    }
}

impl HashContext for sha2::Sha256 {
    fn complete(self) -> HashOutput {
        HashOutput::RustCryptoSha256(self.finalize())
    }
}

#[cfg(test)]
mod test {
    use mail_builder::encoders::base64::base64_encode;

    use super::{Algorithm, HashAlgorithm, HashContext, HashImpl, Sha256};
    use crate::{common::headers::Writer, Error};

    #[test]
    fn algorithm_names() {
        for (name, algorithm) in [
            ("rsa-sha1", Algorithm::RsaSha1),
            ("rsa-sha256", Algorithm::RsaSha256),
            ("ed25519-sha256", Algorithm::Ed25519Sha256),
            (" RSA-SHA256 ", Algorithm::RsaSha256),
        ] {
            let parsed: Algorithm = name.parse().unwrap();
            assert_eq!(parsed, algorithm);
            assert_eq!(parsed.to_string(), name.trim().to_ascii_lowercase());
        }

        for name in ["rsa-sha512", "ed448-sha256", ""] {
            assert!(matches!(
                name.parse::<Algorithm>(),
                Err(Error::UnsupportedAlgorithm)
            ));
        }

        assert_eq!(Algorithm::RsaSha1.hash_algorithm(), HashAlgorithm::Sha1);
        assert_eq!(Algorithm::Ed25519Sha256.hash_algorithm(), HashAlgorithm::Sha256);
    }

    #[test]
    fn runtime_hasher_matches_static() {
        let mut dynamic = HashAlgorithm::Sha256.hasher();
        let mut fixed = Sha256::hasher();
        for chunk in [&b"hello "[..], b"world", b"\r\n"] {
            dynamic.write(chunk);
            fixed.write(chunk);
        }
        let dynamic = dynamic.complete();
        assert_eq!(dynamic.as_ref(), fixed.complete().as_ref());
        assert_eq!(dynamic.as_ref().len(), HashAlgorithm::Sha256.output_len());

        assert_eq!(
            String::from_utf8(base64_encode(HashAlgorithm::Sha256.hash(b"\r\n").as_ref()).unwrap())
                .unwrap(),
            "frcCV1k9oG9oKj3dpUqdJg1PxRT2RSN/XKdLCPjaYaY="
        );
        assert_eq!(HashAlgorithm::Sha1.hash(b"").as_ref().len(), 20);
    }
}
