/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use std::{fmt::Debug, fs::File, io::Read, path::Path};

use mail_parser::decoders::base64::base64_decode;
use rsa::{
    pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey},
    pkcs8::{
        der::{asn1::UintRef, Reader, SliceReader},
        spki::SubjectPublicKeyInfoRef,
        DecodePrivateKey, DecodePublicKey, ObjectIdentifier, PrivateKeyInfo,
    },
    traits::PublicKeyParts,
    RsaPrivateKey, RsaPublicKey,
};

use crate::{Error, Result};

use super::{foreign::DsaParameters, Algorithm, DsaValidation, ForeignKey};

const OID_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const OID_DSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10040.4.1");
const OID_ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");

/// Asymmetric key family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Rsa,
    Dsa,
    Ed25519,
    Unknown,
}

impl KeyAlgorithm {
    /// Maps a key type name (a DKIM `k=` value or a provider algorithm
    /// name) to a key family.
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim();
        if tag.eq_ignore_ascii_case("rsa") {
            KeyAlgorithm::Rsa
        } else if tag.eq_ignore_ascii_case("ed25519") {
            KeyAlgorithm::Ed25519
        } else if tag.eq_ignore_ascii_case("dsa") {
            KeyAlgorithm::Dsa
        } else {
            KeyAlgorithm::Unknown
        }
    }
}

/// A public or private asymmetric key, independent of the format it was
/// loaded from. Immutable once built; share it by reference across any
/// number of signature contexts.
#[derive(Clone)]
pub struct KeyMaterial {
    pub(crate) inner: Key,
}

#[derive(Clone)]
pub(crate) enum Key {
    RsaPrivate(RsaPrivateKey),
    RsaPublic(RsaPublicKey),
    DsaPrivate(dsa::SigningKey, Option<DsaValidation>),
    DsaPublic(dsa::VerifyingKey, Option<DsaValidation>),
    Ed25519Private(ed25519_dalek::SigningKey),
    Ed25519Public(ed25519_dalek::VerifyingKey),
}

impl From<Key> for KeyMaterial {
    fn from(inner: Key) -> Self {
        KeyMaterial { inner }
    }
}

impl KeyMaterial {
    pub fn algorithm(&self) -> KeyAlgorithm {
        match &self.inner {
            Key::RsaPrivate(_) | Key::RsaPublic(_) => KeyAlgorithm::Rsa,
            Key::DsaPrivate(..) | Key::DsaPublic(..) => KeyAlgorithm::Dsa,
            Key::Ed25519Private(_) | Key::Ed25519Public(_) => KeyAlgorithm::Ed25519,
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(
            &self.inner,
            Key::RsaPrivate(_) | Key::DsaPrivate(..) | Key::Ed25519Private(_)
        )
    }

    /// Key size in bits.
    pub fn key_size(&self) -> usize {
        match &self.inner {
            Key::RsaPrivate(key) => key.n().bits(),
            Key::RsaPublic(key) => key.n().bits(),
            Key::DsaPrivate(key, _) => key.verifying_key().components().p().bits(),
            Key::DsaPublic(key, _) => key.components().p().bits(),
            Key::Ed25519Private(_) | Key::Ed25519Public(_) => 256,
        }
    }

    /// Returns the public half of this key.
    pub fn public_key(&self) -> KeyMaterial {
        match &self.inner {
            Key::RsaPrivate(key) => Key::RsaPublic(key.to_public_key()),
            Key::DsaPrivate(key, validation) => {
                Key::DsaPublic(key.verifying_key().clone(), validation.clone())
            }
            Key::Ed25519Private(key) => Key::Ed25519Public(key.verifying_key()),
            public => public.clone(),
        }
        .into()
    }

    /// Whether `algorithm` signs with this key's family.
    pub fn supports(&self, algorithm: Algorithm) -> bool {
        self.algorithm() == algorithm.key_algorithm()
    }

    /// Creates a new RSA private key from a PKCS1 PEM string.
    pub fn from_rsa_pkcs1_pem(private_key_pem: &str) -> Result<Self> {
        Ok(Key::RsaPrivate(RsaPrivateKey::from_pkcs1_pem(private_key_pem)?).into())
    }

    /// Creates a new RSA private key from a PKCS1 binary slice.
    pub fn from_rsa_pkcs1_der(private_key_bytes: &[u8]) -> Result<Self> {
        Ok(Key::RsaPrivate(RsaPrivateKey::from_pkcs1_der(private_key_bytes)?).into())
    }

    /// Creates an Ed25519 private key from its 32-byte seed.
    pub fn from_ed25519_bytes(private_key_bytes: &[u8]) -> Result<Self> {
        let seed: &[u8; 32] = private_key_bytes.try_into().map_err(|_| {
            Error::MalformedKey(format!(
                "Ed25519 private key must be 32 bytes, got {}",
                private_key_bytes.len()
            ))
        })?;
        Ok(Key::Ed25519Private(ed25519_dalek::SigningKey::from_bytes(seed)).into())
    }

    /// Reads a PEM stream and returns the first private key found in it.
    /// Certificates and public keys preceding it are skipped.
    pub fn load_private_key(mut reader: impl Read) -> Result<Self> {
        let mut pem = Vec::new();
        reader.read_to_end(&mut pem)?;

        for block in pem::parse_many(&pem)? {
            let key = match block.tag() {
                "RSA PRIVATE KEY" => {
                    Key::RsaPrivate(RsaPrivateKey::from_pkcs1_der(block.contents())?).into()
                }
                "PRIVATE KEY" => Self::from_pkcs8_der(block.contents())?,
                "DSA PRIVATE KEY" => KeyMaterial::try_from(ForeignKey::Dsa(
                    openssl_dsa_private_key(block.contents())?,
                ))?,
                "EC PRIVATE KEY" => return Err(Error::UnsupportedAlgorithm),
                "ENCRYPTED PRIVATE KEY" => {
                    return Err(Error::MalformedKey(
                        "encrypted private keys are not supported".to_string(),
                    ))
                }
                _ => continue,
            };

            tracing::debug!(
                algorithm = ?key.algorithm(),
                bits = key.key_size(),
                "Loaded private key"
            );

            return Ok(key);
        }

        Err(Error::MalformedKey("no private key found".to_string()))
    }

    pub fn load_private_key_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_private_key(File::open(path)?)
    }

    /// Reads a PEM stream and returns the first public key found in it. A
    /// stream holding only a private key yields that key's public half.
    pub fn load_public_key(mut reader: impl Read) -> Result<Self> {
        let mut pem = Vec::new();
        reader.read_to_end(&mut pem)?;

        for block in pem::parse_many(&pem)? {
            let key = match block.tag() {
                "PUBLIC KEY" => Self::from_spki_der(block.contents())?,
                "RSA PUBLIC KEY" => {
                    Key::RsaPublic(RsaPublicKey::from_pkcs1_der(block.contents())?).into()
                }
                _ => continue,
            };

            tracing::debug!(
                algorithm = ?key.algorithm(),
                bits = key.key_size(),
                "Loaded public key"
            );

            return Ok(key);
        }

        Self::load_private_key(pem.as_slice())
            .map(|key| key.public_key())
            .map_err(|err| match err {
                Error::MalformedKey(_) => Error::MalformedKey("no public key found".to_string()),
                err => err,
            })
    }

    pub fn load_public_key_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_public_key(File::open(path)?)
    }

    /// Builds a public key from a DKIM key record's `k=` tag and base64
    /// `p=` payload. An empty tag means `rsa`.
    pub fn from_public_key_record(tag: &str, payload: &str) -> Result<Self> {
        let algorithm = if tag.trim().is_empty() {
            KeyAlgorithm::Rsa
        } else {
            KeyAlgorithm::from_tag(tag)
        };
        let payload = payload
            .bytes()
            .filter(|ch| !ch.is_ascii_whitespace())
            .collect::<Vec<_>>();
        if payload.is_empty() {
            return Err(Error::RevokedPublicKey);
        } else if !payload
            .iter()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, b'+' | b'/' | b'='))
        {
            return Err(Error::Base64);
        }

        Self::from_public_key_bytes(algorithm, &base64_decode(&payload).ok_or(Error::Base64)?)
    }

    pub(crate) fn from_public_key_bytes(algorithm: KeyAlgorithm, bytes: &[u8]) -> Result<Self> {
        let key = match algorithm {
            KeyAlgorithm::Rsa => Key::RsaPublic(
                RsaPublicKey::from_public_key_der(bytes)
                    .or_else(|_| RsaPublicKey::from_pkcs1_der(bytes))?,
            ),
            KeyAlgorithm::Ed25519 => {
                Key::Ed25519Public(ed25519_dalek::VerifyingKey::from_bytes(
                    bytes.try_into().map_err(|_| {
                        Error::MalformedKey(format!(
                            "Ed25519 public key must be 32 bytes, got {}",
                            bytes.len()
                        ))
                    })?,
                )?)
            }
            KeyAlgorithm::Dsa | KeyAlgorithm::Unknown => return Err(Error::UnsupportedAlgorithm),
        };

        Ok(key.into())
    }

    fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let oid = PrivateKeyInfo::try_from(der)?.algorithm.oid;
        let key = if oid == OID_RSA {
            Key::RsaPrivate(RsaPrivateKey::from_pkcs8_der(der)?)
        } else if oid == OID_ED25519 {
            Key::Ed25519Private(ed25519_dalek::SigningKey::from_pkcs8_der(der)?)
        } else if oid == OID_DSA {
            Key::DsaPrivate(dsa::SigningKey::from_pkcs8_der(der)?, None)
        } else {
            tracing::debug!(oid = %oid, "Unsupported PKCS#8 key algorithm");
            return Err(Error::UnsupportedAlgorithm);
        };

        Ok(key.into())
    }

    fn from_spki_der(der: &[u8]) -> Result<Self> {
        let oid = SubjectPublicKeyInfoRef::try_from(der)?.algorithm.oid;
        let key = if oid == OID_RSA {
            Key::RsaPublic(RsaPublicKey::from_public_key_der(der)?)
        } else if oid == OID_ED25519 {
            Key::Ed25519Public(ed25519_dalek::VerifyingKey::from_public_key_der(der)?)
        } else if oid == OID_DSA {
            Key::DsaPublic(dsa::VerifyingKey::from_public_key_der(der)?, None)
        } else {
            tracing::debug!(oid = %oid, "Unsupported public key algorithm");
            return Err(Error::UnsupportedAlgorithm);
        };

        Ok(key.into())
    }
}

// OpenSSL "traditional" DSA key pair: SEQUENCE { version, p, q, g, y, x }
fn openssl_dsa_private_key(der: &[u8]) -> Result<DsaParameters> {
    let mut reader = SliceReader::new(der)?;
    let params = reader.sequence(|reader| {
        let _version: u8 = reader.decode()?;
        let mut uint = || -> rsa::pkcs8::der::Result<Vec<u8>> {
            Ok(reader.decode::<UintRef<'_>>()?.as_bytes().to_vec())
        };
        Ok(DsaParameters {
            p: uint()?,
            q: uint()?,
            g: uint()?,
            y: Some(uint()?),
            x: Some(uint()?),
            validation: None,
        })
    })?;
    Ok(reader.finish(params)?)
}

impl Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("algorithm", &self.algorithm())
            .field("private", &self.is_private())
            .field("bits", &self.key_size())
            .finish()
    }
}
