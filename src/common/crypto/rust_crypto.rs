/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use ed25519_dalek::Signer;
use rsa::Pkcs1v15Sign;

use crate::{Error, Result};

use super::{Algorithm, HashOutput, Key};

impl Key {
    /// Signs a finished digest. The caller has already checked that the key
    /// family matches `algorithm`.
    pub(crate) fn sign(&self, algorithm: Algorithm, hash: &HashOutput) -> Result<Vec<u8>> {
        match (self, algorithm) {
            (Key::RsaPrivate(key), Algorithm::RsaSha1) => key
                .sign(Pkcs1v15Sign::new::<sha1::Sha1>(), hash.as_ref())
                .map_err(|err| Error::CryptoError(err.to_string())),
            (Key::RsaPrivate(key), Algorithm::RsaSha256) => key
                .sign(Pkcs1v15Sign::new::<sha2::Sha256>(), hash.as_ref())
                .map_err(|err| Error::CryptoError(err.to_string())),
            (Key::Ed25519Private(key), Algorithm::Ed25519Sha256) => {
                Ok(key.sign(hash.as_ref()).to_bytes().to_vec())
            }
            (Key::RsaPublic(_) | Key::DsaPublic(..) | Key::Ed25519Public(_), _) => Err(
                Error::MalformedKey("a private key is required for signing".to_string()),
            ),
            _ => Err(Error::UnsupportedAlgorithm),
        }
    }

    /// Checks `signature` against a finished digest. Any mismatch, including
    /// a signature of the wrong length, is reported as `false`.
    pub(crate) fn verify(&self, algorithm: Algorithm, hash: &HashOutput, signature: &[u8]) -> bool {
        match (self, algorithm) {
            (Key::RsaPublic(key), Algorithm::RsaSha1) => key
                .verify(Pkcs1v15Sign::new::<sha1::Sha1>(), hash.as_ref(), signature)
                .is_ok(),
            (Key::RsaPublic(key), Algorithm::RsaSha256) => key
                .verify(Pkcs1v15Sign::new::<sha2::Sha256>(), hash.as_ref(), signature)
                .is_ok(),
            (Key::RsaPrivate(key), Algorithm::RsaSha1 | Algorithm::RsaSha256) => {
                Key::RsaPublic(key.to_public_key()).verify(algorithm, hash, signature)
            }
            (Key::Ed25519Public(key), Algorithm::Ed25519Sha256) => {
                ed25519_dalek::Signature::from_slice(signature)
                    .and_then(|signature| key.verify_strict(hash.as_ref(), &signature))
                    .is_ok()
            }
            (Key::Ed25519Private(key), Algorithm::Ed25519Sha256) => {
                Key::Ed25519Public(key.verifying_key()).verify(algorithm, hash, signature)
            }
            _ => false,
        }
    }
}
