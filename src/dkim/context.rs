/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use std::fmt::Debug;

use crate::{
    common::{
        crypto::{Algorithm, HashContext, HashOutput, Hasher, KeyMaterial},
        headers::Writer,
    },
    Error, Result,
};

use super::Mode;

/// Binds a key, a signature algorithm and a mode to a running digest.
///
/// Canonical header and body-hash bytes are fed with `update` (or through
/// the `Writer` impl), then the context is finalized exactly once with
/// `generate_signature` or `verify_signature`. The digest is released when
/// the context is finalized, disposed or dropped.
pub struct SignatureContext<'k> {
    key: &'k KeyMaterial,
    algorithm: Algorithm,
    mode: Mode,
    state: State,
}

enum State {
    Hashing(Hasher),
    Done,
}

impl<'k> SignatureContext<'k> {
    pub fn new(key: &'k KeyMaterial, algorithm: Algorithm, mode: Mode) -> Result<Self> {
        if !key.supports(algorithm) {
            tracing::debug!(
                algorithm = %algorithm,
                key_algorithm = ?key.algorithm(),
                "Key cannot be used with signature algorithm"
            );
            return Err(Error::UnsupportedAlgorithm);
        } else if mode == Mode::Sign && !key.is_private() {
            return Err(Error::MalformedKey(
                "a private key is required for signing".to_string(),
            ));
        }

        tracing::debug!(algorithm = %algorithm, mode = %mode, "Created signature context");

        Ok(SignatureContext {
            key,
            algorithm,
            mode,
            state: State::Hashing(algorithm.hash_algorithm().hasher()),
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, State::Done)
    }

    /// Feeds canonical bytes into the digest. Ignored once the context has
    /// been finalized.
    pub fn update(&mut self, data: &[u8]) {
        if let State::Hashing(hasher) = &mut self.state {
            hasher.write(data);
        }
    }

    /// Finalizes the digest and signs it.
    pub fn generate_signature(&mut self) -> Result<Vec<u8>> {
        let hash = self.finalize(Mode::Sign)?;
        let signature = self.key.inner.sign(self.algorithm, &hash)?;

        tracing::trace!(
            algorithm = %self.algorithm,
            len = signature.len(),
            "Generated signature"
        );

        Ok(signature)
    }

    /// Finalizes the digest and checks `signature` against it. An invalid
    /// signature is `Ok(false)`, not an error.
    pub fn verify_signature(&mut self, signature: &[u8]) -> Result<bool> {
        let hash = self.finalize(Mode::Verify)?;
        let result = self.key.inner.verify(self.algorithm, &hash, signature);

        if result {
            tracing::trace!(algorithm = %self.algorithm, "Signature verified");
        } else {
            tracing::debug!(algorithm = %self.algorithm, "Signature verification failed");
        }

        Ok(result)
    }

    /// Releases the digest without producing a result. Later finalizing
    /// calls fail with `AlreadyFinalized`.
    pub fn dispose(&mut self) {
        self.state = State::Done;
    }

    fn finalize(&mut self, mode: Mode) -> Result<HashOutput> {
        if self.mode != mode {
            return Err(Error::InvalidMode);
        }

        match std::mem::replace(&mut self.state, State::Done) {
            State::Hashing(hasher) => Ok(hasher.complete()),
            State::Done => Err(Error::AlreadyFinalized),
        }
    }
}

impl Writer for SignatureContext<'_> {
    fn write(&mut self, buf: &[u8]) {
        self.update(buf);
    }
}

impl Debug for SignatureContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureContext")
            .field("key", self.key)
            .field("algorithm", &self.algorithm)
            .field("mode", &self.mode)
            .field("finalized", &self.is_finalized())
            .finish()
    }
}
