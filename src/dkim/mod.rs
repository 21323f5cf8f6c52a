/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use std::{fmt::Display, str::FromStr};

use crate::{
    common::crypto::{HashAlgorithm, KeyMaterial},
    Error,
};

pub mod canonicalize;
pub mod context;
pub mod locator;
pub mod parse;

pub(crate) const R_HASH_SHA1: u64 = 0x01;
pub(crate) const R_HASH_SHA256: u64 = 0x02;
pub(crate) const R_SVC_ALL: u64 = 0x04;
pub(crate) const R_SVC_EMAIL: u64 = 0x08;
pub(crate) const R_FLAG_TESTING: u64 = 0x10;
pub(crate) const R_FLAG_MATCH_DOMAIN: u64 = 0x20;
pub(crate) const R_SVC_TAG: u64 = 0x40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Canonicalization {
    Relaxed,
    #[default]
    Simple,
}

impl Canonicalization {
    /// Parses a `c=` tag value such as `relaxed/simple` into its header and
    /// body parts. A missing body part means `simple`.
    pub fn parse_pair(value: &str) -> crate::Result<(Canonicalization, Canonicalization)> {
        match value.split_once('/') {
            Some((header, body)) => Ok((header.parse()?, body.parse()?)),
            None if value.trim().is_empty() => {
                Ok((Canonicalization::Simple, Canonicalization::Simple))
            }
            None => Ok((value.parse()?, Canonicalization::Simple)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Canonicalization::Relaxed => "relaxed",
            Canonicalization::Simple => "simple",
        }
    }
}

impl FromStr for Canonicalization {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("relaxed") {
            Ok(Canonicalization::Relaxed)
        } else if s.eq_ignore_ascii_case("simple") {
            Ok(Canonicalization::Simple)
        } else {
            Err(Error::UnsupportedCanonicalization)
        }
    }
}

impl Display for Canonicalization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a signature context does with its digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Sign,
    Verify,
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Mode::Sign => "sign",
            Mode::Verify => "verify",
        })
    }
}

/// A parsed DKIM public key record (`<selector>._domainkey.<domain>`).
#[derive(Debug, Clone)]
pub struct DomainKey {
    pub(crate) p: KeyMaterial,
    pub(crate) f: u64,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum Service {
    All,
    Email,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum Flag {
    Testing,
    MatchDomain,
}

impl From<Service> for u64 {
    fn from(v: Service) -> Self {
        match v {
            Service::All => R_SVC_ALL,
            Service::Email => R_SVC_EMAIL,
        }
    }
}

impl From<Flag> for u64 {
    fn from(v: Flag) -> Self {
        match v {
            Flag::Testing => R_FLAG_TESTING,
            Flag::MatchDomain => R_FLAG_MATCH_DOMAIN,
        }
    }
}

impl From<HashAlgorithm> for u64 {
    fn from(v: HashAlgorithm) -> Self {
        match v {
            HashAlgorithm::Sha1 => R_HASH_SHA1,
            HashAlgorithm::Sha256 => R_HASH_SHA256,
        }
    }
}

impl DomainKey {
    pub fn public_key(&self) -> &KeyMaterial {
        &self.p
    }

    /// Whether the record's `h=` tag allows `hash`. A record without `h=`
    /// allows every hash algorithm.
    pub fn accepts_hash(&self, hash: HashAlgorithm) -> bool {
        self.f & (R_HASH_SHA1 | R_HASH_SHA256) == 0 || self.f & u64::from(hash) != 0
    }

    /// Whether the key may sign email (`s=` absent, `*` or `email`).
    pub fn accepts_email(&self) -> bool {
        self.f & R_SVC_TAG == 0 || self.f & (R_SVC_ALL | R_SVC_EMAIL) != 0
    }

    /// The domain is testing DKIM (`t=y`).
    pub fn is_testing(&self) -> bool {
        self.f & R_FLAG_TESTING != 0
    }

    /// The `i=` domain must match `d=` exactly (`t=s`).
    pub fn strict_domain_match(&self) -> bool {
        self.f & R_FLAG_MATCH_DOMAIN != 0
    }
}

#[cfg(test)]
mod test {
    use super::{Canonicalization, Mode};
    use crate::Error;

    #[test]
    fn canonicalization_names() {
        for (value, expected) in [
            ("relaxed/simple", (Canonicalization::Relaxed, Canonicalization::Simple)),
            ("relaxed/relaxed", (Canonicalization::Relaxed, Canonicalization::Relaxed)),
            ("Simple / Relaxed", (Canonicalization::Simple, Canonicalization::Relaxed)),
            ("relaxed", (Canonicalization::Relaxed, Canonicalization::Simple)),
            ("", (Canonicalization::Simple, Canonicalization::Simple)),
        ] {
            assert_eq!(Canonicalization::parse_pair(value).unwrap(), expected, "{value:?}");
        }

        for value in ["loose", "relaxed/", "relaxed/strict", "/simple"] {
            assert!(
                matches!(
                    Canonicalization::parse_pair(value),
                    Err(Error::UnsupportedCanonicalization)
                ),
                "{value:?}"
            );
        }

        assert_eq!(Canonicalization::Relaxed.to_string(), "relaxed");
        assert_eq!(
            "SIMPLE".parse::<Canonicalization>().unwrap(),
            Canonicalization::Simple
        );
        assert_eq!(Canonicalization::default(), Canonicalization::Simple);
        assert_eq!(Mode::Verify.to_string(), "verify");
    }
}
