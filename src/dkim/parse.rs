/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use crate::{
    common::{
        crypto::{HashAlgorithm, KeyMaterial},
        parse::*,
    },
    Error,
};

use super::{DomainKey, Flag, Service, R_SVC_TAG};

impl DomainKey {
    /// Parses a DKIM key record as published in DNS, for example
    /// `v=DKIM1; k=ed25519; p=<base64>`.
    pub fn parse(record: &[u8]) -> crate::Result<Self> {
        let mut record = record.iter();
        let mut flags = 0;
        let mut key_type = Vec::new();
        let mut public_key = None;

        while let Some(key) = record.key() {
            match key {
                V => {
                    if !record.match_bytes(b"DKIM1") || !record.seek_tag_end() {
                        return Err(Error::InvalidRecordType);
                    }
                }
                H => flags |= record.flags::<HashAlgorithm>(),
                P => public_key = Some(record.tag()),
                S => flags |= R_SVC_TAG | record.flags::<Service>(),
                T => flags |= record.flags::<Flag>(),
                K => key_type = record.tag(),
                _ => record.ignore(),
            }
        }

        let public_key = public_key.ok_or(Error::InvalidRecordType)?;
        let key = KeyMaterial::from_public_key_record(
            &String::from_utf8_lossy(&key_type),
            &String::from_utf8_lossy(&public_key),
        )?;

        tracing::debug!(
            algorithm = ?key.algorithm(),
            bits = key.key_size(),
            flags,
            "Parsed DKIM key record"
        );

        Ok(DomainKey { p: key, f: flags })
    }
}

impl ItemParser for HashAlgorithm {
    fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.eq_ignore_ascii_case(b"sha256") {
            HashAlgorithm::Sha256.into()
        } else if bytes.eq_ignore_ascii_case(b"sha1") {
            HashAlgorithm::Sha1.into()
        } else {
            None
        }
    }
}

impl ItemParser for Flag {
    fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.eq_ignore_ascii_case(b"y") {
            Flag::Testing.into()
        } else if bytes.eq_ignore_ascii_case(b"s") {
            Flag::MatchDomain.into()
        } else {
            None
        }
    }
}

impl ItemParser for Service {
    fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.eq(b"*") {
            Service::All.into()
        } else if bytes.eq_ignore_ascii_case(b"email") {
            Service::Email.into()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{
        common::crypto::{HashAlgorithm, KeyAlgorithm},
        dkim::{
            DomainKey, R_FLAG_MATCH_DOMAIN, R_FLAG_TESTING, R_HASH_SHA1, R_HASH_SHA256,
            R_SVC_ALL, R_SVC_EMAIL, R_SVC_TAG,
        },
        Error,
    };

    #[test]
    fn dkim_record_parse() {
        for (record, expected_flags, expected_bits) in [
            (
                concat!(
                    "v=DKIM1; p=MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQ",
                    "KBgQDwIRP/UC3SBsEmGqZ9ZJW3/DkMoGeLnQg1fWn7/zYt",
                    "IxN2SnFCjxOCKG9v3b4jYfcTNh5ijSsq631uBItLa7od+v",
                    "/RtdC2UzJ1lWT947qR+Rcac2gbto/NMqJ0fzfVjH4OuKhi",
                    "tdY9tf6mcwGjaNBcWToIMmPSPDdQPNUYckcQ2QIDAQAB",
                ),
                0,
                1024,
            ),
            (
                concat!(
                    "v=DKIM1; k=rsa; p=MIIBIjANBgkqhkiG9w0BAQEFAAOC",
                    "AQ8AMIIBCgKCAQEAvzwKQIIWzQXv0nihasFTT3+JO23hXCg",
                    "e+ESWNxCJdVLxKL5edxrumEU3DnrPeGD6q6E/vjoXwBabpm",
                    "8F5o96MEPm7v12O5IIK7wx7gIJiQWvexwh+GJvW4aFFa0g1",
                    "3Ai75UdZjGFNKHAEGeLmkQYybK/EHW5ymRlSg3g8zydJGEc",
                    "I/melLCiBoShHjfZFJEThxLmPHNSi+KOUMypxqYHd7hzg6W",
                    "7qnq6t9puZYXMWj6tEaf6ORWgb7DOXZSTJJjAJPBWa2+Urx",
                    "XX6Ro7L7Xy1zzeYFCk8W5vmn0wMgGpjkWw0ljJWNwIpxZAj9",
                    "p5wMedWasaPS74TZ1b7tI39ncp6QIDAQAB ; t= y : s :yy:x;",
                    "s=*:email;; h= sha1:sha 256:other;; n=ignore these notes "
                ),
                R_HASH_SHA1
                    | R_HASH_SHA256
                    | R_SVC_TAG
                    | R_SVC_ALL
                    | R_SVC_EMAIL
                    | R_FLAG_MATCH_DOMAIN
                    | R_FLAG_TESTING,
                2048,
            ),
            (
                concat!(
                    "p=MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQCYtb/9Sh8nGKV7exhUFS",
                    "+cBNXlHgO1CxD9zIfQd5ztlq1LO7g38dfmFpQafh9lKgqPBTolFhZxhF1yUNT",
                    "hpV673NdAtaCVGNyx/fTYtvyyFe9DH2tmm/ijLlygDRboSkIJ4NHZjK++48hk",
                    "NP8/htqWHS+CvwWT4Qgs0NtB7Re9bQIDAQAB"
                ),
                0,
                1024,
            ),
        ] {
            let key = DomainKey::parse(record.as_bytes()).unwrap();
            assert_eq!(key.f, expected_flags, "{record}");
            assert_eq!(key.public_key().algorithm(), KeyAlgorithm::Rsa);
            assert_eq!(key.public_key().key_size(), expected_bits);
            assert!(!key.public_key().is_private());
            assert!(key.accepts_email());
            assert!(key.accepts_hash(HashAlgorithm::Sha256));
        }
    }

    #[test]
    fn dkim_record_flags() {
        let key = DomainKey::parse(
            b"v=DKIM1; k=ed25519; h=sha256; s=tls; t=s; p=11qYAYKxCrfVS/7TyWQHOg7hcvPapiMlrwIaaPcHURo=",
        )
        .unwrap();
        assert_eq!(key.public_key().algorithm(), KeyAlgorithm::Ed25519);
        assert!(key.accepts_hash(HashAlgorithm::Sha256));
        assert!(!key.accepts_hash(HashAlgorithm::Sha1));
        assert!(!key.accepts_email());
        assert!(key.strict_domain_match());
        assert!(!key.is_testing());
    }

    #[test]
    fn dkim_record_errors() {
        for (record, expected) in [
            ("v=DKIM1; k=rsa; p=", Error::RevokedPublicKey),
            ("v=DKIM1; p= ; t=y", Error::RevokedPublicKey),
            ("v=DKIM2; p=MIGfMA0G", Error::InvalidRecordType),
            ("v=DKIM1; k=rsa; t=y", Error::InvalidRecordType),
            ("", Error::InvalidRecordType),
            (
                "v=DKIM1; k=ecdsa; p=11qYAYKxCrfVS/7TyWQHOg7hcvPapiMlrwIaaPcHURo=",
                Error::UnsupportedAlgorithm,
            ),
            ("v=DKIM1; p=%%%", Error::Base64),
        ] {
            let result = DomainKey::parse(record.as_bytes());
            assert!(
                matches!(
                    (&result, &expected),
                    (Err(Error::RevokedPublicKey), Error::RevokedPublicKey)
                        | (Err(Error::InvalidRecordType), Error::InvalidRecordType)
                        | (Err(Error::UnsupportedAlgorithm), Error::UnsupportedAlgorithm)
                        | (Err(Error::Base64), Error::Base64)
                ),
                "{record:?}: {result:?}"
            );
        }
    }
}
