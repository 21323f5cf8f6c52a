/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

#![no_main]
use libfuzzer_sys::fuzz_target;

use mail_dkim_core::{BodyCanonicalizer, Canonicalization, DomainKey, KeyMaterial};

static BODY_ALPHABET: &[u8] = b"ab \t\r\n";
static TXT_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz1=;:";

fuzz_target!(|data: &[u8]| {
    let data_body = into_alphabet(data, BODY_ALPHABET);
    let data_txt = into_alphabet(data, TXT_ALPHABET);

    for canonicalization in [Canonicalization::Relaxed, Canonicalization::Simple] {
        for body in [data, data_body.as_slice()] {
            let mut filter = canonicalization.body_canonicalizer();
            let whole = filter.canonicalize(body);

            let split = body.first().map_or(0, |&byte| byte as usize % (body.len() + 1));
            let mut chunked = filter.filter_to_vec(&body[..split]);
            chunked.extend(filter.filter_to_vec(&body[split..]));
            chunked.extend(filter.flush_to_vec());
            assert_eq!(whole, chunked);

            assert_eq!(whole, filter.canonicalize(&whole));
        }
    }

    DomainKey::parse(data).ok();
    DomainKey::parse(&data_txt).ok();

    KeyMaterial::from_public_key_record("rsa", &String::from_utf8_lossy(data)).ok();
    KeyMaterial::load_private_key(data).ok();
});

fn into_alphabet(data: &[u8], alphabet: &[u8]) -> Vec<u8> {
    data.iter()
        .map(|&byte| alphabet[byte as usize % alphabet.len()])
        .collect()
}
