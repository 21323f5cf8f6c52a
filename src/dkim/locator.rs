/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use std::{collections::HashMap, future::Future};

use crate::{Error, Result};

use super::DomainKey;

/// Source of DKIM public key records.
///
/// `methods` is the signature's `q=` list; an empty list means `dns/txt`.
/// Lookups are cancelled by dropping the returned future.
pub trait PublicKeyLocator {
    fn locate_public_key(
        &self,
        methods: &[&str],
        domain: &str,
        selector: &str,
    ) -> impl Future<Output = Result<Vec<DomainKey>>> + Send;

    fn locate_public_key_blocking(
        &self,
        methods: &[&str],
        domain: &str,
        selector: &str,
    ) -> Result<Vec<DomainKey>>;
}

/// Key records held in memory, keyed by `<selector>._domainkey.<domain>`.
#[derive(Debug, Clone, Default)]
pub struct MemoryLocator {
    records: HashMap<String, Vec<String>>,
}

impl MemoryLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a TXT record. Several records may exist for one name.
    pub fn with_record(
        mut self,
        domain: impl AsRef<str>,
        selector: impl AsRef<str>,
        txt: impl Into<String>,
    ) -> Self {
        self.insert(domain, selector, txt);
        self
    }

    pub fn insert(
        &mut self,
        domain: impl AsRef<str>,
        selector: impl AsRef<str>,
        txt: impl Into<String>,
    ) {
        self.records
            .entry(query_name(domain.as_ref(), selector.as_ref()))
            .or_default()
            .push(txt.into());
    }

    fn lookup(&self, methods: &[&str], domain: &str, selector: &str) -> Result<Vec<DomainKey>> {
        if !methods.is_empty() && !methods.iter().any(|method| is_dns_txt(method)) {
            tracing::debug!(?methods, "No supported key query method");
            return Err(Error::DnsRecordNotFound);
        }

        let name = query_name(domain, selector);
        let records = self.records.get(&name).ok_or_else(|| {
            tracing::debug!(name = %name, "Key record not found");
            Error::DnsRecordNotFound
        })?;

        // Records that fail to parse are skipped unless none parse.
        let mut keys = Vec::with_capacity(records.len());
        let mut last_err = None;
        for record in records {
            match DomainKey::parse(record.as_bytes()) {
                Ok(key) => keys.push(key),
                Err(err) => {
                    tracing::debug!(name = %name, error = %err, "Ignoring key record");
                    last_err = Some(err);
                }
            }
        }

        match last_err {
            Some(err) if keys.is_empty() => Err(err),
            _ if keys.is_empty() => Err(Error::DnsRecordNotFound),
            _ => Ok(keys),
        }
    }
}

impl PublicKeyLocator for MemoryLocator {
    async fn locate_public_key(
        &self,
        methods: &[&str],
        domain: &str,
        selector: &str,
    ) -> Result<Vec<DomainKey>> {
        self.lookup(methods, domain, selector)
    }

    fn locate_public_key_blocking(
        &self,
        methods: &[&str],
        domain: &str,
        selector: &str,
    ) -> Result<Vec<DomainKey>> {
        self.lookup(methods, domain, selector)
    }
}

fn query_name(domain: &str, selector: &str) -> String {
    format!(
        "{}._domainkey.{}",
        selector.trim().trim_end_matches('.'),
        domain.trim().trim_end_matches('.')
    )
    .to_ascii_lowercase()
}

fn is_dns_txt(method: &str) -> bool {
    let method = method.trim();
    method.eq_ignore_ascii_case("dns/txt") || method.eq_ignore_ascii_case("dns")
}
