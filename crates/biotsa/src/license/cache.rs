// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! License cache file parsing and the product-entry format (spec §4.G, §6).
//!
//! Plain-text file: a customer-code header line, then one line per product
//! holding a hex-encoded, hyphen-grouped AES-ECB ciphertext that decrypts to
//! a fixed-width entry record. Parsing follows the same bounds-checked,
//! explicit-offset style as the block codec's cursor reads, just over text
//! lines instead of a byte buffer.

use crate::error::{Error, Result};

const CUSTOMER_CODE_PREFIX: &str = "Customer Code: ";

/// One decrypted product entry (spec §6 "License cache file").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductEntry {
    pub product_code: u32,
    pub version_major: u8,
    pub version_minor: u8,
    pub license_type: u8,
    pub timeout: u32,
    pub machine_code: u32,
}

impl ProductEntry {
    const ENCODED_LEN: usize = 16;

    fn to_bytes(self) -> [u8; Self::ENCODED_LEN] {
        let mut buf = [0u8; Self::ENCODED_LEN];
        buf[0..4].copy_from_slice(&self.product_code.to_le_bytes());
        buf[4] = self.version_major;
        buf[5] = self.version_minor;
        buf[6] = self.license_type;
        buf[7] = 0;
        buf[8..12].copy_from_slice(&self.timeout.to_le_bytes());
        buf[12..16].copy_from_slice(&self.machine_code.to_le_bytes());
        buf
    }

    fn from_bytes(buf: &[u8; Self::ENCODED_LEN]) -> Self {
        Self {
            product_code: u32::from_le_bytes(buf[0..4].try_into().expect("4-byte slice")),
            version_major: buf[4],
            version_minor: buf[5],
            license_type: buf[6],
            timeout: u32::from_le_bytes(buf[8..12].try_into().expect("4-byte slice")),
            machine_code: u32::from_le_bytes(buf[12..16].try_into().expect("4-byte slice")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LicenseCache {
    pub customer_code: u32,
    pub entries: Vec<ProductEntry>,
}

impl LicenseCache {
    pub fn new(customer_code: u32) -> Self {
        Self { customer_code, entries: Vec::new() }
    }

    pub fn entry_for(&self, product_code: u32) -> Option<&ProductEntry> {
        self.entries.iter().find(|e| e.product_code == product_code)
    }

    /// Insert or replace the entry for `entry.product_code`.
    pub fn upsert(&mut self, entry: ProductEntry) {
        match self.entries.iter_mut().find(|e| e.product_code == entry.product_code) {
            Some(slot) => *slot = entry,
            None => self.entries.push(entry),
        }
    }

    /// Collapse duplicate entries for the same product code down to one,
    /// keeping the last occurrence (spec §4.G "A duplicate-entry cleaner
    /// collapses multiple entries for the same product code to one on
    /// write").
    pub fn dedupe(&mut self) {
        let mut seen = std::collections::HashMap::new();
        for (i, e) in self.entries.iter().enumerate() {
            seen.insert(e.product_code, i);
        }
        let mut kept: Vec<usize> = seen.into_values().collect();
        kept.sort_by_key(|&i| i);
        self.entries = kept.into_iter().map(|i| self.entries[i]).collect();
    }

    #[cfg(feature = "crypto")]
    pub fn parse(text: &str, key: &[u8; 16]) -> Result<Self> {
        let mut lines = text.lines();
        let header = lines.next().ok_or_else(|| parse_err("empty license cache file"))?;
        let customer_code: u32 = header
            .strip_prefix(CUSTOMER_CODE_PREFIX)
            .ok_or_else(|| parse_err("missing customer code header"))?
            .trim()
            .parse()
            .map_err(|_| parse_err("customer code is not a valid integer"))?;

        let mut cache = LicenseCache::new(customer_code);
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut bytes = decode_hex_grouped(line)?;
            crate::crypto::decrypt_in_place(key, &mut bytes);
            let array: [u8; ProductEntry::ENCODED_LEN] = bytes.try_into().map_err(|_| parse_err("entry did not decrypt to 16 bytes"))?;
            cache.upsert(ProductEntry::from_bytes(&array));
        }
        Ok(cache)
    }

    #[cfg(feature = "crypto")]
    pub fn serialize(&self, key: &[u8; 16]) -> String {
        let mut out = format!("{CUSTOMER_CODE_PREFIX}{}\n", self.customer_code);
        let mut deduped = self.clone();
        deduped.dedupe();
        for entry in &deduped.entries {
            let mut bytes = entry.to_bytes().to_vec();
            crate::crypto::encrypt_in_place(key, &mut bytes);
            out.push_str(&encode_hex_grouped(&bytes));
            out.push('\n');
        }
        out
    }
}

fn parse_err(msg: &str) -> Error {
    Error::FileOpenFailed { path: "license cache".into(), source: std::io::Error::new(std::io::ErrorKind::InvalidData, msg.to_string()) }
}

/// 32 hex characters grouped as eight hyphen-separated quartets (spec §6).
fn encode_hex_grouped(bytes: &[u8]) -> String {
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    hex.as_bytes().chunks(4).map(|c| std::str::from_utf8(c).expect("ascii hex")).collect::<Vec<_>>().join("-")
}

fn decode_hex_grouped(line: &str) -> Result<Vec<u8>> {
    let hex: String = line.chars().filter(|c| *c != '-').collect();
    if hex.len() != 32 {
        return Err(parse_err("expected 32 hex characters per license entry"));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| parse_err("invalid hex digit in license entry")))
        .collect()
}

#[cfg(test)]
#[cfg(feature = "crypto")]
mod tests {
    use super::*;

    #[test]
    fn serialize_then_parse_roundtrips() {
        let key = [0x5au8; 16];
        let mut cache = LicenseCache::new(42);
        cache.upsert(ProductEntry { product_code: 7, version_major: 2, version_minor: 1, license_type: 0, timeout: 3600, machine_code: 0xdead_beef });
        let text = cache.serialize(&key);
        let parsed = LicenseCache::parse(&text, &key).unwrap();
        assert_eq!(parsed.customer_code, 42);
        assert_eq!(parsed.entry_for(7), cache.entry_for(7));
    }

    #[test]
    fn dedupe_keeps_last_entry_for_duplicate_product_codes() {
        let mut cache = LicenseCache::new(1);
        cache.entries.push(ProductEntry { product_code: 5, version_major: 1, version_minor: 0, license_type: 0, timeout: 10, machine_code: 1 });
        cache.entries.push(ProductEntry { product_code: 5, version_major: 2, version_minor: 0, license_type: 0, timeout: 20, machine_code: 1 });
        cache.dedupe();
        assert_eq!(cache.entries.len(), 1);
        assert_eq!(cache.entries[0].timeout, 20);
    }

    #[test]
    fn parse_rejects_missing_header() {
        let key = [0u8; 16];
        assert!(LicenseCache::parse("not a header\n", &key).is_err());
    }
}
