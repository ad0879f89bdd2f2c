// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! License check handshake (spec §4.G). Gated behind the `crypto` feature
//! since the cache file format is AES-ECB encrypted.

pub mod cache;

pub use cache::{LicenseCache, ProductEntry};

use crate::config::LICENSE_DEGRADED_EXTENSION_SECS;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::OnceLock;

static CACHE: OnceLock<Mutex<Option<LicenseCache>>> = OnceLock::new();

fn cache_slot() -> &'static Mutex<Option<LicenseCache>> {
    CACHE.get_or_init(|| Mutex::new(None))
}

/// Install the process-wide cache, read once at startup (spec §4.G "On
/// process initialisation read the cache file").
pub fn install_cache(cache: LicenseCache) {
    *cache_slot().lock() = Some(cache);
}

/// Check `product_code` against the installed process-wide cache. Returns
/// [`LicenseStatus::ConnectToServer`] if no cache has been installed yet.
pub fn check_installed(product_code: u32, local_machine_code: u32, now: i64) -> LicenseStatus {
    match cache_slot().lock().as_ref() {
        Some(cache) => check(cache, product_code, local_machine_code, now),
        None => LicenseStatus::ConnectToServer,
    }
}

/// Read and decrypt the cache file at `path` (spec §4.G "On process
/// initialisation read the cache file").
#[cfg(feature = "crypto")]
pub fn load_cache_file(path: &std::path::Path, key: &[u8; 16]) -> Result<LicenseCache> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::FileOpenFailed { path: path.display().to_string(), source })?;
    LicenseCache::parse(&text, key)
}

/// [`load_cache_file`] at `runtime.license_cache_path`.
#[cfg(feature = "crypto")]
pub fn load_from_runtime(runtime: &crate::config::RuntimeConfig, key: &[u8; 16]) -> Result<LicenseCache> {
    load_cache_file(&runtime.license_cache_path, key)
}

/// Outcome of checking one product against the cache (spec §4.G).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseStatus {
    /// Entry matches; the product is usable until `timeout`.
    Valid,
    /// No cache entry for this product; caller must round-trip to the server.
    ConnectToServer,
    /// Entry's machine code doesn't match this host.
    WrongMachine,
    /// Entry's timeout has elapsed.
    Expired,
}

/// Whether the network is reachable, as the caller's own probe determined
/// it (this crate has no opinion on how that probe is implemented).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    ServerReachable,
    /// The license server specifically is down, but general internet access works.
    ServerUnreachableInternetUp,
    Offline,
}

/// Check `product_code` against `cache`, given the local machine code and
/// the current time (spec §4.G "On process initialisation...").
pub fn check(cache: &LicenseCache, product_code: u32, local_machine_code: u32, now: i64) -> LicenseStatus {
    match cache.entry_for(product_code) {
        None => LicenseStatus::ConnectToServer,
        Some(entry) if entry.machine_code != local_machine_code => LicenseStatus::WrongMachine,
        Some(entry) if (entry.timeout as i64) < now => LicenseStatus::Expired,
        Some(_) => LicenseStatus::Valid,
    }
}

/// Resolve a non-`Valid` status against the server's reachability, applying
/// the degraded-availability extension when only the license server itself
/// is unreachable (spec §4.G "extend the timeout by one hour without
/// contacting the server").
pub fn resolve_degraded(status: LicenseStatus, reachability: Reachability, entry: Option<ProductEntry>, now: i64) -> Result<ProductEntry> {
    match status {
        LicenseStatus::Valid => entry.ok_or(Error::NoLicense),
        _ => match reachability {
            Reachability::ServerReachable => Err(Error::ServerUnreachable),
            Reachability::Offline => Err(Error::ServerUnreachable),
            Reachability::ServerUnreachableInternetUp => {
                let mut e = entry.ok_or(Error::NoLicense)?;
                e.timeout = (now + LICENSE_DEGRADED_EXTENSION_SECS).max(0) as u32;
                log::info!(
                    "license server unreachable for product {}, extending timeout to {} (degraded availability)",
                    e.product_code,
                    e.timeout
                );
                Ok(e)
            }
        },
    }
}
