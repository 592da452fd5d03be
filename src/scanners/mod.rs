//! Static scanner contract (spec §4.1) and the representative scanners.
//!
//! Every scanner is a plain struct holding only its own state (a monotonic
//! finding-id counter, its own config). The engine never reaches into a
//! scanner's internals; it only calls `name()` and `scan()`.

pub mod apple;
pub mod config_scanner;
pub mod custom;
pub mod dependency;
pub mod license;
pub mod sast;
pub mod secrets;

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{Finding, ScanTarget};

/// A cooperative cancellation flag threaded through every scanner/analyzer
/// call (spec §5). Cheap to clone; `cancelled()` is checked at file/request
/// boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// A deterministic producer of [`Finding`]s from source, lockfiles, or config
/// files (spec §4.1). Implementors must never panic on an unreadable or
/// unparsable file — skip and continue with the next one.
#[async_trait]
pub trait StaticScanner: Send + Sync {
    fn name(&self) -> &str;

    async fn scan(&self, cancel: &CancellationToken, target: &ScanTarget) -> CoreResult<Vec<Finding>>;
}

/// Read the first 512 bytes of `bytes` and return `true` if a NUL byte is
/// present — the engine-wide binary-file heuristic (spec §4.1.1 step 2).
#[must_use]
pub fn looks_binary(bytes: &[u8]) -> bool {
    let limit = bytes.len().min(512);
    memchr::memchr(0, &bytes[..limit]).is_some()
}

/// Case-insensitive "this looks like a placeholder, not a real secret" guard
/// shared by the secret scanner's rule-match and entropy passes (spec §4.1.1
/// step 4).
#[must_use]
pub fn is_example_value(value: &str) -> bool {
    static PATTERN: once_cell::sync::Lazy<regex::Regex> = once_cell::sync::Lazy::new(|| {
        regex::Regex::new(
            r"(?i)example|placeholder|your[-_]|sample|dummy|test[-_]|changeme|replace[-_]|insert[-_]|xxx|todo",
        )
        .expect("static pattern is valid")
    });
    PATTERN.is_match(value)
}

/// Mask a matched value per spec §4.1.1 step 6 / §8: first 4 characters kept,
/// the remainder replaced one-for-one with `*`.
#[must_use]
pub fn mask_evidence(rule_name: &str, matched: &str) -> String {
    let kept: String = matched.chars().take(4).collect();
    let stars = "*".repeat(matched.chars().count().saturating_sub(4));
    format!("Matched {rule_name} pattern: {kept}{stars}")
}

/// Shannon entropy in bits/character over `value`'s byte distribution
/// (spec §4.1.1 step 5).
#[must_use]
pub fn shannon_entropy(value: &str) -> f64 {
    if value.is_empty() {
        return 0.0;
    }
    let mut counts = std::collections::HashMap::new();
    for byte in value.bytes() {
        *counts.entry(byte).or_insert(0u32) += 1;
    }
    let len = value.len() as f64;
    counts
        .values()
        .map(|&count| {
            let p = f64::from(count) / len;
            -p * p.log2()
        })
        .sum()
}

/// Monotonic, mutex-guarded per-scanner finding-id counter (spec §4.1.4,
/// §9 "Global counters"). Each scanner owns one instance.
#[derive(Debug)]
pub struct IdCounter {
    prefix: &'static str,
    next: std::sync::Mutex<u64>,
}

impl IdCounter {
    #[must_use]
    pub const fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            next: std::sync::Mutex::new(1),
        }
    }

    #[must_use]
    pub fn next_id(&self) -> String {
        let mut guard = self.next.lock().expect("id counter mutex poisoned");
        let id = *guard;
        *guard += 1;
        format!("{}-{id:03}", self.prefix)
    }
}
