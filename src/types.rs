//! Finding, Location, AttackChain, Severity/Category/Confidence enums, Report,
//! and the summary computation described in spec §3.
//!
//! All wire (de)serialization lives on these types directly via `serde`, so
//! formatters only ever reshape already-validated, already-typed values.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Severity, ranked `critical=5 .. info=1`. The set is closed: there is no
/// `Unknown` variant because this is a typed Rust enum, not a string parsed
/// at the boundary — callers that need to map an arbitrary string map it to
/// one of these five first (see [`Severity::parse_loose`]), so a Finding can
/// never carry an "unknown" severity once constructed. See DESIGN.md for the
/// resulting simplification of the summary invariant in spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Critical => 5,
            Self::High => 4,
            Self::Medium => 3,
            Self::Low => 2,
            Self::Info => 1,
        }
    }

    /// Case-insensitive mapping used by the LLM analyzer base algorithm
    /// (spec §4.3 step 6): any unrecognized value maps to `info`.
    #[must_use]
    pub fn parse_loose(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Self::Critical,
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Info,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence, ranked `high=3, medium=2, low=1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }

    /// Case-insensitive mapping used by the LLM analyzer base algorithm
    /// (spec §4.3 step 6): any unrecognized value maps to `low`.
    #[must_use]
    pub fn parse_loose(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            _ => Self::Low,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of 13 category tags (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Injection,
    Authentication,
    Authorization,
    Cryptography,
    SecretsExposure,
    VulnerableDependency,
    Misconfiguration,
    DataExposure,
    RaceCondition,
    InputValidation,
    LoggingMonitoring,
    SupplyChain,
    LicenseCompliance,
}

impl Category {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Injection => "injection",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::Cryptography => "cryptography",
            Self::SecretsExposure => "secrets-exposure",
            Self::VulnerableDependency => "vulnerable-dependency",
            Self::Misconfiguration => "misconfiguration",
            Self::DataExposure => "data-exposure",
            Self::RaceCondition => "race-condition",
            Self::InputValidation => "input-validation",
            Self::LoggingMonitoring => "logging-monitoring",
            Self::SupplyChain => "supply-chain",
            Self::LicenseCompliance => "license-compliance",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source location, relative to the scan root (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    /// Enclosing function name, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
}

impl Location {
    #[must_use]
    pub fn new(file: impl Into<String>, start_line: usize, end_line: usize) -> Self {
        Self {
            file: file.into(),
            start_line,
            end_line,
            function: None,
        }
    }

    #[must_use]
    pub fn with_function(mut self, name: impl Into<String>) -> Self {
        self.function = Some(name.into());
        self
    }
}

/// A single, immutable-once-emitted security observation (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub scanner: String,
    pub severity: Severity,
    pub category: Category,
    pub title: String,
    pub description: String,
    pub location: Location,
    /// `"CWE-89"`-shaped identifier, or empty when not applicable.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cwe: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owasp: Option<String>,
    /// Short string; MUST NOT reveal a matched secret in full (spec §3/§8).
    pub evidence: String,
    pub remediation: String,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_source: Option<String>,
}

impl Finding {
    /// Parse the leading integer out of a `CWE-<n>` string, if well-formed.
    #[must_use]
    pub fn cwe_number(&self) -> Option<u32> {
        self.cwe.strip_prefix("CWE-")?.parse().ok()
    }
}

/// An ordered set of findings realising a known multi-step exploit shape
/// (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackChain {
    pub id: String,
    pub title: String,
    pub severity: Severity,
    pub steps: Vec<Finding>,
    pub impact: String,
    pub likelihood: String,
}

/// A bounded source region submitted to an LLM analyzer (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisChunk {
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    pub language: String,
    pub risk_score: u32,
}

/// Describes what to scan (spec §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanTarget {
    pub root_dir: PathBuf,
    /// When set, scan exactly these files (relative to `root_dir`) instead
    /// of walking the tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<PathBuf>>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// Engine-level tuning knobs (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub max_llm_chunks: usize,
    pub min_risk_score: u32,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    pub concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_llm_chunks: 50,
            min_risk_score: 0,
            exclude_patterns: Vec::new(),
            concurrency: 4,
        }
    }
}

impl EngineConfig {
    /// Clamp `concurrency` to the spec's invariant (`>= 1`).
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.concurrency = self.concurrency.max(1);
        self
    }
}

/// A non-fatal, per-scanner/analyzer error accumulated into the report
/// (spec §3, §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanError {
    pub scanner: String,
    pub err: String,
    pub fatal: bool,
}

/// Aggregate statistics for a completed scan (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportStats {
    pub duration_ms: u64,
    pub files_scanned: usize,
    pub chunks_analyzed: usize,
    pub findings_count: usize,
    pub chain_count: usize,
}

/// Per-severity counts, derived from `findings` (spec §3, §9 Open Question).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub total: usize,
    pub chains: usize,
}

/// The final, formatter-ready output of a scan (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub findings: Vec<Finding>,
    pub attack_chains: Vec<AttackChain>,
    pub stats: ReportStats,
    #[serde(default)]
    pub errors: Vec<ScanError>,
}

impl Report {
    /// Compute the per-severity summary. `total` is the deduplicated finding
    /// count (spec §9 Open Question) — callers must not assume it equals any
    /// pre-dedup count.
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary {
            chains: self.attack_chains.len(),
            total: self.findings.len(),
            ..ReportSummary::default()
        };

        for finding in &self.findings {
            match finding.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Info => summary.info += 1,
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_rank_order() {
        assert!(Severity::Critical.rank() > Severity::High.rank());
        assert!(Severity::High.rank() > Severity::Medium.rank());
        assert!(Severity::Medium.rank() > Severity::Low.rank());
        assert!(Severity::Low.rank() > Severity::Info.rank());
    }

    #[test]
    fn severity_parse_loose_defaults_to_info() {
        assert_eq!(Severity::parse_loose("bogus"), Severity::Info);
        assert_eq!(Severity::parse_loose("HIGH"), Severity::High);
    }

    #[test]
    fn confidence_parse_loose_defaults_to_low() {
        assert_eq!(Confidence::parse_loose("bogus"), Confidence::Low);
        assert_eq!(Confidence::parse_loose("High"), Confidence::High);
    }

    #[test]
    fn cwe_number_parses_standard_form() {
        let finding = sample_finding("CWE-89");
        assert_eq!(finding.cwe_number(), Some(89));
    }

    #[test]
    fn cwe_number_none_for_empty() {
        let finding = sample_finding("");
        assert_eq!(finding.cwe_number(), None);
    }

    #[test]
    fn summary_counts_match_findings() {
        let report = Report {
            findings: vec![sample_finding("CWE-89"), sample_finding("CWE-798")],
            attack_chains: Vec::new(),
            stats: ReportStats {
                duration_ms: 0,
                files_scanned: 0,
                chunks_analyzed: 0,
                findings_count: 2,
                chain_count: 0,
            },
            errors: Vec::new(),
        };
        let summary = report.summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.total, report.findings.len());
    }

    fn sample_finding(cwe: &str) -> Finding {
        Finding {
            id: "test-1".into(),
            scanner: "test".into(),
            severity: Severity::High,
            category: Category::Injection,
            title: "t".into(),
            description: "d".into(),
            location: Location::new("a.rs", 1, 1),
            cwe: cwe.into(),
            owasp: None,
            evidence: "e".into(),
            remediation: "r".into(),
            confidence: Confidence::High,
            references: Vec::new(),
            metadata: None,
            skill_source: None,
        }
    }
}
