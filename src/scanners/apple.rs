//! Apple-platform misconfiguration scanner (spec §4.1.4).
//!
//! Same shape as [`crate::scanners::config_scanner`]: dispatch by filename,
//! apply fixed rules, emit findings under the `APPLE-` id prefix.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CoreResult;
use crate::scanners::{CancellationToken, IdCounter, StaticScanner};
use crate::types::{Category, Confidence, Finding, Location, ScanTarget, Severity};
use crate::walker::collect_files;

struct AppleRule {
    filenames: &'static [&'static str],
    regex: Lazy<Regex>,
    cwe: &'static str,
    severity: Severity,
    title: &'static str,
}

macro_rules! apple_rule {
    ($filenames:expr, $pattern:literal, $cwe:literal, $severity:expr, $title:literal) => {
        AppleRule {
            filenames: $filenames,
            regex: Lazy::new(|| Regex::new($pattern).expect("static Apple rule is valid")),
            cwe: $cwe,
            severity: $severity,
            title: $title,
        }
    };
}

static RULES: &[AppleRule] = &[
    apple_rule!(
        &["Info.plist"],
        r"(?i)NSAllowsArbitraryLoads</key>\s*<true/>",
        "CWE-319",
        Severity::High,
        "App Transport Security disabled (NSAllowsArbitraryLoads)"
    ),
    apple_rule!(
        &["Info.plist"],
        r"(?i)NSAllowsArbitraryLoadsInWebContent</key>\s*<true/>",
        "CWE-319",
        Severity::Medium,
        "App Transport Security disabled for web content"
    ),
    apple_rule!(
        &[".entitlements"],
        r"com\.apple\.security\.get-task-allow</key>\s*<true/>",
        "CWE-489",
        Severity::Medium,
        "Debugger-attach entitlement enabled"
    ),
];

pub struct AppleScanner {
    ids: IdCounter,
}

impl AppleScanner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ids: IdCounter::new("APPLE"),
        }
    }

    #[must_use]
    pub fn scan_source(&self, relative_path: &str, filename: &str, source: &str) -> Vec<Finding> {
        let mut findings = Vec::new();
        for rule in RULES {
            let matches_filename = rule
                .filenames
                .iter()
                .any(|pattern| filename == *pattern || filename.ends_with(pattern.trim_start_matches('*')));
            if !matches_filename {
                continue;
            }
            if let Some(line_no) = source.lines().position(|line| rule.regex.is_match(line)) {
                let line_no = line_no + 1;
                findings.push(Finding {
                    id: self.ids.next_id(),
                    scanner: self.name().to_string(),
                    severity: rule.severity,
                    category: Category::Misconfiguration,
                    title: rule.title.to_string(),
                    description: format!("{} in {relative_path} at line {line_no}.", rule.title),
                    location: Location::new(relative_path, line_no, line_no),
                    cwe: rule.cwe.to_string(),
                    owasp: None,
                    evidence: rule.title.to_string(),
                    remediation: "Review this Apple platform security configuration.".to_string(),
                    confidence: Confidence::High,
                    references: Vec::new(),
                    metadata: None,
                    skill_source: None,
                });
            }
        }
        findings
    }
}

impl Default for AppleScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StaticScanner for AppleScanner {
    fn name(&self) -> &str {
        "apple-platform"
    }

    async fn scan(&self, cancel: &CancellationToken, target: &ScanTarget) -> CoreResult<Vec<Finding>> {
        if cancel.is_cancelled() {
            return Err(crate::error::CoreError::Cancelled);
        }

        let files = match &target.files {
            Some(explicit) => explicit.clone(),
            None => collect_files(&target.root_dir, &target.exclude_patterns),
        };

        let mut findings = Vec::new();
        for rel in files {
            if cancel.is_cancelled() {
                return Err(crate::error::CoreError::Cancelled);
            }
            let Some(filename) = rel.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let full_path = target.root_dir.join(&rel);
            let Ok(source) = std::fs::read_to_string(&full_path) else {
                continue;
            };
            let rel_str = rel.to_string_lossy().replace('\\', "/");
            findings.extend(self.scan_source(&rel_str, filename, &source));
        }

        Ok(findings)
    }
}
