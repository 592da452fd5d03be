//! Configuration-file misconfiguration scanner (spec §4.1.4).
//!
//! Same shape as [`crate::scanners::license`]: walk, dispatch by filename,
//! apply fixed regex rules, emit findings under the `CFG-` id prefix.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CoreResult;
use crate::scanners::{CancellationToken, IdCounter, StaticScanner};
use crate::types::{Category, Confidence, Finding, Location, ScanTarget, Severity};
use crate::walker::collect_files;

struct ConfigRule {
    filenames: &'static [&'static str],
    regex: Lazy<Regex>,
    cwe: &'static str,
    severity: Severity,
    title: &'static str,
}

macro_rules! config_rule {
    ($filenames:expr, $pattern:literal, $cwe:literal, $severity:expr, $title:literal) => {
        ConfigRule {
            filenames: $filenames,
            regex: Lazy::new(|| Regex::new($pattern).expect("static config rule is valid")),
            cwe: $cwe,
            severity: $severity,
            title: $title,
        }
    };
}

static RULES: &[ConfigRule] = &[
    config_rule!(
        &["docker-compose.yml", "docker-compose.yaml"],
        r"(?i)privileged\s*:\s*true",
        "CWE-250",
        Severity::High,
        "Container runs in privileged mode"
    ),
    config_rule!(
        &["Dockerfile"],
        r"(?i)^\s*USER\s+root",
        "CWE-250",
        Severity::Medium,
        "Container explicitly runs as root"
    ),
    config_rule!(
        &[".env", ".env.example"],
        r"(?i)DEBUG\s*=\s*(true|1)",
        "CWE-489",
        Severity::Low,
        "Debug mode left enabled"
    ),
    config_rule!(
        &["nginx.conf"],
        r"(?i)autoindex\s+on",
        "CWE-548",
        Severity::Medium,
        "Directory listing (autoindex) is enabled"
    ),
];

pub struct ConfigScanner {
    ids: IdCounter,
}

impl ConfigScanner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ids: IdCounter::new("CFG"),
        }
    }

    #[must_use]
    pub fn scan_source(&self, relative_path: &str, filename: &str, source: &str) -> Vec<Finding> {
        let mut findings = Vec::new();
        for rule in RULES {
            if !rule.filenames.contains(&filename) {
                continue;
            }
            for (idx, line) in source.lines().enumerate() {
                if rule.regex.is_match(line) {
                    let line_no = idx + 1;
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
                        evidence: line.trim().to_string(),
                        remediation: "Review this configuration against least-privilege defaults."
                            .to_string(),
                        confidence: Confidence::High,
                        references: Vec::new(),
                        metadata: None,
                        skill_source: None,
                    });
                }
            }
        }
        findings
    }
}

impl Default for ConfigScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StaticScanner for ConfigScanner {
    fn name(&self) -> &str {
        "config"
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
            if !RULES.iter().any(|rule| rule.filenames.contains(&filename)) {
                continue;
            }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privileged_compose_service_is_flagged() {
        let scanner = ConfigScanner::new();
        let source = "services:\n  app:\n    privileged: true\n";
        let findings = scanner.scan_source("docker-compose.yml", "docker-compose.yml", source);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].cwe, "CWE-250");
    }

    #[test]
    fn unrelated_filename_is_ignored() {
        let scanner = ConfigScanner::new();
        let findings = scanner.scan_source("notes.txt", "notes.txt", "privileged: true\n");
        assert!(findings.is_empty());
    }
}
