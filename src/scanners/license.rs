//! License-compliance scanner (spec §4.1.4).
//!
//! Flags dependency manifests and `LICENSE` files that declare a copyleft
//! license likely to be incompatible with proprietary distribution.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CoreResult;
use crate::scanners::{CancellationToken, IdCounter, StaticScanner};
use crate::types::{Category, Confidence, Finding, Location, ScanTarget, Severity};
use crate::walker::collect_files;

static COPYLEFT_LICENSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(GPL-[23](\.0)?|AGPL-3(\.0)?|GNU GENERAL PUBLIC LICENSE)\b")
        .expect("static license pattern is valid")
});

const RELEVANT_FILENAMES: &[&str] = &["LICENSE", "LICENSE.txt", "LICENSE.md", "package.json", "Cargo.toml"];

pub struct LicenseScanner {
    ids: IdCounter,
}

impl LicenseScanner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ids: IdCounter::new("LIC"),
        }
    }

    #[must_use]
    pub fn scan_source(&self, relative_path: &str, source: &str) -> Vec<Finding> {
        let Some((idx, _)) = source.lines().enumerate().find(|(_, line)| COPYLEFT_LICENSE.is_match(line))
        else {
            return Vec::new();
        };
        let line_no = idx + 1;
        vec![Finding {
            id: self.ids.next_id(),
            scanner: self.name().to_string(),
            severity: Severity::Medium,
            category: Category::LicenseCompliance,
            title: "Copyleft license detected".to_string(),
            description: format!("{relative_path} declares a copyleft license at line {line_no}."),
            location: Location::new(relative_path, line_no, line_no),
            cwe: String::new(),
            owasp: None,
            evidence: "Copyleft license detected".to_string(),
            remediation: "Confirm this license is compatible with your distribution model."
                .to_string(),
            confidence: Confidence::Medium,
            references: Vec::new(),
            metadata: None,
            skill_source: None,
        }]
    }
}

impl Default for LicenseScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StaticScanner for LicenseScanner {
    fn name(&self) -> &str {
        "license"
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
            if !RELEVANT_FILENAMES.contains(&filename) {
                continue;
            }
            let full_path = target.root_dir.join(&rel);
            let Ok(source) = std::fs::read_to_string(&full_path) else {
                continue;
            };
            let rel_str = rel.to_string_lossy().replace('\\', "/");
            findings.extend(self.scan_source(&rel_str, &source));
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpl_license_file_is_flagged() {
        let scanner = LicenseScanner::new();
        let findings = scanner.scan_source("LICENSE", "GNU GENERAL PUBLIC LICENSE\nVersion 3\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, Category::LicenseCompliance);
    }

    #[test]
    fn mit_license_is_not_flagged() {
        let scanner = LicenseScanner::new();
        let findings = scanner.scan_source("LICENSE", "MIT License\n\nPermission is hereby granted...");
        assert!(findings.is_empty());
    }
}
