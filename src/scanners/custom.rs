//! User-supplied rule scanner (spec §4.1.5).
//!
//! Invalid regexes are silently discarded at construction (spec §7 item 7):
//! no finding, no log, the scanner simply runs with one fewer rule.

use async_trait::async_trait;
use regex::Regex;

use crate::error::CoreResult;
use crate::scanners::{CancellationToken, IdCounter, StaticScanner};
use crate::types::{Category, Confidence, Finding, Location, ScanTarget, Severity};
use crate::walker::collect_files;

/// A user-supplied rule as described by spec §4.1.5, before regex
/// compilation.
#[derive(Debug, Clone)]
pub struct CustomRuleSpec {
    pub id: String,
    pub pattern: String,
    pub severity: Severity,
    pub title: String,
    pub category: Category,
}

struct CompiledRule {
    id: String,
    regex: Regex,
    severity: Severity,
    title: String,
    category: Category,
}

pub struct CustomRuleScanner {
    ids: IdCounter,
    rules: Vec<CompiledRule>,
}

impl CustomRuleScanner {
    #[must_use]
    pub fn new(specs: Vec<CustomRuleSpec>) -> Self {
        let rules = specs
            .into_iter()
            .filter_map(|spec| {
                Regex::new(&spec.pattern).ok().map(|regex| CompiledRule {
                    id: spec.id,
                    regex,
                    severity: spec.severity,
                    title: spec.title,
                    category: spec.category,
                })
            })
            .collect();
        Self {
            ids: IdCounter::new("CUSTOM"),
            rules,
        }
    }

    /// Number of rules that survived compilation; exposed for tests that
    /// want to assert on the silent-discard behaviour.
    #[must_use]
    pub fn compiled_rule_count(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn scan_source(&self, relative_path: &str, source: &str) -> Vec<Finding> {
        let mut findings = Vec::new();
        for rule in &self.rules {
            for (idx, line) in source.lines().enumerate() {
                if rule.regex.is_match(line) {
                    let line_no = idx + 1;
                    findings.push(Finding {
                        id: self.ids.next_id(),
                        scanner: self.name().to_string(),
                        severity: rule.severity,
                        category: rule.category,
                        title: rule.title.clone(),
                        description: format!("{} matched rule {} in {relative_path}.", rule.title, rule.id),
                        location: Location::new(relative_path, line_no, line_no),
                        cwe: String::new(),
                        owasp: None,
                        evidence: line.trim().to_string(),
                        remediation: "Review this custom rule match.".to_string(),
                        confidence: Confidence::High,
                        references: Vec::new(),
                        metadata: Some(std::collections::HashMap::from([(
                            "rule_id".to_string(),
                            rule.id.clone(),
                        )])),
                        skill_source: None,
                    });
                }
            }
        }
        findings
    }
}

#[async_trait]
impl StaticScanner for CustomRuleScanner {
    fn name(&self) -> &str {
        "custom-rule"
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
