//! PR-review JSON formatter (spec §6 "PR review JSON", formatter name
//! `github-pr`).

use std::fmt::Write as _;

use serde::Serialize;

use crate::error::CoreResult;
use crate::formatters::Formatter;
use crate::types::Report;

#[derive(Serialize)]
struct PrReviewDocument {
    body: String,
    comments: Vec<PrComment>,
}

#[derive(Serialize)]
struct PrComment {
    path: String,
    line: usize,
    body: String,
    severity: String,
}

fn build_body(report: &Report) -> String {
    let summary = report.summary();
    let mut body = String::new();
    body.push_str("### Security scan summary\n\n");
    body.push_str("| Severity | Count |\n|---|---|\n");
    let _ = writeln!(body, "| Critical | {} |", summary.critical);
    let _ = writeln!(body, "| High | {} |", summary.high);
    let _ = writeln!(body, "| Medium | {} |", summary.medium);
    let _ = writeln!(body, "| Low | {} |", summary.low);
    let _ = writeln!(body, "| Info | {} |", summary.info);
    let _ = writeln!(body, "\nAttack chains detected: {}", report.attack_chains.len());
    body
}

pub struct PrReviewFormatter;

impl Formatter for PrReviewFormatter {
    fn name(&self) -> &str {
        "github-pr"
    }

    fn format(&self, report: &Report) -> CoreResult<Vec<u8>> {
        let document = PrReviewDocument {
            body: build_body(report),
            comments: report
                .findings
                .iter()
                .map(|finding| PrComment {
                    path: finding.location.file.clone(),
                    line: finding.location.start_line,
                    body: format!("**{}**\n\n{}", finding.title, finding.description),
                    severity: finding.severity.as_str().to_string(),
                })
                .collect(),
        };
        Ok(serde_json::to_vec_pretty(&document)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Confidence, Finding, Location, ReportStats, Severity};

    #[test]
    fn comments_map_location_and_severity() {
        let report = Report {
            findings: vec![Finding {
                id: "F-1".to_string(),
                scanner: "secrets".to_string(),
                severity: Severity::High,
                category: Category::SecretsExposure,
                title: "t".to_string(),
                description: "d".to_string(),
                location: Location::new("a.go", 42, 42),
                cwe: "CWE-798".to_string(),
                owasp: None,
                evidence: "e".to_string(),
                remediation: "r".to_string(),
                confidence: Confidence::High,
                references: Vec::new(),
                metadata: None,
                skill_source: None,
            }],
            attack_chains: Vec::new(),
            stats: ReportStats {
                duration_ms: 0,
                files_scanned: 1,
                chunks_analyzed: 0,
                findings_count: 1,
                chain_count: 0,
            },
            errors: Vec::new(),
        };
        let bytes = PrReviewFormatter.format(&report).unwrap();
        let decoded: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded["comments"][0]["path"], "a.go");
        assert_eq!(decoded["comments"][0]["line"], 42);
        assert_eq!(decoded["comments"][0]["severity"], "high");
        assert!(decoded["body"].as_str().unwrap().contains("Security scan summary"));
    }

    #[test]
    fn empty_report_has_empty_comments_array() {
        let report = Report {
            findings: Vec::new(),
            attack_chains: Vec::new(),
            stats: ReportStats {
                duration_ms: 0,
                files_scanned: 0,
                chunks_analyzed: 0,
                findings_count: 0,
                chain_count: 0,
            },
            errors: Vec::new(),
        };
        let bytes = PrReviewFormatter.format(&report).unwrap();
        let decoded: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(decoded["comments"].as_array().unwrap().is_empty());
    }
}
