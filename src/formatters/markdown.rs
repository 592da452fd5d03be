//! Markdown report formatter (spec §6 "Markdown").

use std::fmt::Write as _;

use crate::error::CoreResult;
use crate::formatters::Formatter;
use crate::types::{Finding, Report, Severity};

const SEVERITY_ORDER: [Severity; 5] = [
    Severity::Critical,
    Severity::High,
    Severity::Medium,
    Severity::Low,
    Severity::Info,
];

fn findings_by_severity<'a>(findings: &'a [Finding], severity: Severity) -> Vec<&'a Finding> {
    findings.iter().filter(|f| f.severity == severity).collect()
}

const fn severity_title(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "Critical",
        Severity::High => "High",
        Severity::Medium => "Medium",
        Severity::Low => "Low",
        Severity::Info => "Info",
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn name(&self) -> &str {
        "markdown"
    }

    fn format(&self, report: &Report) -> CoreResult<Vec<u8>> {
        let summary = report.summary();
        let mut out = String::new();

        out.push_str("# Security Scan Report\n\n");
        out.push_str("## Summary\n\n");
        out.push_str("| Severity | Count |\n|---|---|\n");
        let _ = writeln!(out, "| Critical | {} |", summary.critical);
        let _ = writeln!(out, "| High | {} |", summary.high);
        let _ = writeln!(out, "| Medium | {} |", summary.medium);
        let _ = writeln!(out, "| Low | {} |", summary.low);
        let _ = writeln!(out, "| Info | {} |", summary.info);
        let _ = writeln!(out, "\nTotal findings: {}\n", summary.total);

        for severity in SEVERITY_ORDER {
            let findings = findings_by_severity(&report.findings, severity);
            if findings.is_empty() {
                continue;
            }
            let _ = writeln!(out, "## {}\n", severity_title(severity));
            for finding in findings {
                let _ = writeln!(
                    out,
                    "- **{}** ({}) — `{}:{}`{}",
                    finding.title,
                    finding.cwe,
                    finding.location.file,
                    finding.location.start_line,
                    finding
                        .location
                        .function
                        .as_ref()
                        .map(|f| format!(" in `{f}`"))
                        .unwrap_or_default()
                );
            }
            out.push('\n');
        }

        if !report.attack_chains.is_empty() {
            out.push_str("## Attack Chains\n\n");
            for chain in &report.attack_chains {
                let _ = writeln!(out, "### {} ({})\n", chain.title, chain.severity);
                for step in &chain.steps {
                    let _ = writeln!(out, "1. {} — `{}:{}`", step.title, step.location.file, step.location.start_line);
                }
                out.push('\n');
            }
        }

        Ok(out.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Confidence, Location, ReportStats};

    fn sample_report() -> Report {
        Report {
            findings: vec![Finding {
                id: "F-1".to_string(),
                scanner: "secrets".to_string(),
                severity: Severity::High,
                category: Category::SecretsExposure,
                title: "AWS key".to_string(),
                description: "d".to_string(),
                location: Location::new("a.go", 1, 1),
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
        }
    }

    #[test]
    fn begins_with_header_and_skips_empty_severities() {
        let report = sample_report();
        let bytes = MarkdownFormatter.format(&report).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("# Security Scan Report"));
        assert!(text.contains("## High"));
        assert!(!text.contains("## Critical"));
        assert!(!text.contains("## Attack Chains"));
    }

    #[test]
    fn empty_report_still_has_summary_section() {
        let mut report = sample_report();
        report.findings.clear();
        let bytes = MarkdownFormatter.format(&report).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("## Summary"));
        assert!(text.contains("Total findings: 0"));
    }
}
