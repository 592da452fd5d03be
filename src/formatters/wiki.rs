//! Multi-page wiki JSON formatter (spec §6 "Wiki").

use std::fmt::Write as _;

use serde::Serialize;

use crate::error::CoreResult;
use crate::formatters::Formatter;
use crate::types::{Category, Finding, Report};

#[derive(Serialize)]
struct WikiDocument {
    overview: String,
    findings: String,
    attack_chains: String,
}

const CATEGORY_ORDER: [Category; 13] = [
    Category::Injection,
    Category::Authentication,
    Category::Authorization,
    Category::Cryptography,
    Category::SecretsExposure,
    Category::VulnerableDependency,
    Category::Misconfiguration,
    Category::DataExposure,
    Category::RaceCondition,
    Category::InputValidation,
    Category::LoggingMonitoring,
    Category::SupplyChain,
    Category::LicenseCompliance,
];

fn build_overview(report: &Report) -> String {
    let summary = report.summary();
    let mut out = String::new();
    out.push_str("# Overview\n\n| Severity | Count |\n|---|---|\n");
    let _ = writeln!(out, "| Critical | {} |", summary.critical);
    let _ = writeln!(out, "| High | {} |", summary.high);
    let _ = writeln!(out, "| Medium | {} |", summary.medium);
    let _ = writeln!(out, "| Low | {} |", summary.low);
    let _ = writeln!(out, "| Info | {} |", summary.info);
    let _ = writeln!(out, "\nTotal findings: {}", summary.total);
    out
}

fn build_findings(findings: &[Finding]) -> String {
    let mut out = String::new();
    out.push_str("# Findings by Category\n\n");
    for category in CATEGORY_ORDER {
        let in_category: Vec<&Finding> = findings.iter().filter(|f| f.category == category).collect();
        if in_category.is_empty() {
            continue;
        }
        let _ = writeln!(out, "## {category}\n");
        for finding in in_category {
            let _ = writeln!(out, "- {} — `{}:{}`", finding.title, finding.location.file, finding.location.start_line);
        }
        out.push('\n');
    }
    out
}

fn build_chains(report: &Report) -> String {
    let mut out = String::new();
    out.push_str("# Attack Chains\n\n");
    for chain in &report.attack_chains {
        let _ = writeln!(out, "## {}\n", chain.title);
        for (idx, step) in chain.steps.iter().enumerate() {
            let _ = writeln!(out, "{}. {} (`{}:{}`)", idx + 1, step.title, step.location.file, step.location.start_line);
        }
        out.push('\n');
    }
    out
}

pub struct WikiFormatter;

impl Formatter for WikiFormatter {
    fn name(&self) -> &str {
        "wiki"
    }

    fn format(&self, report: &Report) -> CoreResult<Vec<u8>> {
        let document = WikiDocument {
            overview: build_overview(report),
            findings: build_findings(&report.findings),
            attack_chains: build_chains(report),
        };
        Ok(serde_json::to_vec_pretty(&document)?)
    }
}
