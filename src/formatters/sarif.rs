//! SARIF v2.1.0 formatter (spec §6 "SARIF").

use serde::Serialize;

use crate::error::CoreResult;
use crate::formatters::{Formatter, RUBICHAN_NAME, RUBICHAN_VERSION};
use crate::types::{Finding, Report, Severity};

const SCHEMA_URL: &str = "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";

#[derive(Serialize)]
struct SarifDocument {
    #[serde(rename = "$schema")]
    schema: &'static str,
    version: &'static str,
    runs: Vec<SarifRun>,
}

#[derive(Serialize)]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Serialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Serialize)]
struct SarifDriver {
    name: &'static str,
    version: &'static str,
    rules: Vec<SarifRule>,
}

#[derive(Serialize)]
struct SarifRule {
    id: String,
    name: String,
}

#[derive(Serialize)]
struct SarifResult {
    #[serde(rename = "ruleId")]
    rule_id: String,
    level: &'static str,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
}

#[derive(Serialize)]
struct SarifMessage {
    text: String,
}

#[derive(Serialize)]
struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    physical_location: SarifPhysicalLocation,
}

#[derive(Serialize)]
struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    artifact_location: SarifArtifactLocation,
    region: SarifRegion,
}

#[derive(Serialize)]
struct SarifArtifactLocation {
    uri: String,
}

#[derive(Serialize)]
struct SarifRegion {
    #[serde(rename = "startLine")]
    start_line: usize,
    #[serde(rename = "endLine")]
    end_line: usize,
}

fn level_for(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::High => "error",
        Severity::Medium => "warning",
        Severity::Low | Severity::Info => "note",
    }
}

fn dedup_rules(findings: &[Finding]) -> Vec<SarifRule> {
    let mut seen = std::collections::HashSet::new();
    let mut rules = Vec::new();
    for finding in findings {
        if finding.cwe.is_empty() || !seen.insert(finding.cwe.clone()) {
            continue;
        }
        rules.push(SarifRule {
            id: finding.cwe.clone(),
            name: finding.title.clone(),
        });
    }
    rules
}

pub struct SarifFormatter;

impl Formatter for SarifFormatter {
    fn name(&self) -> &str {
        "sarif"
    }

    fn format(&self, report: &Report) -> CoreResult<Vec<u8>> {
        let rules = dedup_rules(&report.findings);
        let results = report
            .findings
            .iter()
            .map(|finding| SarifResult {
                rule_id: finding.cwe.clone(),
                level: level_for(finding.severity),
                message: SarifMessage {
                    text: finding.description.clone(),
                },
                locations: vec![SarifLocation {
                    physical_location: SarifPhysicalLocation {
                        artifact_location: SarifArtifactLocation {
                            uri: finding.location.file.clone(),
                        },
                        region: SarifRegion {
                            start_line: finding.location.start_line,
                            end_line: finding.location.end_line,
                        },
                    },
                }],
            })
            .collect();

        let document = SarifDocument {
            schema: SCHEMA_URL,
            version: "2.1.0",
            runs: vec![SarifRun {
                tool: SarifTool {
                    driver: SarifDriver {
                        name: RUBICHAN_NAME,
                        version: RUBICHAN_VERSION,
                        rules,
                    },
                },
                results,
            }],
        };

        Ok(serde_json::to_vec_pretty(&document)?)
    }
}
