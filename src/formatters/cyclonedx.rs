//! CycloneDX v1.5 BOM formatter (spec §6 "CycloneDX").

use serde::Serialize;

use crate::error::CoreResult;
use crate::formatters::{Formatter, RUBICHAN_NAME, RUBICHAN_VERSION};
use crate::types::{Finding, Report};

#[derive(Serialize)]
struct CycloneDxDocument {
    #[serde(rename = "bomFormat")]
    bom_format: &'static str,
    #[serde(rename = "specVersion")]
    spec_version: &'static str,
    version: u32,
    metadata: CycloneDxMetadata,
    vulnerabilities: Vec<CycloneDxVulnerability>,
}

#[derive(Serialize)]
struct CycloneDxMetadata {
    tools: Vec<CycloneDxTool>,
}

#[derive(Serialize)]
struct CycloneDxTool {
    name: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct CycloneDxVulnerability {
    #[serde(rename = "bom-ref")]
    bom_ref: String,
    id: String,
    description: String,
    source: CycloneDxSource,
    ratings: Vec<CycloneDxRating>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cwes: Option<Vec<u32>>,
    affects: Vec<CycloneDxAffects>,
}

#[derive(Serialize)]
struct CycloneDxSource {
    name: &'static str,
}

#[derive(Serialize)]
struct CycloneDxRating {
    severity: String,
    method: &'static str,
}

#[derive(Serialize)]
struct CycloneDxAffects {
    #[serde(rename = "ref")]
    reference: String,
}

fn vulnerability_for(finding: &Finding) -> CycloneDxVulnerability {
    CycloneDxVulnerability {
        bom_ref: finding.id.clone(),
        id: finding.id.clone(),
        description: finding.title.clone(),
        source: CycloneDxSource { name: RUBICHAN_NAME },
        ratings: vec![CycloneDxRating {
            severity: finding.severity.as_str().to_string(),
            method: "other",
        }],
        cwes: finding.cwe_number().map(|n| vec![n]),
        affects: vec![CycloneDxAffects {
            reference: finding.location.file.clone(),
        }],
    }
}

pub struct CycloneDxFormatter;

impl Formatter for CycloneDxFormatter {
    fn name(&self) -> &str {
        "cyclonedx"
    }

    fn format(&self, report: &Report) -> CoreResult<Vec<u8>> {
        let document = CycloneDxDocument {
            bom_format: "CycloneDX",
            spec_version: "1.5",
            version: 1,
            metadata: CycloneDxMetadata {
                tools: vec![CycloneDxTool {
                    name: RUBICHAN_NAME,
                    version: RUBICHAN_VERSION,
                }],
            },
            vulnerabilities: report.findings.iter().map(vulnerability_for).collect(),
        };
        Ok(serde_json::to_vec_pretty(&document)?)
    }
}
