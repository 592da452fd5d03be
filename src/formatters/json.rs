//! Two-space-indented JSON formatter (spec §6 "JSON").

use serde::Serialize;

use crate::error::CoreResult;
use crate::formatters::Formatter;
use crate::types::{Report, ReportStats, ReportSummary};

#[derive(Serialize)]
struct JsonReport<'a> {
    findings: &'a [crate::types::Finding],
    attack_chains: &'a [crate::types::AttackChain],
    summary: ReportSummary,
    stats: &'a ReportStats,
}

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn name(&self) -> &str {
        "json"
    }

    fn format(&self, report: &Report) -> CoreResult<Vec<u8>> {
        let payload = JsonReport {
            findings: &report.findings,
            attack_chains: &report.attack_chains,
            summary: report.summary(),
            stats: &report.stats,
        };
        let mut buf = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, serde_json::ser::PrettyFormatter::with_indent(b"  "));
        payload.serialize(&mut serializer)?;
        Ok(buf)
    }
}
