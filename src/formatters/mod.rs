//! Output formatter contract and the six required formats (spec §4.6, §6).

pub mod cyclonedx;
pub mod json;
pub mod markdown;
pub mod pr_review;
pub mod sarif;
pub mod wiki;

use crate::error::CoreResult;
use crate::types::Report;

/// Every formatter renders a completed [`Report`] to bytes. Empty reports
/// still emit the shell of the format — no null slices, empty arrays
/// instead (spec §6, final paragraph).
pub trait Formatter {
    fn name(&self) -> &str;
    fn format(&self, report: &Report) -> CoreResult<Vec<u8>>;
}

pub const RUBICHAN_NAME: &str = "rubichan";
pub const RUBICHAN_VERSION: &str = "0.1.0";
