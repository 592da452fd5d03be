//! Core of a multi-phase source-code security auditor: a two-phase scan
//! engine, a risk-based prioritiser, a correlator, a handful of static
//! scanners, and six report formatters.
//!
//! This crate has no CLI, no config-file parser, and no concrete LLM
//! provider client — those are external collaborators that consume the
//! narrow interfaces defined here ([`analyzers::provider::StreamingProvider`],
//! [`scanners::StaticScanner`], [`formatters::Formatter`]).

pub mod analyzers;
pub mod ast;
pub mod correlator;
pub mod engine;
pub mod error;
pub mod formatters;
pub mod prioritiser;
pub mod scanners;
pub mod types;
pub mod walker;

pub use engine::Engine;
pub use error::{CoreError, CoreResult};
pub use types::{
    AnalysisChunk, AttackChain, Category, Confidence, EngineConfig, Finding, Location, Report,
    ReportStats, ReportSummary, ScanError, ScanTarget, Severity,
};
