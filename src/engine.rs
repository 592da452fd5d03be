//! Scan engine orchestration (spec §4.5).
//!
//! Drives the two-phase run: a bounded worker pool executes every static
//! scanner concurrently, the prioritiser turns the results into chunks, a
//! second bounded pool runs the LLM analyzers over those chunks, and the
//! correlator assembles the final [`Report`].

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::analyzers::LlmAnalyzer;
use crate::correlator::correlate;
use crate::error::{CoreError, CoreResult};
use crate::prioritiser::prioritise;
use crate::scanners::{CancellationToken, StaticScanner};
use crate::types::{EngineConfig, Finding, Report, ReportStats, ScanError, ScanTarget};
use crate::walker::{collect_files, merge_excludes};

pub struct Engine {
    config: EngineConfig,
    scanners: Vec<Arc<dyn StaticScanner>>,
    analyzers: Vec<Arc<dyn LlmAnalyzer>>,
}

impl Engine {
    #[must_use]
    pub fn new(
        config: EngineConfig,
        scanners: Vec<Arc<dyn StaticScanner>>,
        analyzers: Vec<Arc<dyn LlmAnalyzer>>,
    ) -> Self {
        Self {
            config: config.normalized(),
            scanners,
            analyzers,
        }
    }

    /// Run a full scan (spec §4.5 steps 1-7).
    pub async fn run(&self, cancel: &CancellationToken, target: &ScanTarget) -> CoreResult<Report> {
        let started = Instant::now();

        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        let mut merged_target = target.clone();
        merged_target.exclude_patterns = merge_excludes(&target.exclude_patterns, &self.config.exclude_patterns);

        let (mut findings, mut errors) = self.run_phase1(cancel, &merged_target).await?;

        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        let chunks = prioritise(&merged_target, &findings, &self.config)?;

        if !chunks.is_empty() && !self.analyzers.is_empty() {
            let (analyzer_findings, analyzer_errors) = self.run_phase2(cancel, &chunks).await?;
            findings.extend(analyzer_findings);
            errors.extend(analyzer_errors);
        }

        let (deduped, chains) = correlate(&findings);

        let files_scanned = match &merged_target.files {
            Some(explicit) => explicit.len(),
            None => collect_files(&merged_target.root_dir, &merged_target.exclude_patterns).len(),
        };

        Ok(Report {
            stats: ReportStats {
                duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                files_scanned,
                chunks_analyzed: chunks.len(),
                findings_count: deduped.len(),
                chain_count: chains.len(),
            },
            findings: deduped,
            attack_chains: chains,
            errors,
        })
    }

    async fn run_phase1(
        &self,
        cancel: &CancellationToken,
        target: &ScanTarget,
    ) -> CoreResult<(Vec<Finding>, Vec<ScanError>)> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks = JoinSet::new();

        for scanner in &self.scanners {
            let scanner = Arc::clone(scanner);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let target = target.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                let name = scanner.name().to_string();
                let result = scanner.scan(&cancel, &target).await;
                (name, result)
            });
        }

        let mut findings = Vec::new();
        let mut errors = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            let (name, result) = joined.map_err(|err| CoreError::Scanner {
                scanner: "phase1".to_string(),
                message: err.to_string(),
            })?;
            match result {
                Ok(mut scanner_findings) => findings.append(&mut scanner_findings),
                Err(CoreError::Cancelled) => return Err(CoreError::Cancelled),
                Err(err) => {
                    warn!(scanner = %name, error = %err, "static scanner failed");
                    errors.push(ScanError {
                        scanner: name,
                        err: err.to_string(),
                        fatal: false,
                    });
                }
            }
        }

        debug!(findings = findings.len(), errors = errors.len(), "phase 1 complete");
        Ok((findings, errors))
    }

    async fn run_phase2(
        &self,
        cancel: &CancellationToken,
        chunks: &[crate::types::AnalysisChunk],
    ) -> CoreResult<(Vec<Finding>, Vec<ScanError>)> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks = JoinSet::new();
        let chunks = Arc::new(chunks.to_vec());

        for analyzer in &self.analyzers {
            let analyzer = Arc::clone(analyzer);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let chunks = Arc::clone(&chunks);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                let name = analyzer.name().to_string();
                let result = analyzer.analyze(&cancel, &chunks).await;
                (name, result)
            });
        }

        let mut findings = Vec::new();
        let mut errors = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            let (name, result) = joined.map_err(|err| CoreError::Analyzer {
                analyzer: "phase2".to_string(),
                message: err.to_string(),
            })?;
            match result {
                Ok(mut analyzer_findings) => findings.append(&mut analyzer_findings),
                Err(CoreError::Cancelled) => return Err(CoreError::Cancelled),
                Err(err) => {
                    warn!(analyzer = %name, error = %err, "llm analyzer failed");
                    errors.push(ScanError {
                        scanner: name,
                        err: err.to_string(),
                        fatal: false,
                    });
                }
            }
        }

        debug!(findings = findings.len(), errors = errors.len(), "phase 2 complete");
        Ok((findings, errors))
    }
}
