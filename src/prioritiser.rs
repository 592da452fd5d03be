//! Risk-based chunk prioritiser (spec §4.2).
//!
//! Turns source files into scored [`AnalysisChunk`]s for the LLM phase: one
//! chunk per function for a supported language, the whole file for anything
//! else. Scoring uses an additive keyword-weight table; a file that already
//! produced a static finding gets a flat boost.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{self, SourceLanguage};
use crate::error::{CoreError, CoreResult};
use crate::types::{AnalysisChunk, EngineConfig, Finding, ScanTarget};
use crate::walker::collect_files_checked;

struct KeywordWeight {
    regex: Lazy<Regex>,
    weight: u32,
}

macro_rules! keyword_weight {
    ($pattern:literal, $weight:literal) => {
        KeywordWeight {
            regex: Lazy::new(|| Regex::new($pattern).expect("static keyword pattern is valid")),
            weight: $weight,
        }
    };
}

static KEYWORD_WEIGHTS: &[KeywordWeight] = &[
    keyword_weight!(r"(?i)auth|password|credential", 10),
    keyword_weight!(r"(?i)exec|Command|system|shell", 9),
    keyword_weight!(r"(?i)database/sql|\.execute\(|\.query\(", 7),
    keyword_weight!(r"(?i)crypto|hash|encrypt|decrypt", 5),
    keyword_weight!(r"(?i)eval\(|unsafe|innerHTML", 6),
];

const STATIC_FINDING_BOOST: u32 = 3;

fn score_content(content: &str) -> u32 {
    KEYWORD_WEIGHTS
        .iter()
        .filter(|kw| kw.regex.is_match(content))
        .map(|kw| kw.weight)
        .sum()
}

fn language_tag(ext: &str) -> &'static str {
    SourceLanguage::from_extension(ext).map_or("text", SourceLanguage::tag)
}

/// Produce the sorted, capped chunk list. `static_findings` supplies the
/// per-file "already flagged" hint used for the `+3` boost (spec §4.2 step
/// 4).
///
/// A failure to walk `target.root_dir` at all is fatal (spec §4.5 step 5,
/// §7.5): it surfaces as [`CoreError::Prioritization`] and aborts the scan.
/// A single unreadable or unparsable file is local recovery (spec §7.2) and
/// is skipped instead.
pub fn prioritise(
    target: &ScanTarget,
    static_findings: &[Finding],
    config: &EngineConfig,
) -> CoreResult<Vec<AnalysisChunk>> {
    let flagged_files: std::collections::HashSet<&str> =
        static_findings.iter().map(|f| f.location.file.as_str()).collect();

    let files = match &target.files {
        Some(explicit) => explicit.clone(),
        None => collect_files_checked(&target.root_dir, &target.exclude_patterns)
            .map_err(|err| CoreError::Prioritization(err.to_string()))?,
    };

    let mut chunks = Vec::new();

    for rel in files {
        let Some(ext) = rel.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        let full_path = target.root_dir.join(&rel);
        let Ok(source) = std::fs::read_to_string(&full_path) else {
            continue;
        };
        let rel_str = rel.to_string_lossy().replace('\\', "/");
        let tag = language_tag(ext);
        let boost = if flagged_files.contains(rel_str.as_str()) {
            STATIC_FINDING_BOOST
        } else {
            0
        };

        match SourceLanguage::from_extension(ext).and_then(|lang| ast::parse(lang, &source).map(|t| (lang, t))) {
            Some((_, tree)) => {
                let functions = tree.functions();
                if functions.is_empty() {
                    chunks.push(whole_file_chunk(&rel_str, &source, tag, boost));
                } else {
                    for function in functions {
                        let body = slice_lines(&source, function.start_line, function.end_line);
                        let score = score_content(&body) + boost;
                        chunks.push(AnalysisChunk {
                            file: rel_str.clone(),
                            start_line: function.start_line,
                            end_line: function.end_line,
                            content: body,
                            language: tag.to_string(),
                            risk_score: score,
                        });
                    }
                }
            }
            None => chunks.push(whole_file_chunk(&rel_str, &source, tag, boost)),
        }
    }

    chunks.retain(|chunk| chunk.risk_score >= config.min_risk_score);
    chunks.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));
    chunks.truncate(config.max_llm_chunks);
    Ok(chunks)
}

fn whole_file_chunk(rel_str: &str, source: &str, tag: &str, boost: u32) -> AnalysisChunk {
    let line_count = source.lines().count().max(1);
    let score = score_content(source) + boost;
    AnalysisChunk {
        file: rel_str.to_string(),
        start_line: 1,
        end_line: line_count,
        content: source.to_string(),
        language: tag.to_string(),
        risk_score: score,
    }
}

fn slice_lines(source: &str, start_line: usize, end_line: usize) -> String {
    source
        .lines()
        .skip(start_line.saturating_sub(1))
        .take(end_line.saturating_sub(start_line) + 1)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s3_additive_scoring_across_overlapping_keywords() {
        let content = "func combined() {\n  password := getSecret()\n  import \"database/sql\"\n  db.Query(sql)\n}";
        let score = score_content(content);
        assert!(score >= 10 + 7, "expected at least 17, got {score}");
    }

    #[test]
    fn monotonicity_adding_keyword_never_decreases_score() {
        let base = "func plain() { return 1 }";
        let with_keyword = "func plain() { return 1 } // password here";
        assert!(score_content(with_keyword) >= score_content(base));
    }

    #[test]
    fn chunks_are_sorted_descending_and_capped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.go"),
            "package a\nfunc low() {}\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.go"),
            "package b\nfunc high() { password := exec.Command(\"sh\") }\n",
        )
        .unwrap();

        let target = ScanTarget {
            root_dir: dir.path().to_path_buf(),
            files: None,
            exclude_patterns: Vec::new(),
        };
        let config = EngineConfig {
            max_llm_chunks: 1,
            min_risk_score: 0,
            exclude_patterns: Vec::new(),
            concurrency: 1,
        };
        let chunks = prioritise(&target, &[], &config).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].file, "b.go");
    }

    #[test]
    fn unsupported_language_yields_whole_file_chunk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "just some text\nwith two lines\n").unwrap();
        let target = ScanTarget {
            root_dir: dir.path().to_path_buf(),
            files: None,
            exclude_patterns: Vec::new(),
        };
        let config = EngineConfig::default();
        let chunks = prioritise(&target, &[], &config).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].language, "text");
    }

    #[test]
    fn missing_root_dir_is_a_fatal_prioritization_error() {
        let target = ScanTarget {
            root_dir: std::path::PathBuf::from("/nonexistent/definitely-not-here-xyz"),
            files: None,
            exclude_patterns: Vec::new(),
        };
        let result = prioritise(&target, &[], &EngineConfig::default());
        assert!(matches!(result, Err(CoreError::Prioritization(_))));
    }
}
