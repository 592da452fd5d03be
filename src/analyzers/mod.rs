//! LLM analyzer contract and shared base algorithm (spec §4.3).
//!
//! Concrete analyzers differ only by name, category, and system prompt; all
//! share [`run_base_algorithm`] for prompt assembly, stream consumption, and
//! response parsing.

pub mod provider;

use async_trait::async_trait;

use crate::error::{CoreError, CoreResult};
use crate::scanners::CancellationToken;
use crate::types::{AnalysisChunk, Category, Confidence, Finding, Location, Severity};
use provider::{EventStream, StreamingProvider};

#[async_trait]
pub trait LlmAnalyzer: Send + Sync {
    fn name(&self) -> &str;
    fn category(&self) -> Category;

    async fn analyze(&self, cancel: &CancellationToken, chunks: &[AnalysisChunk]) -> CoreResult<Vec<Finding>>;
}

/// One fixed-prompt analyzer, parameterised over `name`/`category`/`system
/// prompt` and the provider it streams against (spec §4.3: "Each concrete
/// analyzer differs only by name, category, and a fixed system-prompt
/// string").
pub struct PromptAnalyzer<P: StreamingProvider> {
    name: &'static str,
    category: Category,
    system_prompt: &'static str,
    provider: P,
}

impl<P: StreamingProvider> PromptAnalyzer<P> {
    #[must_use]
    pub fn new(name: &'static str, category: Category, system_prompt: &'static str, provider: P) -> Self {
        Self {
            name,
            category,
            system_prompt,
            provider,
        }
    }
}

#[async_trait]
impl<P: StreamingProvider + Send + Sync> LlmAnalyzer for PromptAnalyzer<P> {
    fn name(&self) -> &str {
        self.name
    }

    fn category(&self) -> Category {
        self.category
    }

    async fn analyze(&self, cancel: &CancellationToken, chunks: &[AnalysisChunk]) -> CoreResult<Vec<Finding>> {
        run_base_algorithm(self.name, self.system_prompt, &self.provider, cancel, chunks).await
    }
}

const MAX_OUTPUT_TOKENS: u32 = 4096;

/// The five steps shared by every analyzer (spec §4.3 steps 1-7).
pub async fn run_base_algorithm<P: StreamingProvider + Sync>(
    analyzer_name: &str,
    system_prompt: &str,
    provider: &P,
    cancel: &CancellationToken,
    chunks: &[AnalysisChunk],
) -> CoreResult<Vec<Finding>> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }
    if cancel.is_cancelled() {
        return Err(CoreError::Cancelled);
    }

    let message = build_user_message(chunks);

    let mut stream = provider
        .stream(system_prompt, &message, MAX_OUTPUT_TOKENS)
        .await
        .map_err(|message| CoreError::Analyzer {
            analyzer: analyzer_name.to_string(),
            message,
        })?;

    let mut response = String::new();
    while let Some(event) = stream.next().await {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        if event.kind == "text_delta" {
            response.push_str(&event.text);
        }
    }

    Ok(parse_response(analyzer_name, &response))
}

fn build_user_message(chunks: &[AnalysisChunk]) -> String {
    let mut message =
        "Analyze the following code segments for security issues. Return findings as a JSON array.\n\n".to_string();
    for chunk in chunks {
        message.push_str(&format!(
            "// File: {}:{}-{}\n{}\n\n",
            chunk.file, chunk.start_line, chunk.end_line, chunk.content
        ));
    }
    message
}

fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let Some(first_newline) = trimmed.find('\n') else {
        return trimmed;
    };
    let mut body = &trimmed[first_newline + 1..];
    if body.trim_end().ends_with("```") {
        let end = body.trim_end();
        body = &end[..end.len() - 3];
    }
    body.trim()
}

#[derive(serde::Deserialize)]
struct RawFinding {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    confidence: String,
    #[serde(default)]
    cwe: String,
    #[serde(default)]
    file: String,
    #[serde(default)]
    start_line: usize,
    #[serde(default)]
    end_line: usize,
    #[serde(default)]
    function: Option<String>,
    #[serde(default)]
    remediation: String,
    #[serde(default)]
    evidence: String,
}

fn parse_response(analyzer_name: &str, response: &str) -> Vec<Finding> {
    let candidate = strip_code_fence(response);
    let parsed: Result<Vec<RawFinding>, _> = serde_json::from_str(candidate);

    match parsed {
        Ok(raw_findings) => raw_findings
            .into_iter()
            .enumerate()
            .map(|(idx, raw)| to_finding(analyzer_name, idx, raw))
            .collect(),
        Err(_) => vec![unparseable_finding(analyzer_name, response)],
    }
}

fn to_finding(analyzer_name: &str, idx: usize, raw: RawFinding) -> Finding {
    let mut location = Location::new(raw.file, raw.start_line, raw.end_line.max(raw.start_line));
    if let Some(function) = raw.function {
        location = location.with_function(function);
    }
    Finding {
        id: format!("{analyzer_name}-{idx:03}"),
        scanner: analyzer_name.to_string(),
        severity: Severity::parse_loose(&raw.severity),
        category: category_for_analyzer(analyzer_name),
        title: raw.title,
        description: raw.description,
        location,
        cwe: raw.cwe,
        owasp: None,
        evidence: raw.evidence,
        remediation: raw.remediation,
        confidence: Confidence::parse_loose(&raw.confidence),
        references: Vec::new(),
        metadata: None,
        skill_source: None,
    }
}

fn category_for_analyzer(analyzer_name: &str) -> Category {
    match analyzer_name {
        "auth-authz" => Category::Authentication,
        "concurrency" => Category::RaceCondition,
        "cryptography" => Category::Cryptography,
        "dataflow" => Category::Injection,
        "business-logic" => Category::InputValidation,
        _ => Category::Misconfiguration,
    }
}

fn unparseable_finding(analyzer_name: &str, response: &str) -> Finding {
    Finding {
        id: format!("{analyzer_name}-unparsed-001"),
        scanner: analyzer_name.to_string(),
        severity: Severity::Info,
        category: category_for_analyzer(analyzer_name),
        title: "Unparseable LLM response".to_string(),
        description: "The analyzer's response could not be parsed as JSON.".to_string(),
        location: Location::new(String::new(), 0, 0),
        cwe: String::new(),
        owasp: None,
        evidence: response.to_string(),
        remediation: String::new(),
        confidence: Confidence::Low,
        references: Vec::new(),
        metadata: None,
        skill_source: None,
    }
}

/// Construct the five required analyzers (spec §4.3 "Required analyzer
/// categories") over a shared provider type.
pub fn required_analyzers<P: StreamingProvider + Clone + Send + Sync + 'static>(
    provider: P,
) -> Vec<Box<dyn LlmAnalyzer>> {
    vec![
        Box::new(PromptAnalyzer::new(
            "auth-authz",
            Category::Authentication,
            "You are a security reviewer focused on authentication and authorization flaws.",
            provider.clone(),
        )),
        Box::new(PromptAnalyzer::new(
            "concurrency",
            Category::RaceCondition,
            "You are a security reviewer focused on race conditions and concurrency bugs.",
            provider.clone(),
        )),
        Box::new(PromptAnalyzer::new(
            "cryptography",
            Category::Cryptography,
            "You are a security reviewer focused on cryptographic misuse.",
            provider.clone(),
        )),
        Box::new(PromptAnalyzer::new(
            "dataflow",
            Category::Injection,
            "You are a security reviewer focused on injection and tainted dataflow.",
            provider.clone(),
        )),
        Box::new(PromptAnalyzer::new(
            "business-logic",
            Category::InputValidation,
            "You are a security reviewer focused on input validation and business-logic flaws.",
            provider,
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use provider::test_support::ScriptedProvider;

    fn sample_chunk() -> AnalysisChunk {
        AnalysisChunk {
            file: "app.py".to_string(),
            start_line: 1,
            end_line: 3,
            content: "def handle(): pass".to_string(),
            language: "python".to_string(),
            risk_score: 10,
        }
    }

    #[tokio::test]
    async fn empty_chunk_list_returns_no_findings_without_calling_provider() {
        let provider = ScriptedProvider::new(vec!["unused".to_string()]);
        let findings = run_base_algorithm("dataflow", "prompt", &provider, &CancellationToken::new(), &[])
            .await
            .unwrap();
        assert!(findings.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn s6_unparseable_response_yields_single_fallback_finding() {
        let provider = ScriptedProvider::new(vec!["This is not valid JSON.".to_string()]);
        let findings = run_base_algorithm(
            "dataflow",
            "prompt",
            &provider,
            &CancellationToken::new(),
            &[sample_chunk()],
        )
        .await
        .unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].title, "Unparseable LLM response");
        assert_eq!(findings[0].confidence, Confidence::Low);
        assert!(findings[0].evidence.contains("This is not valid JSON."));
        assert_eq!(findings[0].scanner, "dataflow");
    }

    #[tokio::test]
    async fn fenced_json_response_is_parsed() {
        let body = r#"```json
[{"title": "SQL injection", "severity": "high", "confidence": "high", "cwe": "CWE-89", "file": "app.py", "start_line": 1, "end_line": 2}]
```"#;
        let provider = ScriptedProvider::new(vec![body.to_string()]);
        let findings = run_base_algorithm(
            "dataflow",
            "prompt",
            &provider,
            &CancellationToken::new(),
            &[sample_chunk()],
        )
        .await
        .unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].title, "SQL injection");
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].category, Category::Injection);
    }

    #[test]
    fn strip_code_fence_handles_plain_and_fenced_json() {
        assert_eq!(strip_code_fence("[1,2,3]"), "[1,2,3]");
        assert_eq!(strip_code_fence("```json\n[1,2,3]\n```"), "[1,2,3]");
        assert_eq!(strip_code_fence("```\n[1,2,3]\n```"), "[1,2,3]");
    }
}
