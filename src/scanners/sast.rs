//! Pattern-over-AST scanning (spec §4.1.3).
//!
//! Function bodies are sliced by the shared [`crate::ast`] adapter's
//! reported ranges; a fixed per-language pattern table is matched against
//! each body. Import-level patterns (e.g. Go's weak-crypto imports) are
//! checked once per file against the raw import tokens.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{self, SourceLanguage};
use crate::error::CoreResult;
use crate::scanners::{CancellationToken, IdCounter, StaticScanner};
use crate::types::{Category, Confidence, Finding, Location, ScanTarget, Severity};
use crate::walker::{collect_files, merge_excludes};

struct BodyPattern {
    regex: Lazy<Regex>,
    cwe: &'static str,
    severity: Severity,
    category: Category,
    title: &'static str,
}

macro_rules! body_pattern {
    ($pattern:literal, $cwe:literal, $severity:expr, $category:expr, $title:literal) => {
        BodyPattern {
            regex: Lazy::new(|| Regex::new($pattern).expect("static SAST pattern is valid")),
            cwe: $cwe,
            severity: $severity,
            category: $category,
            title: $title,
        }
    };
}

struct ImportPattern {
    regex: Lazy<Regex>,
    cwe: &'static str,
    severity: Severity,
    category: Category,
    title: &'static str,
}

macro_rules! import_pattern {
    ($pattern:literal, $cwe:literal, $severity:expr, $category:expr, $title:literal) => {
        ImportPattern {
            regex: Lazy::new(|| Regex::new($pattern).expect("static SAST import pattern is valid")),
            cwe: $cwe,
            severity: $severity,
            category: $category,
            title: $title,
        }
    };
}

static GO_BODY_PATTERNS: &[BodyPattern] = &[
    body_pattern!(
        r#"fmt\.Sprintf\([^)]*\)\s*\)?\s*;?\s*db\.(Query|Exec)"#,
        "CWE-89",
        Severity::High,
        Category::Injection,
        "Potential SQL injection via string formatting"
    ),
    body_pattern!(
        r"exec\.Command\(",
        "CWE-78",
        Severity::High,
        Category::Injection,
        "Potential OS command injection"
    ),
];

static GO_IMPORT_PATTERNS: &[ImportPattern] = &[import_pattern!(
    r"crypto/(md5|sha1|des|rc4)",
    "CWE-327",
    Severity::Medium,
    Category::Cryptography,
    "Use of a weak or broken cryptographic primitive"
)];

static PYTHON_BODY_PATTERNS: &[BodyPattern] = &[
    body_pattern!(
        r"\bexec\s*\(|\beval\s*\(",
        "CWE-95",
        Severity::High,
        Category::Injection,
        "Use of eval/exec on potentially untrusted input"
    ),
    body_pattern!(
        r#"cursor\.execute\(\s*["'].*%s.*["']\s*%"#,
        "CWE-89",
        Severity::High,
        Category::Injection,
        "Potential SQL injection via string formatting"
    ),
    body_pattern!(
        r"\bpickle\.loads?\(",
        "CWE-502",
        Severity::High,
        Category::Injection,
        "Deserialization of untrusted data via pickle"
    ),
];

static JS_BODY_PATTERNS: &[BodyPattern] = &[
    body_pattern!(
        r"\.innerHTML\s*=",
        "CWE-79",
        Severity::Medium,
        Category::Injection,
        "Potential cross-site scripting via innerHTML assignment"
    ),
    body_pattern!(
        r"\beval\s*\(",
        "CWE-95",
        Severity::High,
        Category::Injection,
        "Use of eval on potentially untrusted input"
    ),
    body_pattern!(
        r#"\.query\(\s*["'`].*\$\{"#,
        "CWE-89",
        Severity::High,
        Category::Injection,
        "Potential SQL injection via template literal interpolation"
    ),
];

fn body_patterns(language: SourceLanguage) -> &'static [BodyPattern] {
    match language {
        SourceLanguage::Go => GO_BODY_PATTERNS,
        SourceLanguage::Python => PYTHON_BODY_PATTERNS,
        SourceLanguage::JavaScript
        | SourceLanguage::Jsx
        | SourceLanguage::TypeScript
        | SourceLanguage::Tsx => JS_BODY_PATTERNS,
    }
}

fn import_patterns(language: SourceLanguage) -> &'static [ImportPattern] {
    match language {
        SourceLanguage::Go => GO_IMPORT_PATTERNS,
        _ => &[],
    }
}

const SUPPORTED_EXTENSIONS: &[&str] = &["go", "py", "js", "ts", "tsx", "jsx"];

pub struct SastScanner {
    ids: IdCounter,
}

impl SastScanner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ids: IdCounter::new("SAST"),
        }
    }

    #[must_use]
    pub fn scan_source(&self, relative_path: &str, source: &str, language: SourceLanguage) -> Vec<Finding> {
        let mut findings = Vec::new();
        let lines: Vec<&str> = source.lines().collect();

        let Some(tree) = ast::parse(language, source) else {
            return findings;
        };

        for function in tree.functions() {
            let start = function.start_line.max(1);
            let end = function.end_line.max(start);
            for pattern in body_patterns(language) {
                let first_match_line = (start..=end).find(|&line_no| {
                    lines
                        .get(line_no - 1)
                        .is_some_and(|line| pattern.regex.is_match(line))
                });
                if let Some(line_no) = first_match_line {
                    findings.push(self.build_finding(
                        relative_path,
                        line_no,
                        line_no,
                        Some(function.name.clone()),
                        pattern,
                    ));
                }
            }
        }

        for import in tree.imports() {
            for pattern in import_patterns(language) {
                if pattern.regex.is_match(&import) {
                    findings.push(self.build_import_finding(relative_path, pattern));
                }
            }
        }

        findings
    }

    fn build_finding(
        &self,
        file: &str,
        start_line: usize,
        end_line: usize,
        function: Option<String>,
        pattern: &BodyPattern,
    ) -> Finding {
        let mut location = Location::new(file, start_line, end_line);
        if let Some(name) = function {
            location = location.with_function(name);
        }
        Finding {
            id: self.ids.next_id(),
            scanner: self.name().to_string(),
            severity: pattern.severity,
            category: pattern.category,
            title: pattern.title.to_string(),
            description: format!("{} at {}:{}.", pattern.title, file, start_line),
            location,
            cwe: pattern.cwe.to_string(),
            owasp: None,
            evidence: pattern.title.to_string(),
            remediation: "Review this code path and use a parameterized or sanitized alternative."
                .to_string(),
            confidence: Confidence::Medium,
            references: Vec::new(),
            metadata: None,
            skill_source: None,
        }
    }

    fn build_import_finding(&self, file: &str, pattern: &ImportPattern) -> Finding {
        Finding {
            id: self.ids.next_id(),
            scanner: self.name().to_string(),
            severity: pattern.severity,
            category: pattern.category,
            title: pattern.title.to_string(),
            description: format!("{} in {file}.", pattern.title),
            location: Location::new(file, 0, 0),
            cwe: pattern.cwe.to_string(),
            owasp: None,
            evidence: pattern.title.to_string(),
            remediation: "Replace this import with a modern, vetted cryptographic primitive."
                .to_string(),
            confidence: Confidence::Medium,
            references: Vec::new(),
            metadata: None,
            skill_source: None,
        }
    }
}

impl Default for SastScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StaticScanner for SastScanner {
    fn name(&self) -> &str {
        "sast"
    }

    async fn scan(&self, cancel: &CancellationToken, target: &ScanTarget) -> CoreResult<Vec<Finding>> {
        if cancel.is_cancelled() {
            return Err(crate::error::CoreError::Cancelled);
        }

        let patterns = merge_excludes(&target.exclude_patterns, &[]);
        let files = match &target.files {
            Some(explicit) => explicit.clone(),
            None => collect_files(&target.root_dir, &patterns),
        };

        let mut findings = Vec::new();
        for rel in files {
            if cancel.is_cancelled() {
                return Err(crate::error::CoreError::Cancelled);
            }

            let Some(ext) = rel.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if !SUPPORTED_EXTENSIONS.contains(&ext) {
                continue;
            }
            let Some(language) = SourceLanguage::from_extension(ext) else {
                continue;
            };

            let full_path = target.root_dir.join(&rel);
            let Ok(source) = std::fs::read_to_string(&full_path) else {
                continue;
            };

            let rel_str = rel.to_string_lossy().replace('\\', "/");
            findings.extend(self.scan_source(&rel_str, &source, language));
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn go_weak_crypto_import_is_flagged_once() {
        let scanner = SastScanner::new();
        let source = "package main\n\nimport \"crypto/md5\"\n\nfunc main() {}\n";
        let findings = scanner.scan_source("main.go", source, SourceLanguage::Go);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].cwe, "CWE-327");
    }

    #[test]
    fn go_command_injection_is_flagged_with_function_name() {
        let scanner = SastScanner::new();
        let source = "package main\n\nfunc run(input string) {\n\texec.Command(\"sh\", \"-c\", input)\n}\n";
        let findings = scanner.scan_source("run.go", source, SourceLanguage::Go);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].cwe, "CWE-78");
        assert_eq!(findings[0].location.function.as_deref(), Some("run"));
    }

    #[test]
    fn python_eval_is_flagged() {
        let scanner = SastScanner::new();
        let source = "def handle(payload):\n    return eval(payload)\n";
        let findings = scanner.scan_source("handler.py", source, SourceLanguage::Python);
        assert!(findings.iter().any(|f| f.cwe == "CWE-95"));
    }

    #[test]
    fn js_inner_html_assignment_is_flagged() {
        let scanner = SastScanner::new();
        let source = "function render(data) {\n  el.innerHTML = data;\n}\n";
        let findings = scanner.scan_source("render.js", source, SourceLanguage::JavaScript);
        assert!(findings.iter().any(|f| f.cwe == "CWE-79"));
    }

    #[test]
    fn clean_function_yields_no_findings() {
        let scanner = SastScanner::new();
        let source = "def add(a, b):\n    return a + b\n";
        let findings = scanner.scan_source("math.py", source, SourceLanguage::Python);
        assert!(findings.is_empty());
    }
}
