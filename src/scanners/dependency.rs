//! Lockfile parsing plus OSV-style vulnerability lookup (spec §4.1.2).
//!
//! The HTTP client is injected so tests can point at a `wiremock` server
//! instead of `https://api.osv.dev`; a `None` client means "skip all queries
//! silently, lockfile parsing still runs" per spec §7 item 6.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::CoreResult;
use crate::scanners::{CancellationToken, IdCounter, StaticScanner};
use crate::types::{Category, Confidence, Finding, Location, ScanTarget, Severity};

const DEFAULT_BASE_URL: &str = "https://api.osv.dev";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedDependency {
    pub name: String,
    pub version: String,
    pub ecosystem: &'static str,
}

/// Parse `go.sum`. Skips `/go.mod`-suffixed version fields, dedupes by
/// `name@version`, strips a leading `v` from the version.
#[must_use]
pub fn parse_go_sum(content: &str) -> Vec<LockedDependency> {
    let mut seen = std::collections::HashSet::new();
    let mut deps = Vec::new();
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(name), Some(version)) = (parts.next(), parts.next()) else {
            continue;
        };
        if version.ends_with("/go.mod") {
            continue;
        }
        let version = version.strip_prefix('v').unwrap_or(version).to_string();
        let key = format!("{name}@{version}");
        if seen.insert(key) {
            deps.push(LockedDependency {
                name: name.to_string(),
                version,
                ecosystem: "Go",
            });
        }
    }
    deps
}

#[derive(Deserialize)]
struct PackageLockV1 {
    #[serde(default)]
    dependencies: std::collections::HashMap<String, PackageLockV1Dep>,
}

#[derive(Deserialize)]
struct PackageLockV1Dep {
    version: String,
}

#[derive(Deserialize)]
struct PackageLockV2 {
    #[serde(default)]
    packages: std::collections::HashMap<String, PackageLockV2Entry>,
}

#[derive(Deserialize)]
struct PackageLockV2Entry {
    #[serde(default)]
    version: Option<String>,
}

/// Parse `package-lock.json`: prefer the v2/v3 `packages` map, falling back
/// to the v1 `dependencies` map.
#[must_use]
pub fn parse_package_lock_json(content: &str) -> Vec<LockedDependency> {
    if let Ok(v2) = serde_json::from_str::<PackageLockV2>(content) {
        if !v2.packages.is_empty() {
            return v2
                .packages
                .into_iter()
                .filter_map(|(key, entry)| {
                    let name = key.rsplit("node_modules/").next()?.to_string();
                    if name.is_empty() {
                        return None;
                    }
                    let version = entry.version?;
                    Some(LockedDependency {
                        name,
                        version,
                        ecosystem: "npm",
                    })
                })
                .collect();
        }
    }

    serde_json::from_str::<PackageLockV1>(content)
        .map(|v1| {
            v1.dependencies
                .into_iter()
                .map(|(name, dep)| LockedDependency {
                    name,
                    version: dep.version,
                    ecosystem: "npm",
                })
                .collect()
        })
        .unwrap_or_default()
}

static REQUIREMENTS_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-zA-Z0-9._-]+)==([^\s#]+)").expect("static pattern is valid"));

/// Parse `requirements.txt`, ignoring comments and non-`==` pins.
#[must_use]
pub fn parse_requirements_txt(content: &str) -> Vec<LockedDependency> {
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .filter_map(|line| {
            let captures = REQUIREMENTS_LINE.captures(line)?;
            Some(LockedDependency {
                name: captures[1].to_string(),
                version: captures[2].to_string(),
                ecosystem: "PyPI",
            })
        })
        .collect()
}

static GEMFILE_SPEC_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^    ([a-zA-Z0-9._-]+) \(([^)]+)\)").expect("static pattern is valid"));

/// Parse `Gemfile.lock`'s `specs:` block; stops at the first non-indented
/// line after entering the block.
#[must_use]
pub fn parse_gemfile_lock(content: &str) -> Vec<LockedDependency> {
    let mut deps = Vec::new();
    let mut in_specs = false;
    for line in content.lines() {
        if line.trim() == "specs:" {
            in_specs = true;
            continue;
        }
        if !in_specs {
            continue;
        }
        if !line.starts_with(' ') {
            break;
        }
        if let Some(captures) = GEMFILE_SPEC_LINE.captures(line) {
            deps.push(LockedDependency {
                name: captures[1].to_string(),
                version: captures[2].to_string(),
                ecosystem: "RubyGems",
            });
        }
    }
    deps
}

static CARGO_LOCK_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^name = "([^"]+)""#).expect("static pattern is valid"));
static CARGO_LOCK_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^version = "([^"]+)""#).expect("static pattern is valid"));

/// Parse `Cargo.lock`'s `[[package]]` blocks, pairing each `name`/`version`
/// pair found inside one block.
#[must_use]
pub fn parse_cargo_lock(content: &str) -> Vec<LockedDependency> {
    let mut deps = Vec::new();
    let mut name: Option<String> = None;
    let mut version: Option<String> = None;

    let flush = |name: &mut Option<String>, version: &mut Option<String>, deps: &mut Vec<LockedDependency>| {
        if let (Some(n), Some(v)) = (name.take(), version.take()) {
            deps.push(LockedDependency {
                name: n,
                version: v,
                ecosystem: "crates.io",
            });
        }
    };

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed == "[[package]]" {
            flush(&mut name, &mut version, &mut deps);
            continue;
        }
        if let Some(captures) = CARGO_LOCK_NAME.captures(trimmed) {
            name = Some(captures[1].to_string());
        } else if let Some(captures) = CARGO_LOCK_VERSION.captures(trimmed) {
            version = Some(captures[1].to_string());
        }
    }
    flush(&mut name, &mut version, &mut deps);
    deps
}

static PODFILE_SPEC_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^  - ([a-zA-Z0-9._/-]+) \(([^)]+)\)").expect("static pattern is valid"));

/// Parse `Podfile.lock`'s `PODS:` block.
#[must_use]
pub fn parse_podfile_lock(content: &str) -> Vec<LockedDependency> {
    let mut deps = Vec::new();
    let mut in_pods = false;
    for line in content.lines() {
        if line.trim_end() == "PODS:" {
            in_pods = true;
            continue;
        }
        if in_pods {
            if !line.starts_with(' ') {
                break;
            }
            if let Some(captures) = PODFILE_SPEC_LINE.captures(line) {
                deps.push(LockedDependency {
                    name: captures[1].to_string(),
                    version: captures[2].to_string(),
                    ecosystem: "CocoaPods",
                });
            }
        }
    }
    deps
}

fn parse_lockfile(filename: &str, content: &str) -> Option<Vec<LockedDependency>> {
    match filename {
        "go.sum" => Some(parse_go_sum(content)),
        "package-lock.json" => Some(parse_package_lock_json(content)),
        "requirements.txt" => Some(parse_requirements_txt(content)),
        "Gemfile.lock" => Some(parse_gemfile_lock(content)),
        "Cargo.lock" => Some(parse_cargo_lock(content)),
        "Podfile.lock" => Some(parse_podfile_lock(content)),
        _ => None,
    }
}

const LOCKFILE_NAMES: &[&str] = &[
    "go.sum",
    "package-lock.json",
    "requirements.txt",
    "Gemfile.lock",
    "Cargo.lock",
    "Podfile.lock",
];

#[derive(serde::Serialize)]
struct OsvQuery<'a> {
    package: OsvPackage<'a>,
    version: &'a str,
}

#[derive(serde::Serialize)]
struct OsvPackage<'a> {
    name: &'a str,
    ecosystem: &'a str,
}

#[derive(Deserialize, Default)]
struct OsvResponse {
    #[serde(default)]
    vulns: Vec<OsvVuln>,
}

#[derive(Deserialize)]
struct OsvVuln {
    id: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    severity: Vec<OsvSeverity>,
    #[serde(default)]
    references: Vec<OsvReference>,
}

#[derive(Deserialize)]
struct OsvSeverity {
    #[serde(rename = "type")]
    kind: String,
    score: String,
}

#[derive(Deserialize)]
struct OsvReference {
    url: String,
}

fn classify_severity(vuln: &OsvVuln) -> Severity {
    let Some(cvss) = vuln.severity.iter().find(|s| s.kind == "CVSS_V3") else {
        return Severity::Medium;
    };
    let leading: String = cvss
        .score
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let Ok(score) = leading.parse::<f64>() else {
        return Severity::Medium;
    };
    if score >= 9.0 {
        Severity::Critical
    } else if score >= 7.0 {
        Severity::High
    } else if score >= 4.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub struct DependencyAuditor {
    ids: IdCounter,
    client: Option<reqwest::Client>,
    base_url: String,
}

impl DependencyAuditor {
    #[must_use]
    pub fn new(client: Option<reqwest::Client>) -> Self {
        Self {
            ids: IdCounter::new("DEP"),
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn query_vulns(&self, dep: &LockedDependency) -> Option<Vec<OsvVuln>> {
        let client = self.client.as_ref()?;
        let body = OsvQuery {
            package: OsvPackage {
                name: &dep.name,
                ecosystem: dep.ecosystem,
            },
            version: &dep.version,
        };
        let url = format!("{}/v1/query", self.base_url);
        let response = client.post(url).json(&body).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let parsed: OsvResponse = response.json().await.ok()?;
        Some(parsed.vulns)
    }

    fn finding_for_vuln(&self, lockfile: &str, dep: &LockedDependency, vuln: &OsvVuln) -> Finding {
        Finding {
            id: self.ids.next_id(),
            scanner: self.name().to_string(),
            severity: classify_severity(vuln),
            category: Category::VulnerableDependency,
            title: format!("Vulnerable dependency: {}@{} ({})", dep.name, dep.version, vuln.id),
            description: vuln.summary.clone(),
            location: Location::new(lockfile, 0, 0),
            cwe: "CWE-1035".to_string(),
            owasp: None,
            evidence: vuln.summary.clone(),
            remediation: format!("Upgrade {} past the version affected by {}.", dep.name, vuln.id),
            confidence: Confidence::High,
            references: vuln.references.iter().map(|r| r.url.clone()).collect(),
            metadata: Some(std::collections::HashMap::from([
                ("vuln_id".to_string(), vuln.id.clone()),
                ("package".to_string(), dep.name.clone()),
                ("version".to_string(), dep.version.clone()),
                ("ecosystem".to_string(), dep.ecosystem.to_string()),
            ])),
            skill_source: None,
        }
    }

    fn unavailable_finding(&self, lockfile: &str) -> Finding {
        Finding {
            id: self.ids.next_id(),
            scanner: self.name().to_string(),
            severity: Severity::Info,
            category: Category::VulnerableDependency,
            title: "OSV API unavailable".to_string(),
            description: format!("Could not query the vulnerability database for {lockfile}."),
            location: Location::new(lockfile, 0, 0),
            cwe: "CWE-1035".to_string(),
            owasp: None,
            evidence: "OSV API unavailable".to_string(),
            remediation: "Retry the scan once the vulnerability database is reachable.".to_string(),
            confidence: Confidence::Low,
            references: Vec::new(),
            metadata: None,
            skill_source: None,
        }
    }
}

#[async_trait]
impl StaticScanner for DependencyAuditor {
    fn name(&self) -> &str {
        "dependency-audit"
    }

    async fn scan(&self, cancel: &CancellationToken, target: &ScanTarget) -> CoreResult<Vec<Finding>> {
        if cancel.is_cancelled() {
            return Err(crate::error::CoreError::Cancelled);
        }

        let mut findings = Vec::new();

        for lockfile in LOCKFILE_NAMES {
            let path = target.root_dir.join(lockfile);
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            let Some(deps) = parse_lockfile(lockfile, &content) else {
                continue;
            };

            if self.client.is_none() {
                continue;
            }

            for dep in &deps {
                if cancel.is_cancelled() {
                    return Err(crate::error::CoreError::Cancelled);
                }
                match self.query_vulns(dep).await {
                    Some(vulns) => {
                        for vuln in &vulns {
                            findings.push(self.finding_for_vuln(lockfile, dep, vuln));
                        }
                    }
                    None => {
                        findings.push(self.unavailable_finding(lockfile));
                        break;
                    }
                }
            }
        }

        Ok(findings)
    }
}
