//! Deduplication and attack-chain detection (spec §4.4).

use crate::types::{AttackChain, Category, Finding};

/// Deduplicate by `(cwe, file, startLine)`, keeping the highest-confidence
/// representative per key (ties keep the earliest occurrence), then emit
/// representatives in original input order (spec §4.4, §5 ordering
/// guarantee (b), §8 S7).
#[must_use]
pub fn deduplicate(findings: &[Finding]) -> Vec<Finding> {
    let mut best_index_by_key: std::collections::HashMap<(String, String, usize), usize> =
        std::collections::HashMap::new();

    for (idx, finding) in findings.iter().enumerate() {
        let key = (finding.cwe.clone(), finding.location.file.clone(), finding.location.start_line);
        match best_index_by_key.get(&key) {
            None => {
                best_index_by_key.insert(key, idx);
            }
            Some(&current_best) => {
                let current = &findings[current_best];
                if finding.confidence.rank() > current.confidence.rank() {
                    best_index_by_key.insert(key, idx);
                }
            }
        }
    }

    let mut retained_indices: Vec<usize> = best_index_by_key.into_values().collect();
    retained_indices.sort_unstable();
    retained_indices.into_iter().map(|idx| findings[idx].clone()).collect()
}

struct ChainPattern {
    title: &'static str,
    cat1: Category,
    cat2: Category,
    severity: crate::types::Severity,
    same_func: bool,
    impact: &'static str,
}

const CHAIN_PATTERNS: &[ChainPattern] = &[
    ChainPattern {
        title: "Unauthenticated Injection",
        cat1: Category::Authentication,
        cat2: Category::Injection,
        severity: crate::types::Severity::Critical,
        same_func: true,
        impact: "An unauthenticated caller can reach an injection sink in the same function.",
    },
    ChainPattern {
        title: "Unauthenticated Data Access",
        cat1: Category::Authentication,
        cat2: Category::DataExposure,
        severity: crate::types::Severity::Critical,
        same_func: true,
        impact: "An unauthenticated caller can reach sensitive data exposure in the same function.",
    },
    ChainPattern {
        title: "Recoverable Secret",
        cat1: Category::Cryptography,
        cat2: Category::SecretsExposure,
        severity: crate::types::Severity::High,
        same_func: false,
        impact: "A weak cryptographic primitive combined with an exposed secret in the same file makes the secret recoverable.",
    },
    ChainPattern {
        title: "TOCTOU Authorization Bypass",
        cat1: Category::RaceCondition,
        cat2: Category::Authorization,
        severity: crate::types::Severity::High,
        same_func: true,
        impact: "A time-of-check/time-of-use race in an authorization check can be exploited to bypass it.",
    },
];

fn is_proximate(a: &Finding, b: &Finding, same_func: bool) -> bool {
    if a.location.file != b.location.file {
        return false;
    }
    if !same_func {
        return true;
    }
    match (&a.location.function, &b.location.function) {
        (Some(fa), Some(fb)) if !fa.is_empty() && !fb.is_empty() => fa == fb,
        _ => false,
    }
}

fn category_pair_matches(pattern: &ChainPattern, a: &Finding, b: &Finding) -> bool {
    (a.category == pattern.cat1 && b.category == pattern.cat2)
        || (a.category == pattern.cat2 && b.category == pattern.cat1)
}

/// Detect attack chains over already-deduplicated findings (spec §4.4).
#[must_use]
pub fn detect_chains(deduped: &[Finding]) -> Vec<AttackChain> {
    let mut chains = Vec::new();
    let mut seen_keys = std::collections::HashSet::new();
    let mut next_id = 1u32;

    for pattern in CHAIN_PATTERNS {
        for i in 0..deduped.len() {
            for j in (i + 1)..deduped.len() {
                let (fi, fj) = (&deduped[i], &deduped[j]);
                if !category_pair_matches(pattern, fi, fj) {
                    continue;
                }
                if !is_proximate(fi, fj, pattern.same_func) {
                    continue;
                }
                let key = format!("{}:{}:{}", pattern.title, fi.id, fj.id);
                if !seen_keys.insert(key) {
                    continue;
                }
                chains.push(AttackChain {
                    id: format!("C-{next_id}"),
                    title: pattern.title.to_string(),
                    severity: pattern.severity,
                    steps: vec![fi.clone(), fj.clone()],
                    impact: pattern.impact.to_string(),
                    likelihood: "high".to_string(),
                });
                next_id += 1;
            }
        }
    }

    chains
}

/// Full correlation pass: dedup, then chain detection over the deduped set.
#[must_use]
pub fn correlate(findings: &[Finding]) -> (Vec<Finding>, Vec<AttackChain>) {
    let deduped = deduplicate(findings);
    let chains = detect_chains(&deduped);
    (deduped, chains)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Confidence, Location, Severity};

    fn finding(id: &str, cwe: &str, file: &str, line: usize, category: Category, confidence: Confidence) -> Finding {
        Finding {
            id: id.to_string(),
            scanner: "test".to_string(),
            severity: Severity::Medium,
            category,
            title: "t".to_string(),
            description: "d".to_string(),
            location: Location::new(file, line, line),
            cwe: cwe.to_string(),
            owasp: None,
            evidence: "e".to_string(),
            remediation: "r".to_string(),
            confidence,
            references: Vec::new(),
            metadata: None,
            skill_source: None,
        }
    }

    fn finding_in_function(id: &str, category: Category, file: &str, start: usize, end: usize, func: &str) -> Finding {
        let mut f = finding(id, "", file, start, category, Confidence::High);
        f.location = Location::new(file, start, end).with_function(func);
        f
    }

    #[test]
    fn s7_dedup_retains_higher_confidence_on_tie() {
        let findings = vec![
            finding("F-1", "CWE-89", "db.go", 42, Category::Injection, Confidence::Low),
            finding("F-2", "CWE-89", "db.go", 42, Category::Injection, Confidence::High),
        ];
        let deduped = deduplicate(&findings);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].id, "F-2");
    }

    #[test]
    fn dedup_ties_keep_earliest() {
        let findings = vec![
            finding("F-1", "CWE-89", "db.go", 42, Category::Injection, Confidence::High),
            finding("F-2", "CWE-89", "db.go", 42, Category::Injection, Confidence::High),
        ];
        let deduped = deduplicate(&findings);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].id, "F-1");
    }

    #[test]
    fn dedup_preserves_original_order() {
        let findings = vec![
            finding("F-1", "CWE-1", "a.go", 1, Category::Injection, Confidence::High),
            finding("F-2", "CWE-2", "b.go", 1, Category::Authentication, Confidence::High),
            finding("F-3", "CWE-3", "c.go", 1, Category::Cryptography, Confidence::High),
        ];
        let deduped = deduplicate(&findings);
        assert_eq!(deduped.iter().map(|f| f.id.clone()).collect::<Vec<_>>(), vec!["F-1", "F-2", "F-3"]);
    }

    #[test]
    fn s4_unauthenticated_injection_chain() {
        let findings = vec![
            finding_in_function("F-1", Category::Authentication, "handler.go", 10, 20, "HandleRequest"),
            finding_in_function("F-2", Category::Injection, "handler.go", 15, 25, "HandleRequest"),
        ];
        let (deduped, chains) = correlate(&findings);
        assert_eq!(deduped.len(), 2);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].title, "Unauthenticated Injection");
        assert_eq!(chains[0].severity, Severity::Critical);
        assert_eq!(chains[0].steps.len(), 2);
    }

    #[test]
    fn s5_recoverable_secret_does_not_require_same_function() {
        let mut crypto_finding = finding("F-1", "", "crypto.go", 10, Category::Cryptography, Confidence::High);
        crypto_finding.location = Location::new("crypto.go", 10, 10);
        let mut secret_finding = finding("F-2", "", "crypto.go", 100, Category::SecretsExposure, Confidence::High);
        secret_finding.location = Location::new("crypto.go", 100, 100);

        let (_, chains) = correlate(&[crypto_finding, secret_finding]);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].title, "Recoverable Secret");
        assert_eq!(chains[0].severity, Severity::High);
    }

    #[test]
    fn different_function_names_do_not_chain_when_same_func_required() {
        let findings = vec![
            finding_in_function("F-1", Category::Authentication, "handler.go", 10, 20, "Login"),
            finding_in_function("F-2", Category::Injection, "handler.go", 15, 25, "Other"),
        ];
        let (_, chains) = correlate(&findings);
        assert!(chains.is_empty());
    }
}
