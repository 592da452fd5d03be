//! End-to-end exercise of the scan engine over a small synthetic project
//! tree, through every output formatter.

mod common;

use std::sync::Arc;

use rubichan_core::engine::Engine;
use rubichan_core::formatters::cyclonedx::CycloneDxFormatter;
use rubichan_core::formatters::json::JsonFormatter;
use rubichan_core::formatters::markdown::MarkdownFormatter;
use rubichan_core::formatters::pr_review::PrReviewFormatter;
use rubichan_core::formatters::sarif::SarifFormatter;
use rubichan_core::formatters::wiki::WikiFormatter;
use rubichan_core::formatters::Formatter;
use rubichan_core::scanners::sast::SastScanner;
use rubichan_core::scanners::secrets::SecretScanner;
use rubichan_core::scanners::{CancellationToken, StaticScanner};
use rubichan_core::{EngineConfig, ScanTarget};

fn write_fixture(root: &std::path::Path) {
    std::fs::write(
        root.join("handler.go"),
        "package handler\n\nfunc HandleRequest(r *Request) {\n\tif !authenticate(r) {\n\t\treturn\n\t}\n\tquery := fmt.Sprintf(\"SELECT * FROM users WHERE id=%s\", r.ID)\n\tdb.Query(query)\n}\n",
    )
    .unwrap();
    std::fs::write(
        root.join("config.go"),
        "package config\nconst awsKey = \"AKIAIOSFODNN7REALKEY1\"\n",
    )
    .unwrap();
}

#[tokio::test]
async fn full_scan_produces_findings_and_every_formatter_succeeds() {
    common::logging::init_test_logging();

    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());

    let engine = Engine::new(
        EngineConfig::default(),
        vec![
            Arc::new(SecretScanner::new()) as Arc<dyn StaticScanner>,
            Arc::new(SastScanner::new()) as Arc<dyn StaticScanner>,
        ],
        Vec::new(),
    );

    let target = ScanTarget {
        root_dir: dir.path().to_path_buf(),
        files: None,
        exclude_patterns: Vec::new(),
    };

    let report = engine.run(&CancellationToken::new(), &target).await.unwrap();

    assert_eq!(report.findings.len(), report.stats.findings_count);
    assert_eq!(report.attack_chains.len(), report.stats.chain_count);
    assert!(report.findings.iter().any(|f| f.scanner == "secrets"));

    let formatters: Vec<Box<dyn Formatter>> = vec![
        Box::new(JsonFormatter),
        Box::new(SarifFormatter),
        Box::new(CycloneDxFormatter),
        Box::new(MarkdownFormatter),
        Box::new(PrReviewFormatter),
        Box::new(WikiFormatter),
    ];

    for formatter in formatters {
        let bytes = formatter.format(&report).unwrap();
        assert!(!bytes.is_empty(), "formatter {} produced no output", formatter.name());
    }
}

#[tokio::test]
async fn excluded_directory_is_never_scanned() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("vendor")).unwrap();
    std::fs::write(
        dir.path().join("vendor/secret.go"),
        "package vendor\nconst awsKey = \"AKIAIOSFODNN7REALKEY1\"\n",
    )
    .unwrap();

    let engine = Engine::new(
        EngineConfig::default(),
        vec![Arc::new(SecretScanner::new()) as Arc<dyn StaticScanner>],
        Vec::new(),
    );

    let target = ScanTarget {
        root_dir: dir.path().to_path_buf(),
        files: None,
        exclude_patterns: vec!["vendor/**".to_string()],
    };

    let report = engine.run(&CancellationToken::new(), &target).await.unwrap();
    assert!(report.findings.is_empty());
}
