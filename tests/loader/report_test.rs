//! Dry-run policy reports.

use std::sync::Arc;

use trustgate::engine::InMemoryEngine;
use trustgate::policy::AllowList;

use crate::support::{allow_list_with, descriptor, loader, ATTACKER_URL};

const MIXED: &str = r#"
[project]
group = "org.example"
artifact = "app"
version = "1.0"

[[repositories]]
id = "central"
url = "https://repo.maven.apache.org/maven2"

[[repositories]]
id = "evil"
url = "http://attacker.example/repo"

[[plugin_repositories]]
id = "evil-plugins"
url = "http://attacker.example/repo"

[[extensions]]
coordinate = "org.example:trusted-ext:1.0"

[[extensions]]
coordinate = "org.evil:ext:1.0"

[[plugins]]
coordinate = "org.evil:compiler:1.0"
"#;

#[test]
fn report_lists_every_rejection_without_fetching() {
    let engine = Arc::new(InMemoryEngine::new());
    let loader = loader(
        allow_list_with(&["org.example:trusted-ext"]),
        Arc::clone(&engine),
    );

    let report = loader.evaluate(&descriptor(MIXED));

    assert_eq!(report.project, "org.example:app:1.0");
    assert!(report.would_abort());
    assert!(!report.is_clean());
    assert_eq!(report.rejections.len(), 3);
    assert!(report.rejections.iter().all(|r| r.url == ATTACKER_URL));

    let allowed: Vec<bool> = report.repositories.iter().map(|r| r.allowed).collect();
    assert_eq!(allowed, vec![true, false]);

    let admitted: Vec<bool> = report.extensions.iter().map(|e| e.admitted).collect();
    assert_eq!(admitted, vec![true, false]);

    assert!(engine.attempts().is_empty());
    assert!(loader
        .decisions()
        .iter()
        .all(|d| d.load_id == report.load_id));
}

#[test]
fn clean_descriptor_reports_clean() {
    let loader = loader(AllowList::seeded(), Arc::new(InMemoryEngine::new()));
    let report = loader.evaluate(&descriptor(
        r#"
[project]
group = "org.example"
artifact = "app"
version = "1.0"
"#,
    ));
    assert!(report.is_clean());
    assert!(report.repositories.is_empty());
}

#[test]
fn report_serializes_to_json() {
    let loader = loader(AllowList::seeded(), Arc::new(InMemoryEngine::new()));
    let report = loader.evaluate(&descriptor(MIXED));
    let value = serde_json::to_value(&report).expect("json");

    assert_eq!(value["rejections"][0]["url"], ATTACKER_URL);
    assert_eq!(value["rejections"][0]["extension"], "org.example:trusted-ext:1.0");
    assert_eq!(value["extensions"][1]["extension"]["kind"], "build");
}
