//! Repository filter, extension-resolution gate, and code-load gate tests.

use std::path::PathBuf;

use trustgate::policy::{
    AllowList, DecisionLog, ExtensionGate, ExtensionMode, Gate, Outcome, Reason, RepositoryGate,
    Subject, TrustBoundary,
};
use trustgate::types::{ArtifactCoordinate, RepositoryRef, ResolvedFile, DEFAULT_REPOSITORY_URL};
use uuid::Uuid;

const ATTACKER_URL: &str = "http://attacker.example/repo";

fn coord(s: &str) -> ArtifactCoordinate {
    s.parse().expect("test coordinate")
}

fn files_for(c: &ArtifactCoordinate) -> Vec<ResolvedFile> {
    vec![ResolvedFile {
        coordinate: c.clone(),
        path: PathBuf::from(format!("/cache/{}.jar", c.artifact)),
        repository_url: DEFAULT_REPOSITORY_URL.to_owned(),
    }]
}

fn boundary(allow_list: AllowList) -> TrustBoundary {
    TrustBoundary::new(allow_list, DecisionLog::new())
}

// ---------- repository filter ----------

#[test]
fn filter_preserves_order_and_drops_untrusted() {
    let mut allow_list = AllowList::seeded();
    allow_list
        .allow_repository("https://allowed.example/m2")
        .expect("allow");
    let boundary = boundary(allow_list);
    let scope = boundary.begin_load();

    let declared = vec![
        RepositoryRef::new("a", "https://allowed.example/m2"),
        RepositoryRef::new("evil", ATTACKER_URL),
        RepositoryRef::new("corp", "https://corp.example/m2"),
        RepositoryRef::default_public(),
    ];
    let trusted = vec![RepositoryRef::new("corp-settings", "https://corp.example/m2/")];

    let kept = scope.filter_repositories(&declared, &trusted);
    let ids: Vec<&str> = kept.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "corp", "central"]);

    let decisions = boundary.decisions();
    assert_eq!(decisions.len(), 4);
    assert_eq!(decisions[0].reason, Reason::AllowListed);
    assert_eq!(decisions[1].outcome, Outcome::Block);
    assert_eq!(decisions[2].reason, Reason::TrustedExternal);
    assert!(decisions.iter().all(|d| d.gate == Gate::RepositoryFilter));
}

#[test]
fn filter_keeps_caller_trusted_repository_without_allow_list_entry() {
    let boundary = boundary(AllowList::empty());
    let scope = boundary.begin_load();
    let corp = RepositoryRef::new("corp", "https://corp.example/m2");

    let kept = scope.filter_repositories(std::slice::from_ref(&corp), std::slice::from_ref(&corp));
    assert_eq!(kept, vec![corp]);
}

#[test]
fn filter_never_adds_repositories() {
    let boundary = boundary(AllowList::seeded());
    let scope = boundary.begin_load();
    let kept = scope.filter_repositories(&[], &[RepositoryRef::default_public()]);
    assert!(kept.is_empty());
    assert!(boundary.decisions().is_empty());
}

// ---------- extension-resolution gate ----------

#[test]
fn extension_gate_accepts_allow_listed_sources() {
    let mut allow_list = AllowList::seeded();
    allow_list
        .allow_repository("https://plugins.example/m2")
        .expect("allow");
    let boundary = boundary(allow_list);
    let scope = boundary.begin_load();

    let repos = vec![
        RepositoryRef::default_public(),
        RepositoryRef::new("plugins", "https://plugins.example/m2/"),
    ];
    scope
        .check_extension_repositories(&coord("org.example:ext:1.0"), &repos)
        .expect("all sources trusted");
    assert!(boundary.decisions().is_empty());
}

#[test]
fn extension_gate_ignores_caller_trust_that_is_not_allow_listed() {
    // Caller-trusted URLs only reach this gate through the allow-list.
    let boundary = boundary(AllowList::empty());
    let scope = boundary.begin_load();

    let rejected = scope
        .check_extension_repositories(
            &coord("org.example:ext:1.0"),
            &[RepositoryRef::default_public()],
        )
        .expect_err("seed disabled");
    assert_eq!(rejected.url, DEFAULT_REPOSITORY_URL);
    assert_eq!(rejected.extension, coord("org.example:ext:1.0"));
}

#[test]
fn extension_gate_records_block_for_rejected_url() {
    let boundary = boundary(AllowList::seeded());
    let scope = boundary.begin_load();

    let rejected = scope
        .check_extension_repositories(
            &coord("org.evil:ext:1.0"),
            &[RepositoryRef::new("evil", ATTACKER_URL)],
        )
        .expect_err("untrusted");
    assert_eq!(rejected.url, ATTACKER_URL);

    let decisions = boundary.decisions();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].gate, Gate::ExtensionResolution);
    assert_eq!(decisions[0].subject, Subject::Repository(ATTACKER_URL.to_owned()));
    assert_eq!(decisions[0].load_id, scope.load_id());
}

#[test]
fn extension_gate_records_allow_for_each_approved_url() {
    let mut allow_list = AllowList::seeded();
    allow_list
        .allow_repository("https://repo.corp.example/plugins")
        .expect("allow corp");
    let boundary = boundary(allow_list);
    let scope = boundary.begin_load();

    scope
        .check_extension_repositories(
            &coord("org.example:ext:1.0"),
            &[
                RepositoryRef::new("corp", "https://repo.corp.example/plugins"),
                RepositoryRef::default_public(),
            ],
        )
        .expect("both sources are allow-listed");

    let decisions = boundary.decisions();
    assert_eq!(decisions.len(), 2);
    assert!(decisions.iter().all(|d| d.gate == Gate::ExtensionResolution
        && d.outcome == Outcome::Allow
        && d.reason == Reason::AllowListed));
    assert_eq!(
        decisions[0].subject,
        Subject::Repository("https://repo.corp.example/plugins".to_owned())
    );
}

// ---------- code-load gate ----------

#[test]
fn admit_returns_files_for_allow_listed_extension() {
    let mut allow_list = AllowList::seeded();
    allow_list.allow_extension("org.example:ext").expect("allow");
    let boundary = boundary(allow_list);
    let scope = boundary.begin_load();

    for version in ["1.0", "2.5.1", "3.0-SNAPSHOT"] {
        let c = coord("org.example:ext:1.0").with_version(version);
        assert_eq!(scope.admit(&c, files_for(&c)), files_for(&c));
    }
    assert_eq!(boundary.decision_log().allowed_extensions().len(), 3);
}

#[test]
fn admit_returns_empty_for_unlisted_extension() {
    let boundary = boundary(AllowList::seeded());
    let scope = boundary.begin_load();
    let c = coord("org.example:ext:1.0");

    assert!(scope.admit(&c, files_for(&c)).is_empty());
    let decisions = boundary.decisions();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].gate, Gate::CodeLoad);
    assert_eq!(decisions[0].outcome, Outcome::Block);
    assert_eq!(decisions[0].reason, Reason::NotAllowListed);
    assert_eq!(decisions[0].subject, Subject::Extension(c));
}

#[test]
fn admit_in_allow_all_mode_is_identity() {
    let boundary = boundary(AllowList::new(ExtensionMode::AllowAll, true));
    let scope = boundary.begin_load();
    for c in ["a:b:1", "org.evil:ext:6.6.6", "x.y:z:jar:tests:0.1"] {
        let c = coord(c);
        assert_eq!(scope.admit(&c, files_for(&c)), files_for(&c));
    }
    assert!(boundary
        .decisions()
        .iter()
        .all(|d| d.reason == Reason::AllowAll));
}

#[test]
fn code_load_gate_is_independent_of_repository_decisions() {
    let boundary = boundary(AllowList::seeded());
    let scope = boundary.begin_load();
    let c = coord("org.example:ext:1.0");
    // Resolved from the trusted default repository, still not allow-listed.
    assert!(!scope.code_load_gate().permits(&c));
}

// ---------- load scopes ----------

#[test]
fn each_load_gets_a_distinct_id() {
    let boundary = boundary(AllowList::seeded());
    let first = boundary.begin_load().load_id();
    let second = boundary.begin_load().load_id();
    assert_ne!(first, second);
    assert_ne!(first, Uuid::nil());
    assert!(boundary.allow_list().is_frozen());
}
