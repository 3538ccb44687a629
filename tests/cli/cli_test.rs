//! CLI smoke tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;
use trustgate::engine::filesystem::layout_path;
use trustgate::types::ArtifactCoordinate;
use url::Url;

/// Isolated working directory with its own config file.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(config: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("config.toml"), config).expect("write config");
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).expect("write file");
        path
    }

    fn repo_url(&self) -> String {
        let root = self.path("repo");
        std::fs::create_dir_all(&root).expect("create repo");
        Url::from_directory_path(&root)
            .expect("absolute path")
            .to_string()
    }

    fn publish(&self, coordinate: &str) {
        let coord: ArtifactCoordinate = coordinate.parse().expect("coordinate");
        let path = self.path("repo").join(layout_path(&coord));
        let parent = path.parent().expect("parent");
        std::fs::create_dir_all(parent).expect("layout dirs");
        std::fs::write(&path, b"PK").expect("artifact");
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("trustgate").expect("binary");
        cmd.current_dir(self.dir.path())
            .env("TRUSTGATE_CONFIG", self.path("config.toml"))
            .env_remove("TRUSTGATE_ALLOW_EXTENSIONS")
            .env_remove("TRUSTGATE_ALLOW_REPOSITORIES")
            .env_remove("TRUSTGATE_ENFORCE_EXTENSIONS")
            .env_remove("TRUSTGATE_AUDIT_LOG")
            .env("RUST_LOG", "warn");
        cmd
    }
}

fn stdout_of(cmd: &mut Command) -> (bool, String) {
    let output = cmd.output().expect("run trustgate");
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).into_owned(),
    )
}

fn descriptor_with_extension(plugin_repo: &str) -> String {
    format!(
        r#"
[project]
group = "org.example"
artifact = "app"
version = "1.0"
packaging = "bundle"

[[plugin_repositories]]
id = "plugins"
url = "{plugin_repo}"

[[extensions]]
coordinate = "org.example:bundle-ext:1.0"
lifecycles = ["bundle"]
"#
    )
}

fn config_trusting(repo_url: &str, extension: &str) -> String {
    format!(
        r#"
[extensions]
allow = ["{extension}"]

[repositories]
seed_default = false

[[repositories.trusted]]
id = "local"
url = "{repo_url}"

[[repositories.trusted_plugin]]
id = "local-plugins"
url = "{repo_url}"
"#
    )
}

#[test]
fn help_lists_subcommands() {
    let ws = Workspace::new("");
    let (ok, stdout) = stdout_of(ws.cmd().arg("--help"));
    assert!(ok);
    for sub in ["audit", "load", "resolve", "allow-list"] {
        assert!(stdout.contains(sub), "missing {sub}");
    }
}

#[test]
fn allow_list_prints_seeded_repository() {
    let ws = Workspace::new("[extensions]\nallow = [\"org.example:ext\"]\n");
    let (ok, stdout) = stdout_of(ws.cmd().args(["allow-list", "--json"]));
    assert!(ok);
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("json output");
    assert_eq!(value["extensions"][0], "org.example:ext");
    assert_eq!(
        value["repositories"][0],
        "https://repo.maven.apache.org/maven2"
    );
}

#[test]
fn allow_list_respects_env_overrides() {
    let ws = Workspace::new("");
    let (ok, stdout) = stdout_of(
        ws.cmd()
            .env("TRUSTGATE_ALLOW_EXTENSIONS", "org.example:a, org.example:b")
            .arg("allow-list"),
    );
    assert!(ok);
    assert!(stdout.contains("org.example:a"));
    assert!(stdout.contains("org.example:b"));
}

#[test]
fn audit_fails_on_untrusted_extension_repository() {
    let ws = Workspace::new("");
    let descriptor = ws.write(
        "project.toml",
        &descriptor_with_extension("http://attacker.example/repo"),
    );

    let (ok, stdout) = stdout_of(ws.cmd().arg("audit").arg(&descriptor));
    assert!(!ok);
    assert!(stdout.contains("rejected"));
    assert!(stdout.contains("http://attacker.example/repo"));
}

#[test]
fn audit_json_on_clean_descriptor_succeeds() {
    let ws = Workspace::new("");
    let descriptor = ws.write(
        "project.toml",
        "[project]\ngroup = \"org.example\"\nartifact = \"app\"\nversion = \"1.0\"\n",
    );

    let (ok, stdout) = stdout_of(ws.cmd().args(["audit", "--json"]).arg(&descriptor));
    assert!(ok);
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("json output");
    assert_eq!(value["project"], "org.example:app:1.0");
    assert!(value["rejections"]
        .as_array()
        .is_some_and(|r| r.is_empty()));
}

#[test]
fn load_wires_allow_listed_extension() {
    let ws = Workspace::new("");
    let repo_url = ws.repo_url();
    std::fs::write(
        ws.path("config.toml"),
        config_trusting(&repo_url, "org.example:bundle-ext"),
    )
    .expect("rewrite config");
    ws.publish("org.example:bundle-ext:1.0");
    let descriptor = ws.write("project.toml", &descriptor_with_extension(&repo_url));

    let (ok, stdout) = stdout_of(ws.cmd().arg("load").arg(&descriptor));
    assert!(ok, "stdout: {stdout}");
    assert!(stdout.contains("loaded"));
    assert!(stdout.contains("org.example:bundle-ext:1.0"));
}

#[test]
fn load_fails_when_lifecycle_extension_is_blocked() {
    let ws = Workspace::new("");
    let repo_url = ws.repo_url();
    std::fs::write(
        ws.path("config.toml"),
        config_trusting(&repo_url, "org.example:something-else"),
    )
    .expect("rewrite config");
    ws.publish("org.example:bundle-ext:1.0");
    let descriptor = ws.write("project.toml", &descriptor_with_extension(&repo_url));

    let (ok, stdout) = stdout_of(ws.cmd().arg("load").arg(&descriptor));
    assert!(!ok);
    assert!(stdout.contains("empty"));
}

#[test]
fn audit_log_is_written_when_configured() {
    let ws = Workspace::new("");
    let audit = ws.path("audit/decisions.jsonl");
    let descriptor = ws.write(
        "project.toml",
        &descriptor_with_extension("http://attacker.example/repo"),
    );

    let _ = ws
        .cmd()
        .env("TRUSTGATE_AUDIT_LOG", &audit)
        .arg("audit")
        .arg(&descriptor)
        .output()
        .expect("run");

    let contents = std::fs::read_to_string(&audit).expect("audit log written");
    assert!(contents.lines().count() >= 1);
    assert!(contents.contains("extension_resolution"));
}

#[test]
fn resolve_prints_local_path() {
    let ws = Workspace::new("");
    let repo_url = ws.repo_url();
    std::fs::write(
        ws.path("config.toml"),
        config_trusting(&repo_url, "org.example:unused"),
    )
    .expect("rewrite config");
    ws.publish("org.example:lib:2.0");

    let (ok, stdout) = stdout_of(ws.cmd().args(["resolve", "org.example:lib:2.0"]));
    assert!(ok);
    assert!(Path::new(stdout.trim()).is_file());
}

#[test]
fn resolve_reports_missing_artifact_as_not_found() {
    let ws = Workspace::new("");
    let repo_url = ws.repo_url();
    // The default repository stays seeded next to the local one.
    std::fs::write(
        ws.path("config.toml"),
        format!("[[repositories.trusted]]\nid = \"local\"\nurl = \"{repo_url}\"\n"),
    )
    .expect("rewrite config");

    let output = ws
        .cmd()
        .args(["resolve", "org.example:absent:1.0"])
        .output()
        .expect("run trustgate");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("artifact not found"), "stderr: {stderr}");
    assert!(!stderr.contains("transport failure"));
}

#[test]
fn resolve_rejects_malformed_coordinate() {
    let ws = Workspace::new("");
    let (ok, _) = stdout_of(ws.cmd().args(["resolve", "not-a-coordinate"]));
    assert!(!ok);
}
