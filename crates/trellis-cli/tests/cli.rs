//! End-to-end tests for the `trellis` binary

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const GRAPH: &str = r#"{
  "entities": [
    {"name": "GraphStore", "entityType": "class",
     "observations": ["Defined in: src/store.py", "docstring: Persists the graph"]},
    {"name": "load_graph", "entityType": "function",
     "observations": ["Defined in: src/io.py"]}
  ],
  "relations": [
    {"from": "load_graph", "to": "GraphStore", "relationType": "uses"}
  ]
}"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    fn trellis(&self) -> Command {
        let mut cmd = Command::cargo_bin("trellis").unwrap();
        cmd.env("TRELLIS_DATA_DIR", self.dir.path().join("data"))
            .env("TRELLIS_CONFIG", self.config_path())
            .env_remove("RUST_LOG");
        cmd
    }

    fn imported() -> Self {
        let ws = Self::new();
        let file = ws.dir.path().join("graph.json");
        std::fs::write(&file, GRAPH).unwrap();
        ws.trellis()
            .arg("import")
            .arg(&file)
            .assert()
            .success()
            .stdout(predicate::str::contains("Imported 2 entities and 1 relations"));
        ws
    }
}

#[test]
fn help_lists_commands() {
    Workspace::new()
        .trellis()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("graph"))
        .stdout(predicate::str::contains("import"));
}

#[test]
fn smart_view_with_meta_on_stderr() {
    Workspace::imported()
        .trellis()
        .arg("graph")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"totalEntities\":2"))
        .stdout(predicate::str::contains("\"apiSurface\""))
        .stderr(predicate::str::contains("<!-- meta: "))
        .stderr(predicate::str::contains("\"truncated\":false"));
}

#[test]
fn entities_view_filters_by_type() {
    Workspace::imported()
        .trellis()
        .args(["graph", "--mode", "entities", "--type", "function"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\":\"load_graph\""))
        .stdout(predicate::str::contains("\"name\":\"GraphStore\"").not());
}

#[test]
fn raw_view_of_empty_graph() {
    Workspace::new()
        .trellis()
        .args(["graph", "--mode", "raw"])
        .assert()
        .success()
        .stdout("{\"entities\":[],\"relations\":[]}\n");
}

#[test]
fn unknown_mode_degrades() {
    Workspace::imported()
        .trellis()
        .args(["graph", "--mode", "everything"])
        .assert()
        .success()
        .stdout("{\"entities\":[],\"relations\":[]}\n")
        .stderr(predicate::str::contains("\"truncated\":true"));
}

#[test]
fn tiny_token_limit_is_rejected() {
    Workspace::new()
        .trellis()
        .args(["graph", "--max-tokens", "16"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_tokens"));
}

#[test]
fn reimport_skips_existing() {
    let ws = Workspace::imported();
    let file = ws.dir.path().join("graph.json");
    ws.trellis()
        .arg("import")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 0 entities and 0 relations"));
}

#[test]
fn exact_and_semantic_search() {
    let ws = Workspace::imported();
    ws.trellis()
        .args(["search", "store.py", "--exact"])
        .assert()
        .success()
        .stdout(predicate::str::contains("GraphStore (class)"));

    ws.trellis()
        .args(["search", "persists the graph", "--type", "class"])
        .assert()
        .success()
        .stdout(predicate::str::contains("GraphStore (class)"));
}

#[test]
fn export_round_trips_through_import() {
    let ws = Workspace::imported();
    let out = ws.dir.path().join("export.json");
    ws.trellis()
        .args(["export", "--output"])
        .arg(&out)
        .assert()
        .success();

    let exported = std::fs::read_to_string(&out).unwrap();
    assert!(exported.contains("\"entityType\": \"class\""));

    let fresh = Workspace::new();
    fresh
        .trellis()
        .arg("import")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 entities and 1 relations"));
}

#[test]
fn config_set_and_get() {
    let ws = Workspace::new();
    ws.trellis()
        .args(["config", "set", "response.max_tokens", "8000"])
        .assert()
        .success();
    assert!(ws.config_path().exists());

    ws.trellis()
        .args(["config", "get", "response.max_tokens"])
        .assert()
        .success()
        .stdout("8000\n");

    ws.trellis()
        .args(["config", "get", "response.nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn configured_token_limit_reaches_graph_meta() {
    let ws = Workspace::imported();
    ws.trellis()
        .args(["config", "set", "response.max_tokens", "4000"])
        .assert()
        .success();
    ws.trellis()
        .arg("graph")
        .assert()
        .success()
        .stderr(predicate::str::contains("\"tokenLimit\":4000"));
}

#[test]
fn serve_answers_over_stdio() {
    Workspace::imported()
        .trellis()
        .arg("serve")
        .write_stdin(concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/list\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"tools/call\",\"params\":{\"name\":\"read_graph\",\"arguments\":{\"mode\":\"entities\"}}}\n",
        ))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"serverInfo\""))
        .stdout(predicate::str::contains("search_similar"))
        .stdout(predicate::str::contains("load_graph"))
        .stdout(predicate::str::contains("<!-- meta: "));
}

#[test]
fn completions_for_bash() {
    Workspace::new()
        .trellis()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trellis"));
}
