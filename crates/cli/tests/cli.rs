use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

const CONFIG: &str = r#"
default_database = "gesn"

[[databases]]
id = "gesn"
name = "ГЭСН"

[[databases]]
id = "gesnr"
name = "ГЭСНр"

[[databases]]
id = "fsbts_mat"
name = "ФСБЦ материалы"

[[databases]]
id = "fsbts_mash"
name = "ФСБЦ машины"

[[catalog_map]]
prefix = "01"
database = "fsbts_mat"

[[catalog_map]]
prefix = "91"
database = "fsbts_mash"
"#;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../store/tests/fixtures/catalog.json")
}

fn run(args: &[&str]) -> (bool, String, String) {
    let temp = tempdir().unwrap();
    let config = temp.path().join("ratebook.toml");
    fs::write(&config, CONFIG).unwrap();

    let output = cargo_bin_cmd!("ratebook")
        .env_remove("RATEBOOK_CATALOG")
        .env_remove("RATEBOOK_CONFIG")
        .arg("--catalog")
        .arg(fixture())
        .arg("--config")
        .arg(&config)
        .args(args)
        .output()
        .expect("command run");
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

fn run_json(args: &[&str]) -> Value {
    let mut full = vec!["--json"];
    full.extend_from_slice(args);
    let (ok, stdout, stderr) = run(&full);
    assert!(ok, "command failed: {stderr}");
    serde_json::from_str(&stdout).expect("valid json")
}

#[test]
fn databases_lists_configured_ids() {
    let body = run_json(&["databases"]);
    let ids: Vec<&str> = body
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|db| db["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["gesn", "gesnr", "fsbts_mat", "fsbts_mash"]);
}

#[test]
fn tree_expands_requested_sections() {
    let (ok, stdout, stderr) = run(&["tree", "--expand", "01", "--expand", "01-01"]);
    assert!(ok, "command failed: {stderr}");
    assert!(stdout.starts_with("[gesn]"), "unexpected output: {stdout}");
    assert!(stdout.contains("- 01 Земляные работы"), "{stdout}");
    assert!(stdout.contains("- 01-01 Разработка грунта"), "{stdout}");
    assert!(stdout.contains("* 01-01-001-01"), "{stdout}");
    assert!(!stdout.contains("06-01"), "collapsed section leaked: {stdout}");
}

#[test]
fn tree_json_reports_expanded_codes() {
    let body = run_json(&["tree", "--expand", "01"]);
    assert_eq!(body["currentDatabase"], "gesn");
    let expanded = body["expanded"].as_array().expect("expanded array");
    assert_eq!(expanded, &vec![Value::from("01")]);
}

#[test]
fn work_json_carries_section_names() {
    let body = run_json(&["work", "01-01-001-01"]);
    assert_eq!(body["code"], "01-01-001-01");
    assert_eq!(
        body["sectionNames"],
        serde_json::json!(["Земляные работы", "Разработка грунта"])
    );
    let resources = body["resources"].as_array().expect("resources array");
    assert_eq!(resources.len(), 2);
}

#[test]
fn missing_work_fails() {
    let (ok, _, stderr) = run(&["work", "99-99-999-99"]);
    assert!(!ok);
    assert!(stderr.contains("99-99-999-99"), "stderr: {stderr}");
}

#[test]
fn resource_resolves_through_catalog_map() {
    let body = run_json(&["resource", "91.01.01-035"]);
    assert_eq!(body["database"], "fsbts_mash");
    assert_eq!(body["name"], "Бульдозеры мощностью 79 кВт");
}

#[test]
fn suggest_returns_state_for_query() {
    let body = run_json(&["suggest", "грунт"]);
    assert_eq!(body["query"], "грунт");
    assert_eq!(body["loading"], false);
    assert!(body["error"].is_null(), "unexpected error: {body}");
}

#[test]
fn search_groups_hits_by_database() {
    let body = run_json(&["search", "бетон"]);
    let groups = body["groups"].as_array().expect("groups array");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["database"], "gesn");
    let codes: Vec<&str> = groups[0]["hits"]
        .as_array()
        .expect("hits array")
        .iter()
        .filter_map(|hit| hit["code"].as_str())
        .collect();
    assert_eq!(codes, vec!["06-01-001-01"]);
}

#[test]
fn search_opens_selected_hit() {
    let body = run_json(&["search", "бетон", "--open", "1"]);
    assert_eq!(body["code"], "06-01-001-01");
    assert_eq!(
        body["sectionNames"],
        serde_json::json!(["Бетонные и железобетонные конструкции", "Бетонные конструкции"])
    );

    let (ok, _, stderr) = run(&["search", "бетон", "--open", "2"]);
    assert!(!ok);
    assert!(stderr.contains("No hit #2"), "stderr: {stderr}");
}

#[test]
fn search_without_hits_says_so() {
    let (ok, stdout, stderr) = run(&["search", "несуществующее"]);
    assert!(ok, "command failed: {stderr}");
    assert!(stdout.contains("Nothing found for `несуществующее`"), "{stdout}");
}

#[test]
fn missing_catalog_is_an_error() {
    cargo_bin_cmd!("ratebook")
        .env_remove("RATEBOOK_CATALOG")
        .env_remove("RATEBOOK_CONFIG")
        .args(["work", "01-01-001-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No catalog given"));
}
