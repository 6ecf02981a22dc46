//! Integration tests for the occultum binary

use assert_cmd::Command;
use occultum_core::{Config, VectorStore};
use predicates::prelude::*;
use tempfile::TempDir;

/// Command isolated from the user's config, keys and `.env`
fn occultum_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("occultum").unwrap();
    cmd.current_dir(dir.path())
        .env("OCCULTUM_CONFIG", dir.path().join("missing-config.yml"))
        .env("OCCULTUM_STORE", dir.path().join("vector_db"))
        .env_remove("OCCULTUM_API_KEY")
        .env_remove("NEBIUS_API_KEY")
        .env_remove("OCCULTUM_TOP_K")
        .env_remove("OCCULTUM_MIN_SCORE")
        .env_remove("OCCULTUM_EMBEDDING_URL")
        .env_remove("OCCULTUM_EMBEDDING_MODEL")
        .env_remove("OCCULTUM_EMBEDDING_DIMS")
        .env_remove("OCCULTUM_COLLECTION")
        .env_remove("RUST_LOG");
    cmd
}

/// Register an empty collection with the default embedding model
fn create_collection(dir: &TempDir, name: &str) {
    let defaults = Config::default();
    VectorStore::open(
        dir.path().join("vector_db"),
        name,
        &defaults.embedding.model,
        defaults.embedding.dimensions,
    )
    .unwrap();
}

#[test]
fn test_status_on_empty_store() {
    let dir = TempDir::new().unwrap();
    create_collection(&dir, "occultum");

    occultum_cmd(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Collection:      occultum"))
        .stdout(predicate::str::contains("Documents:       0"));
}

#[test]
fn test_status_never_creates_a_store() {
    let dir = TempDir::new().unwrap();

    occultum_cmd(&dir)
        .arg("status")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Collection 'occultum' not found"));
    assert!(!dir.path().join("vector_db").exists());
}

#[test]
fn test_mistyped_collection_is_not_registered() {
    let dir = TempDir::new().unwrap();
    create_collection(&dir, "occultum");

    for _ in 0..2 {
        occultum_cmd(&dir)
            .args(["status", "--collection", "occultm"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("Collection 'occultm' not found"));
    }
}

#[test]
fn test_status_json() {
    let dir = TempDir::new().unwrap();
    create_collection(&dir, "tomes");

    let output = occultum_cmd(&dir)
        .args(["status", "--format", "json", "--collection", "tomes"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["collection"], "tomes");
    assert_eq!(stats["document_count"], 0);
    assert_eq!(stats["dimensions"], 384);
}

#[test]
fn test_empty_question_is_invalid_input() {
    let dir = TempDir::new().unwrap();

    occultum_cmd(&dir)
        .env("OCCULTUM_API_KEY", "test-key")
        .args(["ask", "   "])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Invalid query"));

    // Rejected before the store is ever opened
    assert!(!dir.path().join("vector_db").exists());
}

#[test]
fn test_ask_error_in_json_format() {
    let dir = TempDir::new().unwrap();

    let output = occultum_cmd(&dir)
        .env("OCCULTUM_API_KEY", "test-key")
        .args(["ask", "   ", "--format", "json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));

    let error: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(error["code"], 3);
    assert!(error["error"].as_str().unwrap().contains("Invalid query"));
}

#[test]
fn test_missing_api_key_is_config_error() {
    let dir = TempDir::new().unwrap();

    occultum_cmd(&dir)
        .args(["ask", "How do I cast a fireball?"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("API key"));
}

#[test]
fn test_unreachable_embedding_service_is_upstream_error() {
    let dir = TempDir::new().unwrap();
    create_collection(&dir, "occultum");

    occultum_cmd(&dir)
        .env("OCCULTUM_EMBEDDING_URL", "http://127.0.0.1:9")
        .args(["search", "fireball"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Embedding model unavailable"));
}

#[test]
fn test_config_redacts_api_key() {
    let dir = TempDir::new().unwrap();

    occultum_cmd(&dir)
        .env("OCCULTUM_API_KEY", "super-secret-key")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("super-secret-key").not())
        .stdout(predicate::str::contains("***"))
        .stdout(predicate::str::contains("meta-llama/Meta-Llama-3.1-8B-Instruct"));
}

#[test]
fn test_config_env_overrides() {
    let dir = TempDir::new().unwrap();

    let output = occultum_cmd(&dir)
        .env("OCCULTUM_TOP_K", "5")
        .env("NEBIUS_API_KEY", "nebius-key")
        .args(["config", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["retrieval"]["top_k"], 5);
    assert_eq!(config["generation"]["api_key"], "***");
}

#[test]
fn test_invalid_env_value_is_config_error() {
    let dir = TempDir::new().unwrap();

    occultum_cmd(&dir)
        .env("OCCULTUM_TOP_K", "many")
        .arg("config")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("OCCULTUM_TOP_K"));
}

#[test]
fn test_config_file_is_honoured() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("occultum.yml");
    std::fs::write(
        &config_path,
        "store:\n  collection: grimoire\nretrieval:\n  top_k: 3\n",
    )
    .unwrap();

    let output = occultum_cmd(&dir)
        .args(["config", "--format", "json", "--config"])
        .arg(&config_path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["store"]["collection"], "grimoire");
    assert_eq!(config["retrieval"]["top_k"], 3);
}

#[test]
fn test_malformed_config_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("broken.yml");
    std::fs::write(&config_path, "retrieval: [top_k\n").unwrap();

    occultum_cmd(&dir)
        .args(["config", "--config"])
        .arg(&config_path)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("YAML"));
}

#[test]
fn test_import_missing_file_fails() {
    let dir = TempDir::new().unwrap();

    occultum_cmd(&dir)
        .args(["import", "no-such-scrolls.jsonl"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no-such-scrolls.jsonl"));
}
