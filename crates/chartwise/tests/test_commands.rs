//! Command behaviour tests against mock Superset and Ollama servers

mod common;

use common::TestEnv;
use mockito::{Matcher, Server};
use predicates::prelude::*;
use serde_json::json;

const TOOLS: [&str; 6] = [
    "superset_database_list",
    "superset_database_get_tables",
    "superset_database_schemas",
    "superset_sqllab_execute_query",
    "superset_chart_create",
    "superset_dataset_list",
];

#[test]
fn test_tools_lists_catalogue() {
    let env = TestEnv::default();
    let assert = env.command().arg("tools").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();

    for tool in TOOLS {
        assert!(stdout.contains(tool), "missing {}", tool);
    }
    assert!(stdout.contains("required: database_id, sql"));
    assert!(stdout.contains("required: none"));
}

#[test]
fn test_status_without_config() {
    let env = TestEnv::default();
    env.command()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("[Missing]"))
        .stdout(predicate::str::contains("http://localhost:8088"))
        .stdout(predicate::str::contains("Backend:    ollama"))
        .stdout(predicate::str::contains("Max rounds: 5"));
}

#[test]
fn test_init_writes_default_config() {
    let env = TestEnv::default();
    env.command()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Next steps"));

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(env.config_file()).unwrap()).unwrap();
    assert_eq!(written["agent"]["max_rounds"], 5);
    assert_eq!(written["model"]["backend"], "ollama");

    // A second init keeps the existing file
    env.command().arg("init").assert().success();
}

#[test]
fn test_status_reads_config() {
    let env = TestEnv::default();
    env.create_config("http://bi.internal:8088", "http://gpu:11434")
        .unwrap();

    env.command()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK]"))
        .stdout(predicate::str::contains("http://bi.internal:8088"))
        .stdout(predicate::str::contains("http://gpu:11434"))
        .stdout(predicate::str::contains("Max rounds: 3"));
}

#[test]
fn test_status_env_override() {
    let env = TestEnv::default();
    env.command()
        .env("SUPERSET_BASE_URL", "http://override:8088")
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("http://override:8088"));
}

#[test]
fn test_call_unknown_tool() {
    let env = TestEnv::default();
    env.command()
        .args(["call", "superset_database_lsit"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown tool: superset_database_lsit"));
}

#[test]
fn test_call_invalid_json_args() {
    let env = TestEnv::default();
    env.command()
        .args(["call", "superset_database_schemas", "--args", "{database_id: 1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid JSON"));
}

#[test]
fn test_call_database_list() {
    let mut superset = Server::new();
    superset
        .mock("GET", "/api/v1/database/")
        .with_status(200)
        .with_body(r#"{"result":[{"id":1,"database_name":"examples"}]}"#)
        .create();

    let env = TestEnv::default();
    env.create_config(&superset.url(), "http://127.0.0.1:9").unwrap();

    env.command()
        .args(["call", "superset_database_list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"examples\""));
}

#[test]
fn test_call_reports_superset_error() {
    let mut superset = Server::new();
    superset
        .mock("GET", "/api/v1/database/3/schemas/")
        .with_status(404)
        .with_body(r#"{"message":"Not found"}"#)
        .create();

    let env = TestEnv::default();
    env.create_config(&superset.url(), "http://127.0.0.1:9").unwrap();

    env.command()
        .args(["call", "superset_database_schemas", "--args", r#"{"database_id": 3}"#])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Superset API error (404): Not found"));
}

#[test]
fn test_call_logs_in_with_configured_credentials() {
    let mut superset = Server::new();
    let login = superset
        .mock("POST", "/api/v1/security/login")
        .match_body(Matcher::PartialJson(json!({"username": "admin", "password": "secret"})))
        .with_status(200)
        .with_body(r#"{"access_token":"tok"}"#)
        .create();
    superset
        .mock("GET", "/api/v1/security/csrf_token/")
        .with_status(200)
        .with_body(r#"{"result":"csrf"}"#)
        .create();
    superset
        .mock("GET", "/api/v1/dataset/")
        .match_header("authorization", "Bearer tok")
        .with_status(200)
        .with_body(r#"{"result":[{"id":7,"table_name":"sales"}]}"#)
        .create();

    let env = TestEnv::default();
    env.create_config(&superset.url(), "http://127.0.0.1:9").unwrap();

    env.command()
        .env("SUPERSET_USERNAME", "admin")
        .env("SUPERSET_PASSWORD", "secret")
        .args(["call", "superset_dataset_list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sales"));

    login.assert();
}

#[test]
fn test_ask_one_shot() {
    let superset = Server::new();
    let mut ollama = Server::new();
    ollama
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(json!({"model": "llama3", "stream": false})))
        .with_status(200)
        .with_body(
            json!({
                "model": "llama3",
                "message": {"role": "assistant", "content": "Which dataset should I chart?"},
                "done": true
            })
            .to_string(),
        )
        .create();

    let env = TestEnv::default();
    env.create_config(&superset.url(), &ollama.url()).unwrap();

    env.command()
        .args(["ask", "-m", "make me a chart"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Which dataset should I chart?"));
}

#[test]
fn test_ask_model_unreachable() {
    let superset = Server::new();

    let env = TestEnv::default();
    env.create_config(&superset.url(), "http://127.0.0.1:9").unwrap();

    env.command()
        .args(["ask", "-m", "list databases"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Error communicating with the language model",
        ));
}

#[test]
fn test_register_db() {
    let mut superset = Server::new();
    superset
        .mock("POST", "/api/v1/database/")
        .match_body(Matcher::PartialJson(json!({
            "database_name": "Trino",
            "sqlalchemy_uri": "trino://admin@trino:8080/iceberg",
            "engine": "trino"
        })))
        .with_status(201)
        .with_body(r#"{"id":3,"result":{}}"#)
        .create();

    let env = TestEnv::default();
    env.create_config(&superset.url(), "http://127.0.0.1:9").unwrap();

    env.command()
        .args([
            "register-db",
            "--name",
            "Trino",
            "--uri",
            "trino://admin@trino:8080/iceberg",
            "--engine",
            "trino",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Registered database Trino (id 3)"));
}
