//! Common test utilities for Chartwise integration tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

/// Environment variables that would leak the developer's setup into a test
const OVERRIDE_VARS: &[&str] = &[
    "SUPERSET_BASE_URL",
    "SUPERSET_USERNAME",
    "SUPERSET_PASSWORD",
    "OLLAMA_BASE_URL",
    "OPENAI_API_KEY",
    "CHARTWISE_MODEL",
    "RUST_LOG",
];

/// Isolated home directory holding `.chartwise/`
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub config_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = tempdir()?;
        let config_dir = temp_dir.path().join(".chartwise");

        Ok(Self {
            temp_dir,
            config_dir,
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }

    /// Command with HOME pointed at the temp dir and overrides cleared
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_chartwise"));
        cmd.env("HOME", self.temp_dir.path());
        for var in OVERRIDE_VARS {
            cmd.env_remove(var);
        }
        cmd
    }

    /// Write a config file pointing at the given Superset and Ollama hosts
    pub fn create_config(&self, superset_url: &str, ollama_url: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let config = serde_json::json!({
            "superset": {"base_url": superset_url},
            "model": {"backend": "ollama", "name": "llama3", "api_base": ollama_url},
            "agent": {"max_rounds": 3}
        });
        std::fs::write(self.config_file(), serde_json::to_string_pretty(&config)?)?;
        Ok(())
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}
