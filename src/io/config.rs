//! Loop defaults stored in `triad.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::types::ToolKey;

/// Defaults for a run (TOML).
///
/// This file is intended to be edited by humans; every CLI flag overrides
/// its counterpart here. Missing fields fall back to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoopConfig {
    /// Tool that creates and revises code.
    pub creator: ToolKey,

    /// Tool that reviews the code.
    pub reviewer: ToolKey,

    /// Tool that critiques the review.
    pub critic: ToolKey,

    /// Number of review → critique → revise cycles.
    pub iterations: u32,

    /// Per-agent-call timeout in seconds.
    pub timeout_secs: u64,

    /// Truncate captured agent output beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Directory where session transcripts are written.
    pub sessions_dir: PathBuf,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            creator: ToolKey::Claude,
            reviewer: ToolKey::Codex,
            critic: ToolKey::Gemini,
            iterations: 5,
            timeout_secs: 120,
            output_limit_bytes: 400_000,
            sessions_dir: PathBuf::from("sessions"),
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(anyhow!("iterations must be > 0"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `LoopConfig::default()`.
pub fn load_config(path: &Path) -> Result<LoopConfig> {
    if !path.exists() {
        let cfg = LoopConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: LoopConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &LoopConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, &buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, LoopConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("triad.toml");
        let cfg = LoopConfig {
            creator: ToolKey::Gemini,
            iterations: 2,
            ..LoopConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn rejects_zero_iterations() {
        let cfg = LoopConfig {
            iterations: 0,
            ..LoopConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("triad.toml");
        fs::write(&path, "iterations = 3\ncreator = \"codex\"\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.iterations, 3);
        assert_eq!(cfg.creator, ToolKey::Codex);
        assert_eq!(cfg.timeout_secs, LoopConfig::default().timeout_secs);
    }
}
