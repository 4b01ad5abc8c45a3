use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = ".boardroom";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InterviewConfig {
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
    pub user_id: String,
    pub data_dir: Option<PathBuf>,
    pub report_width: usize,
    pub bet_horizon_days: i64,
    pub review_interval_days: i64,
    /// Delete abandoned session snapshots instead of keeping them.
    pub purge_abandoned: bool,
}

impl InterviewConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut config: InterviewConfig = match ext.as_str() {
            "yml" | "yaml" => serde_yaml::from_str(&contents).context("parse config")?,
            "toml" | "tml" => toml::from_str(&contents).context("parse config")?,
            _ => serde_yaml::from_str(&contents)
                .or_else(|_| toml::from_str(&contents))
                .context("parse config (yaml or toml)")?,
        };
        config.source_path = Some(path.to_path_buf());
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.user_id.trim().is_empty() {
            anyhow::bail!("config user_id must not be empty");
        }
        if self.report_width < 40 {
            anyhow::bail!("config report_width must be at least 40, got {}", self.report_width);
        }
        if self.bet_horizon_days <= 0 {
            anyhow::bail!("config bet_horizon_days must be positive");
        }
        if self.review_interval_days <= 0 {
            anyhow::bail!("config review_interval_days must be positive");
        }
        Ok(())
    }

    /// `data_dir` resolved against the config file's directory, defaulting
    /// to `.boardroom` there (or in the working directory).
    pub fn resolved_data_dir(&self) -> PathBuf {
        let base = self
            .source_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        match &self.data_dir {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => base.join(path),
            None => base.join(DEFAULT_DATA_DIR),
        }
    }
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            source_path: None,
            user_id: "default".to_string(),
            data_dir: None,
            report_width: 100,
            bet_horizon_days: 90,
            review_interval_days: 90,
            purge_abandoned: false,
        }
    }
}
