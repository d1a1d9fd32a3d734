/*!
Optional TOML configuration. Every field has a default, so an empty file and
no file at all behave the same.
*/

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use ghost_stores::PreservationRules;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PurgeConfig {
    /// Home directory to purge; defaults to the current user's
    pub home: Option<PathBuf>,
    pub browser: BrowserConfig,
    pub app_data: AppDataConfig,
    pub preservation: PreservationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserConfig {
    /// How long to wait for a browser (or Mail) to quit
    pub quit_timeout_secs: u64,
    /// How often to check whether it has quit
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppDataConfig {
    /// Directories to walk, relative to the home directory
    pub roots: Vec<PathBuf>,
    /// Directory levels below each root to descend
    pub max_depth: usize,
    /// Larger files are not read
    pub max_file_bytes: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreservationConfig {
    /// Patterns added to the built-in rules: `*.ext`, `name/`, `~/path` or an
    /// absolute path
    pub extra: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            quit_timeout_secs: 15,
            poll_interval_ms: 250,
        }
    }
}

impl Default for AppDataConfig {
    fn default() -> Self {
        Self {
            roots: vec![
                PathBuf::from("Library/Application Support"),
                PathBuf::from("Library/Containers"),
                PathBuf::from("Library/Group Containers"),
            ],
            max_depth: 4,
            max_file_bytes: 8 * 1024 * 1024,
        }
    }
}

impl PurgeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        let config: Self =
            toml::from_str(&text).with_context(|| format!("Invalid configuration {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.browser.poll_interval_ms == 0 {
            bail!("browser.poll_interval_ms must be greater than zero");
        }
        if self.app_data.max_depth == 0 {
            bail!("app_data.max_depth must be at least 1");
        }
        if let Some(root) = self.app_data.roots.iter().find(|root| root.is_absolute()) {
            bail!("app_data.roots must be relative to the home directory: {}", root.display());
        }
        Ok(())
    }

    pub fn home(&self) -> Result<PathBuf> {
        match &self.home {
            Some(home) if home.is_absolute() => Ok(home.clone()),
            Some(home) => bail!("home must be an absolute path: {}", home.display()),
            None => dirs::home_dir().context("Cannot determine the home directory"),
        }
    }

    pub fn preservation_rules(&self, home: &Path) -> Result<PreservationRules> {
        PreservationRules::builtin(home)
            .with_patterns(&self.preservation.extra, home)
            .context("Invalid preservation pattern")
    }

    pub fn log_dir(&self, home: &Path) -> PathBuf {
        self.logging
            .dir
            .clone()
            .unwrap_or_else(|| home.join("Library/Logs/ghost-purge"))
    }

    pub fn quit_timeout(&self) -> Duration {
        Duration::from_secs(self.browser.quit_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.browser.poll_interval_ms)
    }

    pub fn app_data_roots(&self, home: &Path) -> Vec<PathBuf> {
        self.app_data.roots.iter().map(|root| home.join(root)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(contents: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ghost-purge.toml");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let (_dir, path) = write("");
        let config = PurgeConfig::load(&path).unwrap();
        assert_eq!(config.quit_timeout(), Duration::from_secs(15));
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.app_data.max_depth, 4);
        assert_eq!(config.app_data.roots.len(), 3);
    }

    #[test]
    fn test_full_file() {
        let (dir, path) = write(
            r#"
home = "/Users/me"
[browser]
quit_timeout_secs = 5
[app_data]
roots = ["Library/Application Support"]
max_file_bytes = 1024
[preservation]
extra = ["*.kdb", "~/Work/"]
[logging]
dir = "/tmp/ghost-logs"
"#,
        );
        let config = PurgeConfig::load(&path).unwrap();
        let home = config.home().unwrap();
        assert_eq!(home, PathBuf::from("/Users/me"));
        assert_eq!(config.quit_timeout(), Duration::from_secs(5));
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.app_data_roots(&home), vec![home.join("Library/Application Support")]);
        assert_eq!(config.log_dir(&home), PathBuf::from("/tmp/ghost-logs"));

        let rules = config.preservation_rules(dir.path()).unwrap();
        assert!(rules.is_preserved(&dir.path().join("Downloads/old.KDB")));
        assert!(rules.is_preserved(&dir.path().join("Work/notes.txt")));
    }

    #[test]
    fn test_unusable_configuration_is_rejected() {
        let (_dir, path) = write("[browser]\npoll_interval_ms = 0\n");
        assert!(PurgeConfig::load(&path).is_err());
        let (_dir, path) = write("unknown = true\n");
        assert!(PurgeConfig::load(&path).is_err());
        let (_dir, path) = write("[app_data]\nroots = [\"/Library\"]\n");
        assert!(PurgeConfig::load(&path).is_err());

        let (dir, path) = write("[preservation]\nextra = [\"weird\"]\n");
        let config = PurgeConfig::load(&path).unwrap();
        assert!(config.preservation_rules(dir.path()).is_err());
    }
}
