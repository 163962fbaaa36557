//! Filesystem locations for config, secrets and logs.

use std::env;
use std::fs;
use std::path::PathBuf;

const ROOT_ENV: &str = "FLOWGUARD_ROOT";
const DATA_DIR_ENV: &str = "FLOWGUARD_DATA_DIR";

#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Holds the shipped `config.yml`.
    pub project_root: PathBuf,
    /// Holds operator overrides, `secrets.yaml` and `logs/`.
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        Self::discover(|key| env::var(key).ok())
    }

    /// Resolves both directories through `lookup`; blank values count as unset.
    fn discover(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
        };

        let project_root = var(ROOT_ENV).unwrap_or_else(default_project_root);
        let user_data_dir = var(DATA_DIR_ENV).unwrap_or_else(|| project_root.clone());
        Self::from_dirs(project_root, user_data_dir)
    }

    pub fn from_dirs(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let log_dir = user_data_dir.join("logs");
        let secrets_path = user_data_dir.join("secrets.yaml");

        // Retried by logging setup before the log file opens.
        let _ = fs::create_dir_all(&log_dir);

        AppPaths {
            project_root,
            user_data_dir,
            log_dir,
            secrets_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

/// The crate directory in dev builds, otherwise the working directory.
fn default_project_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if cfg!(debug_assertions) && manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }
    env::current_dir().unwrap_or(manifest_dir)
}
