use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigPathError {
    MissingHomeDirectory,
}

pub(crate) const APP_DIR: &str = "swik";
const APP_CONFIG_FILE: &str = "config.json";

pub const DEFAULT_UNDO_LIMIT: usize = 200;
pub const DEFAULT_DUPLICATE_OFFSET: f64 = 10.0;

/// Application-level settings from `config.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub undo_limit: Option<usize>,
    #[serde(default)]
    pub duplicate_offset: Option<f64>,
    #[serde(default)]
    pub socket_path: Option<PathBuf>,
}

impl AppConfig {
    /// Zero disables the limit.
    pub fn undo_limit(&self) -> Option<usize> {
        match self.undo_limit {
            Some(0) => None,
            Some(limit) => Some(limit),
            None => Some(DEFAULT_UNDO_LIMIT),
        }
    }

    pub fn duplicate_offset(&self) -> f64 {
        self.duplicate_offset
            .filter(|offset| offset.is_finite())
            .unwrap_or(DEFAULT_DUPLICATE_OFFSET)
    }
}

pub fn load_app_config() -> AppConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_app_config_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_app_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> AppConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(_) => return AppConfig::default(),
    };
    if !path.exists() {
        return AppConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            AppConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            AppConfig::default()
        }
    }
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_root(tag: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        path.push(format!("swik-config-{tag}-{}-{nanos}", std::process::id()));
        path
    }

    #[test]
    fn app_config_path_prefers_xdg_config_home() {
        let path = app_config_path(
            "swik",
            "styles.json",
            Some(Path::new("/tmp/config-root")),
            Some(Path::new("/tmp/home")),
        )
        .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/config-root/swik/styles.json"));
    }

    #[test]
    fn app_config_path_falls_back_to_home_dot_config() {
        let path = app_config_path("swik", "styles.json", None, Some(Path::new("/tmp/home")))
            .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/home/.config/swik/styles.json"));
    }

    #[test]
    fn app_config_path_errors_when_home_missing_and_xdg_unset() {
        let error = app_config_path("swik", "styles.json", None, None).unwrap_err();
        assert_eq!(error, ConfigPathError::MissingHomeDirectory);
    }

    #[test]
    fn missing_config_uses_defaults() {
        let root = fixture_root("missing");
        let config = load_app_config_with(Some(&root), None);
        assert_eq!(config.undo_limit(), Some(DEFAULT_UNDO_LIMIT));
        assert_eq!(config.duplicate_offset(), DEFAULT_DUPLICATE_OFFSET);
        assert!(config.socket_path.is_none());
    }

    #[test]
    fn config_file_overrides_limits_and_malformed_file_falls_back() {
        let root = fixture_root("parse");
        let dir = root.join(APP_DIR);
        std::fs::create_dir_all(&dir).unwrap();

        std::fs::write(
            dir.join(APP_CONFIG_FILE),
            r#"{ "undo_limit": 0, "duplicate_offset": 4.5 }"#,
        )
        .unwrap();
        let config = load_app_config_with(Some(&root), None);
        assert_eq!(config.undo_limit(), None);
        assert_eq!(config.duplicate_offset(), 4.5);

        std::fs::write(dir.join(APP_CONFIG_FILE), "{ not json").unwrap();
        let config = load_app_config_with(Some(&root), None);
        assert_eq!(config.undo_limit(), Some(DEFAULT_UNDO_LIMIT));

        let _ = std::fs::remove_dir_all(&root);
    }
}
