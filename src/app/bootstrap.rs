use std::path::PathBuf;

use crate::config::{load_app_config, AppConfig};
use crate::ipc::default_socket_path;
use crate::style::{load_style_defaults, StyleDefaults};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct StartupConfig {
    pub(super) files: Vec<PathBuf>,
}

impl StartupConfig {
    pub(super) fn from_args() -> Self {
        Self::from_arg_list(std::env::args_os().skip(1))
    }

    fn from_arg_list(args: impl IntoIterator<Item = std::ffi::OsString>) -> Self {
        let files = args
            .into_iter()
            .filter(|arg| !arg.to_string_lossy().starts_with('-'))
            .map(PathBuf::from)
            .collect();
        Self { files }
    }
}

pub(super) struct AppBootstrap {
    pub(super) startup_config: StartupConfig,
    pub(super) app_config: AppConfig,
    pub(super) style_defaults: StyleDefaults,
    pub(super) socket_path: PathBuf,
}

pub(super) fn bootstrap_app_runtime() -> AppBootstrap {
    let startup_config = StartupConfig::from_args();

    let app_config = load_app_config();
    tracing::info!(
        undo_limit = ?app_config.undo_limit(),
        duplicate_offset = app_config.duplicate_offset(),
        "loaded app config"
    );

    let style_defaults = load_style_defaults().unwrap_or_else(|err| {
        tracing::warn!(?err, "failed to load style defaults; using built-in styles");
        StyleDefaults::default()
    });

    let socket_path = app_config
        .socket_path
        .clone()
        .unwrap_or_else(default_socket_path);

    AppBootstrap {
        startup_config,
        app_config,
        style_defaults,
        socket_path,
    }
}
