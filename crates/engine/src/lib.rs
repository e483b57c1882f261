use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod actors;
pub mod app;
pub mod content;
pub mod physics;

pub use actors::{
    Archetype, AnimationCue, Entity, EntityEvent, EntityId, Facing, Player, PlayerState, SoundCue,
};
pub use app::{
    run_headless, run_headless_with_metrics, AnimationService, AppError, AudioService, HeldKeys,
    InputQuery, InputSource, InputState, Key, LoopConfig, LoopMetricsSnapshot, MetricsHandle,
    RunOutcome, RunSummary, Scene, SceneCommand, SceneWorld, ServiceError, Services,
};
pub use content::{load_stage, parse_stage, SpawnPoint, Stage, StageLoadError};
pub use physics::{CollisionType, Rectangle, StageGrid, BLOCK_SIZE};

pub const ROOT_ENV_VAR: &str = "TILERUN_ROOT";

/// Stage files live here, relative to the asset root.
const STAGES_SUBDIR: [&str; 2] = ["assets", "stages"];

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub stages_dir: PathBuf,
}

impl AppPaths {
    fn at(root: PathBuf) -> Self {
        let stages_dir = STAGES_SUBDIR.iter().fold(root.clone(), |dir, part| dir.join(part));
        Self { root, stages_dir }
    }

    pub fn stage_path(&self, file_name: &str) -> PathBuf {
        self.stages_dir.join(file_name)
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("{var} points at {path}, which has no assets/stages directory")]
    InvalidEnvRoot { var: &'static str, path: PathBuf },
    #[error("no assets/stages directory above {start_dir}; set {var} to the asset root")]
    RootNotFound { var: &'static str, start_dir: PathBuf },
}

/// `TILERUN_ROOT` when set, otherwise the nearest ancestor of the executable
/// that holds `assets/stages`.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let root = normalize_path(Path::new(&value));
            let paths = AppPaths::at(root);
            if paths.stages_dir.is_dir() {
                Ok(paths)
            } else {
                Err(StartupError::InvalidEnvRoot {
                    var: ROOT_ENV_VAR,
                    path: paths.root,
                })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let start_dir = exe.parent().unwrap_or(exe.as_path());
            find_asset_root(start_dir).ok_or_else(|| StartupError::RootNotFound {
                var: ROOT_ENV_VAR,
                start_dir: start_dir.to_path_buf(),
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn find_asset_root(start_dir: &Path) -> Option<AppPaths> {
    start_dir
        .ancestors()
        .map(|candidate| AppPaths::at(normalize_path(candidate)))
        .find(|paths| paths.stages_dir.is_dir())
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
