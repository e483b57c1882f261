use std::process::ExitCode;

use engine::{load_stage, resolve_app_paths, run_headless, AppError, RunSummary};
use tracing::{error, info};

use super::bootstrap::AppWiring;
use super::gameplay;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match try_run(app) {
        Ok(summary) => {
            info!(
                ticks = summary.ticks,
                hard_resets = summary.hard_resets,
                outcome = ?summary.outcome,
                "run_complete"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}

fn try_run(app: AppWiring) -> Result<RunSummary, AppError> {
    let paths = resolve_app_paths()?;
    info!(
        root = %paths.root.display(),
        stages_dir = %paths.stages_dir.display(),
        stage_file = app.stage_file.as_str(),
        "startup"
    );

    let stage = load_stage(&paths.stage_path(&app.stage_file))?;
    let scene = gameplay::build_stage_scene(stage);
    let mut input = gameplay::Autopilot;
    run_headless(app.config, scene, &mut input, gameplay::build_services())
}
