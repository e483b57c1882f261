mod input;
mod loop_runner;
mod metrics;
mod scene;
mod services;

pub use input::{HeldKeys, InputQuery, InputState, Key};
pub use loop_runner::{
    run_headless, run_headless_with_metrics, AppError, InputSource, LoopConfig, RunOutcome,
    RunSummary,
};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use scene::{EntityIdAllocator, Scene, SceneCommand, SceneWorld};
pub use services::{
    AnimationService, AudioService, NoAnimation, ServiceError, Services, SilentAudio,
};
