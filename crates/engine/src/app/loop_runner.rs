use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::actors::EntityEvent;
use crate::content::StageLoadError;
use crate::StartupError;

use super::metrics::LoopStats;
use super::scene::SceneMachine;
use super::services::{ServiceError, Services};
use super::{HeldKeys, InputState, MetricsHandle, Scene, SceneCommand};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    /// Stop after this many simulation ticks.
    pub max_ticks: Option<u64>,
    /// Pace ticks against the wall clock. When off, ticks run back to back.
    pub realtime: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_ticks: None,
            realtime: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Stage(#[from] StageLoadError),
}

/// Supplies the held keys for each simulation tick.
pub trait InputSource {
    /// Keys held during `tick`. `None` ends the run.
    fn poll(&mut self, tick: u64) -> Option<HeldKeys>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Finished,
    TickLimit,
    InputClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub hard_resets: u32,
    pub outcome: RunOutcome,
}

pub fn run_headless(
    config: LoopConfig,
    scene: Box<dyn Scene>,
    input: &mut dyn InputSource,
    services: Services,
) -> Result<RunSummary, AppError> {
    let metrics_handle = MetricsHandle::default();
    run_headless_with_metrics(config, scene, input, services, metrics_handle)
}

pub fn run_headless_with_metrics(
    config: LoopConfig,
    scene: Box<dyn Scene>,
    input: &mut dyn InputSource,
    mut services: Services,
    metrics_handle: MetricsHandle,
) -> Result<RunSummary, AppError> {
    services.init()?;

    let mut scenes = SceneMachine::new(scene);
    scenes.load();
    scenes.apply_pending();
    info!(
        scene = scenes.scene_name(),
        entity_count = scenes.world().entity_count(),
        "scene_loaded"
    );

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        max_ticks = ?config.max_ticks,
        realtime = config.realtime,
        "loop_config"
    );

    let mut input_state = InputState::default();
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut loop_stats = LoopStats::new(metrics_log_interval, Instant::now());
    let mut ticks = 0u64;
    let mut hard_resets = 0u32;

    let outcome = 'run: loop {
        let frame_dt = if config.realtime {
            let now = Instant::now();
            let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
            last_frame_instant = now;
            clamp_frame_delta(raw_frame_dt, max_frame_delta)
        } else {
            fixed_dt
        };
        accumulator = accumulator.saturating_add(frame_dt);

        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        for _ in 0..step_plan.ticks_to_run {
            if config.max_ticks.is_some_and(|max| ticks >= max) {
                break 'run RunOutcome::TickLimit;
            }
            let Some(held) = input.poll(ticks) else {
                break 'run RunOutcome::InputClosed;
            };

            let tick_start = Instant::now();
            input_state.advance(held);
            let command = scenes.update(&input_state);
            scenes.apply_pending();
            for (entity, event) in scenes.world_mut().drain_events() {
                services.dispatch(entity, &event);
            }
            ticks = ticks.saturating_add(1);
            loop_stats.record_tick(tick_start.elapsed());

            match command {
                SceneCommand::None => {}
                SceneCommand::HardReset => {
                    for entity in scenes.world().entities() {
                        services.dispatch(entity.id(), &EntityEvent::Despawned);
                    }
                    scenes.hard_reset();
                    scenes.apply_pending();
                    input_state.reset();
                    hard_resets = hard_resets.saturating_add(1);
                    loop_stats.record_hard_reset();
                    info!(
                        scene = scenes.scene_name(),
                        entity_count = scenes.world().entity_count(),
                        tick = ticks,
                        "scene_hard_reset"
                    );
                }
                SceneCommand::Finish => break 'run RunOutcome::Finished,
            }
        }
        accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            loop_stats.record_clamp(step_plan.dropped_backlog);
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }

        if let Some(snapshot) = loop_stats.flush(Instant::now(), scenes.world().entity_count()) {
            metrics_handle.publish(snapshot);
            info!(
                tps = snapshot.tps,
                mean_tick_ms = snapshot.mean_tick_ms,
                worst_tick_ms = snapshot.worst_tick_ms,
                clamped_frames = snapshot.clamped_frames,
                dropped_backlog_ms = snapshot.dropped_backlog_ms,
                hard_resets = snapshot.hard_resets,
                entity_count = snapshot.entity_count,
                scene = scenes.scene_name(),
                "loop_metrics"
            );
        }

        if config.realtime {
            let wait = fixed_dt.saturating_sub(accumulator);
            if wait > Duration::ZERO {
                thread::sleep(wait);
            }
        }
    };

    scenes.shutdown();
    services.dispose();
    info!(ticks, hard_resets, outcome = ?outcome, "shutdown");

    Ok(RunSummary {
        ticks,
        hard_resets,
        outcome,
    })
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::actors::{Archetype, EntityId, SoundCue};
    use crate::app::{AnimationService, AudioService, InputQuery, Key, SceneWorld};
    use crate::physics::{Block, BlockTable, StageGrid};

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        let raw_frame_dt = Duration::from_millis(600);

        assert_eq!(
            clamp_frame_delta(raw_frame_dt, max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(48), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn plan_sim_steps_keeps_partial_tick() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(20), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 1);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(4));
    }

    #[test]
    fn zero_durations_fall_back() {
        assert_eq!(
            normalize_non_zero_duration(Duration::ZERO, Duration::from_secs(1)),
            Duration::from_secs(1)
        );
        assert_eq!(
            normalize_non_zero_duration(Duration::from_millis(5), Duration::from_secs(1)),
            Duration::from_millis(5)
        );
    }

    struct Scripted {
        frames: Vec<HeldKeys>,
    }

    impl InputSource for Scripted {
        fn poll(&mut self, tick: u64) -> Option<HeldKeys> {
            self.frames.get(tick as usize).copied()
        }
    }

    struct Idle;

    impl InputSource for Idle {
        fn poll(&mut self, _tick: u64) -> Option<HeldKeys> {
            Some(HeldKeys::default())
        }
    }

    /// Player on a floor. Finishes when Action is pressed, resets on Jump.
    struct FloorScene {
        loads: Rc<RefCell<u32>>,
    }

    impl Scene for FloorScene {
        fn name(&self) -> &str {
            "floor"
        }

        fn load(&mut self, world: &mut SceneWorld) {
            *self.loads.borrow_mut() += 1;
            let blocks = BlockTable::default().with('#', Block::solid());
            let grid = StageGrid::from_rows(&["    ", "    ", "####"], blocks).expect("grid");
            world.set_grid(grid);
            world.add_entity(Archetype::Player.spawn_at_cell(1, 1));
        }

        fn update(&mut self, input: &dyn InputQuery, world: &mut SceneWorld) -> SceneCommand {
            world.tick_entities(input);
            world.check_collisions();
            if input.is_key_pressed(Key::Action) {
                SceneCommand::Finish
            } else if input.is_key_pressed(Key::Down) {
                SceneCommand::HardReset
            } else {
                SceneCommand::None
            }
        }

        fn unload(&mut self, _world: &mut SceneWorld) {}
    }

    fn fast_config(max_ticks: Option<u64>) -> LoopConfig {
        LoopConfig {
            max_ticks,
            realtime: false,
            ..LoopConfig::default()
        }
    }

    fn floor_scene() -> (Box<dyn Scene>, Rc<RefCell<u32>>) {
        let loads = Rc::new(RefCell::new(0));
        (
            Box::new(FloorScene {
                loads: loads.clone(),
            }),
            loads,
        )
    }

    #[test]
    fn headless_run_stops_at_tick_limit() {
        let (scene, loads) = floor_scene();

        let summary = run_headless(fast_config(Some(30)), scene, &mut Idle, Services::silent())
            .expect("run");

        assert_eq!(summary.ticks, 30);
        assert_eq!(summary.outcome, RunOutcome::TickLimit);
        assert_eq!(*loads.borrow(), 1);
    }

    #[test]
    fn headless_run_ends_when_input_runs_out() {
        let (scene, _) = floor_scene();
        let mut input = Scripted {
            frames: vec![HeldKeys::default(); 12],
        };

        let summary =
            run_headless(fast_config(None), scene, &mut input, Services::silent()).expect("run");

        assert_eq!(summary.ticks, 12);
        assert_eq!(summary.outcome, RunOutcome::InputClosed);
    }

    #[test]
    fn finish_command_ends_run_and_hard_reset_reloads() {
        let (scene, loads) = floor_scene();
        let mut frames = vec![HeldKeys::default(); 4];
        frames.push(HeldKeys::default().with(Key::Down));
        frames.extend(vec![HeldKeys::default(); 3]);
        frames.push(HeldKeys::default().with(Key::Action));
        frames.extend(vec![HeldKeys::default(); 10]);
        let mut input = Scripted { frames };

        let summary =
            run_headless(fast_config(None), scene, &mut input, Services::silent()).expect("run");

        assert_eq!(summary.outcome, RunOutcome::Finished);
        assert_eq!(summary.ticks, 9);
        assert_eq!(summary.hard_resets, 1);
        assert_eq!(*loads.borrow(), 2);
    }

    struct CountingAudio {
        jumps: Rc<RefCell<u32>>,
    }

    impl AudioService for CountingAudio {
        fn init(&mut self) -> Result<(), ServiceError> {
            Ok(())
        }

        fn play(&mut self, cue: SoundCue) {
            if cue == SoundCue::Jump {
                *self.jumps.borrow_mut() += 1;
            }
        }

        fn dispose(&mut self) -> Result<(), ServiceError> {
            Ok(())
        }
    }

    struct FailingAnimation;

    impl AnimationService for FailingAnimation {
        fn init(&mut self) -> Result<(), ServiceError> {
            Err(ServiceError::Init {
                service: "animation",
                reason: "unavailable".to_string(),
            })
        }

        fn show(&mut self, _entity: EntityId, _cue: crate::actors::AnimationCue) {}

        fn forget(&mut self, _entity: EntityId) {}

        fn dispose(&mut self) -> Result<(), ServiceError> {
            Ok(())
        }
    }

    #[test]
    fn entity_cues_reach_services() {
        let (scene, _) = floor_scene();
        let jumps = Rc::new(RefCell::new(0));
        let services = Services::new(
            Box::new(CountingAudio {
                jumps: jumps.clone(),
            }),
            Box::new(crate::app::NoAnimation),
        );
        let mut frames = vec![HeldKeys::default(); 3];
        frames.push(HeldKeys::default().with(Key::Jump));
        frames.extend(vec![HeldKeys::default(); 5]);
        let mut input = Scripted { frames };

        run_headless(fast_config(None), scene, &mut input, services).expect("run");

        assert_eq!(*jumps.borrow(), 1);
    }

    #[test]
    fn metrics_handle_receives_window_snapshots() {
        let (scene, _) = floor_scene();
        let handle = MetricsHandle::default();
        let config = LoopConfig {
            metrics_log_interval: Duration::from_nanos(1),
            ..fast_config(Some(20))
        };

        run_headless_with_metrics(config, scene, &mut Idle, Services::silent(), handle.clone())
            .expect("run");

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.entity_count, 1);
        assert_eq!(snapshot.clamped_frames, 0);
    }

    #[test]
    fn service_init_failure_aborts_before_scene_load() {
        let (scene, loads) = floor_scene();
        let services = Services::new(Box::new(crate::app::SilentAudio), Box::new(FailingAnimation));

        let err = run_headless(fast_config(Some(5)), scene, &mut Idle, services)
            .expect_err("init should fail");

        assert!(matches!(err, AppError::Service(ServiceError::Init { .. })));
        assert_eq!(*loads.borrow(), 0);
    }
}
