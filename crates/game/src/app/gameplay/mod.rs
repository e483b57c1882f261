use std::collections::HashMap;

use engine::{
    AnimationCue, AnimationService, Archetype, AudioService, EntityEvent, EntityId, HeldKeys,
    InputQuery, InputSource, Key, Scene, SceneCommand, SceneWorld, ServiceError, Services,
    SoundCue, Stage,
};
use tracing::{debug, info, warn};

const AUTOPILOT_JUMP_PERIOD_TICKS: u64 = 48;
const AUTOPILOT_JUMP_HOLD_TICKS: u64 = 14;
const AUTOPILOT_FIRE_PERIOD_TICKS: u64 = 90;

include!("stage_scene.rs");
include!("input_script.rs");
include!("services.rs");

pub(crate) fn build_stage_scene(stage: Stage) -> Box<dyn Scene> {
    Box::new(StageScene::new(stage))
}

pub(crate) fn build_services() -> Services {
    Services::new(
        Box::new(TracingAudio::default()),
        Box::new(TracingAnimation::default()),
    )
}
