use thiserror::Error;
use tracing::{info, warn};

use crate::actors::{AnimationCue, EntityEvent, EntityId, SoundCue};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service} service failed to initialize: {reason}")]
    Init {
        service: &'static str,
        reason: String,
    },
    #[error("{service} service failed to dispose: {reason}")]
    Dispose {
        service: &'static str,
        reason: String,
    },
}

pub trait AudioService {
    fn init(&mut self) -> Result<(), ServiceError>;
    fn play(&mut self, cue: SoundCue);
    fn dispose(&mut self) -> Result<(), ServiceError>;
}

pub trait AnimationService {
    fn init(&mut self) -> Result<(), ServiceError>;
    fn show(&mut self, entity: EntityId, cue: AnimationCue);
    /// The entity left the scene.
    fn forget(&mut self, entity: EntityId);
    fn dispose(&mut self) -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
pub struct SilentAudio;

impl AudioService for SilentAudio {
    fn init(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn play(&mut self, _cue: SoundCue) {}

    fn dispose(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct NoAnimation;

impl AnimationService for NoAnimation {
    fn init(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn show(&mut self, _entity: EntityId, _cue: AnimationCue) {}

    fn forget(&mut self, _entity: EntityId) {}

    fn dispose(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Audio and animation collaborators, owned by the runner for one run.
pub struct Services {
    audio: Box<dyn AudioService>,
    animation: Box<dyn AnimationService>,
    initialized: bool,
}

impl Services {
    pub fn new(audio: Box<dyn AudioService>, animation: Box<dyn AnimationService>) -> Self {
        Self {
            audio,
            animation,
            initialized: false,
        }
    }

    pub fn silent() -> Self {
        Self::new(Box::new(SilentAudio), Box::new(NoAnimation))
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Initializes audio, then animation. If animation fails, audio is
    /// disposed again before the error is returned.
    pub fn init(&mut self) -> Result<(), ServiceError> {
        if self.initialized {
            return Ok(());
        }
        self.audio.init()?;
        if let Err(error) = self.animation.init() {
            if let Err(dispose_error) = self.audio.dispose() {
                warn!(error = %dispose_error, "service_dispose_failed");
            }
            return Err(error);
        }
        self.initialized = true;
        info!("services_initialized");
        Ok(())
    }

    /// Failures are logged, not returned; shutdown always runs to the end.
    pub fn dispose(&mut self) {
        if !self.initialized {
            return;
        }
        if let Err(error) = self.animation.dispose() {
            warn!(error = %error, "service_dispose_failed");
        }
        if let Err(error) = self.audio.dispose() {
            warn!(error = %error, "service_dispose_failed");
        }
        self.initialized = false;
    }

    pub fn dispatch(&mut self, entity: EntityId, event: &EntityEvent) {
        match event {
            EntityEvent::Sound(cue) => self.audio.play(*cue),
            EntityEvent::Animation(cue) => self.animation.show(entity, *cue),
            EntityEvent::Despawned => self.animation.forget(entity),
            EntityEvent::Damaged { .. }
            | EntityEvent::Healed { .. }
            | EntityEvent::Died
            | EntityEvent::GoalReached => {}
        }
    }
}
