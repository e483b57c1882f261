/// Headless audio: every cue becomes a debug log line.
#[derive(Debug, Default)]
struct TracingAudio {
    ready: bool,
    played: u64,
}

impl AudioService for TracingAudio {
    fn init(&mut self) -> Result<(), ServiceError> {
        self.ready = true;
        info!("audio_ready");
        Ok(())
    }

    fn play(&mut self, cue: SoundCue) {
        if !self.ready {
            warn!(cue = ?cue, "audio_cue_before_init");
            return;
        }
        self.played = self.played.saturating_add(1);
        debug!(cue = ?cue, "sound_cue");
    }

    fn dispose(&mut self) -> Result<(), ServiceError> {
        info!(played = self.played, "audio_disposed");
        self.ready = false;
        Ok(())
    }
}

/// Headless animation: remembers the clip each entity is showing.
#[derive(Debug, Default)]
struct TracingAnimation {
    clips: HashMap<EntityId, AnimationCue>,
}

impl TracingAnimation {
    #[cfg(test)]
    fn clip_of(&self, entity: EntityId) -> Option<&'static str> {
        self.clips.get(&entity).map(|cue| cue.clip)
    }
}

impl AnimationService for TracingAnimation {
    fn init(&mut self) -> Result<(), ServiceError> {
        self.clips.clear();
        info!("animation_ready");
        Ok(())
    }

    fn show(&mut self, entity: EntityId, cue: AnimationCue) {
        debug!(
            entity = entity.0,
            clip = cue.clip,
            facing = ?cue.facing,
            "animation_cue"
        );
        self.clips.insert(entity, cue);
    }

    fn forget(&mut self, entity: EntityId) {
        self.clips.remove(&entity);
    }

    fn dispose(&mut self) -> Result<(), ServiceError> {
        info!(tracked = self.clips.len(), "animation_disposed");
        self.clips.clear();
        Ok(())
    }
}
