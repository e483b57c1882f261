/// Plays one stage. A player death reloads it from scratch; reaching the
/// goal ends the run.
struct StageScene {
    stage: Stage,
    player_id: Option<EntityId>,
    ticks: u64,
    deaths: u32,
}

impl StageScene {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            player_id: None,
            ticks: 0,
            deaths: 0,
        }
    }

    fn resolve_outcome(&mut self, world: &SceneWorld) -> SceneCommand {
        let Some(player_id) = self.player_id else {
            return SceneCommand::None;
        };

        let mut command = SceneCommand::None;
        for (entity, event) in world.events() {
            if *entity != player_id {
                continue;
            }
            match event {
                EntityEvent::Damaged { amount, hp } => {
                    debug!(amount, hp, tick = self.ticks, "player_damaged");
                }
                EntityEvent::Healed { amount, hp } => {
                    debug!(amount, hp, tick = self.ticks, "player_healed");
                }
                EntityEvent::Died => {
                    self.deaths = self.deaths.saturating_add(1);
                    info!(
                        stage = self.stage.name.as_str(),
                        tick = self.ticks,
                        deaths = self.deaths,
                        "player_died"
                    );
                    command = SceneCommand::HardReset;
                }
                EntityEvent::GoalReached => {
                    info!(
                        stage = self.stage.name.as_str(),
                        tick = self.ticks,
                        deaths = self.deaths,
                        "goal_reached"
                    );
                    return SceneCommand::Finish;
                }
                EntityEvent::Sound(_) | EntityEvent::Animation(_) | EntityEvent::Despawned => {}
            }
        }
        command
    }
}

impl Scene for StageScene {
    fn name(&self) -> &str {
        &self.stage.name
    }

    fn load(&mut self, world: &mut SceneWorld) {
        world.set_grid(self.stage.grid.clone());
        for (spawn, entity) in self.stage.spawns.iter().zip(self.stage.spawn_entities()) {
            let id = world.add_entity(entity);
            if spawn.archetype == Archetype::Player && self.player_id.is_none() {
                self.player_id = Some(id);
            }
        }
        self.ticks = 0;
        debug!(
            stage = self.stage.name.as_str(),
            spawn_count = self.stage.spawns.len(),
            deaths = self.deaths,
            "stage_scene_loaded"
        );
    }

    fn update(&mut self, input: &dyn InputQuery, world: &mut SceneWorld) -> SceneCommand {
        self.ticks = self.ticks.saturating_add(1);
        world.tick_entities(input);
        world.check_collisions();
        self.resolve_outcome(world)
    }

    fn unload(&mut self, _world: &mut SceneWorld) {
        self.player_id = None;
    }
}
