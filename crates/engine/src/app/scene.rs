use tracing::debug;

use crate::actors::{Entity, EntityEvent, EntityId};
use crate::physics::{resolve_pair, StageGrid};

use super::input::InputQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    /// Tear the scene down and load it again from scratch.
    HardReset,
    /// Stop the run; the stage is complete.
    Finish,
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Entities plus the stage grid they move through.
///
/// Additions and removals are queued and only take effect in
/// [`SceneWorld::apply_pending`], so the entity list never changes while a
/// tick or the collision pass is iterating it.
#[derive(Debug, Default)]
pub struct SceneWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
    grid: Option<StageGrid>,
    outbox: Vec<(EntityId, EntityEvent)>,
}

impl SceneWorld {
    pub fn add_entity(&mut self, mut entity: Entity) -> EntityId {
        let id = self.allocator.allocate();
        entity.assign_id(id);
        self.pending_spawns.push(entity);
        id
    }

    /// Returns `false` when no live or pending entity has this id.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        let exists = self.entities.iter().any(|entity| entity.id() == id)
            || self.pending_spawns.iter().any(|entity| entity.id() == id);
        if exists {
            self.pending_despawns.push(id);
        }
        exists
    }

    pub fn apply_pending(&mut self) {
        let requested: Vec<Entity> = self
            .entities
            .iter_mut()
            .flat_map(|entity| entity.core.take_spawns())
            .collect();
        for entity in requested {
            self.add_entity(entity);
        }

        self.pending_despawns.extend(
            self.entities
                .iter()
                .filter(|entity| entity.is_destroyed())
                .map(Entity::id),
        );

        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort_by_key(|id| id.0);
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            let outbox = &mut self.outbox;
            let is_pending = |id: EntityId| pending.binary_search_by_key(&id.0, |p| p.0).is_ok();
            self.entities.retain(|entity| {
                if is_pending(entity.id()) {
                    outbox.push((entity.id(), EntityEvent::Despawned));
                    debug!(entity = entity.id().0, "entity_despawned");
                    false
                } else {
                    true
                }
            });
            self.pending_spawns.retain(|entity| !is_pending(entity.id()));
            self.pending_despawns.clear();
        }

        for entity in self.pending_spawns.drain(..) {
            debug!(
                entity = entity.id().0,
                x = entity.body().x,
                y = entity.body().y,
                "entity_spawned"
            );
            self.entities.push(entity);
        }
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
        self.outbox.clear();
        self.grid = None;
    }

    pub fn set_grid(&mut self, grid: StageGrid) {
        self.grid = Some(grid);
    }

    pub fn grid(&self) -> Option<&StageGrid> {
        self.grid.as_ref()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id() == id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id() == id)
    }

    /// Runs one tick for every live entity in insertion order. Without a
    /// grid nothing moves.
    pub fn tick_entities(&mut self, input: &dyn InputQuery) {
        let Some(grid) = self.grid.as_ref() else {
            return;
        };
        for entity in &mut self.entities {
            entity.tick(grid, input);
        }
        self.collect_events();
    }

    /// Pairwise overlap pass. Each overlapping pair runs the reactions of
    /// both sides; entities destroyed earlier in the pass are skipped.
    /// Returns the number of overlapping pairs.
    pub fn check_collisions(&mut self) -> usize {
        let mut overlaps = 0;
        for index in 0..self.entities.len() {
            let (head, tail) = self.entities.split_at_mut(index + 1);
            let current = &mut head[index];
            for other in tail.iter_mut() {
                if current.is_destroyed() || other.is_destroyed() {
                    continue;
                }
                if resolve_pair(current, other) {
                    overlaps += 1;
                }
            }
        }
        self.collect_events();
        overlaps
    }

    /// Events raised since the last drain, in entity order.
    pub fn events(&self) -> &[(EntityId, EntityEvent)] {
        &self.outbox
    }

    pub fn drain_events(&mut self) -> Vec<(EntityId, EntityEvent)> {
        self.collect_events();
        std::mem::take(&mut self.outbox)
    }

    fn collect_events(&mut self) {
        for entity in &mut self.entities {
            let id = entity.id();
            self.outbox
                .extend(entity.core.take_events().into_iter().map(|event| (id, event)));
        }
    }
}

pub trait Scene {
    fn name(&self) -> &str;
    fn load(&mut self, world: &mut SceneWorld);
    fn update(&mut self, input: &dyn InputQuery, world: &mut SceneWorld) -> SceneCommand;
    fn unload(&mut self, world: &mut SceneWorld);
}

pub(crate) struct SceneMachine {
    scene: Box<dyn Scene>,
    world: SceneWorld,
    is_loaded: bool,
}

impl SceneMachine {
    pub(crate) fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            world: SceneWorld::default(),
            is_loaded: false,
        }
    }

    pub(crate) fn scene_name(&self) -> &str {
        self.scene.name()
    }

    pub(crate) fn load(&mut self) {
        if self.is_loaded {
            return;
        }
        self.scene.load(&mut self.world);
        self.is_loaded = true;
    }

    pub(crate) fn update(&mut self, input: &dyn InputQuery) -> SceneCommand {
        self.scene.update(input, &mut self.world)
    }

    pub(crate) fn apply_pending(&mut self) {
        self.world.apply_pending();
    }

    pub(crate) fn world(&self) -> &SceneWorld {
        &self.world
    }

    pub(crate) fn world_mut(&mut self) -> &mut SceneWorld {
        &mut self.world
    }

    pub(crate) fn hard_reset(&mut self) {
        if self.is_loaded {
            self.scene.unload(&mut self.world);
        }
        self.world.clear();
        self.scene.load(&mut self.world);
        self.is_loaded = true;
    }

    pub(crate) fn shutdown(&mut self) {
        if self.is_loaded {
            self.scene.unload(&mut self.world);
            self.world.clear();
            self.is_loaded = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::Archetype;
    use crate::app::{HeldKeys, InputState, Key};
    use crate::physics::{Block, BlockTable};

    fn stage_grid() -> StageGrid {
        StageGrid::from_rows(
            &["          ", "          ", "##########"],
            BlockTable::default().with('#', Block::solid()),
        )
        .expect("grid")
    }

    struct TestScene {
        spawn_count: usize,
    }

    impl Scene for TestScene {
        fn name(&self) -> &str {
            "test"
        }

        fn load(&mut self, world: &mut SceneWorld) {
            world.set_grid(stage_grid());
            for index in 0..self.spawn_count {
                world.add_entity(Archetype::Walker.spawn_at_cell(index * 2, 1));
            }
            world.apply_pending();
        }

        fn update(&mut self, input: &dyn InputQuery, world: &mut SceneWorld) -> SceneCommand {
            world.tick_entities(input);
            world.check_collisions();
            SceneCommand::None
        }

        fn unload(&mut self, _world: &mut SceneWorld) {}
    }

    #[test]
    fn allocator_never_reuses_ids() {
        let mut allocator = EntityIdAllocator::default();
        let first = allocator.allocate();
        let second = allocator.allocate();
        let third = allocator.allocate();

        assert_eq!(first.0, 0);
        assert_eq!(second.0, 1);
        assert_eq!(third.0, 2);
    }

    #[test]
    fn scene_world_add_and_remove_updates_count() {
        let mut world = SceneWorld::default();
        let id = world.add_entity(Archetype::Goal.spawn(0.0, 0.0));
        assert_eq!(world.entity_count(), 0);
        world.apply_pending();
        assert_eq!(world.entity_count(), 1);

        assert!(world.remove_entity(id));
        world.apply_pending();
        assert_eq!(world.entity_count(), 0);
        assert!(!world.remove_entity(id));
    }

    #[test]
    fn duplicate_pending_removals_are_safe_and_idempotent() {
        let mut world = SceneWorld::default();
        let doomed = world.add_entity(Archetype::Goal.spawn(0.0, 0.0));
        let survivor = world.add_entity(Archetype::Goal.spawn(32.0, 0.0));
        world.apply_pending();

        assert!(world.remove_entity(doomed));
        assert!(world.remove_entity(doomed));
        assert!(world.remove_entity(doomed));
        world.apply_pending();

        assert_eq!(world.entity_count(), 1);
        assert!(world.find_entity(doomed).is_none());
        assert!(world.find_entity(survivor).is_some());
        let despawned = world
            .drain_events()
            .into_iter()
            .filter(|(_, event)| *event == EntityEvent::Despawned)
            .count();
        assert_eq!(despawned, 1);
    }

    #[test]
    fn removing_a_pending_spawn_cancels_it() {
        let mut world = SceneWorld::default();
        let id = world.add_entity(Archetype::Goal.spawn(0.0, 0.0));
        assert!(world.remove_entity(id));
        world.apply_pending();
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn tick_without_grid_moves_nothing() {
        let mut world = SceneWorld::default();
        world.add_entity(Archetype::Walker.spawn(16.0, 0.0));
        world.apply_pending();

        world.tick_entities(&InputState::default());

        assert_eq!(world.entities()[0].body().x, 16.0);
    }

    #[test]
    fn collisions_run_reactions_on_both_sides() {
        let mut world = SceneWorld::default();
        let player = world.add_entity(Archetype::Player.spawn(0.0, 0.0));
        let bouncer = world.add_entity(Archetype::Bouncer.spawn(0.0, 0.0));
        world.apply_pending();
        {
            let entity = world.find_entity_mut(player).expect("player");
            let Entity { core, behavior, .. } = entity;
            let crate::actors::Behavior::Player(state) = behavior else {
                panic!("not a player");
            };
            assert!(state.take_hit(core, 1, None, false));
        }

        assert_eq!(world.check_collisions(), 1);
        world.apply_pending();

        assert!(world.find_entity(bouncer).is_none());
        let state = world
            .find_entity(player)
            .and_then(Entity::as_player)
            .expect("player");
        assert_eq!(state.hp(), state.max_hp());
    }

    #[test]
    fn spawn_requests_join_after_apply_pending() {
        let mut world = SceneWorld::default();
        world.set_grid(stage_grid());
        world.add_entity(Archetype::Player.spawn_at_cell(1, 1));
        world.apply_pending();

        let mut input = InputState::default();
        input.advance(HeldKeys::default().with(Key::Action));
        world.tick_entities(&input);
        world.check_collisions();
        assert_eq!(world.entity_count(), 1);

        world.apply_pending();
        assert_eq!(world.entity_count(), 2);
        assert!(world.entities()[1].has_tag(crate::actors::tags::WIND));
    }

    #[test]
    fn hard_reset_reloads_scene_from_scratch() {
        let mut machine = SceneMachine::new(Box::new(TestScene { spawn_count: 2 }));
        machine.load();
        let first_ids: Vec<EntityId> = machine.world().entities().iter().map(Entity::id).collect();
        let input = InputState::default();
        for _ in 0..5 {
            machine.update(&input);
            machine.apply_pending();
        }
        let moved_x = machine.world().entities()[0].body().x;

        machine.hard_reset();

        assert_eq!(machine.world().entity_count(), 2);
        assert_ne!(machine.world().entities()[0].body().x, moved_x);
        let reset_ids: Vec<EntityId> = machine.world().entities().iter().map(Entity::id).collect();
        assert!(reset_ids.iter().all(|id| !first_ids.contains(id)));
    }

    #[test]
    fn load_is_only_applied_once() {
        let mut machine = SceneMachine::new(Box::new(TestScene { spawn_count: 1 }));
        machine.load();
        machine.load();
        assert_eq!(machine.world().entity_count(), 1);

        machine.shutdown();
        assert_eq!(machine.world().entity_count(), 0);
    }
}
