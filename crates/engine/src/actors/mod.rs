mod boss;
mod player;
mod props;
mod state;
mod walker;

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::app::InputQuery;
use crate::physics::{
    Body, CollisionReactions, Direction, HasReactions, Physics, Rectangle, StageGrid, TileContact,
    TilemapCollision, BLOCK_SIZE,
};

pub use boss::{Boss, BossState};
pub use player::{Player, PlayerState};
pub use props::{Bouncer, Wind};
pub use state::StateMachine;
pub use walker::Walker;

pub mod tags {
    pub const PLAYER: &str = "player";
    pub const ENEMY: &str = "enemy";
    pub const WIND: &str = "wind";
    pub const HEALING: &str = "healing";
    pub const GOAL: &str = "goal";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Placeholder until the scene world assigns a real id.
    pub const UNASSIGNED: EntityId = EntityId(u64::MAX);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }

    /// `None` for zero.
    pub fn from_velocity(vx: f32) -> Option<Self> {
        if vx < 0.0 {
            Some(Facing::Left)
        } else if vx > 0.0 {
            Some(Facing::Right)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    Jump,
    Shoot,
    Hurt,
    Heal,
    Bounce,
    Clear,
    Death,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationCue {
    pub clip: &'static str,
    pub facing: Facing,
}

/// Side effects an entity asks its scene to forward to services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityEvent {
    Sound(SoundCue),
    Animation(AnimationCue),
    Damaged { amount: u32, hp: u32 },
    Healed { amount: u32, hp: u32 },
    Died,
    GoalReached,
    Despawned,
}

/// The parts of an entity every behavior moves: body, components, and the
/// outgoing event and spawn queues.
#[derive(Debug)]
pub struct EntityCore {
    pub body: Body,
    pub physics: Physics,
    pub tilemap: TilemapCollision,
    events: Vec<EntityEvent>,
    spawns: Vec<Entity>,
    animation: Option<AnimationCue>,
    destroyed: bool,
}

impl EntityCore {
    pub fn new(body: Body) -> Self {
        Self {
            body,
            physics: Physics::default(),
            tilemap: TilemapCollision::default(),
            events: Vec::new(),
            spawns: Vec::new(),
            animation: None,
            destroyed: false,
        }
    }

    pub fn emit(&mut self, event: EntityEvent) {
        self.events.push(event);
    }

    pub fn play(&mut self, cue: SoundCue) {
        self.emit(EntityEvent::Sound(cue));
    }

    /// Emits an animation cue only when clip or facing changed.
    pub fn animate(&mut self, clip: &'static str, facing: Facing) {
        let cue = AnimationCue { clip, facing };
        if self.animation != Some(cue) {
            self.animation = Some(cue);
            self.emit(EntityEvent::Animation(cue));
        }
    }

    pub fn spawn(&mut self, entity: Entity) {
        self.spawns.push(entity);
    }

    pub fn destroy(&mut self) {
        self.destroyed = true;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn take_events(&mut self) -> Vec<EntityEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn take_spawns(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.spawns)
    }

    pub fn probe(&self, grid: &StageGrid) -> Vec<TileContact> {
        self.tilemap.contacts(&self.body, grid)
    }

    pub fn stop_at(&mut self, side: Direction) {
        self.tilemap.stop_at(side, &mut self.body);
    }
}

#[derive(Debug, Clone)]
pub enum Behavior {
    Player(Player),
    Boss(Boss),
    Walker(Walker),
    Wind(Wind),
    Bouncer(Bouncer),
    Goal,
}

#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    pub core: EntityCore,
    pub tags: BTreeSet<String>,
    pub reactions: CollisionReactions<Entity>,
    pub behavior: Behavior,
}

impl Entity {
    pub fn new(body: Body, behavior: Behavior, tags: &[&str]) -> Self {
        Self {
            id: EntityId::UNASSIGNED,
            core: EntityCore::new(body),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            reactions: CollisionReactions::default(),
            behavior,
        }
    }

    pub fn with_reactions(mut self, reactions: CollisionReactions<Entity>) -> Self {
        self.reactions = reactions;
        self
    }

    pub fn with_physics(mut self, physics: Physics) -> Self {
        self.core.physics = physics;
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: EntityId) {
        self.id = id;
    }

    pub fn body(&self) -> &Body {
        &self.core.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.core.body
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn destroy(&mut self) {
        self.core.destroy();
    }

    pub fn is_destroyed(&self) -> bool {
        self.core.is_destroyed()
    }

    pub fn as_player(&self) -> Option<&Player> {
        match &self.behavior {
            Behavior::Player(player) => Some(player),
            _ => None,
        }
    }

    pub fn as_boss(&self) -> Option<&Boss> {
        match &self.behavior {
            Behavior::Boss(boss) => Some(boss),
            _ => None,
        }
    }

    /// Damage this entity deals to a player it touches.
    pub fn contact_damage(&self) -> u32 {
        match &self.behavior {
            Behavior::Boss(_) => boss::CONTACT_DAMAGE,
            Behavior::Walker(_) => walker::CONTACT_DAMAGE,
            _ => 0,
        }
    }

    pub fn heal_amount(&self) -> u32 {
        match &self.behavior {
            Behavior::Bouncer(bouncer) => bouncer.heal(),
            _ => 0,
        }
    }

    pub fn tick(&mut self, grid: &StageGrid, input: &dyn InputQuery) {
        if self.core.is_destroyed() {
            return;
        }
        let Entity { core, behavior, .. } = self;
        match behavior {
            Behavior::Player(player) => player.tick(core, grid, input),
            Behavior::Boss(boss) => boss.tick(core, grid),
            Behavior::Walker(walker) => walker.tick(core, grid),
            Behavior::Wind(wind) => wind.tick(core, grid),
            Behavior::Bouncer(bouncer) => bouncer.tick(core, grid),
            Behavior::Goal => core.animate("idle", Facing::Right),
        }
    }
}

impl HasReactions for Entity {
    fn reactions(&self) -> &CollisionReactions<Self> {
        &self.reactions
    }

    fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    fn collision_box(&self) -> Rectangle {
        self.core.body.current_hitbox()
    }
}

/// Spawn-table entries a stage file may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Player,
    Boss,
    Walker,
    Bouncer,
    Goal,
}

impl Archetype {
    pub fn hitbox(self) -> Rectangle {
        match self {
            Archetype::Player => player::stand_hitbox(),
            Archetype::Boss => boss::hitbox(),
            Archetype::Walker => walker::hitbox(),
            Archetype::Bouncer => props::bouncer_hitbox(),
            Archetype::Goal => props::goal_hitbox(),
        }
    }

    pub fn spawn(self, x: f32, y: f32) -> Entity {
        match self {
            Archetype::Player => player::spawn(x, y),
            Archetype::Boss => boss::spawn(x, y),
            Archetype::Walker => walker::spawn(x, y),
            Archetype::Bouncer => props::spawn_bouncer(x, y),
            Archetype::Goal => props::spawn_goal(x, y),
        }
    }

    /// Places the entity so its hitbox bottom sits on the bottom of the cell.
    pub fn spawn_at_cell(self, col: usize, row: usize) -> Entity {
        let x = col as f32 * BLOCK_SIZE;
        let y = (row + 1) as f32 * BLOCK_SIZE - self.hitbox().bottom();
        self.spawn(x, y)
    }
}

/// Ground patrol shared by walkers and the boss: walk at `speed`, turn at
/// walls, and turn at ledges while standing. Returns the facing for the next
/// tick.
pub(crate) fn patrol(
    core: &mut EntityCore,
    grid: &StageGrid,
    facing: Facing,
    speed: f32,
) -> Facing {
    core.body.vx = facing.sign() * speed;
    core.physics.apply_gravity(&mut core.body);

    let contacts = core.probe(grid);
    let grounded = contacts.contains(&TileContact::WallHit {
        side: Direction::Down,
    });
    let mut turn = false;
    for contact in contacts {
        match contact {
            TileContact::WallHit { side } => {
                core.stop_at(side);
                if matches!(side, Direction::Left | Direction::Right) {
                    turn = true;
                }
            }
            TileContact::CliffDetected { .. } => {
                if grounded {
                    core.body.vx = 0.0;
                    turn = true;
                }
            }
            TileContact::DamageHit(_) => {}
        }
    }
    core.physics.apply_velocity(&mut core.body);

    if turn {
        facing.flipped()
    } else {
        facing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::InputState;
    use crate::physics::{Block, BlockTable};

    pub(crate) fn floor_grid(rows: &[&str]) -> StageGrid {
        StageGrid::from_rows(
            rows,
            BlockTable::default()
                .with('#', Block::solid())
                .with('=', Block::platform()),
        )
        .expect("grid")
    }

    #[test]
    fn spawn_at_cell_rests_hitbox_on_cell_bottom() {
        for archetype in [
            Archetype::Player,
            Archetype::Boss,
            Archetype::Walker,
            Archetype::Bouncer,
            Archetype::Goal,
        ] {
            let entity = archetype.spawn_at_cell(2, 3);
            assert_eq!(entity.body().current_hitbox().bottom(), 64.0);
            assert_eq!(entity.id(), EntityId::UNASSIGNED);
        }
    }

    #[test]
    fn archetype_names_deserialize_snake_case() {
        let parsed: Vec<Archetype> =
            serde_json::from_str(r#"["player", "boss", "walker", "bouncer", "goal"]"#)
                .expect("parse");
        assert_eq!(parsed.len(), 5);
        assert_eq!(parsed[1], Archetype::Boss);
    }

    #[test]
    fn animation_cue_is_emitted_only_on_change() {
        let mut core = EntityCore::new(Body::new(0.0, 0.0, Rectangle::new(0.0, 0.0, 8.0, 8.0)));
        core.animate("walk", Facing::Left);
        core.animate("walk", Facing::Left);
        core.animate("walk", Facing::Right);

        assert_eq!(core.take_events().len(), 2);
        assert!(core.take_events().is_empty());
    }

    #[test]
    fn patrol_turns_at_wall_and_ledge() {
        let grid = floor_grid(&["#     ", "####  "]);
        let mut core = EntityCore::new(Body::new(18.0, 0.0, Rectangle::new(0.0, 0.0, 16.0, 16.0)));

        let mut facing = Facing::Left;
        facing = patrol(&mut core, &grid, facing, 4.0);
        assert_eq!(facing, Facing::Right);
        assert_eq!(core.body.x, 16.0);

        for _ in 0..16 {
            facing = patrol(&mut core, &grid, facing, 4.0);
            if facing == Facing::Left {
                break;
            }
        }
        assert_eq!(facing, Facing::Left);
        assert!(core.body.current_hitbox().right() <= 64.0 + 4.0);
        assert_eq!(core.body.y, 0.0);
    }

    #[test]
    fn destroyed_entity_does_not_tick() {
        let grid = floor_grid(&["    ", "    ", "####"]);
        let mut entity = Archetype::Walker.spawn_at_cell(1, 1);
        entity.destroy();
        let before = *entity.body();

        entity.tick(&grid, &InputState::default());

        assert_eq!(*entity.body(), before);
    }
}
