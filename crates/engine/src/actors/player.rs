use crate::app::{InputQuery, Key};
use crate::physics::{Body, CollisionReactions, Direction, Rectangle, StageGrid, TileContact};

use super::props::{self, WIND_SPEED};
use super::{tags, Behavior, Entity, EntityCore, EntityEvent, Facing, SoundCue, StateMachine};

pub const WALK_SPEED: f32 = 1.5;
pub const JUMP_SPEED: f32 = 4.0;
pub const COYOTE_TICKS: u32 = 6;
pub const STAND_UP_TICKS: u32 = 3;
pub const DAMAGE_TICKS: u32 = 10;
pub const DAMAGE_PIT_TICKS: u32 = 40;
pub const INVINCIBLE_TICKS: u32 = 50;
pub const MAX_HP: u32 = 5;
/// Held action key fires again every this many ticks.
pub const WIND_REPEAT_TICKS: i32 = 20;

const KNOCKBACK_SPEED: f32 = 1.5;
const KNOCKBACK_LIFT: f32 = 2.0;

pub fn stand_hitbox() -> Rectangle {
    Rectangle::new(3.0, 0.0, 10.0, 16.0)
}

/// Crouching keeps the feet in place and lowers the head.
pub fn sit_hitbox() -> Rectangle {
    Rectangle::new(3.0, 6.0, 10.0, 10.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Stand,
    Walk,
    Jump,
    Sit,
    StandUp,
    Damage,
    DamagePit,
}

impl PlayerState {
    fn clip(self) -> &'static str {
        match self {
            PlayerState::Stand => "stand",
            PlayerState::Walk => "walk",
            PlayerState::Jump => "jump",
            PlayerState::Sit => "sit",
            PlayerState::StandUp => "stand_up",
            PlayerState::Damage => "damage",
            PlayerState::DamagePit => "damage_pit",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    state: StateMachine<PlayerState>,
    hp: u32,
    max_hp: u32,
    facing: Facing,
    air_ticks: u32,
    jump_consumed: bool,
    invincible_ticks: u32,
    last_grounded: (f32, f32),
    dead: bool,
    cleared: bool,
}

pub fn spawn(x: f32, y: f32) -> Entity {
    Entity::new(
        Body::new(x, y, stand_hitbox()),
        Behavior::Player(Player::new(x, y)),
        &[tags::PLAYER],
    )
    .with_reactions(reactions())
}

fn reactions() -> CollisionReactions<Entity> {
    CollisionReactions::default()
        .with(tags::ENEMY, |me: &mut Entity, other: &mut Entity| {
            let amount = other.contact_damage();
            let source_x = other.body().current_hitbox().center_x();
            if let Behavior::Player(player) = &mut me.behavior {
                player.take_hit(&mut me.core, amount, Some(source_x), false);
            }
        })
        .with(tags::HEALING, |me: &mut Entity, other: &mut Entity| {
            let amount = other.heal_amount();
            if let Behavior::Player(player) = &mut me.behavior {
                player.heal(&mut me.core, amount);
            }
        })
        .with(tags::GOAL, |me: &mut Entity, _: &mut Entity| {
            if let Behavior::Player(player) = &mut me.behavior {
                player.reach_goal(&mut me.core);
            }
        })
}

impl Player {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            state: StateMachine::new(PlayerState::Stand),
            hp: MAX_HP,
            max_hp: MAX_HP,
            facing: Facing::Right,
            air_ticks: 0,
            jump_consumed: false,
            invincible_ticks: 0,
            last_grounded: (x, y),
            dead: false,
            cleared: false,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state.current()
    }

    pub fn time_in_state(&self) -> u32 {
        self.state.time_in_state()
    }

    pub fn hp(&self) -> u32 {
        self.hp
    }

    pub fn max_hp(&self) -> u32 {
        self.max_hp
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn has_cleared(&self) -> bool {
        self.cleared
    }

    pub fn is_invincible(&self) -> bool {
        self.invincible_ticks > 0
    }

    pub fn last_grounded(&self) -> (f32, f32) {
        self.last_grounded
    }

    pub fn tick(&mut self, core: &mut EntityCore, grid: &StageGrid, input: &dyn InputQuery) {
        if self.dead {
            return;
        }
        self.state.tick();
        self.invincible_ticks = self.invincible_ticks.saturating_sub(1);

        match self.state.current() {
            PlayerState::Stand | PlayerState::Walk => self.ground_control(core, input),
            PlayerState::Jump => self.air_control(core, input),
            PlayerState::Sit => {
                core.body.vx = 0.0;
                if !input.is_key_down(Key::Down) {
                    core.body.hitbox = stand_hitbox();
                    self.state.transition(PlayerState::StandUp);
                }
            }
            PlayerState::StandUp => {
                core.body.vx = 0.0;
                if self.state.time_in_state() >= STAND_UP_TICKS {
                    self.state.transition(PlayerState::Stand);
                }
            }
            PlayerState::Damage => {
                if self.state.time_in_state() >= DAMAGE_TICKS {
                    core.body.vx = 0.0;
                    self.state.transition(PlayerState::Stand);
                }
            }
            PlayerState::DamagePit => {
                core.body.vx = 0.0;
                core.body.vy = 0.0;
                if self.state.time_in_state() >= DAMAGE_PIT_TICKS {
                    (core.body.x, core.body.y) = self.last_grounded;
                    self.state.transition(PlayerState::Stand);
                }
                core.animate(self.state.current().clip(), self.facing);
                return;
            }
        }

        core.physics.apply_gravity(&mut core.body);
        let mut grounded = false;
        let mut tile_hit = None;
        for contact in core.probe(grid) {
            match contact {
                TileContact::WallHit { side } => {
                    core.stop_at(side);
                    grounded |= side == Direction::Down;
                }
                TileContact::CliffDetected { .. } => {}
                TileContact::DamageHit(hit) => {
                    tile_hit.get_or_insert(hit);
                }
            }
        }
        let resting_at = (core.body.x, core.body.y);
        core.physics.apply_velocity(&mut core.body);

        if grounded {
            self.air_ticks = 0;
            self.jump_consumed = false;
            if tile_hit.is_none() {
                self.last_grounded = resting_at;
            }
            if self.state.is(PlayerState::Jump) {
                self.state.transition(PlayerState::Stand);
            }
        } else {
            self.air_ticks = self.air_ticks.saturating_add(1);
            // Still STAND/WALK until the coyote window runs out.
            if self.air_ticks > COYOTE_TICKS
                && matches!(
                    self.state.current(),
                    PlayerState::Stand | PlayerState::Walk
                )
            {
                self.state.transition(PlayerState::Jump);
            }
        }

        if let Some(hit) = tile_hit {
            self.take_hit(core, hit.amount, None, hit.is_pit);
        }
        if !self.dead {
            core.animate(self.state.current().clip(), self.facing);
        }
    }

    /// Returns `false` when the hit was ignored (dead or invincible).
    pub fn take_hit(
        &mut self,
        core: &mut EntityCore,
        amount: u32,
        source_x: Option<f32>,
        is_pit: bool,
    ) -> bool {
        if self.dead || self.invincible_ticks > 0 {
            return false;
        }
        self.hp = self.hp.saturating_sub(amount);
        self.invincible_ticks = INVINCIBLE_TICKS;
        core.emit(EntityEvent::Damaged {
            amount,
            hp: self.hp,
        });
        if self.hp == 0 {
            self.die(core);
            return true;
        }

        core.play(SoundCue::Hurt);
        core.body.hitbox = stand_hitbox();
        if is_pit {
            core.body.vx = 0.0;
            core.body.vy = 0.0;
            self.state.transition(PlayerState::DamagePit);
        } else {
            let center = core.body.current_hitbox().center_x();
            let away = match source_x {
                Some(source) if source > center => Facing::Left,
                Some(_) => Facing::Right,
                None => self.facing.flipped(),
            };
            core.body.vx = away.sign() * KNOCKBACK_SPEED;
            core.body.vy = -KNOCKBACK_LIFT;
            self.state.transition(PlayerState::Damage);
        }
        true
    }

    pub fn heal(&mut self, core: &mut EntityCore, amount: u32) {
        if self.dead || amount == 0 {
            return;
        }
        self.hp = self.hp.saturating_add(amount).min(self.max_hp);
        core.emit(EntityEvent::Healed {
            amount,
            hp: self.hp,
        });
        core.play(SoundCue::Heal);
    }

    /// Fires once per stage.
    pub fn reach_goal(&mut self, core: &mut EntityCore) -> bool {
        if self.dead || self.cleared {
            return false;
        }
        self.cleared = true;
        core.emit(EntityEvent::GoalReached);
        core.play(SoundCue::Clear);
        true
    }

    fn die(&mut self, core: &mut EntityCore) {
        self.dead = true;
        core.body.vx = 0.0;
        core.body.vy = 0.0;
        core.emit(EntityEvent::Died);
        core.play(SoundCue::Death);
        core.animate("dead", self.facing);
    }

    fn ground_control(&mut self, core: &mut EntityCore, input: &dyn InputQuery) {
        let direction = self.steer(core, input);
        if direction.is_some() {
            if !self.state.is(PlayerState::Walk) {
                self.state.transition(PlayerState::Walk);
            }
        } else if self.state.is(PlayerState::Walk) {
            self.state.transition(PlayerState::Stand);
        }

        if input.is_key_down(Key::Down) && self.air_ticks == 0 {
            core.body.vx = 0.0;
            core.body.hitbox = sit_hitbox();
            self.state.transition(PlayerState::Sit);
            return;
        }
        self.try_jump(core, input);
        self.try_fire(core, input);
    }

    fn air_control(&mut self, core: &mut EntityCore, input: &dyn InputQuery) {
        self.steer(core, input);
        self.try_jump(core, input);
        self.try_fire(core, input);
    }

    fn steer(&mut self, core: &mut EntityCore, input: &dyn InputQuery) -> Option<Facing> {
        let left = input.is_key_down(Key::Left);
        let right = input.is_key_down(Key::Right);
        let direction = match (left, right) {
            (true, false) => Some(Facing::Left),
            (false, true) => Some(Facing::Right),
            _ => None,
        };
        core.body.vx = direction.map_or(0.0, |facing| facing.sign() * WALK_SPEED);
        if let Some(facing) = direction {
            self.facing = facing;
        }
        direction
    }

    fn try_jump(&mut self, core: &mut EntityCore, input: &dyn InputQuery) {
        if !input.is_key_pressed(Key::Jump)
            || self.air_ticks > COYOTE_TICKS
            || self.jump_consumed
        {
            return;
        }
        core.body.vy = -JUMP_SPEED;
        self.jump_consumed = true;
        self.state.transition(PlayerState::Jump);
        core.play(SoundCue::Jump);
    }

    fn try_fire(&mut self, core: &mut EntityCore, input: &dyn InputQuery) {
        let held = input.get_key(Key::Action);
        if held < 1 || (held - 1) % WIND_REPEAT_TICKS != 0 {
            return;
        }
        let hitbox = core.body.current_hitbox();
        let wind_box = props::wind_hitbox();
        let x = match self.facing {
            Facing::Right => hitbox.right(),
            Facing::Left => hitbox.left() - wind_box.width(),
        };
        let y = hitbox.top() + (hitbox.height() - wind_box.height()) * 0.5;
        core.spawn(props::spawn_wind(x, y, self.facing.sign() * WIND_SPEED));
        core.play(SoundCue::Shoot);
    }
}
