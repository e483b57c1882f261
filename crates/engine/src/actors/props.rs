use crate::physics::{
    Body, CollisionReactions, Direction, Physics, Rectangle, StageGrid, TileContact,
};

use super::{tags, Behavior, Entity, EntityCore, Facing, SoundCue};

pub const WIND_SPEED: f32 = 3.0;
pub const WIND_LIFETIME_TICKS: u32 = 90;
pub const BOUNCE_RESTITUTION: f32 = 0.5;
/// Bounces slower than this settle the bouncer on the floor.
pub const REST_SPEED: f32 = 0.5;
pub const HEAL_AMOUNT: u32 = 1;

pub fn wind_hitbox() -> Rectangle {
    Rectangle::new(0.0, 0.0, 8.0, 8.0)
}

pub fn bouncer_hitbox() -> Rectangle {
    Rectangle::new(2.0, 4.0, 12.0, 12.0)
}

pub fn goal_hitbox() -> Rectangle {
    Rectangle::new(0.0, 0.0, 16.0, 16.0)
}

/// Player projectile. Flies straight, ricochets off walls, expires.
#[derive(Debug, Clone)]
pub struct Wind {
    remaining_ticks: u32,
}

pub fn spawn_wind(x: f32, y: f32, vx: f32) -> Entity {
    Entity::new(
        Body::new(x, y, wind_hitbox()).with_velocity(vx, 0.0),
        Behavior::Wind(Wind {
            remaining_ticks: WIND_LIFETIME_TICKS,
        }),
        &[tags::WIND],
    )
    .with_physics(Physics::with_gravity(0.0))
}

impl Wind {
    pub fn remaining_ticks(&self) -> u32 {
        self.remaining_ticks
    }

    pub(crate) fn tick(&mut self, core: &mut EntityCore, grid: &StageGrid) {
        self.remaining_ticks = self.remaining_ticks.saturating_sub(1);
        if self.remaining_ticks == 0 {
            core.destroy();
            return;
        }

        core.physics.apply_gravity(&mut core.body);
        for contact in core.probe(grid) {
            match contact {
                TileContact::WallHit { side } => match side {
                    Direction::Left => core.tilemap.bounce_at_left_wall(&mut core.body),
                    Direction::Right => core.tilemap.bounce_at_right_wall(&mut core.body),
                    Direction::Up | Direction::Down => core.stop_at(side),
                },
                TileContact::CliffDetected { .. } | TileContact::DamageHit(_) => {}
            }
        }
        core.physics.apply_velocity(&mut core.body);

        let facing = Facing::from_velocity(core.body.vx).unwrap_or_default();
        core.animate("wind", facing);
    }
}

/// Healing pickup that drops and bounces until it settles.
#[derive(Debug, Clone)]
pub struct Bouncer {
    heal: u32,
    resting: bool,
}

pub fn spawn_bouncer(x: f32, y: f32) -> Entity {
    Entity::new(
        Body::new(x, y, bouncer_hitbox()),
        Behavior::Bouncer(Bouncer {
            heal: HEAL_AMOUNT,
            resting: false,
        }),
        &[tags::HEALING],
    )
    .with_reactions(
        CollisionReactions::default().with(tags::PLAYER, |me: &mut Entity, _: &mut Entity| {
            me.destroy();
        }),
    )
}

impl Bouncer {
    pub fn heal(&self) -> u32 {
        self.heal
    }

    pub fn is_resting(&self) -> bool {
        self.resting
    }

    pub(crate) fn tick(&mut self, core: &mut EntityCore, grid: &StageGrid) {
        if self.resting {
            core.animate("idle", Facing::Right);
            return;
        }

        core.physics.apply_gravity(&mut core.body);
        for contact in core.probe(grid) {
            match contact {
                TileContact::WallHit { side } => match side {
                    Direction::Down => {
                        core.tilemap
                            .bounce_at_down_wall(&mut core.body, BOUNCE_RESTITUTION);
                        if core.body.vy.abs() < REST_SPEED {
                            core.body.vy = 0.0;
                            core.body.vx = 0.0;
                            self.resting = true;
                        } else {
                            core.play(SoundCue::Bounce);
                        }
                    }
                    Direction::Left => core.tilemap.bounce_at_left_wall(&mut core.body),
                    Direction::Right => core.tilemap.bounce_at_right_wall(&mut core.body),
                    Direction::Up => core.stop_at(side),
                },
                TileContact::CliffDetected { .. } | TileContact::DamageHit(_) => {}
            }
        }
        core.physics.apply_velocity(&mut core.body);
        core.animate("bounce", Facing::Right);
    }
}

pub fn spawn_goal(x: f32, y: f32) -> Entity {
    Entity::new(Body::new(x, y, goal_hitbox()), Behavior::Goal, &[tags::GOAL])
        .with_physics(Physics::with_gravity(0.0))
}
