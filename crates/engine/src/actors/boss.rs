use crate::physics::{Body, CollisionReactions, Direction, Rectangle, StageGrid, TileContact};

use super::{patrol, tags, Behavior, Entity, EntityCore, Facing, StateMachine};

pub const WALK_SPEED: f32 = 0.5;
pub const RUN_SPEED: f32 = 2.0;
pub const HIT_WIND_TICKS: u32 = 12;
pub const RUN_TICKS: u32 = 24;
pub const CONTACT_DAMAGE: u32 = 2;

pub fn hitbox() -> Rectangle {
    Rectangle::new(2.0, 0.0, 28.0, 32.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BossState {
    Walk,
    HitWind,
    Run,
}

/// Heavy patrol enemy. A wind hit trades velocities with the projectile,
/// then the boss charges back along its original heading.
#[derive(Debug, Clone)]
pub struct Boss {
    state: StateMachine<BossState>,
    direction: Facing,
}

pub fn spawn(x: f32, y: f32) -> Entity {
    Entity::new(
        Body::new(x, y, hitbox()),
        Behavior::Boss(Boss::new(Facing::Left)),
        &[tags::ENEMY],
    )
    .with_reactions(CollisionReactions::default().with(
        tags::WIND,
        |me: &mut Entity, wind: &mut Entity| {
            if let Behavior::Boss(boss) = &mut me.behavior {
                boss.hit_by_wind(&mut me.core.body, &mut wind.core.body);
            }
        },
    ))
}

impl Boss {
    pub fn new(direction: Facing) -> Self {
        Self {
            state: StateMachine::new(BossState::Walk),
            direction,
        }
    }

    pub fn state(&self) -> BossState {
        self.state.current()
    }

    pub fn time_in_state(&self) -> u32 {
        self.state.time_in_state()
    }

    /// Patrol heading; survives the knockback so the charge goes the
    /// original way.
    pub fn direction(&self) -> Facing {
        self.direction
    }

    /// Takes the wind's velocity and sends the wind back the way it came.
    /// Ignored while still reeling from a previous hit.
    pub fn hit_by_wind(&mut self, body: &mut Body, wind: &mut Body) -> bool {
        if self.state.is(BossState::HitWind) {
            return false;
        }
        body.vx = wind.vx;
        body.vy = wind.vy;
        wind.vx = -wind.vx;
        wind.vy = -wind.vy;
        self.state.transition(BossState::HitWind);
        true
    }

    pub(crate) fn tick(&mut self, core: &mut EntityCore, grid: &StageGrid) {
        self.state.tick();

        match self.state.current() {
            BossState::Walk => {
                self.direction = patrol(core, grid, self.direction, WALK_SPEED);
            }
            BossState::HitWind => {
                if self.state.time_in_state() >= HIT_WIND_TICKS {
                    self.state.transition(BossState::Run);
                    self.charge(core, grid);
                } else {
                    drift(core, grid);
                }
            }
            BossState::Run => {
                if self.state.time_in_state() >= RUN_TICKS {
                    self.state.transition(BossState::Walk);
                    self.direction = patrol(core, grid, self.direction, WALK_SPEED);
                } else {
                    self.charge(core, grid);
                }
            }
        }

        let (clip, facing) = match self.state.current() {
            BossState::Walk => ("walk", self.direction),
            BossState::HitWind => (
                "hit_wind",
                Facing::from_velocity(core.body.vx).unwrap_or(self.direction),
            ),
            BossState::Run => ("run", self.direction),
        };
        core.animate(clip, facing);
    }

    fn charge(&mut self, core: &mut EntityCore, grid: &StageGrid) {
        core.body.vx = self.direction.sign() * RUN_SPEED;
        core.physics.apply_gravity(&mut core.body);

        let contacts = core.probe(grid);
        let grounded = contacts.contains(&TileContact::WallHit {
            side: Direction::Down,
        });
        for contact in contacts {
            match contact {
                TileContact::WallHit { side } => core.stop_at(side),
                TileContact::CliffDetected { .. } => {
                    if grounded {
                        core.body.vx = 0.0;
                    }
                }
                TileContact::DamageHit(_) => {}
            }
        }
        core.physics.apply_velocity(&mut core.body);
    }
}

/// Carries stolen momentum; walls reflect it without touching the heading.
fn drift(core: &mut EntityCore, grid: &StageGrid) {
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
}
