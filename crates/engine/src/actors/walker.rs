use crate::physics::{Body, CollisionReactions, Rectangle, StageGrid};

use super::{patrol, tags, Behavior, Entity, EntityCore, Facing};

pub const WALK_SPEED: f32 = 0.5;
pub const CONTACT_DAMAGE: u32 = 1;

pub fn hitbox() -> Rectangle {
    Rectangle::new(2.0, 4.0, 12.0, 12.0)
}

/// Ground enemy that paces between walls and ledges.
#[derive(Debug, Clone)]
pub struct Walker {
    facing: Facing,
}

pub fn spawn(x: f32, y: f32) -> Entity {
    Entity::new(
        Body::new(x, y, hitbox()),
        Behavior::Walker(Walker {
            facing: Facing::Left,
        }),
        &[tags::ENEMY],
    )
    .with_reactions(CollisionReactions::default().with(
        tags::WIND,
        |me: &mut Entity, wind: &mut Entity| {
            if let (Behavior::Walker(walker), Some(pushed)) = (
                &mut me.behavior,
                Facing::from_velocity(wind.body().vx),
            ) {
                walker.facing = pushed;
            }
            wind.destroy();
        },
    ))
}

impl Walker {
    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub(crate) fn tick(&mut self, core: &mut EntityCore, grid: &StageGrid) {
        self.facing = patrol(core, grid, self.facing, WALK_SPEED);
        core.animate("walk", self.facing);
    }
}
