use super::Rectangle;

/// Per-tick downward acceleration in px/tick².
pub const GRAVITY: f32 = 0.125;

/// Position, velocity and entity-local hitbox of one mobile entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub hitbox: Rectangle,
}

impl Body {
    pub fn new(x: f32, y: f32, hitbox: Rectangle) -> Self {
        Self {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            hitbox,
        }
    }

    /// Hitbox in world space at the current position.
    pub fn current_hitbox(&self) -> Rectangle {
        self.hitbox.translate(self.x, self.y)
    }

    pub fn with_velocity(mut self, vx: f32, vy: f32) -> Self {
        self.vx = vx;
        self.vy = vy;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Physics {
    pub gravity: f32,
}

impl Default for Physics {
    fn default() -> Self {
        Self { gravity: GRAVITY }
    }
}

impl Physics {
    pub fn with_gravity(gravity: f32) -> Self {
        Self { gravity }
    }

    pub fn apply_gravity(&self, body: &mut Body) {
        body.vy += self.gravity;
    }

    /// Must run after tile resolution, which works on the pending velocity.
    pub fn apply_velocity(&self, body: &mut Body) {
        body.x += body.vx;
        body.y += body.vy;
    }
}
