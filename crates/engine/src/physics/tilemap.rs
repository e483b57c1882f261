use std::ops::RangeInclusive;

use super::grid::{cell_of, last_cell_before, CollisionType, Direction, StageGrid, BLOCK_SIZE};
use super::Body;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageHit {
    pub amount: u32,
    pub is_pit: bool,
}

/// Outcome of probing the grid for one body's pending move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileContact {
    WallHit { side: Direction },
    CliffDetected { side: Direction },
    DamageHit(DamageHit),
}

/// Directional tile queries and position correction for one entity.
///
/// Queries look at the *next* position (current position plus pending
/// velocity). Corrections snap the hitbox edge flush against the tile it was
/// about to enter; they only move the body while its velocity still points
/// into that tile, so repeated calls never drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilemapCollision {
    pub cliff_probe_depth: f32,
}

impl Default for TilemapCollision {
    fn default() -> Self {
        Self {
            cliff_probe_depth: BLOCK_SIZE,
        }
    }
}

impl TilemapCollision {
    pub fn check_left_wall(&self, body: &Body, grid: &StageGrid) -> bool {
        let hitbox = body.current_hitbox();
        let col = cell_of(hitbox.left() + body.vx);
        cells_spanned(hitbox.top(), hitbox.bottom())
            .any(|row| grid.blocks_at_cell(col, row, Direction::Left))
    }

    pub fn check_right_wall(&self, body: &Body, grid: &StageGrid) -> bool {
        let hitbox = body.current_hitbox();
        let col = last_cell_before(hitbox.right() + body.vx);
        cells_spanned(hitbox.top(), hitbox.bottom())
            .any(|row| grid.blocks_at_cell(col, row, Direction::Right))
    }

    pub fn check_up_wall(&self, body: &Body, grid: &StageGrid) -> bool {
        let hitbox = body.current_hitbox();
        let row = cell_of(hitbox.top() + body.vy);
        cells_spanned(hitbox.left(), hitbox.right())
            .any(|col| grid.blocks_at_cell(col, row, Direction::Up))
    }

    /// Platforms only count when the bottom edge enters a new row this
    /// frame, so a body that rose into a platform from below stays put.
    pub fn check_down_wall(&self, body: &Body, grid: &StageGrid) -> bool {
        let hitbox = body.current_hitbox();
        let current_row = last_cell_before(hitbox.bottom());
        let row = last_cell_before(hitbox.bottom() + body.vy);
        let crossing_row = row > current_row;
        cells_spanned(hitbox.left(), hitbox.right()).any(|col| {
            match grid.collision_at_cell(col, row) {
                CollisionType::Solid => true,
                CollisionType::Platform => crossing_row,
                CollisionType::None | CollisionType::Damage => false,
            }
        })
    }

    pub fn stop_at_left_wall(&self, body: &mut Body) {
        snap_left(body);
        body.vx = 0.0;
    }

    pub fn stop_at_right_wall(&self, body: &mut Body) {
        snap_right(body);
        body.vx = 0.0;
    }

    pub fn stop_at_up_wall(&self, body: &mut Body) {
        snap_up(body);
        body.vy = 0.0;
    }

    pub fn stop_at_down_wall(&self, body: &mut Body) {
        snap_down(body);
        body.vy = 0.0;
    }

    pub fn bounce_at_left_wall(&self, body: &mut Body) {
        if snap_left(body) {
            body.vx = -body.vx;
        }
    }

    pub fn bounce_at_right_wall(&self, body: &mut Body) {
        if snap_right(body) {
            body.vx = -body.vx;
        }
    }

    pub fn bounce_at_down_wall(&self, body: &mut Body, restitution: f32) {
        if snap_down(body) {
            body.vy = -body.vy * restitution;
        }
    }

    pub fn stop_at(&self, side: Direction, body: &mut Body) {
        match side {
            Direction::Left => self.stop_at_left_wall(body),
            Direction::Right => self.stop_at_right_wall(body),
            Direction::Up => self.stop_at_up_wall(body),
            Direction::Down => self.stop_at_down_wall(body),
        }
    }

    pub fn check_left_side_cliff(&self, body: &Body, grid: &StageGrid) -> bool {
        let hitbox = body.current_hitbox();
        let col = cell_of(hitbox.left());
        let row = last_cell_before(hitbox.bottom() + self.cliff_probe_depth);
        !grid.blocks_at_cell(col, row, Direction::Down)
    }

    pub fn check_right_side_cliff(&self, body: &Body, grid: &StageGrid) -> bool {
        let hitbox = body.current_hitbox();
        let col = last_cell_before(hitbox.right());
        let row = last_cell_before(hitbox.bottom() + self.cliff_probe_depth);
        !grid.blocks_at_cell(col, row, Direction::Down)
    }

    /// First damage zone (row-major, then layer order) overlapping the
    /// current hitbox.
    pub fn check_damage_block(&self, body: &Body, grid: &StageGrid) -> Option<DamageHit> {
        let hitbox = body.current_hitbox();
        for row in cells_spanned(hitbox.top(), hitbox.bottom()) {
            for col in cells_spanned(hitbox.left(), hitbox.right()) {
                let hit = grid
                    .damage_zones_at_cell(col, row)
                    .find(|(zone_rect, _)| zone_rect.intersects(&hitbox));
                if let Some((_, zone)) = hit {
                    return Some(DamageHit {
                        amount: zone.amount,
                        is_pit: zone.is_pit,
                    });
                }
            }
        }
        None
    }

    /// All gated contacts for the pending move. Walls are reported only when
    /// the velocity points into them and cliffs only ahead of horizontal
    /// motion.
    pub fn contacts(&self, body: &Body, grid: &StageGrid) -> Vec<TileContact> {
        let mut contacts = Vec::new();
        if body.vx < 0.0 && self.check_left_wall(body, grid) {
            contacts.push(TileContact::WallHit {
                side: Direction::Left,
            });
        }
        if body.vx > 0.0 && self.check_right_wall(body, grid) {
            contacts.push(TileContact::WallHit {
                side: Direction::Right,
            });
        }
        if body.vy < 0.0 && self.check_up_wall(body, grid) {
            contacts.push(TileContact::WallHit { side: Direction::Up });
        }
        if body.vy > 0.0 && self.check_down_wall(body, grid) {
            contacts.push(TileContact::WallHit {
                side: Direction::Down,
            });
        }
        if body.vx < 0.0 && self.check_left_side_cliff(body, grid) {
            contacts.push(TileContact::CliffDetected {
                side: Direction::Left,
            });
        }
        if body.vx > 0.0 && self.check_right_side_cliff(body, grid) {
            contacts.push(TileContact::CliffDetected {
                side: Direction::Right,
            });
        }
        if let Some(hit) = self.check_damage_block(body, grid) {
            contacts.push(TileContact::DamageHit(hit));
        }
        contacts
    }
}

/// Every cell an edge spanning `[start, end)` touches.
fn cells_spanned(start: f32, end: f32) -> RangeInclusive<i32> {
    let first = cell_of(start);
    let last = last_cell_before(end).max(first);
    first..=last
}

fn snap_left(body: &mut Body) -> bool {
    if body.vx >= 0.0 {
        return false;
    }
    let col = cell_of(body.current_hitbox().left() + body.vx);
    body.x = (col + 1) as f32 * BLOCK_SIZE - body.hitbox.left();
    true
}

fn snap_right(body: &mut Body) -> bool {
    if body.vx <= 0.0 {
        return false;
    }
    let col = last_cell_before(body.current_hitbox().right() + body.vx);
    body.x = col as f32 * BLOCK_SIZE - body.hitbox.right();
    true
}

fn snap_up(body: &mut Body) -> bool {
    if body.vy >= 0.0 {
        return false;
    }
    let row = cell_of(body.current_hitbox().top() + body.vy);
    body.y = (row + 1) as f32 * BLOCK_SIZE - body.hitbox.top();
    true
}

fn snap_down(body: &mut Body) -> bool {
    if body.vy <= 0.0 {
        return false;
    }
    let row = last_cell_before(body.current_hitbox().bottom() + body.vy);
    body.y = row as f32 * BLOCK_SIZE - body.hitbox.bottom();
    true
}
