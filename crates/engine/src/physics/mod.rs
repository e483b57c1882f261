mod grid;
mod motion;
mod reaction;
mod rect;
mod tilemap;

pub use grid::{
    cell_of, last_cell_before, Block, BlockTable, CollisionType, DamageZone, Direction, EdgePolicy,
    GridError, StageGrid, TileLayer, BLOCK_SIZE,
};
pub use motion::{Body, Physics, GRAVITY};
pub use reaction::{handle, resolve_pair, CollisionReactions, HasReactions, ReactionFn};
pub use rect::Rectangle;
pub use tilemap::{DamageHit, TileContact, TilemapCollision};
