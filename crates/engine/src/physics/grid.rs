use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use super::Rectangle;

/// Edge length of one grid cell, in pixels.
pub const BLOCK_SIZE: f32 = 16.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollisionType {
    #[default]
    None,
    Platform,
    Solid,
    Damage,
}

impl CollisionType {
    /// `Solid` blocks every direction, `Platform` only blocks falling onto it.
    pub fn blocks(self, direction: Direction) -> bool {
        match self {
            CollisionType::Solid => true,
            CollisionType::Platform => direction == Direction::Down,
            CollisionType::None | CollisionType::Damage => false,
        }
    }

    /// Precedence when layers overlap: `SOLID > PLATFORM > DAMAGE > NONE`.
    fn rank(self) -> u8 {
        match self {
            CollisionType::None => 0,
            CollisionType::Damage => 1,
            CollisionType::Platform => 2,
            CollisionType::Solid => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

/// Damage carried by a `DAMAGE` block. `hitbox` is tile-local.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageZone {
    pub hitbox: Rectangle,
    pub amount: u32,
    pub is_pit: bool,
}

impl DamageZone {
    pub fn full_tile(amount: u32, is_pit: bool) -> Self {
        Self {
            hitbox: Rectangle::new(0.0, 0.0, BLOCK_SIZE, BLOCK_SIZE),
            amount,
            is_pit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub collision: CollisionType,
    pub damage: Option<DamageZone>,
}

impl Block {
    pub const EMPTY: Block = Block {
        collision: CollisionType::None,
        damage: None,
    };

    pub fn solid() -> Self {
        Self {
            collision: CollisionType::Solid,
            damage: None,
        }
    }

    pub fn platform() -> Self {
        Self {
            collision: CollisionType::Platform,
            damage: None,
        }
    }

    pub fn damage(zone: DamageZone) -> Self {
        Self {
            collision: CollisionType::Damage,
            damage: Some(zone),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlockTable {
    blocks: HashMap<char, Block>,
}

impl BlockTable {
    pub fn insert(&mut self, code: char, block: Block) {
        self.blocks.insert(code, block);
    }

    pub fn with(mut self, code: char, block: Block) -> Self {
        self.insert(code, block);
        self
    }

    pub fn get(&self, code: char) -> Option<&Block> {
        self.blocks.get(&code)
    }

    pub fn contains(&self, code: char) -> bool {
        self.blocks.contains_key(&code)
    }

    /// Unmapped codes are open space.
    pub fn collision_of(&self, code: char) -> CollisionType {
        self.get(code)
            .map(|block| block.collision)
            .unwrap_or(CollisionType::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("stage has no tile layers")]
    NoLayers,
    #[error("layer has no rows")]
    EmptyLayer,
    #[error("row {row} has {actual} tiles, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("layer {layer} is {actual_cols}x{actual_rows}, expected {expected_cols}x{expected_rows}")]
    LayerSizeMismatch {
        layer: usize,
        expected_cols: usize,
        expected_rows: usize,
        actual_cols: usize,
        actual_rows: usize,
    },
}

/// One character grid. All rows have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    cols: usize,
    rows: Vec<Vec<char>>,
}

impl TileLayer {
    pub fn new<S: AsRef<str>>(rows: &[S]) -> Result<Self, GridError> {
        let rows = rows
            .iter()
            .map(|row| row.as_ref().chars().collect::<Vec<_>>())
            .collect::<Vec<_>>();
        let Some(first) = rows.first() else {
            return Err(GridError::EmptyLayer);
        };
        let cols = first.len();
        for (index, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(GridError::RaggedRow {
                    row: index,
                    expected: cols,
                    actual: row.len(),
                });
            }
        }
        Ok(Self { cols, rows })
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn code_at(&self, col: i32, row: i32) -> Option<char> {
        if col < 0 || row < 0 {
            return None;
        }
        self.rows
            .get(row as usize)
            .and_then(|cells| cells.get(col as usize))
            .copied()
    }

    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, char)> + '_ {
        self.rows.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .map(move |(col, code)| (col, row, *code))
        })
    }
}

/// What a lookup outside the grid resolves to, per edge.
///
/// Side edges win over above/below for corner cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EdgePolicy {
    pub left: CollisionType,
    pub right: CollisionType,
    pub above: CollisionType,
    pub below: CollisionType,
}

impl Default for EdgePolicy {
    fn default() -> Self {
        Self {
            left: CollisionType::Solid,
            right: CollisionType::Solid,
            above: CollisionType::None,
            below: CollisionType::Solid,
        }
    }
}

/// Read-only collision view of a stage: every layer plus the block table.
#[derive(Debug, Clone)]
pub struct StageGrid {
    layers: Vec<TileLayer>,
    blocks: BlockTable,
    edges: EdgePolicy,
    cols: usize,
    rows: usize,
}

impl StageGrid {
    pub fn new(
        layers: Vec<TileLayer>,
        blocks: BlockTable,
        edges: EdgePolicy,
    ) -> Result<Self, GridError> {
        let Some(first) = layers.first() else {
            return Err(GridError::NoLayers);
        };
        let (cols, rows) = (first.cols(), first.rows());
        for (index, layer) in layers.iter().enumerate().skip(1) {
            if layer.cols() != cols || layer.rows() != rows {
                return Err(GridError::LayerSizeMismatch {
                    layer: index,
                    expected_cols: cols,
                    expected_rows: rows,
                    actual_cols: layer.cols(),
                    actual_rows: layer.rows(),
                });
            }
        }
        Ok(Self {
            layers,
            blocks,
            edges,
            cols,
            rows,
        })
    }

    /// Single-layer grid with the default edge policy.
    pub fn from_rows<S: AsRef<str>>(rows: &[S], blocks: BlockTable) -> Result<Self, GridError> {
        Self::new(vec![TileLayer::new(rows)?], blocks, EdgePolicy::default())
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn width_px(&self) -> f32 {
        self.cols as f32 * BLOCK_SIZE
    }

    pub fn layers(&self) -> &[TileLayer] {
        &self.layers
    }

    /// Strongest collision type across all layers at a cell. A `DAMAGE` tile
    /// only shows through when no layer blocks there.
    pub fn collision_at_cell(&self, col: i32, row: i32) -> CollisionType {
        if let Some(off_grid) = self.off_grid(col, row) {
            return off_grid;
        }
        let mut strongest = CollisionType::None;
        for layer in &self.layers {
            let Some(code) = layer.code_at(col, row) else {
                continue;
            };
            let collision = self.blocks.collision_of(code);
            if collision.rank() > strongest.rank() {
                strongest = collision;
            }
        }
        strongest
    }

    pub fn collision_at(&self, x: f32, y: f32) -> CollisionType {
        self.collision_at_cell(cell_of(x), cell_of(y))
    }

    pub fn blocks_at_cell(&self, col: i32, row: i32, direction: Direction) -> bool {
        self.collision_at_cell(col, row).blocks(direction)
    }

    /// Damage zones of a cell in world space, in layer order. Off-grid cells
    /// carry no damage.
    pub fn damage_zones_at_cell(
        &self,
        col: i32,
        row: i32,
    ) -> impl Iterator<Item = (Rectangle, DamageZone)> + '_ {
        let on_grid = self.off_grid(col, row).is_none();
        let origin_x = col as f32 * BLOCK_SIZE;
        let origin_y = row as f32 * BLOCK_SIZE;
        self.layers
            .iter()
            .filter(move |_| on_grid)
            .filter_map(move |layer| layer.code_at(col, row))
            .filter_map(move |code| self.blocks.get(code))
            .filter(|block| block.collision == CollisionType::Damage)
            .filter_map(|block| block.damage)
            .map(move |zone| (zone.hitbox.translate(origin_x, origin_y), zone))
    }

    fn off_grid(&self, col: i32, row: i32) -> Option<CollisionType> {
        if col < 0 {
            Some(self.edges.left)
        } else if col as usize >= self.cols {
            Some(self.edges.right)
        } else if row < 0 {
            Some(self.edges.above)
        } else if row as usize >= self.rows {
            Some(self.edges.below)
        } else {
            None
        }
    }
}

/// Cell containing an inclusive coordinate.
pub fn cell_of(coord: f32) -> i32 {
    (coord / BLOCK_SIZE).floor() as i32
}

/// Cell containing the last pixel before an exclusive coordinate.
pub fn last_cell_before(coord: f32) -> i32 {
    (coord / BLOCK_SIZE).ceil() as i32 - 1
}
