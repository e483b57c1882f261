use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::actors::{Archetype, Entity};
use crate::physics::{
    Block, BlockTable, CollisionType, DamageZone, EdgePolicy, GridError, Rectangle, StageGrid,
    TileLayer, GRAVITY,
};

/// Tile code that is always empty and never reported as unmapped.
pub const EMPTY_CODE: char = ' ';

const DEFAULT_DAMAGE: u32 = 1;

#[derive(Debug, Error)]
pub enum StageLoadError {
    #[error("failed to read stage file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse stage json at {location}: {source}")]
    Parse {
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("tile code {code:?} at {field} must be exactly one character")]
    InvalidCode { field: String, code: String },
    #[error("damage hitbox for tile {code:?} must have non-negative size")]
    InvalidHitbox { code: char },
    #[error("stage gravity must be finite, got {0}")]
    InvalidGravity(f32),
    #[error("player spawn code {code:?} does not appear in any layer")]
    MissingPlayerSpawn { code: char },
    #[error(transparent)]
    Grid(#[from] GridError),
}

#[derive(Debug, Deserialize)]
struct StageFile {
    name: String,
    layers: Vec<Vec<String>>,
    #[serde(default)]
    blocks: HashMap<String, BlockDef>,
    #[serde(default)]
    spawns: HashMap<String, Archetype>,
    player_spawn: String,
    #[serde(default)]
    edges: Option<EdgePolicy>,
    #[serde(default)]
    gravity: Option<f32>,
}

/// Presentation keys (`frame`, `param.freq`, `param.loop`, `param.layer`,
/// `param.alpha`) are accepted and ignored.
#[derive(Debug, Deserialize)]
struct BlockDef {
    collision_type: CollisionType,
    #[serde(default)]
    param: BlockParam,
}

#[derive(Debug, Default, Deserialize)]
struct BlockParam {
    /// Tile-local `[x, y, width, height]`.
    hitbox: Option<[f32; 4]>,
    damage: Option<u32>,
    #[serde(default)]
    pit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnPoint {
    pub archetype: Archetype,
    pub col: usize,
    pub row: usize,
}

/// A parsed stage: the collision grid plus where everything starts.
#[derive(Debug, Clone)]
pub struct Stage {
    pub name: String,
    pub grid: StageGrid,
    /// Player first, then the spawn table in row-major, layer order.
    pub spawns: Vec<SpawnPoint>,
    pub gravity: f32,
}

impl Stage {
    pub fn player_spawn(&self) -> Option<SpawnPoint> {
        self.spawns
            .iter()
            .copied()
            .find(|spawn| spawn.archetype == Archetype::Player)
    }

    /// Fresh entities for every spawn point. Stage gravity replaces the
    /// default for entities that fall at all.
    pub fn spawn_entities(&self) -> Vec<Entity> {
        self.spawns
            .iter()
            .map(|spawn| {
                let mut entity = spawn.archetype.spawn_at_cell(spawn.col, spawn.row);
                if entity.core.physics.gravity != 0.0 {
                    entity.core.physics.gravity = self.gravity;
                }
                entity
            })
            .collect()
    }
}

pub fn load_stage(path: &Path) -> Result<Stage, StageLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| StageLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let stage = parse_stage(&raw)?;
    info!(
        stage = stage.name.as_str(),
        path = %path.display(),
        cols = stage.grid.cols(),
        rows = stage.grid.rows(),
        layers = stage.grid.layers().len(),
        spawn_count = stage.spawns.len(),
        "stage_loaded"
    );
    Ok(stage)
}

pub fn parse_stage(raw: &str) -> Result<Stage, StageLoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let file: StageFile =
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            let location = error.path().to_string();
            StageLoadError::Parse {
                location,
                source: error.into_inner(),
            }
        })?;
    build_stage(file)
}

fn build_stage(file: StageFile) -> Result<Stage, StageLoadError> {
    let player_code = single_char("player_spawn", &file.player_spawn)?;

    let mut spawn_table = HashMap::with_capacity(file.spawns.len() + 1);
    for (code, archetype) in &file.spawns {
        spawn_table.insert(single_char(&format!("spawns.{code}"), code)?, *archetype);
    }
    spawn_table.insert(player_code, Archetype::Player);

    let mut blocks = BlockTable::default();
    for (code, def) in &file.blocks {
        let code = single_char(&format!("blocks.{code}"), code)?;
        if spawn_table.contains_key(&code) {
            warn!(code = %code, "spawn_code_shadows_block");
            continue;
        }
        blocks.insert(code, block_from_def(code, def)?);
    }

    let gravity = file.gravity.unwrap_or(GRAVITY);
    if !gravity.is_finite() {
        return Err(StageLoadError::InvalidGravity(gravity));
    }

    let layers = file
        .layers
        .iter()
        .map(|rows| TileLayer::new(rows.as_slice()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut player = None;
    let mut spawns = Vec::new();
    let mut unmapped = BTreeSet::new();
    for (row, col, code) in cells_row_major(&layers) {
        if let Some(archetype) = spawn_table.get(&code).copied() {
            let spawn = SpawnPoint { archetype, col, row };
            if archetype != Archetype::Player {
                spawns.push(spawn);
            } else if player.is_none() {
                player = Some(spawn);
            } else {
                warn!(col, row, "extra_player_spawn_ignored");
            }
        } else if code != EMPTY_CODE && !blocks.contains(code) {
            unmapped.insert(code);
        }
    }
    for code in unmapped {
        warn!(code = %code, stage = file.name.as_str(), "unmapped_tile_code");
    }

    let player = player.ok_or(StageLoadError::MissingPlayerSpawn { code: player_code })?;
    spawns.insert(0, player);

    let grid = StageGrid::new(layers, blocks, file.edges.unwrap_or_default())?;

    Ok(Stage {
        name: file.name,
        grid,
        spawns,
        gravity,
    })
}

fn block_from_def(code: char, def: &BlockDef) -> Result<Block, StageLoadError> {
    match def.collision_type {
        CollisionType::None => Ok(Block::EMPTY),
        CollisionType::Solid => Ok(Block::solid()),
        CollisionType::Platform => Ok(Block::platform()),
        CollisionType::Damage => {
            let amount = def.param.damage.unwrap_or(DEFAULT_DAMAGE);
            let mut zone = DamageZone::full_tile(amount, def.param.pit);
            if let Some([x, y, width, height]) = def.param.hitbox {
                if !(width >= 0.0 && height >= 0.0) {
                    return Err(StageLoadError::InvalidHitbox { code });
                }
                zone.hitbox = Rectangle::new(x, y, width, height);
            }
            Ok(Block::damage(zone))
        }
    }
}

fn single_char(field: &str, raw: &str) -> Result<char, StageLoadError> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(code), None) => Ok(code),
        _ => Err(StageLoadError::InvalidCode {
            field: field.to_string(),
            code: raw.to_string(),
        }),
    }
}

/// `(row, col, code)` across all layers, row-major, layers in file order
/// within a cell.
fn cells_row_major(layers: &[TileLayer]) -> Vec<(usize, usize, char)> {
    let mut cells: Vec<(usize, usize, usize, char)> = layers
        .iter()
        .enumerate()
        .flat_map(|(layer, tiles)| {
            tiles
                .cells()
                .map(move |(col, row, code)| (row, col, layer, code))
        })
        .collect();
    cells.sort_by_key(|&(row, col, layer, _)| (row, col, layer));
    cells
        .into_iter()
        .map(|(row, col, _, code)| (row, col, code))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use serde_json::json;

    use super::*;
    use crate::physics::BLOCK_SIZE;

    fn test_stage() -> String {
        json!({
            "name": "test",
            "layers": [[
                "#      #",
                "#P  w  #",
                "#==  ^^#",
                "########"
            ]],
            "blocks": {
                "#": { "frame": 3, "collision_type": "SOLID" },
                "=": { "collision_type": "PLATFORM", "param": { "alpha": 0.5 } },
                "^": {
                    "collision_type": "DAMAGE",
                    "param": { "hitbox": [0, 8, 16, 8], "damage": 2, "freq": 4, "loop": true }
                }
            },
            "spawns": { "w": "walker" },
            "player_spawn": "P"
        })
        .to_string()
    }

    #[test]
    fn parses_grid_blocks_and_spawns() {
        let stage = parse_stage(&test_stage()).expect("stage");

        assert_eq!(stage.name, "test");
        assert_eq!(stage.grid.cols(), 8);
        assert_eq!(stage.grid.rows(), 4);
        assert_eq!(stage.gravity, GRAVITY);
        assert_eq!(stage.grid.collision_at_cell(0, 0), CollisionType::Solid);
        assert_eq!(stage.grid.collision_at_cell(1, 2), CollisionType::Platform);
        assert_eq!(stage.grid.collision_at_cell(5, 2), CollisionType::Damage);
        assert_eq!(
            stage.spawns,
            vec![
                SpawnPoint {
                    archetype: Archetype::Player,
                    col: 1,
                    row: 1
                },
                SpawnPoint {
                    archetype: Archetype::Walker,
                    col: 4,
                    row: 1
                },
            ]
        );
    }

    #[test]
    fn spawn_cells_do_not_collide() {
        let stage = parse_stage(&test_stage()).expect("stage");

        assert_eq!(stage.grid.collision_at_cell(1, 1), CollisionType::None);
        assert_eq!(stage.grid.collision_at_cell(4, 1), CollisionType::None);
    }

    #[test]
    fn damage_param_sets_zone() {
        let stage = parse_stage(&test_stage()).expect("stage");

        let zones: Vec<_> = stage.grid.damage_zones_at_cell(5, 2).collect();
        assert_eq!(zones.len(), 1);
        let (world, zone) = zones[0];
        assert_eq!(zone.amount, 2);
        assert!(!zone.is_pit);
        assert_eq!(world.left(), 5.0 * BLOCK_SIZE);
        assert_eq!(world.top(), 2.0 * BLOCK_SIZE + 8.0);
        assert_eq!(world.height(), 8.0);
    }

    #[test]
    fn pit_flag_and_defaults() {
        let raw = json!({
            "name": "pit",
            "layers": [["P ", "_#"]],
            "blocks": {
                "#": { "collision_type": "SOLID" },
                "_": { "collision_type": "DAMAGE", "param": { "pit": true } }
            },
            "player_spawn": "P",
            "gravity": 0.25,
            "edges": { "left": "NONE", "right": "SOLID", "above": "NONE", "below": "NONE" }
        });

        let stage = parse_stage(&raw.to_string()).expect("stage");

        let (_, zone) = stage
            .grid
            .damage_zones_at_cell(0, 1)
            .next()
            .expect("pit zone");
        assert!(zone.is_pit);
        assert_eq!(zone.amount, DEFAULT_DAMAGE);
        assert_eq!(zone.hitbox.width(), BLOCK_SIZE);
        assert_eq!(stage.gravity, 0.25);
        assert_eq!(stage.grid.collision_at_cell(-1, 0), CollisionType::None);
        assert_eq!(stage.grid.collision_at_cell(0, 5), CollisionType::None);
    }

    #[test]
    fn stage_gravity_applies_to_falling_entities_only() {
        let raw = json!({
            "name": "g",
            "layers": [["P w", "###"]],
            "blocks": { "#": { "collision_type": "SOLID" } },
            "spawns": { "w": "goal" },
            "player_spawn": "P",
            "gravity": 0.5
        });
        let stage = parse_stage(&raw.to_string()).expect("stage");

        let entities = stage.spawn_entities();

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].core.physics.gravity, 0.5);
        assert_eq!(entities[1].core.physics.gravity, 0.0);
    }

    #[test]
    fn unmapped_codes_resolve_to_none() {
        let raw = json!({
            "name": "u",
            "layers": [["P?", "##"]],
            "blocks": { "#": { "collision_type": "SOLID" } },
            "player_spawn": "P"
        });

        let stage = parse_stage(&raw.to_string()).expect("stage");

        assert_eq!(stage.grid.collision_at_cell(1, 0), CollisionType::None);
    }

    #[test]
    fn layers_merge_and_spawns_may_live_on_any_layer() {
        let raw = json!({
            "name": "layers",
            "layers": [["   ", "###"], [" P ", "   "]],
            "blocks": { "#": { "collision_type": "SOLID" } },
            "player_spawn": "P"
        });

        let stage = parse_stage(&raw.to_string()).expect("stage");

        assert_eq!(stage.grid.layers().len(), 2);
        assert_eq!(stage.grid.collision_at_cell(1, 1), CollisionType::Solid);
        assert_eq!(
            stage.player_spawn(),
            Some(SpawnPoint {
                archetype: Archetype::Player,
                col: 1,
                row: 0
            })
        );
    }

    #[test]
    fn multi_char_code_is_rejected() {
        let raw = json!({
            "name": "bad",
            "layers": [["P"]],
            "blocks": { "##": { "collision_type": "SOLID" } },
            "player_spawn": "P"
        });

        let err = parse_stage(&raw.to_string()).expect_err("should fail");

        assert!(matches!(err, StageLoadError::InvalidCode { ref field, .. } if field == "blocks.##"));
    }

    #[test]
    fn missing_player_spawn_is_an_error() {
        let raw = r#"{ "name": "none", "layers": [["  "]], "player_spawn": "P" }"#;

        let err = parse_stage(raw).expect_err("should fail");

        assert!(matches!(err, StageLoadError::MissingPlayerSpawn { code: 'P' }));
    }

    #[test]
    fn ragged_layer_is_a_grid_error() {
        let raw = json!({ "name": "ragged", "layers": [["P ", "#"]], "player_spawn": "P" });

        let err = parse_stage(&raw.to_string()).expect_err("should fail");

        assert!(matches!(err, StageLoadError::Grid(GridError::RaggedRow { .. })));
    }

    #[test]
    fn negative_damage_hitbox_is_rejected() {
        let raw = json!({
            "name": "neg",
            "layers": [["P^"]],
            "blocks": { "^": { "collision_type": "DAMAGE", "param": { "hitbox": [0, 0, -4, 8] } } },
            "player_spawn": "P"
        });

        let err = parse_stage(&raw.to_string()).expect_err("should fail");

        assert!(matches!(err, StageLoadError::InvalidHitbox { code: '^' }));
    }

    #[test]
    fn parse_error_reports_json_path() {
        let raw = json!({
            "name": "typo",
            "layers": [["P"]],
            "blocks": { "#": { "collision_type": "STONE" } },
            "player_spawn": "P"
        });

        let err = parse_stage(&raw.to_string()).expect_err("should fail");

        let StageLoadError::Parse { location, .. } = err else {
            panic!("expected parse error, got {err:?}");
        };
        assert!(location.contains("collision_type"), "location was {location}");
    }

    #[test]
    fn load_stage_reads_file() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("stage.json");
        fs::write(&path, test_stage()).expect("write");

        let stage = load_stage(&path).expect("stage");

        assert_eq!(stage.name, "test");
        assert_eq!(stage.spawn_entities().len(), 2);
    }

    #[test]
    fn load_stage_missing_file_is_read_error() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("missing.json");

        let err = load_stage(&path).expect_err("should fail");

        assert!(matches!(err, StageLoadError::Read { path: ref p, .. } if *p == path));
    }
}
