mod stage;

pub use stage::{load_stage, parse_stage, SpawnPoint, Stage, StageLoadError, EMPTY_CODE};
