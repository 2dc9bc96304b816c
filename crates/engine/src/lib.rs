use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod content;

pub use app::{
    preview_path_to_zone, Actor, ActorConfig, Facing, FixedStepClock, FlowMachine, FlowState,
    GridModel, InputAction, InputSnapshot, InteractionZone, LoopConfig, NavPath, Pathfinder,
    PerformanceKind, PlayerStats, RoomCommand, RoomSession, RoomSessionConfig, RoomSignal,
    SignalBus, TileCoord, TransitionPolicy, Vec2, ZoneRegistry,
};
pub use content::{load_room_map, parse_room_map, MapLayerSpec, MapLoadError, RoomMap};

pub const ROOT_ENV_VAR: &str = "ROOM_ROOT";
pub const MAP_ENV_VAR: &str = "ROOM_MAP";

/// Where the bundled room lives, relative to the project root.
pub const BUNDLED_MAP: &str = "assets/room/room.json";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("{var} points at {path}, which has no assets/room/room.json")]
    InvalidEnvRoot { var: &'static str, path: PathBuf },
    #[error(
        "no assets/room/room.json found above {start_dir}; set {map_var} to a room file or {root_var} to the project root"
    )]
    RootNotFound {
        start_dir: PathBuf,
        map_var: &'static str,
        root_var: &'static str,
    },
}

/// Picks the room map to load when none is given on the command line.
///
/// `ROOM_MAP` wins outright. Otherwise the bundled map is looked up under
/// `ROOM_ROOT`, or in the nearest ancestor of the executable that has one.
pub fn resolve_default_map() -> Result<PathBuf, StartupError> {
    if let Some(map) = read_env_path(MAP_ENV_VAR)? {
        return Ok(map);
    }
    if let Some(root) = read_env_path(ROOT_ENV_VAR)? {
        let map = root.join(BUNDLED_MAP);
        if !map.is_file() {
            return Err(StartupError::InvalidEnvRoot {
                var: ROOT_ENV_VAR,
                path: root,
            });
        }
        return Ok(map);
    }

    let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
    let start_dir = exe.parent().unwrap_or(&exe);
    find_bundled_map(start_dir).ok_or_else(|| StartupError::RootNotFound {
        start_dir: start_dir.to_path_buf(),
        map_var: MAP_ENV_VAR,
        root_var: ROOT_ENV_VAR,
    })
}

fn read_env_path(var: &'static str) -> Result<Option<PathBuf>, StartupError> {
    match env::var(var) {
        Ok(value) => Ok(Some(PathBuf::from(value))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(source) => Err(StartupError::EnvVar { var, source }),
    }
}

fn find_bundled_map(start_dir: &Path) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .map(|dir| dir.join(BUNDLED_MAP))
        .find(|map| map.is_file())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn bundled_map_is_found_from_a_nested_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let room_dir = dir.path().join("assets").join("room");
        fs::create_dir_all(&room_dir).expect("room dir");
        fs::write(room_dir.join("room.json"), "{}").expect("write");
        let nested = dir.path().join("target").join("debug");
        fs::create_dir_all(&nested).expect("nested");

        assert_eq!(
            find_bundled_map(&nested),
            Some(dir.path().join(BUNDLED_MAP))
        );
    }

    #[test]
    fn directory_without_the_map_is_not_a_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("Cargo.toml"), "[workspace]\n").expect("write");
        assert_eq!(find_bundled_map(dir.path()), None);
    }
}
