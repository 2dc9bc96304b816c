use std::path::PathBuf;

use room_engine::{load_room_map, resolve_default_map, MapLoadError, RoomMap, StartupError};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{load_config, ConfigError, RoomConfig};
use super::script::{load_script, parse_script, ScriptCommand, ScriptError};

const USAGE: &str = "room_game [--map <path>] [--config <path>] [--script <path>]";
const DEFAULT_SCRIPT: &str = include_str!("../../../../assets/scripts/tour.txt");

pub(crate) struct AppWiring {
    pub(crate) config: RoomConfig,
    pub(crate) map: RoomMap,
    pub(crate) script: Vec<ScriptCommand>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct CliArgs {
    pub(crate) map: Option<PathBuf>,
    pub(crate) config: Option<PathBuf>,
    pub(crate) script: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error("unknown argument '{arg}'. usage: {usage}")]
    UnknownArgument { arg: String, usage: &'static str },
    #[error("missing value for {flag}. usage: {usage}")]
    MissingValue {
        flag: &'static str,
        usage: &'static str,
    },
}

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Cli(#[from] CliError),
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Map(#[from] MapLoadError),
    #[error(transparent)]
    Script(#[from] ScriptError),
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    init_tracing();
    info!("=== Room Startup ===");

    let args = parse_cli_args(std::env::args().skip(1))?;
    let config = load_config(args.config.as_deref())?;

    let map_path = match args.map {
        Some(path) => path,
        None => resolve_default_map()?,
    };
    let map = load_room_map(&map_path, &config.layers)?;

    let script = match &args.script {
        Some(path) => load_script(path)?,
        None => {
            info!("script_default_tour");
            parse_script(DEFAULT_SCRIPT)?
        }
    };
    info!(commands = script.len(), "script_loaded");

    Ok(AppWiring {
        config,
        map,
        script,
    })
}

pub(crate) fn parse_cli_args(
    args: impl IntoIterator<Item = String>,
) -> Result<CliArgs, CliError> {
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let (flag, slot) = match arg.as_str() {
            "--map" => ("--map", &mut parsed.map),
            "--config" => ("--config", &mut parsed.config),
            "--script" => ("--script", &mut parsed.script),
            _ => return Err(CliError::UnknownArgument { arg, usage: USAGE }),
        };
        let value = args
            .next()
            .ok_or(CliError::MissingValue { flag, usage: USAGE })?;
        *slot = Some(PathBuf::from(value));
    }
    Ok(parsed)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
