use std::fs;
use std::path::{Path, PathBuf};

use room_engine::app::{LessonOutcome, Purchase};
use room_engine::{Facing, FlowState, InputAction, PerformanceKind, RoomCommand, Vec2};
use thiserror::Error;

/// One line of a driver script.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScriptCommand {
    /// Advance simulated wall time; ticks come out of the fixed-step clock.
    Wait { millis: u64 },
    /// Run exactly `count` fixed ticks.
    Tick { count: u32 },
    Hold { actions: Vec<InputAction> },
    Release { actions: Vec<InputAction> },
    Tap { point: Vec2 },
    Interact,
    AnimationDone,
    Path { zone_id: String },
    Dump,
    Room(RoomCommand),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{reason}. usage: {usage}")]
pub(crate) struct CommandParseError {
    reason: String,
    usage: String,
}

#[derive(Debug, Error)]
pub(crate) enum ScriptError {
    #[error("failed to read script {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("script line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: CommandParseError,
    },
}

pub(crate) fn load_script(path: &Path) -> Result<Vec<ScriptCommand>, ScriptError> {
    let raw = fs::read_to_string(path).map_err(|source| ScriptError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_script(&raw)
}

/// Blank lines and lines starting with `#` are skipped.
pub(crate) fn parse_script(raw: &str) -> Result<Vec<ScriptCommand>, ScriptError> {
    let mut commands = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let command = parse_line(trimmed).map_err(|source| ScriptError::Parse {
            line: index + 1,
            source,
        })?;
        commands.push(command);
    }
    Ok(commands)
}

fn parse_line(line: &str) -> Result<ScriptCommand, CommandParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (name, args) = match tokens.split_first() {
        Some((name, args)) => (name.to_ascii_lowercase(), args),
        None => {
            return Err(CommandParseError {
                reason: "empty command".to_string(),
                usage: "<command> [args...]".to_string(),
            })
        }
    };

    match name.as_str() {
        "wait" => {
            let usage = "wait <millis>";
            expect_arg_count(args, 1, usage)?;
            Ok(ScriptCommand::Wait {
                millis: parse_number(args[0], "millis", usage)?,
            })
        }
        "tick" => {
            let usage = "tick [count]";
            let count = match args {
                [] => 1,
                [count] => parse_number(count, "count", usage)?,
                _ => return Err(parse_error("expected at most one argument", usage)),
            };
            Ok(ScriptCommand::Tick { count })
        }
        "hold" => Ok(ScriptCommand::Hold {
            actions: parse_actions(args, "hold <up|down|left|right>...")?,
        }),
        "release" => Ok(ScriptCommand::Release {
            actions: parse_actions(args, "release <up|down|left|right>...")?,
        }),
        "tap" => {
            let usage = "tap <x> <y>";
            expect_arg_count(args, 2, usage)?;
            Ok(ScriptCommand::Tap {
                point: Vec2::new(
                    parse_number(args[0], "x", usage)?,
                    parse_number(args[1], "y", usage)?,
                ),
            })
        }
        "interact" => {
            expect_arg_count(args, 0, "interact")?;
            Ok(ScriptCommand::Interact)
        }
        "anim_done" => {
            expect_arg_count(args, 0, "anim_done")?;
            Ok(ScriptCommand::AnimationDone)
        }
        "path" => {
            expect_arg_count(args, 1, "path <zone_id>")?;
            Ok(ScriptCommand::Path {
                zone_id: args[0].to_string(),
            })
        }
        "dump" => {
            expect_arg_count(args, 0, "dump")?;
            Ok(ScriptCommand::Dump)
        }
        _ => parse_room_command(&name, args).map(ScriptCommand::Room),
    }
}

fn parse_room_command(name: &str, args: &[&str]) -> Result<RoomCommand, CommandParseError> {
    match name {
        "move_to" => {
            expect_arg_count(args, 1, "move_to <zone_id>")?;
            Ok(RoomCommand::MoveActorToZone {
                zone_id: args[0].to_string(),
            })
        }
        "respawn" => {
            expect_arg_count(args, 1, "respawn <zone_id>")?;
            Ok(RoomCommand::RespawnAt {
                zone_id: args[0].to_string(),
            })
        }
        "face" => {
            let usage = "face <up|down|left|right>";
            expect_arg_count(args, 1, usage)?;
            let facing = args[0]
                .parse::<Facing>()
                .map_err(|error| parse_error(&error.to_string(), usage))?;
            Ok(RoomCommand::FaceDirection { facing })
        }
        "set_state" => {
            let usage = "set_state <flow_state>";
            expect_arg_count(args, 1, usage)?;
            let state = args[0]
                .parse::<FlowState>()
                .map_err(|error| parse_error(&error.to_string(), usage))?;
            Ok(RoomCommand::SetFlowState { state })
        }
        "complete_lesson" => {
            let usage = "complete_lesson <lesson_id> <score> <t_factor> [money closeness]";
            if args.len() != 3 && args.len() != 5 {
                return Err(parse_error("expected three or five arguments", usage));
            }
            let mut outcome = LessonOutcome::new(
                args[0],
                parse_number(args[1], "score", usage)?,
                parse_number(args[2], "t_factor", usage)?,
            );
            if args.len() == 5 {
                outcome = outcome.with_rewards(
                    parse_number(args[3], "money", usage)?,
                    parse_number(args[4], "closeness", usage)?,
                );
            }
            Ok(RoomCommand::CompleteLesson { outcome })
        }
        "buy" => {
            let usage = "buy <cost> <hunger_gain> <t_value_gain>";
            expect_arg_count(args, 3, usage)?;
            Ok(RoomCommand::BuyItem {
                purchase: Purchase {
                    cost: parse_number(args[0], "cost", usage)?,
                    hunger_gain: parse_number(args[1], "hunger_gain", usage)?,
                    t_value_gain: parse_number(args[2], "t_value_gain", usage)?,
                },
            })
        }
        "grant" => {
            let usage = "grant <amount>";
            expect_arg_count(args, 1, usage)?;
            Ok(RoomCommand::GrantMoney {
                amount: parse_number(args[0], "amount", usage)?,
            })
        }
        "consume" => {
            let usage = "consume <amount>";
            expect_arg_count(args, 1, usage)?;
            Ok(RoomCommand::ConsumeHunger {
                amount: parse_number(args[0], "amount", usage)?,
            })
        }
        "closeness" => {
            let usage = "closeness <amount>";
            expect_arg_count(args, 1, usage)?;
            Ok(RoomCommand::UpdateCloseness {
                amount: parse_number(args[0], "amount", usage)?,
            })
        }
        "unlock_ending" => {
            let usage = "unlock_ending [ending_id]";
            let ending_id = match args {
                [] => None,
                [ending_id] => Some(ending_id.to_string()),
                _ => return Err(parse_error("expected at most one argument", usage)),
            };
            Ok(RoomCommand::UnlockEnding { ending_id })
        }
        "perform" => {
            let usage = "perform <spellcast|thrust|emote|hurt>";
            expect_arg_count(args, 1, usage)?;
            let kind = args[0]
                .parse::<PerformanceKind>()
                .map_err(|error| parse_error(&error.to_string(), usage))?;
            Ok(RoomCommand::StartPerformance { kind })
        }
        "stop_perform" => {
            expect_arg_count(args, 0, "stop_perform")?;
            Ok(RoomCommand::StopPerformance)
        }
        "trigger" => {
            expect_arg_count(args, 0, "trigger")?;
            Ok(RoomCommand::TriggerInteraction)
        }
        other => Err(parse_error(
            &format!("unknown command '{other}'"),
            "<command> [args...]",
        )),
    }
}

fn parse_actions(args: &[&str], usage: &str) -> Result<Vec<InputAction>, CommandParseError> {
    if args.is_empty() {
        return Err(parse_error("expected at least one direction", usage));
    }
    args.iter()
        .map(|token| {
            InputAction::parse(&token.to_ascii_lowercase())
                .ok_or_else(|| parse_error(&format!("unknown direction '{token}'"), usage))
        })
        .collect()
}

fn parse_number<T: std::str::FromStr>(
    raw: &str,
    name: &str,
    usage: &str,
) -> Result<T, CommandParseError> {
    raw.parse::<T>()
        .map_err(|_| parse_error(&format!("invalid {name} '{raw}'"), usage))
}

fn expect_arg_count(args: &[&str], expected: usize, usage: &str) -> Result<(), CommandParseError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(parse_error(
            &format!("expected {expected} argument(s), got {}", args.len()),
            usage,
        ))
    }
}

fn parse_error(reason: &str, usage: &str) -> CommandParseError {
    CommandParseError {
        reason: reason.to_string(),
        usage: usage.to_string(),
    }
}
