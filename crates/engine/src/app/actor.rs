use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::{GridModel, InputSnapshot, NavPath, Rect, Vec2};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Facing {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Facing {
    pub const fn as_token(self) -> &'static str {
        match self {
            Facing::Up => "up",
            Facing::Down => "down",
            Facing::Left => "left",
            Facing::Right => "right",
        }
    }

    /// Dominant axis of `velocity`; exact ties resolve to the vertical axis.
    pub fn from_velocity(velocity: Vec2) -> Self {
        if velocity.x.abs() > velocity.y.abs() {
            if velocity.x < 0.0 {
                Facing::Left
            } else {
                Facing::Right
            }
        } else if velocity.y < 0.0 {
            Facing::Up
        } else {
            Facing::Down
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown facing '{0}' (expected up|down|left|right)")]
pub struct ParseFacingError(String);

impl FromStr for Facing {
    type Err = ParseFacingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "up" => Ok(Facing::Up),
            "down" => Ok(Facing::Down),
            "left" => Ok(Facing::Left),
            "right" => Ok(Facing::Right),
            other => Err(ParseFacingError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MotionMode {
    #[default]
    Idle,
    ManualMove,
    AutoPath,
}

/// Looping animation set played while the actor is held in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PerformanceKind {
    Spellcast,
    Thrust,
    Emote,
    Hurt,
}

impl PerformanceKind {
    pub const fn as_token(self) -> &'static str {
        match self {
            PerformanceKind::Spellcast => "spellcast",
            PerformanceKind::Thrust => "thrust",
            PerformanceKind::Emote => "emote",
            PerformanceKind::Hurt => "hurt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown performance '{0}' (expected spellcast|thrust|emote|hurt)")]
pub struct ParsePerformanceError(String);

impl FromStr for PerformanceKind {
    type Err = ParsePerformanceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "spellcast" => Ok(PerformanceKind::Spellcast),
            "thrust" => Ok(PerformanceKind::Thrust),
            "emote" => Ok(PerformanceKind::Emote),
            "hurt" => Ok(PerformanceKind::Hurt),
            other => Err(ParsePerformanceError(other.to_string())),
        }
    }
}

pub const PERFORMANCE_DIRECTIONS: [Facing; 4] = [Facing::Down, Facing::Right, Facing::Up, Facing::Left];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Performance {
    kind: PerformanceKind,
    direction_index: usize,
}

impl Performance {
    pub fn kind(&self) -> PerformanceKind {
        self.kind
    }

    pub fn direction(&self) -> Facing {
        PERFORMANCE_DIRECTIONS[self.direction_index % PERFORMANCE_DIRECTIONS.len()]
    }

    pub fn animation_key(&self) -> String {
        match self.kind {
            PerformanceKind::Hurt => PerformanceKind::Hurt.as_token().to_string(),
            kind => format!("{}-{}", kind.as_token(), self.direction()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    pub move_speed_px_per_second: f32,
    pub waypoint_reached_px: f32,
    /// Progress slower than this counts toward the stuck timeout. Scaled by `dt`,
    /// so 30 px/s is half a pixel per tick at 60 Hz.
    pub stuck_min_speed_px_per_second: f32,
    pub stuck_timeout_seconds: f32,
    pub facing_min_speed_px_per_second: f32,
    pub body_width_px: f32,
    pub body_height_px: f32,
    pub probe_margin_px: f32,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            move_speed_px_per_second: 120.0,
            waypoint_reached_px: 5.0,
            stuck_min_speed_px_per_second: 30.0,
            stuck_timeout_seconds: 0.5,
            facing_min_speed_px_per_second: 5.0,
            body_width_px: 20.0,
            body_height_px: 10.0,
            probe_margin_px: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalKind {
    Reached,
    Stuck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionEvent {
    /// An auto-walk ended, either at its last waypoint or by giving up while stuck.
    Arrived(ArrivalKind),
}

/// The player avatar. `position` is the feet point in room pixels.
#[derive(Debug, Clone)]
pub struct Actor {
    config: ActorConfig,
    position: Vec2,
    velocity: Vec2,
    facing: Facing,
    mode: MotionMode,
    locked: bool,
    path: Option<NavPath>,
    auto_walking: bool,
    performance: Option<Performance>,
    stuck_seconds: f32,
    last_position: Vec2,
}

impl Actor {
    pub fn new(position: Vec2, config: ActorConfig) -> Self {
        Self {
            config,
            position,
            velocity: Vec2::ZERO,
            facing: Facing::Down,
            mode: MotionMode::Idle,
            locked: false,
            path: None,
            auto_walking: false,
            performance: None,
            stuck_seconds: 0.0,
            last_position: position,
        }
    }

    pub fn config(&self) -> &ActorConfig {
        &self.config
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn mode(&self) -> MotionMode {
        self.mode
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn is_auto_walking(&self) -> bool {
        self.auto_walking
    }

    pub fn path(&self) -> Option<&NavPath> {
        self.path.as_ref()
    }

    pub fn performance(&self) -> Option<&Performance> {
        self.performance.as_ref()
    }

    pub fn is_performing(&self) -> bool {
        self.performance.is_some()
    }

    pub fn stuck_seconds(&self) -> f32 {
        self.stuck_seconds
    }

    /// Feet rectangle, centered on `position`.
    pub fn body_rect(&self) -> Rect {
        Rect::from_center(
            self.position,
            self.config.body_width_px,
            self.config.body_height_px,
        )
    }

    /// Feet rectangle grown by the probe margin; used for zone proximity.
    pub fn probe_rect(&self) -> Rect {
        self.body_rect().expanded(self.config.probe_margin_px)
    }

    /// Name of the animation a renderer should be playing right now.
    pub fn animation_key(&self) -> String {
        if let Some(performance) = &self.performance {
            return performance.animation_key();
        }
        match self.mode {
            MotionMode::Idle => format!("idle-{}", self.facing),
            MotionMode::ManualMove | MotionMode::AutoPath => format!("walk-{}", self.facing),
        }
    }

    /// Moves the actor without pathing. Any in-flight path is dropped.
    pub fn teleport(&mut self, position: Vec2) {
        self.stop_movement();
        self.position = position;
        self.last_position = position;
    }

    /// Starts following `path`. Ignored while locked; an empty path is a no-op.
    pub fn walk_path(&mut self, path: NavPath, auto_walk: bool) -> bool {
        if self.locked || path.is_empty() {
            return false;
        }
        debug!(
            waypoints = path.len(),
            auto_walk,
            "actor_walk_path"
        );
        self.path = Some(path);
        self.auto_walking = auto_walk;
        self.stuck_seconds = 0.0;
        self.last_position = self.position;
        true
    }

    pub fn stop_movement(&mut self) {
        self.velocity = Vec2::ZERO;
        self.path = None;
        self.auto_walking = false;
        self.stuck_seconds = 0.0;
        self.mode = MotionMode::Idle;
    }

    pub fn face_direction(&mut self, facing: Facing) {
        self.facing = facing;
        self.velocity = Vec2::ZERO;
        self.mode = MotionMode::Idle;
    }

    pub fn start_performance(&mut self, kind: PerformanceKind) {
        self.velocity = Vec2::ZERO;
        self.mode = MotionMode::Idle;
        self.performance = Some(Performance {
            kind,
            direction_index: 0,
        });
    }

    pub fn stop_performance(&mut self) {
        self.performance = None;
        self.velocity = Vec2::ZERO;
        self.mode = MotionMode::Idle;
    }

    /// Feeds an animation-complete notification into the performance loop.
    /// Returns the animation to play next, if the notification belonged to it.
    pub fn on_animation_complete(&mut self, finished_key: &str) -> Option<String> {
        let performance = self.performance.as_mut()?;
        match performance.kind {
            PerformanceKind::Hurt => {
                (finished_key == PerformanceKind::Hurt.as_token()).then(|| performance.animation_key())
            }
            kind if finished_key.starts_with(kind.as_token()) => {
                performance.direction_index =
                    (performance.direction_index + 1) % PERFORMANCE_DIRECTIONS.len();
                Some(performance.animation_key())
            }
            _ => None,
        }
    }

    /// Advances motion by one fixed step.
    pub fn update(
        &mut self,
        dt_seconds: f32,
        input: &InputSnapshot,
        grid: &GridModel,
    ) -> Option<MotionEvent> {
        if self.locked || self.performance.is_some() {
            return None;
        }

        let has_manual_input = input.has_manual_input();
        if has_manual_input && self.path.is_some() {
            debug!("actor_path_preempted_by_input");
            self.stop_movement();
        }

        let mut event = None;
        let is_moving = if self.path.is_some() {
            let (moving, path_event) = self.process_path(dt_seconds, grid);
            event = path_event;
            moving
        } else if has_manual_input {
            let direction = input.manual_axis().normalized();
            self.velocity = direction.scaled(self.config.move_speed_px_per_second);
            self.mode = MotionMode::ManualMove;
            let delta = self.velocity.scaled(dt_seconds);
            self.integrate(delta, grid);
            direction != Vec2::ZERO
        } else {
            self.velocity = Vec2::ZERO;
            self.mode = MotionMode::Idle;
            false
        };

        if is_moving && self.velocity.length() > self.config.facing_min_speed_px_per_second {
            self.facing = Facing::from_velocity(self.velocity);
        } else if !is_moving {
            self.mode = MotionMode::Idle;
        }

        event
    }

    fn process_path(&mut self, dt_seconds: f32, grid: &GridModel) -> (bool, Option<MotionEvent>) {
        let reached_px = self.config.waypoint_reached_px;
        let position = self.position;
        let Some(path) = self.path.as_mut() else {
            return (false, None);
        };

        let mut waypoint = path.current_waypoint();
        if let Some(target) = waypoint {
            if position.distance(target) < reached_px {
                path.advance_waypoint();
                waypoint = path.current_waypoint();
            }
        }
        let Some(target) = waypoint else {
            return (false, self.finish_path(ArrivalKind::Reached));
        };

        let offset = Vec2 {
            x: target.x - position.x,
            y: target.y - position.y,
        };
        self.velocity = offset
            .normalized()
            .scaled(self.config.move_speed_px_per_second);
        self.mode = MotionMode::AutoPath;
        let max_step = self.config.move_speed_px_per_second * dt_seconds;
        let delta = if offset.length() <= max_step {
            offset
        } else {
            self.velocity.scaled(dt_seconds)
        };
        self.integrate(delta, grid);

        let min_progress_px = self.config.stuck_min_speed_px_per_second * dt_seconds;
        if self.position.distance(self.last_position) < min_progress_px {
            self.stuck_seconds += dt_seconds;
            if self.stuck_seconds > self.config.stuck_timeout_seconds {
                debug!(
                    x = self.position.x,
                    y = self.position.y,
                    stuck_seconds = self.stuck_seconds,
                    "actor_path_aborted_stuck"
                );
                let was_auto = self.auto_walking;
                self.stop_movement();
                return (false, was_auto.then_some(MotionEvent::Arrived(ArrivalKind::Stuck)));
            }
        } else {
            self.stuck_seconds = 0.0;
        }
        self.last_position = self.position;
        (true, None)
    }

    fn finish_path(&mut self, kind: ArrivalKind) -> Option<MotionEvent> {
        let was_auto = self.auto_walking;
        self.stop_movement();
        if !was_auto {
            return None;
        }
        self.face_direction(Facing::Down);
        Some(MotionEvent::Arrived(kind))
    }

    /// Applies `delta` one axis at a time; an axis step that would enter a
    /// different, blocked tile is dropped.
    fn integrate(&mut self, delta: Vec2, grid: &GridModel) {
        let current_tile = grid.world_to_tile(self.position);

        let next_x = Vec2 {
            x: self.position.x + delta.x,
            y: self.position.y,
        };
        let tile_x = grid.world_to_tile(next_x);
        if tile_x == current_tile || !grid.is_tile_blocked(tile_x) {
            self.position = next_x;
        }

        let current_tile = grid.world_to_tile(self.position);
        let next_y = Vec2 {
            x: self.position.x,
            y: self.position.y + delta.y,
        };
        let tile_y = grid.world_to_tile(next_y);
        if tile_y == current_tile || !grid.is_tile_blocked(tile_y) {
            self.position = next_y;
        }
    }
}
