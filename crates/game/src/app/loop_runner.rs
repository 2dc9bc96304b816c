use std::process::ExitCode;
use std::time::Duration;

use room_engine::app::{ActionStates, SignalKind};
use room_engine::{
    preview_path_to_zone, FixedStepClock, FlowMachine, FlowState, InputSnapshot, RoomMap,
    RoomSession, RoomSignal, Vec2,
};
use tracing::{debug, info, warn};

use super::bootstrap::AppWiring;
use super::config::RoomConfig;
use super::script::ScriptCommand;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        map,
        script,
    } = app;
    let mut driver = ScriptDriver::new(map, &config);
    for command in script {
        driver.execute(command);
    }
    let summary = driver.summary();
    info!(
        ticks = summary.ticks,
        signals = summary.signals,
        arrivals = summary.arrivals,
        interactions = summary.interactions,
        flow = %summary.flow,
        "script_finished"
    );
    if summary.ticks == 0 {
        warn!("script_ran_no_ticks");
    }

    ExitCode::SUCCESS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RunSummary {
    pub(crate) ticks: u64,
    pub(crate) signals: u64,
    pub(crate) arrivals: u64,
    pub(crate) interactions: u64,
    pub(crate) flow: FlowState,
}

/// Feeds script commands into a room session through the fixed-step clock.
pub(crate) struct ScriptDriver {
    session: RoomSession,
    flow: FlowMachine,
    clock: FixedStepClock,
    simulated_frame: Duration,
    held: ActionStates,
    pending_tap: Option<Vec2>,
    pending_interact: bool,
    signals_seen: u64,
    arrivals: u64,
    interactions: u64,
}

impl ScriptDriver {
    pub(crate) fn new(map: RoomMap, config: &RoomConfig) -> Self {
        let mut flow = FlowMachine::new(config.transition_policy());
        flow.subscribe(|change| debug!(from = %change.from, to = %change.to, "flow_listener"));
        let session = RoomSession::new(map, config.session.clone(), &mut flow);
        if config.skip_onboarding {
            if let Err(error) = flow.set_state(FlowState::InRoom) {
                warn!(error = %error, "skip_onboarding_rejected");
            }
        }
        let clock = FixedStepClock::new(&config.loop_config);
        info!(
            fixed_dt_ms = clock.fixed_dt().as_secs_f64() * 1000.0,
            policy = ?flow.policy(),
            "driver_ready"
        );

        Self {
            session,
            flow,
            clock,
            simulated_frame: config.loop_config.simulated_frame.max(Duration::from_millis(1)),
            held: ActionStates::default(),
            pending_tap: None,
            pending_interact: false,
            signals_seen: 0,
            arrivals: 0,
            interactions: 0,
        }
    }

    pub(crate) fn session(&self) -> &RoomSession {
        &self.session
    }

    pub(crate) fn flow(&self) -> &FlowMachine {
        &self.flow
    }

    pub(crate) fn execute(&mut self, command: ScriptCommand) {
        debug!(command = ?command, "script_command");
        match command {
            ScriptCommand::Wait { millis } => self.wait(Duration::from_millis(millis)),
            ScriptCommand::Tick { count } => self.run_ticks(count),
            ScriptCommand::Hold { actions } => {
                for action in actions {
                    self.held.set(action, true);
                }
            }
            ScriptCommand::Release { actions } => {
                for action in actions {
                    self.held.set(action, false);
                }
            }
            ScriptCommand::Tap { point } => self.pending_tap = Some(point),
            ScriptCommand::Interact => self.pending_interact = true,
            ScriptCommand::AnimationDone => self.finish_animation(),
            ScriptCommand::Path { zone_id } => self.log_path_preview(&zone_id),
            ScriptCommand::Dump => self.dump(),
            ScriptCommand::Room(command) => self.session.enqueue(command),
        }
    }

    pub(crate) fn summary(&self) -> RunSummary {
        RunSummary {
            ticks: self.session.tick_count(),
            signals: self.signals_seen,
            arrivals: self.arrivals,
            interactions: self.interactions,
            flow: self.flow.current(),
        }
    }

    fn wait(&mut self, duration: Duration) {
        let mut remaining = duration;
        while !remaining.is_zero() {
            let frame = remaining.min(self.simulated_frame);
            remaining -= frame;
            let plan = self.clock.advance_frame(frame);
            self.run_ticks(plan.ticks_to_run);
        }
    }

    fn run_ticks(&mut self, count: u32) {
        let dt = self.clock.fixed_dt_seconds();
        for _ in 0..count {
            let input = InputSnapshot::from_actions(self.held)
                .with_tap_world(self.pending_tap.take())
                .with_interact_pressed(std::mem::take(&mut self.pending_interact));
            let signals = self.session.tick(dt, &input, &mut self.flow);
            for signal in &signals {
                self.record(signal);
            }
        }
    }

    fn record(&mut self, signal: &RoomSignal) {
        self.signals_seen = self.signals_seen.saturating_add(1);
        match signal.kind() {
            SignalKind::ActorArrived => self.arrivals = self.arrivals.saturating_add(1),
            SignalKind::InteractionTriggered => {
                self.interactions = self.interactions.saturating_add(1)
            }
            _ => {}
        }
        info!(tick = self.session.tick_count(), signal = %signal, "room_signal");
    }

    fn finish_animation(&mut self) {
        let finished = self.session.actor().animation_key();
        match self.session.actor_mut().on_animation_complete(&finished) {
            Some(next) => info!(finished = %finished, next = %next, "animation_advanced"),
            None => debug!(finished = %finished, "animation_complete_ignored"),
        }
    }

    fn log_path_preview(&self, zone_id: &str) {
        match preview_path_to_zone(&self.session, zone_id) {
            Some(path) => {
                let waypoints = path
                    .waypoints()
                    .iter()
                    .map(|point| format!("({:.0},{:.0})", point.x, point.y))
                    .collect::<Vec<_>>()
                    .join(" ");
                info!(zone = zone_id, count = path.len(), waypoints = %waypoints, "path_preview");
            }
            None => warn!(zone = zone_id, "path_preview_unknown_zone"),
        }
    }

    fn dump(&self) {
        let actor = self.session.actor();
        let stats = match serde_json::to_string(self.session.stats()) {
            Ok(json) => json,
            Err(error) => {
                warn!(error = %error, "stats_serialize_failed");
                String::new()
            }
        };
        info!(
            flow = %self.flow.current(),
            x = actor.position().x,
            y = actor.position().y,
            facing = %actor.facing(),
            animation = %actor.animation_key(),
            zone = self.session.trigger().current_zone().unwrap_or("-"),
            stats = %stats,
            "room_dump"
        );
    }
}

#[cfg(test)]
mod tests {
    use room_engine::{parse_room_map, MapLayerSpec};

    use super::*;
    use crate::app::script::parse_script;

    fn test_map() -> RoomMap {
        let raw = serde_json::json!({
            "width": 8, "height": 6, "tilewidth": 32, "tileheight": 32,
            "layers": [
                { "type": "tilelayer", "name": "furnitures", "data": [
                    0, 0, 0, 0, 0, 0, 0, 0,
                    0, 1, 0, 0, 0, 0, 1, 0,
                    0, 0, 0, 0, 0, 0, 0, 0,
                    0, 0, 0, 0, 0, 0, 0, 0,
                    0, 0, 0, 0, 0, 0, 0, 0,
                    0, 0, 0, 0, 0, 0, 0, 0
                ] },
                { "type": "objectgroup", "name": "interactives", "objects": [
                    { "name": "bed", "x": 20, "y": 20, "width": 56, "height": 56 },
                    { "name": "computer", "x": 180, "y": 20, "width": 56, "height": 56 }
                ] }
            ]
        })
        .to_string();
        parse_room_map(&raw, &MapLayerSpec::default()).expect("map")
    }

    fn driver() -> ScriptDriver {
        ScriptDriver::new(test_map(), &RoomConfig::default())
    }

    fn run_script(driver: &mut ScriptDriver, raw: &str) {
        for command in parse_script(raw).expect("script") {
            driver.execute(command);
        }
    }

    #[test]
    fn walk_then_interact_counts_signals() {
        let mut driver = driver();
        run_script(&mut driver, "move_to computer\nwait 3000\ninteract\ntick");

        let summary = driver.summary();
        assert_eq!(summary.arrivals, 1);
        assert_eq!(summary.interactions, 1);
        assert_eq!(summary.flow, FlowState::InRoom);
        assert_eq!(driver.session().trigger().current_zone(), Some("computer"));
    }

    #[test]
    fn wait_turns_time_into_fixed_ticks() {
        let mut driver = driver();
        run_script(&mut driver, "wait 1000");
        let ticks = driver.summary().ticks;
        // 60 Hz, up to one tick of slack left in the accumulator.
        if std::env::var(room_engine::app::TPS_ENV_VAR).is_err() {
            assert!((59..=60).contains(&ticks), "ticks = {ticks}");
        }
    }

    #[test]
    fn held_keys_move_until_released() {
        let mut driver = driver();
        let start = driver.session().actor().position();
        run_script(&mut driver, "hold down\ntick 30\nrelease down\ntick 5");
        let after = driver.session().actor().position();
        assert!(after.y > start.y);

        run_script(&mut driver, "tick 30");
        assert_eq!(driver.session().actor().position(), after);
    }

    #[test]
    fn hurt_performance_loops_on_animation_done() {
        let mut driver = driver();
        run_script(&mut driver, "perform hurt\ntick\nanim_done\ntick");
        assert_eq!(driver.session().actor().animation_key(), "hurt");
        assert_eq!(driver.flow().current(), FlowState::InRoom);
    }
}
