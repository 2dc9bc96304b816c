use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{
    Actor, ActorConfig, CommandApplyStats, CommandQueue, Facing, FlowChange, FlowMachine,
    FlowState, GridModel, InputSnapshot, InteractionTrigger, LessonOutcome, MotionEvent, NavPath,
    Pathfinder, PerformanceKind, PlayerStats, Purchase, RoomCommand, RoomSignal, SignalBus,
    StatsConfig, StatsSource, SubscriptionId, TooltipCatalog, Vec2, ZoneRegistry,
};
use crate::content::RoomMap;

/// Spawn fallback distance to the right of a zone with no walkable neighbour.
const SPAWN_FALLBACK_OFFSET_PX: f32 = 32.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoomSessionConfig {
    pub spawn_zone: String,
    pub actor: ActorConfig,
    pub stats: StatsConfig,
    pub tooltips: TooltipCatalog,
    /// Seconds the post-lesson stats animation holds before returning to the room.
    pub state_update_hold_seconds: Option<f32>,
    /// Zone the actor walks to when a story starts playing.
    pub story_walk_zone: Option<String>,
}

impl Default for RoomSessionConfig {
    fn default() -> Self {
        Self {
            spawn_zone: "bed".to_string(),
            actor: ActorConfig::default(),
            stats: StatsConfig::default(),
            tooltips: TooltipCatalog::default(),
            state_update_hold_seconds: Some(5.0),
            story_walk_zone: Some("computer".to_string()),
        }
    }
}

/// What the most recent stats-changing action was; picks the StateUpdate performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateContext {
    Buy,
    Lesson { score: i32 },
}

impl UpdateContext {
    pub fn performance(context: Option<UpdateContext>) -> PerformanceKind {
        match context {
            Some(UpdateContext::Lesson { score }) if score < 40 => PerformanceKind::Hurt,
            Some(UpdateContext::Lesson { score }) if score < 70 => PerformanceKind::Thrust,
            Some(UpdateContext::Lesson { .. }) => PerformanceKind::Emote,
            Some(UpdateContext::Buy) | None => PerformanceKind::Spellcast,
        }
    }
}

/// One loaded room: grid, zones, the actor and everything that reacts to them.
///
/// The flow machine is lent in on every tick rather than owned, so a session can
/// be torn down and rebuilt without losing the game's flow state. Every change the
/// machine announces is queued and reacted to in order on the next tick.
#[derive(Debug)]
pub struct RoomSession {
    config: RoomSessionConfig,
    grid: GridModel,
    zones: ZoneRegistry,
    actor: Actor,
    trigger: InteractionTrigger,
    stats: PlayerStats,
    signals: SignalBus,
    commands: CommandQueue,
    last_update: Option<UpdateContext>,
    flow_changes: Rc<RefCell<VecDeque<FlowChange>>>,
    flow_subscription: SubscriptionId,
    state_update_elapsed: f32,
    tick_count: u64,
}

impl RoomSession {
    pub fn new(map: RoomMap, config: RoomSessionConfig, flow: &mut FlowMachine) -> Self {
        let RoomMap { grid, zones } = map;
        let flow_changes = Rc::new(RefCell::new(VecDeque::new()));
        let pending: Weak<RefCell<VecDeque<FlowChange>>> = Rc::downgrade(&flow_changes);
        let flow_subscription = flow.subscribe(move |change| {
            if let Some(pending) = pending.upgrade() {
                pending.borrow_mut().push_back(change);
            }
        });
        let center = Vec2 {
            x: grid.width_px() * 0.5,
            y: grid.height_px() * 0.5,
        };
        let mut session = Self {
            actor: Actor::new(center, config.actor),
            trigger: InteractionTrigger::new(config.tooltips.clone()),
            stats: PlayerStats::new(config.stats),
            signals: SignalBus::default(),
            commands: CommandQueue::default(),
            last_update: None,
            flow_changes,
            flow_subscription,
            state_update_elapsed: 0.0,
            tick_count: 0,
            grid,
            zones,
            config,
        };
        let spawn_zone = session.config.spawn_zone.clone();
        session.respawn_at(&spawn_zone);
        session.signals.emit(RoomSignal::StatsUpdated {
            source: StatsSource::Init,
        });
        info!(
            spawn_zone = %spawn_zone,
            x = session.actor.position().x,
            y = session.actor.position().y,
            zone_count = session.zones.len(),
            "room_session_started"
        );
        session
    }

    /// Stops listening to `flow`. Call before dropping a session whose flow machine lives on.
    pub fn detach(self, flow: &mut FlowMachine) {
        flow.unsubscribe(self.flow_subscription);
    }

    pub fn grid(&self) -> &GridModel {
        &self.grid
    }

    pub fn zones(&self) -> &ZoneRegistry {
        &self.zones
    }

    pub fn pathfinder(&self) -> Pathfinder<'_> {
        Pathfinder::new(&self.grid)
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn actor_mut(&mut self) -> &mut Actor {
        &mut self.actor
    }

    pub fn trigger(&self) -> &InteractionTrigger {
        &self.trigger
    }

    pub fn stats(&self) -> &PlayerStats {
        &self.stats
    }

    pub fn signals_mut(&mut self) -> &mut SignalBus {
        &mut self.signals
    }

    pub fn last_update_context(&self) -> Option<UpdateContext> {
        self.last_update
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn enqueue(&mut self, command: RoomCommand) {
        self.commands.enqueue(command);
    }

    pub fn last_tick_command_stats(&self) -> CommandApplyStats {
        self.commands.last_tick_apply_stats()
    }

    /// Runs one fixed step and returns the signals it produced, already delivered
    /// to subscribers.
    pub fn tick(
        &mut self,
        dt_seconds: f32,
        input: &InputSnapshot,
        flow: &mut FlowMachine,
    ) -> Vec<RoomSignal> {
        self.tick_count = self.tick_count.saturating_add(1);
        self.sync_flow();
        self.apply_commands(flow);

        let flow_state = flow.current();
        let navigation_input = if flow_state.allows_navigation() {
            if let Some(point) = input.tap_world() {
                self.tap_at(point, flow_state);
            }
            InputSnapshot::from_actions(input.actions())
        } else {
            InputSnapshot::empty()
        };

        if let Some(MotionEvent::Arrived(kind)) =
            self.actor.update(dt_seconds, &navigation_input, &self.grid)
        {
            info!(
                kind = ?kind,
                x = self.actor.position().x,
                y = self.actor.position().y,
                "actor_arrived"
            );
            self.signals.emit(RoomSignal::ActorArrived);
        }

        if let Some(source) = self.stats.tick(dt_seconds) {
            self.signals.emit(RoomSignal::StatsUpdated { source });
        }

        self.advance_state_update_hold(dt_seconds, flow);

        self.trigger
            .update(&self.actor, &self.zones, flow.current(), &mut self.signals);
        if input.interact_pressed() {
            self.trigger.trigger(flow.current(), &mut self.signals);
        }

        self.signals.finish_tick_rollover()
    }

    /// Pointer tap in world space. Taps on a zone walk to its best access point.
    pub fn tap_at(&mut self, point: Vec2, flow_state: FlowState) -> bool {
        if !flow_state.allows_navigation() {
            debug!(flow = %flow_state, "tap_ignored_outside_room");
            return false;
        }
        let start = self.actor.position();
        let pathfinder = Pathfinder::new(&self.grid);
        let path = match self.zones.get_zone_at(point) {
            Some(zone) => {
                debug!(zone = zone.id(), "tap_on_zone");
                pathfinder.find_path_to_zone(start, zone)
            }
            None => pathfinder.find_path(start, point),
        };
        self.actor.walk_path(path, false)
    }

    /// Auto-walks to `zone_id`. An empty path counts as an immediate arrival.
    pub fn move_actor_to_zone(&mut self, zone_id: &str) -> bool {
        let Some(zone) = self.zones.get_zone_by_id(zone_id) else {
            warn!(zone = zone_id, "move_to_unknown_zone");
            return false;
        };
        let path = Pathfinder::new(&self.grid).find_path_to_zone(self.actor.position(), zone);
        if path.is_empty() {
            warn!(zone = zone_id, "no_path_to_zone_force_arrival");
            self.force_arrival();
            return true;
        }
        if self.actor.is_performing() {
            debug!(zone = zone_id, "auto_walk_stops_performance");
            self.actor.stop_performance();
        }
        info!(zone = zone_id, waypoints = path.len(), "actor_auto_walk");
        if !self.actor.walk_path(path, true) {
            warn!(zone = zone_id, "auto_walk_refused_force_arrival");
            self.force_arrival();
        }
        true
    }

    /// Scripted walks always end in an arrival, even when the actor cannot move.
    fn force_arrival(&mut self) {
        self.actor.face_direction(Facing::Down);
        self.signals.emit(RoomSignal::ActorArrived);
    }

    /// Places the actor on the best access point of `zone_id`, judged from the room center.
    pub fn respawn_at(&mut self, zone_id: &str) {
        let room_center = Vec2 {
            x: self.grid.width_px() * 0.5,
            y: self.grid.height_px() * 0.5,
        };
        let Some(zone) = self.zones.get_zone_by_id(zone_id) else {
            warn!(zone = zone_id, "respawn_zone_missing_using_room_center");
            self.actor.teleport(room_center);
            return;
        };

        let pathfinder = Pathfinder::new(&self.grid);
        let spawn = match pathfinder.get_sorted_access_points(room_center, zone).first() {
            Some(point) => Some(point.world),
            None => {
                warn!(zone = zone_id, "respawn_without_access_point");
                pathfinder.find_closest_walkable_point(zone.center())
            }
        };
        let position = spawn.unwrap_or(Vec2 {
            x: zone.center().x + zone.width() * 0.5 + SPAWN_FALLBACK_OFFSET_PX,
            y: zone.center().y,
        });
        self.actor.teleport(position);
        self.actor.face_direction(Facing::Down);
    }

    fn apply_commands(&mut self, flow: &mut FlowMachine) {
        let mut stats = CommandApplyStats::default();
        for command in self.commands.drain_current_tick() {
            stats.record_command(command.kind());
            if !self.apply_command(command, flow) {
                stats.record_skipped();
            }
            self.sync_flow();
        }
        self.commands.set_last_tick_apply_stats(stats);
    }

    fn apply_command(&mut self, command: RoomCommand, flow: &mut FlowMachine) -> bool {
        match command {
            RoomCommand::MoveActorToZone { zone_id } => self.move_actor_to_zone(&zone_id),
            RoomCommand::FaceDirection { facing } => {
                self.actor.face_direction(facing);
                true
            }
            RoomCommand::SetFlowState { state } => match flow.set_state(state) {
                Ok(_) => true,
                Err(error) => {
                    warn!(error = %error, "flow_transition_rejected");
                    false
                }
            },
            RoomCommand::TapAt { point } => self.tap_at(point, flow.current()),
            RoomCommand::TriggerInteraction => {
                self.trigger.trigger(flow.current(), &mut self.signals).is_some()
            }
            RoomCommand::CompleteLesson { outcome } => {
                self.complete_lesson(&outcome);
                true
            }
            RoomCommand::BuyItem { purchase } => self.buy(purchase),
            RoomCommand::GrantMoney { amount } => {
                let source = self.stats.grant_money(amount);
                self.emit_stats(source);
                true
            }
            RoomCommand::ConsumeHunger { amount } => {
                let source = self.stats.consume_hunger(amount);
                self.emit_stats(source);
                true
            }
            RoomCommand::UpdateCloseness { amount } => {
                let source = self.stats.update_closeness(amount);
                self.emit_stats(source);
                true
            }
            RoomCommand::UnlockEnding { ending_id } => {
                let ending_id = ending_id.unwrap_or_else(|| self.stats.ending_id().to_string());
                let source = self.stats.unlock_ending(&ending_id);
                self.emit_stats(source);
                true
            }
            RoomCommand::StartPerformance { kind } => {
                self.actor.start_performance(kind);
                true
            }
            RoomCommand::StopPerformance => {
                self.actor.stop_performance();
                true
            }
            RoomCommand::RespawnAt { zone_id } => {
                self.respawn_at(&zone_id);
                true
            }
        }
    }

    fn complete_lesson(&mut self, outcome: &LessonOutcome) {
        self.last_update = Some(UpdateContext::Lesson {
            score: outcome.score,
        });
        let source = self.stats.complete_lesson(outcome);
        info!(
            lesson = %outcome.lesson_id,
            score = outcome.score,
            academic_score = self.stats.academic_score,
            week = self.stats.week,
            "lesson_completed"
        );
        self.emit_stats(source);
    }

    fn buy(&mut self, purchase: Purchase) -> bool {
        self.last_update = Some(UpdateContext::Buy);
        match self.stats.buy(purchase) {
            Some(source) => {
                self.emit_stats(source);
                true
            }
            None => false,
        }
    }

    fn emit_stats(&mut self, source: StatsSource) {
        self.signals.emit(RoomSignal::StatsUpdated { source });
    }

    /// Reacts to every flow change queued since the last drain, oldest first.
    fn sync_flow(&mut self) {
        loop {
            let next = self.flow_changes.borrow_mut().pop_front();
            let Some(change) = next else {
                break;
            };
            self.react_to_flow(change);
        }
    }

    fn react_to_flow(&mut self, FlowChange { from, to }: FlowChange) {
        self.signals.emit(RoomSignal::FlowStateChanged { from, to });

        match to {
            FlowState::StateUpdate => {
                self.actor.stop_movement();
                let kind = UpdateContext::performance(self.last_update);
                debug!(performance = kind.as_token(), "state_update_performance");
                self.actor.start_performance(kind);
                self.trigger.hide(&mut self.signals);
                self.state_update_elapsed = 0.0;
            }
            FlowState::InRoom => self.actor.stop_performance(),
            FlowState::StoryTelling => {
                if let Some(zone_id) = self.config.story_walk_zone.clone() {
                    self.move_actor_to_zone(&zone_id);
                }
            }
            _ => {}
        }
    }

    fn advance_state_update_hold(&mut self, dt_seconds: f32, flow: &mut FlowMachine) {
        let Some(hold) = self.config.state_update_hold_seconds else {
            return;
        };
        if !flow.is(FlowState::StateUpdate) {
            return;
        }
        self.state_update_elapsed += dt_seconds;
        if self.state_update_elapsed < hold {
            return;
        }
        if let Err(error) = flow.set_state(FlowState::InRoom) {
            warn!(error = %error, "state_update_return_rejected");
            return;
        }
        self.sync_flow();
    }
}

/// Path the actor would take to `zone_id` from where it stands, without walking it.
pub fn preview_path_to_zone(session: &RoomSession, zone_id: &str) -> Option<NavPath> {
    let zone = session.zones().get_zone_by_id(zone_id)?;
    Some(
        session
            .pathfinder()
            .find_path_to_zone(session.actor().position(), zone),
    )
}
