use std::fmt;

use super::{Facing, FlowState, LessonOutcome, PerformanceKind, Purchase, StatsSource, Vec2};

/// Outbound notifications from a room session.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomSignal {
    ActorArrived,
    InteractionTriggered { zone_id: String },
    FlowStateChanged { from: FlowState, to: FlowState },
    StatsUpdated { source: StatsSource },
    TooltipShown { zone_id: String },
    TooltipHidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    ActorArrived,
    InteractionTriggered,
    FlowStateChanged,
    StatsUpdated,
    TooltipShown,
    TooltipHidden,
}

impl RoomSignal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::ActorArrived => SignalKind::ActorArrived,
            Self::InteractionTriggered { .. } => SignalKind::InteractionTriggered,
            Self::FlowStateChanged { .. } => SignalKind::FlowStateChanged,
            Self::StatsUpdated { .. } => SignalKind::StatsUpdated,
            Self::TooltipShown { .. } => SignalKind::TooltipShown,
            Self::TooltipHidden => SignalKind::TooltipHidden,
        }
    }
}

impl fmt::Display for RoomSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActorArrived => f.write_str("actor_arrived"),
            Self::InteractionTriggered { zone_id } => write!(f, "interaction_triggered({zone_id})"),
            Self::FlowStateChanged { from, to } => write!(f, "flow_state_changed({from} -> {to})"),
            Self::StatsUpdated { source } => write!(f, "stats_updated({source})"),
            Self::TooltipShown { zone_id } => write!(f, "tooltip_shown({zone_id})"),
            Self::TooltipHidden => f.write_str("tooltip_hidden"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalCounts {
    pub total: u32,
    pub actor_arrived: u32,
    pub interaction_triggered: u32,
    pub flow_state_changed: u32,
    pub stats_updated: u32,
    pub tooltip_shown: u32,
    pub tooltip_hidden: u32,
}

impl SignalCounts {
    fn record(&mut self, kind: SignalKind) {
        self.total = self.total.saturating_add(1);
        match kind {
            SignalKind::ActorArrived => self.actor_arrived = self.actor_arrived.saturating_add(1),
            SignalKind::InteractionTriggered => {
                self.interaction_triggered = self.interaction_triggered.saturating_add(1)
            }
            SignalKind::FlowStateChanged => {
                self.flow_state_changed = self.flow_state_changed.saturating_add(1)
            }
            SignalKind::StatsUpdated => self.stats_updated = self.stats_updated.saturating_add(1),
            SignalKind::TooltipShown => self.tooltip_shown = self.tooltip_shown.saturating_add(1),
            SignalKind::TooltipHidden => {
                self.tooltip_hidden = self.tooltip_hidden.saturating_add(1)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type SignalListener = Box<dyn FnMut(&RoomSignal)>;

struct ListenerEntry {
    id: ListenerId,
    kind: SignalKind,
    once: bool,
    callback: SignalListener,
}

/// Typed mediator between the room core and its hosts.
///
/// Signals raised during a tick are queued and delivered together, in emission
/// order, when the tick rolls over.
#[derive(Default)]
pub struct SignalBus {
    current_tick_signals: Vec<RoomSignal>,
    listeners: Vec<ListenerEntry>,
    next_listener: u64,
    last_tick_counts: SignalCounts,
}

impl fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalBus")
            .field("pending", &self.current_tick_signals)
            .field("listener_count", &self.listeners.len())
            .field("last_tick_counts", &self.last_tick_counts)
            .finish()
    }
}

impl SignalBus {
    pub fn emit(&mut self, signal: RoomSignal) {
        self.current_tick_signals.push(signal);
    }

    pub fn iter_emitted_so_far(&self) -> impl Iterator<Item = &RoomSignal> {
        self.current_tick_signals.iter()
    }

    pub fn subscribe(
        &mut self,
        kind: SignalKind,
        listener: impl FnMut(&RoomSignal) + 'static,
    ) -> ListenerId {
        self.add_listener(kind, false, Box::new(listener))
    }

    /// Listener detached right after its first delivery.
    pub fn subscribe_once(
        &mut self,
        kind: SignalKind,
        listener: impl FnMut(&RoomSignal) + 'static,
    ) -> ListenerId {
        self.add_listener(kind, true, Box::new(listener))
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|entry| entry.id != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Delivers every queued signal, records counts, and hands the signals back.
    pub fn finish_tick_rollover(&mut self) -> Vec<RoomSignal> {
        let signals = std::mem::take(&mut self.current_tick_signals);
        let mut counts = SignalCounts::default();
        for signal in &signals {
            let kind = signal.kind();
            counts.record(kind);
            let mut index = 0;
            while index < self.listeners.len() {
                let entry = &mut self.listeners[index];
                if entry.kind != kind {
                    index += 1;
                    continue;
                }
                (entry.callback)(signal);
                if entry.once {
                    self.listeners.remove(index);
                } else {
                    index += 1;
                }
            }
        }
        self.last_tick_counts = counts;
        signals
    }

    pub fn last_tick_counts(&self) -> SignalCounts {
        self.last_tick_counts
    }

    fn add_listener(&mut self, kind: SignalKind, once: bool, callback: SignalListener) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener = self.next_listener.saturating_add(1);
        self.listeners.push(ListenerEntry {
            id,
            kind,
            once,
            callback,
        });
        id
    }
}

/// Inbound requests, applied at the start of the next tick in FIFO order.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomCommand {
    MoveActorToZone { zone_id: String },
    FaceDirection { facing: Facing },
    SetFlowState { state: FlowState },
    TapAt { point: Vec2 },
    TriggerInteraction,
    CompleteLesson { outcome: LessonOutcome },
    BuyItem { purchase: Purchase },
    GrantMoney { amount: i64 },
    ConsumeHunger { amount: i32 },
    UpdateCloseness { amount: i32 },
    /// Records an ending. `None` picks the one the current stats lead to.
    UnlockEnding { ending_id: Option<String> },
    StartPerformance { kind: PerformanceKind },
    StopPerformance,
    RespawnAt { zone_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomCommandKind {
    MoveActorToZone,
    FaceDirection,
    SetFlowState,
    TapAt,
    TriggerInteraction,
    CompleteLesson,
    BuyItem,
    GrantMoney,
    ConsumeHunger,
    UpdateCloseness,
    UnlockEnding,
    StartPerformance,
    StopPerformance,
    RespawnAt,
}

impl RoomCommand {
    pub fn kind(&self) -> RoomCommandKind {
        match self {
            Self::MoveActorToZone { .. } => RoomCommandKind::MoveActorToZone,
            Self::FaceDirection { .. } => RoomCommandKind::FaceDirection,
            Self::SetFlowState { .. } => RoomCommandKind::SetFlowState,
            Self::TapAt { .. } => RoomCommandKind::TapAt,
            Self::TriggerInteraction => RoomCommandKind::TriggerInteraction,
            Self::CompleteLesson { .. } => RoomCommandKind::CompleteLesson,
            Self::BuyItem { .. } => RoomCommandKind::BuyItem,
            Self::GrantMoney { .. } => RoomCommandKind::GrantMoney,
            Self::ConsumeHunger { .. } => RoomCommandKind::ConsumeHunger,
            Self::UpdateCloseness { .. } => RoomCommandKind::UpdateCloseness,
            Self::UnlockEnding { .. } => RoomCommandKind::UnlockEnding,
            Self::StartPerformance { .. } => RoomCommandKind::StartPerformance,
            Self::StopPerformance => RoomCommandKind::StopPerformance,
            Self::RespawnAt { .. } => RoomCommandKind::RespawnAt,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandApplyStats {
    pub total: u32,
    pub movement: u32,
    pub flow: u32,
    pub stats: u32,
    pub performance: u32,
    pub skipped: u32,
}

impl CommandApplyStats {
    pub fn record_command(&mut self, kind: RoomCommandKind) {
        self.total = self.total.saturating_add(1);
        match kind {
            RoomCommandKind::MoveActorToZone
            | RoomCommandKind::FaceDirection
            | RoomCommandKind::TapAt
            | RoomCommandKind::RespawnAt => self.movement = self.movement.saturating_add(1),
            RoomCommandKind::SetFlowState | RoomCommandKind::TriggerInteraction => {
                self.flow = self.flow.saturating_add(1)
            }
            RoomCommandKind::CompleteLesson
            | RoomCommandKind::BuyItem
            | RoomCommandKind::GrantMoney
            | RoomCommandKind::ConsumeHunger
            | RoomCommandKind::UpdateCloseness
            | RoomCommandKind::UnlockEnding => self.stats = self.stats.saturating_add(1),
            RoomCommandKind::StartPerformance | RoomCommandKind::StopPerformance => {
                self.performance = self.performance.saturating_add(1)
            }
        }
    }

    pub fn record_skipped(&mut self) {
        self.skipped = self.skipped.saturating_add(1);
    }
}

#[derive(Debug, Default)]
pub struct CommandQueue {
    commands: Vec<RoomCommand>,
    last_tick_apply_stats: CommandApplyStats,
}

impl CommandQueue {
    pub fn enqueue(&mut self, command: RoomCommand) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn drain_current_tick(&mut self) -> Vec<RoomCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn set_last_tick_apply_stats(&mut self, stats: CommandApplyStats) {
        self.last_tick_apply_stats = stats;
    }

    pub fn last_tick_apply_stats(&self) -> CommandApplyStats {
        self.last_tick_apply_stats
    }
}
