mod actor;
mod ending;
mod flow;
mod geometry;
mod grid;
mod input;
mod interaction;
mod loop_runner;
mod nav;
mod session;
mod signals;
mod stats;
mod zones;

pub use actor::{
    Actor, ActorConfig, ArrivalKind, Facing, MotionEvent, MotionMode, ParseFacingError,
    ParsePerformanceError, Performance, PerformanceKind, PERFORMANCE_DIRECTIONS,
};
pub use ending::{
    determine_ending_id, EndingScenario, StatLevel, DEFAULT_ENDING_ID, ENDING_TABLE,
};
pub use flow::{
    is_observed_transition, FlowChange, FlowMachine, FlowState, FlowTransitionError,
    ParseFlowStateError, SubscriptionId, TransitionPolicy,
};
pub use geometry::{Rect, Vec2};
pub use grid::{CollisionLayer, GridError, GridModel, TileCoord, DEFAULT_TILE_SIZE_PX};
pub use input::{ActionStates, InputAction, InputSnapshot};
pub use interaction::{
    InteractionTrigger, TooltipCatalog, TooltipEntry, TooltipPlacement, TooltipStyle, TooltipView,
};
pub use loop_runner::{FixedStepClock, LoopConfig, StepPlan, TPS_ENV_VAR};
pub use nav::{
    AccessPoint, NavPath, Pathfinder, ACCESS_CENTER_BAND_PX_SQ, ARRIVED_RADIUS_PX,
    NON_CARDINAL_PENALTY, WALKABLE_SEARCH_MAX_RADIUS,
};
pub use session::{preview_path_to_zone, RoomSession, RoomSessionConfig, UpdateContext};
pub use signals::{
    CommandApplyStats, CommandQueue, ListenerId, RoomCommand, RoomCommandKind, RoomSignal,
    SignalBus, SignalCounts, SignalKind,
};
pub use stats::{
    round_half_up, EndingRecord, LessonOutcome, LessonRecord, PlayerStats, Purchase, StatsConfig,
    StatsSource, StoryEntry, STAT_MAX, STAT_MIN,
};
pub use zones::{InteractionZone, ZoneRegistry, ZoneRegistryError, DEFAULT_ZONE_SIZE_PX};
