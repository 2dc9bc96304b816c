use std::cell::Cell;
use std::rc::Rc;

use room_engine::app::{LessonOutcome, MotionMode, Purchase, SignalKind, StatsSource};
use room_engine::{
    parse_room_map, Facing, FlowMachine, FlowState, InputAction, InputSnapshot, MapLayerSpec,
    PerformanceKind, RoomCommand, RoomSession, RoomSessionConfig, RoomSignal, TransitionPolicy,
    Vec2,
};

const DT: f32 = 1.0 / 60.0;

/// 10x8 room: top wall row, a two-tile bed at (1..=2, 2), a computer at (8, 2)
/// whose zone overhangs its tile, and a walk-on desk zone at (5, 6).
fn room_json() -> String {
    let width = 10;
    let height = 8;
    let mut walls = vec![0u32; width * height];
    walls[..width].fill(1);
    let mut furnitures = vec![0u32; width * height];
    for (col, row) in [(1, 2), (2, 2), (8, 2)] {
        furnitures[row * width + col] = 7;
    }
    serde_json::json!({
        "width": width,
        "height": height,
        "tilewidth": 32,
        "tileheight": 32,
        "layers": [
            { "type": "tilelayer", "name": "walls", "data": walls },
            { "type": "tilelayer", "name": "furnitures", "data": furnitures },
            { "type": "objectgroup", "name": "interactives", "objects": [
                { "name": "bed", "x": 32, "y": 64, "width": 64, "height": 32 },
                { "name": "computer", "x": 244, "y": 52, "width": 56, "height": 56 },
                { "name": "desk", "x": 160, "y": 192, "width": 32, "height": 32 }
            ] }
        ]
    })
    .to_string()
}

fn session_with(policy: TransitionPolicy) -> (RoomSession, FlowMachine) {
    let map = parse_room_map(&room_json(), &MapLayerSpec::default()).expect("room map");
    let mut flow = FlowMachine::new(policy);
    let session = RoomSession::new(map, RoomSessionConfig::default(), &mut flow);
    (session, flow)
}

fn in_room_session() -> (RoomSession, FlowMachine) {
    let (mut session, mut flow) = session_with(TransitionPolicy::Strict);
    flow.set_state(FlowState::InRoom).expect("onboarding to room");
    session.tick(DT, &InputSnapshot::empty(), &mut flow);
    (session, flow)
}

fn run_ticks(
    session: &mut RoomSession,
    flow: &mut FlowMachine,
    input: &InputSnapshot,
    ticks: usize,
) -> Vec<RoomSignal> {
    let mut signals = Vec::new();
    for _ in 0..ticks {
        signals.extend(session.tick(DT, input, flow));
    }
    signals
}

fn flow_signals(signals: Vec<RoomSignal>) -> Vec<RoomSignal> {
    signals
        .into_iter()
        .filter(|signal| signal.kind() == SignalKind::FlowStateChanged)
        .collect()
}

#[test]
fn session_spawns_beside_the_spawn_zone_and_reports_initial_stats() {
    let (mut session, mut flow) = session_with(TransitionPolicy::Strict);
    let position = session.actor().position();
    let tile = session.grid().world_to_tile(position);

    assert!(!session.grid().is_tile_blocked(tile));
    assert!((0..=3).contains(&tile.col) && (1..=3).contains(&tile.row));
    assert_eq!(session.actor().facing(), Facing::Down);

    let signals = session.tick(DT, &InputSnapshot::empty(), &mut flow);
    assert_eq!(
        signals,
        [RoomSignal::StatsUpdated {
            source: StatsSource::Init
        }]
    );
}

#[test]
fn move_to_zone_arrives_once_and_notifies_once_listener() {
    let (mut session, mut flow) = in_room_session();
    let arrivals = Rc::new(Cell::new(0u32));
    let seen = Rc::clone(&arrivals);
    session
        .signals_mut()
        .subscribe_once(SignalKind::ActorArrived, move |_| seen.set(seen.get() + 1));

    session.enqueue(RoomCommand::MoveActorToZone {
        zone_id: "computer".to_string(),
    });
    let signals = run_ticks(&mut session, &mut flow, &InputSnapshot::empty(), 600);

    let arrived = signals
        .iter()
        .filter(|signal| **signal == RoomSignal::ActorArrived)
        .count();
    assert_eq!(arrived, 1);
    assert_eq!(arrivals.get(), 1);
    assert_eq!(session.signals_mut().listener_count(), 0);
    assert!(session.actor().position().distance(Vec2::new(272.0, 80.0)) < 46.0);
    assert_eq!(session.actor().facing(), Facing::Down);
    assert_eq!(session.trigger().current_zone(), Some("computer"));
}

#[test]
fn held_key_cancels_auto_walk_without_arrival() {
    let (mut session, mut flow) = in_room_session();
    session.enqueue(RoomCommand::MoveActorToZone {
        zone_id: "computer".to_string(),
    });
    run_ticks(&mut session, &mut flow, &InputSnapshot::empty(), 5);
    assert!(session.actor().is_auto_walking());

    let held = InputSnapshot::empty().with_action_down(InputAction::MoveDown, true);
    let mut signals = run_ticks(&mut session, &mut flow, &held, 10);
    assert_eq!(session.actor().mode(), MotionMode::ManualMove);
    assert!(session.actor().path().is_none());

    signals.extend(run_ticks(&mut session, &mut flow, &InputSnapshot::empty(), 120));
    assert!(!signals.contains(&RoomSignal::ActorArrived));
    assert_eq!(session.actor().mode(), MotionMode::Idle);
}

#[test]
fn unknown_zone_command_is_skipped() {
    let (mut session, mut flow) = in_room_session();
    session.enqueue(RoomCommand::MoveActorToZone {
        zone_id: "attic".to_string(),
    });
    session.tick(DT, &InputSnapshot::empty(), &mut flow);

    let stats = session.last_tick_command_stats();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.skipped, 1);
    assert!(session.actor().path().is_none());
}

#[test]
fn taps_only_move_the_actor_while_in_room() {
    let (mut session, mut flow) = session_with(TransitionPolicy::Strict);
    let tap = InputSnapshot::empty().with_tap_world(Some(Vec2::new(176.0, 208.0)));

    session.tick(DT, &tap, &mut flow);
    assert!(session.actor().path().is_none());

    flow.set_state(FlowState::InRoom).expect("room");
    session.tick(DT, &tap, &mut flow);
    assert!(session.actor().path().is_some());
    assert!(!session.actor().is_auto_walking());

    let signals = run_ticks(&mut session, &mut flow, &InputSnapshot::empty(), 600);
    assert!(!signals.contains(&RoomSignal::ActorArrived));
    assert_eq!(session.trigger().current_zone(), Some("desk"));
}

#[test]
fn low_lesson_score_plays_hurt_then_returns_to_room() {
    let (mut session, mut flow) = in_room_session();
    for command in [
        RoomCommand::SetFlowState {
            state: FlowState::Lesson,
        },
        RoomCommand::CompleteLesson {
            outcome: LessonOutcome::new("algebra", 30, 0.1),
        },
        RoomCommand::SetFlowState {
            state: FlowState::StoryTelling,
        },
        RoomCommand::SetFlowState {
            state: FlowState::StateUpdate,
        },
    ] {
        session.enqueue(command);
    }
    let signals = session.tick(DT, &InputSnapshot::empty(), &mut flow);

    assert_eq!(flow.current(), FlowState::StateUpdate);
    assert!(signals.contains(&RoomSignal::StatsUpdated {
        source: StatsSource::Lesson
    }));
    assert!(signals.contains(&RoomSignal::FlowStateChanged {
        from: FlowState::StoryTelling,
        to: FlowState::StateUpdate,
    }));
    let performance = session.actor().performance().expect("performance");
    assert_eq!(performance.kind(), PerformanceKind::Hurt);
    assert!(session.actor().path().is_none());
    assert_eq!(session.stats().week, 2);

    let signals = run_ticks(&mut session, &mut flow, &InputSnapshot::empty(), 310);
    assert_eq!(flow.current(), FlowState::InRoom);
    assert!(!session.actor().is_performing());
    assert!(signals.contains(&RoomSignal::FlowStateChanged {
        from: FlowState::StateUpdate,
        to: FlowState::InRoom,
    }));
}

#[test]
fn rejected_purchase_still_picks_spellcast() {
    let (mut session, mut flow) = in_room_session();
    session.enqueue(RoomCommand::BuyItem {
        purchase: Purchase {
            cost: 500,
            hunger_gain: 10,
            t_value_gain: 0,
        },
    });
    session.tick(DT, &InputSnapshot::empty(), &mut flow);
    assert_eq!(session.last_tick_command_stats().skipped, 1);
    assert_eq!(session.stats().money, 100);

    flow.set_state(FlowState::Lesson).expect("lesson");
    flow.set_state(FlowState::StoryTelling).expect("story");
    flow.set_state(FlowState::StateUpdate).expect("update");
    session.tick(DT, &InputSnapshot::empty(), &mut flow);

    assert_eq!(
        session.actor().performance().map(|performance| performance.kind()),
        Some(PerformanceKind::Spellcast)
    );
}

#[test]
fn strict_flow_rejects_unobserved_transition() {
    let (mut session, mut flow) = session_with(TransitionPolicy::Strict);
    session.enqueue(RoomCommand::SetFlowState {
        state: FlowState::Lesson,
    });
    session.tick(DT, &InputSnapshot::empty(), &mut flow);

    assert_eq!(flow.current(), FlowState::Onboarding);
    assert_eq!(session.last_tick_command_stats().skipped, 1);
}

#[test]
fn story_telling_walks_to_the_computer() {
    let (mut session, mut flow) = in_room_session();
    flow.set_state(FlowState::Lesson).expect("lesson");
    flow.set_state(FlowState::StoryTelling).expect("story");

    let signals = run_ticks(&mut session, &mut flow, &InputSnapshot::empty(), 600);
    assert!(signals.contains(&RoomSignal::ActorArrived));
    assert!(session.actor().position().distance(Vec2::new(272.0, 80.0)) < 46.0);
}

#[test]
fn interact_press_fires_for_the_zone_in_range() {
    let (mut session, mut flow) = in_room_session();
    session.enqueue(RoomCommand::MoveActorToZone {
        zone_id: "computer".to_string(),
    });
    run_ticks(&mut session, &mut flow, &InputSnapshot::empty(), 600);

    let signals = session.tick(
        DT,
        &InputSnapshot::empty().with_interact_pressed(true),
        &mut flow,
    );
    assert_eq!(
        signals,
        [RoomSignal::InteractionTriggered {
            zone_id: "computer".to_string()
        }]
    );
}

#[test]
fn host_transitions_between_ticks_are_all_reacted_to() {
    let (mut session, mut flow) = in_room_session();
    flow.set_state(FlowState::Lesson).expect("lesson");
    flow.set_state(FlowState::StoryTelling).expect("story");

    let signals = flow_signals(session.tick(DT, &InputSnapshot::empty(), &mut flow));
    assert_eq!(
        signals,
        [
            RoomSignal::FlowStateChanged {
                from: FlowState::InRoom,
                to: FlowState::Lesson,
            },
            RoomSignal::FlowStateChanged {
                from: FlowState::Lesson,
                to: FlowState::StoryTelling,
            },
        ]
    );
    assert!(session.actor().is_auto_walking());

    flow.set_state(FlowState::StateUpdate).expect("update");
    flow.set_state(FlowState::InRoom).expect("back to room");
    let signals = flow_signals(session.tick(DT, &InputSnapshot::empty(), &mut flow));
    assert_eq!(
        signals,
        [
            RoomSignal::FlowStateChanged {
                from: FlowState::StoryTelling,
                to: FlowState::StateUpdate,
            },
            RoomSignal::FlowStateChanged {
                from: FlowState::StateUpdate,
                to: FlowState::InRoom,
            },
        ]
    );
    assert!(!session.actor().is_performing());
    assert!(session.actor().path().is_none());
}

#[test]
fn detached_session_stops_listening() {
    let (session, mut flow) = in_room_session();
    assert_eq!(flow.listener_count(), 1);
    session.detach(&mut flow);
    assert_eq!(flow.listener_count(), 0);
}

#[test]
fn move_to_zone_during_a_performance_still_arrives() {
    let (mut session, mut flow) = in_room_session();
    session.enqueue(RoomCommand::StartPerformance {
        kind: PerformanceKind::Emote,
    });
    session.enqueue(RoomCommand::MoveActorToZone {
        zone_id: "desk".to_string(),
    });

    let signals = run_ticks(&mut session, &mut flow, &InputSnapshot::empty(), 600);
    let arrived = signals
        .iter()
        .filter(|signal| **signal == RoomSignal::ActorArrived)
        .count();
    assert_eq!(arrived, 1);
    assert!(!session.actor().is_performing());
    assert_eq!(session.trigger().current_zone(), Some("desk"));
}

#[test]
fn move_to_zone_while_locked_arrives_in_place() {
    let (mut session, mut flow) = in_room_session();
    let start = session.actor().position();
    session.actor_mut().set_locked(true);
    session.actor_mut().face_direction(Facing::Left);
    session.enqueue(RoomCommand::MoveActorToZone {
        zone_id: "desk".to_string(),
    });

    let signals = session.tick(DT, &InputSnapshot::empty(), &mut flow);
    assert_eq!(signals, [RoomSignal::ActorArrived]);
    assert_eq!(session.actor().position(), start);
    assert_eq!(session.actor().facing(), Facing::Down);
    assert_eq!(session.last_tick_command_stats().skipped, 0);
}

#[test]
fn unlock_ending_without_an_id_uses_the_current_stats() {
    let (mut session, mut flow) = in_room_session();
    session.enqueue(RoomCommand::UpdateCloseness { amount: 40 });
    session.enqueue(RoomCommand::UnlockEnding { ending_id: None });
    let signals = session.tick(DT, &InputSnapshot::empty(), &mut flow);

    assert!(signals.contains(&RoomSignal::StatsUpdated {
        source: StatsSource::UnlockEnding
    }));
    let history = session.stats().ending_history();
    assert_eq!(history.len(), 1);
    // t-value 50, academic 0, closeness 90.
    assert_eq!(history[0].ending_id, "story_stowaway_police");
    assert_eq!(session.stats().latest_ending_week, 1);
}
