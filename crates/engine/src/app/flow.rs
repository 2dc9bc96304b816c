use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FlowState {
    #[default]
    Onboarding,
    InRoom,
    Interaction,
    Lesson,
    StoryTelling,
    StateUpdate,
    EndingTelling,
}

impl FlowState {
    pub const ALL: [FlowState; 7] = [
        FlowState::Onboarding,
        FlowState::InRoom,
        FlowState::Interaction,
        FlowState::Lesson,
        FlowState::StoryTelling,
        FlowState::StateUpdate,
        FlowState::EndingTelling,
    ];

    pub const fn as_token(self) -> &'static str {
        match self {
            FlowState::Onboarding => "Onboarding",
            FlowState::InRoom => "InRoom",
            FlowState::Interaction => "Interaction",
            FlowState::Lesson => "Lesson",
            FlowState::StoryTelling => "StoryTelling",
            FlowState::StateUpdate => "StateUpdate",
            FlowState::EndingTelling => "EndingTelling",
        }
    }

    /// Navigation input and the interaction prompt are live only in the room.
    pub fn allows_navigation(self) -> bool {
        self == FlowState::InRoom
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown flow state '{0}'")]
pub struct ParseFlowStateError(String);

impl FromStr for FlowState {
    type Err = ParseFlowStateError;

    /// Accepts the canonical token case-insensitively.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        FlowState::ALL
            .into_iter()
            .find(|state| state.as_token().eq_ignore_ascii_case(raw))
            .ok_or_else(|| ParseFlowStateError(raw.to_string()))
    }
}

/// True for the transitions the game actually drives.
///
/// Any state may fall back to `Onboarding` (system reset).
pub fn is_observed_transition(from: FlowState, to: FlowState) -> bool {
    use FlowState::*;
    matches!(
        (from, to),
        (_, Onboarding)
            | (Onboarding, InRoom)
            | (InRoom, Interaction)
            | (Interaction, InRoom)
            | (InRoom, Lesson)
            | (Lesson, StoryTelling)
            | (StoryTelling, StateUpdate)
            | (StoryTelling, InRoom)
            | (StateUpdate, InRoom)
            | (InRoom, EndingTelling)
            | (EndingTelling, InRoom)
    )
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransitionPolicy {
    /// Any-to-any; unobserved transitions are logged.
    #[default]
    Permissive,
    /// Unobserved transitions are rejected.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("flow transition {from} -> {to} is not allowed")]
pub struct FlowTransitionError {
    pub from: FlowState,
    pub to: FlowState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowChange {
    pub from: FlowState,
    pub to: FlowState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type FlowListener = Box<dyn FnMut(FlowChange)>;

/// The single live flow state plus its change listeners.
///
/// Owned by the host and lent to each room session, so it survives session rebuilds.
pub struct FlowMachine {
    current: FlowState,
    policy: TransitionPolicy,
    listeners: Vec<(SubscriptionId, FlowListener)>,
    next_subscription: u64,
}

impl Default for FlowMachine {
    fn default() -> Self {
        Self::new(TransitionPolicy::default())
    }
}

impl fmt::Debug for FlowMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowMachine")
            .field("current", &self.current)
            .field("policy", &self.policy)
            .field("listener_count", &self.listeners.len())
            .finish()
    }
}

impl FlowMachine {
    pub fn new(policy: TransitionPolicy) -> Self {
        Self {
            current: FlowState::Onboarding,
            policy,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn current(&self) -> FlowState {
        self.current
    }

    pub fn is(&self, state: FlowState) -> bool {
        self.current == state
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Moves to `to`. Returns `Ok(false)` when already there (no notification).
    pub fn set_state(&mut self, to: FlowState) -> Result<bool, FlowTransitionError> {
        let from = self.current;
        if from == to {
            return Ok(false);
        }
        if !is_observed_transition(from, to) {
            match self.policy {
                TransitionPolicy::Strict => return Err(FlowTransitionError { from, to }),
                TransitionPolicy::Permissive => {
                    warn!(from = %from, to = %to, "flow_transition_unobserved");
                }
            }
        }

        info!(from = %from, to = %to, "flow_state_changed");
        self.current = to;
        let change = FlowChange { from, to };
        for (_, listener) in &mut self.listeners {
            listener(change);
        }
        Ok(true)
    }

    pub fn subscribe(&mut self, listener: impl FnMut(FlowChange) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription = self.next_subscription.saturating_add(1);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn starts_in_onboarding() {
        let flow = FlowMachine::default();
        assert!(flow.is(FlowState::Onboarding));
    }

    #[test]
    fn listeners_fire_in_registration_order_only_on_change() {
        let mut flow = FlowMachine::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = Rc::clone(&log);
        flow.subscribe(move |change| first.borrow_mut().push(("first", change.to)));
        let second = Rc::clone(&log);
        flow.subscribe(move |change| second.borrow_mut().push(("second", change.to)));

        assert_eq!(flow.set_state(FlowState::InRoom), Ok(true));
        assert_eq!(flow.set_state(FlowState::InRoom), Ok(false));

        assert_eq!(
            *log.borrow(),
            [("first", FlowState::InRoom), ("second", FlowState::InRoom)]
        );
    }

    #[test]
    fn unsubscribed_listener_is_not_notified() {
        let mut flow = FlowMachine::default();
        let hits = Rc::new(RefCell::new(0u32));
        let counter = Rc::clone(&hits);
        let id = flow.subscribe(move |_| *counter.borrow_mut() += 1);

        flow.set_state(FlowState::InRoom).expect("transition");
        assert!(flow.unsubscribe(id));
        assert!(!flow.unsubscribe(id));
        flow.set_state(FlowState::Lesson).expect("transition");

        assert_eq!(*hits.borrow(), 1);
        assert_eq!(flow.listener_count(), 0);
    }

    #[test]
    fn lesson_cycle_is_observed() {
        let cycle = [
            FlowState::InRoom,
            FlowState::Lesson,
            FlowState::StoryTelling,
            FlowState::StateUpdate,
            FlowState::InRoom,
        ];
        let mut flow = FlowMachine::new(TransitionPolicy::Strict);
        for state in cycle {
            flow.set_state(state).expect("observed transition");
        }
        assert!(flow.is(FlowState::InRoom));
    }

    #[test]
    fn strict_policy_rejects_unobserved_transition() {
        let mut flow = FlowMachine::new(TransitionPolicy::Strict);
        let error = flow.set_state(FlowState::Lesson).expect_err("rejected");
        assert_eq!(
            error,
            FlowTransitionError {
                from: FlowState::Onboarding,
                to: FlowState::Lesson,
            }
        );
        assert!(flow.is(FlowState::Onboarding));
    }

    #[test]
    fn permissive_policy_allows_any_transition() {
        let mut flow = FlowMachine::default();
        assert_eq!(flow.set_state(FlowState::EndingTelling), Ok(true));
        assert!(!is_observed_transition(FlowState::Onboarding, FlowState::EndingTelling));
        assert!(is_observed_transition(FlowState::EndingTelling, FlowState::Onboarding));
    }

    #[test]
    fn state_tokens_parse_case_insensitively() {
        assert_eq!("inroom".parse::<FlowState>(), Ok(FlowState::InRoom));
        assert_eq!("StateUpdate".parse::<FlowState>(), Ok(FlowState::StateUpdate));
        assert!("Lobby".parse::<FlowState>().is_err());
    }
}
