use super::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
}

const ACTION_COUNT: usize = 4;

impl InputAction {
    pub const ALL: [InputAction; ACTION_COUNT] = [
        InputAction::MoveUp,
        InputAction::MoveDown,
        InputAction::MoveLeft,
        InputAction::MoveRight,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "up" | "w" => Some(InputAction::MoveUp),
            "down" | "s" => Some(InputAction::MoveDown),
            "left" | "a" => Some(InputAction::MoveLeft),
            "right" | "d" => Some(InputAction::MoveRight),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub fn any_down(&self) -> bool {
        self.down.iter().any(|down| *down)
    }

    pub fn clear(&mut self) {
        self.down = [false; ACTION_COUNT];
    }
}

/// Per-tick view of the player's input: held directions, plus one-shot tap and
/// interact presses that only live for the tick they are delivered in.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    actions: ActionStates,
    tap_world: Option<Vec2>,
    interact_pressed: bool,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_actions(actions: ActionStates) -> Self {
        Self {
            actions,
            ..Self::default()
        }
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn has_manual_input(&self) -> bool {
        self.actions.any_down()
    }

    pub fn actions(&self) -> ActionStates {
        self.actions
    }

    pub fn tap_world(&self) -> Option<Vec2> {
        self.tap_world
    }

    pub fn interact_pressed(&self) -> bool {
        self.interact_pressed
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_tap_world(mut self, tap_world: Option<Vec2>) -> Self {
        self.tap_world = tap_world;
        self
    }

    pub fn with_interact_pressed(mut self, interact_pressed: bool) -> Self {
        self.interact_pressed = interact_pressed;
        self
    }

    /// Unit-axis direction from held keys. Left wins over right and up wins over down.
    pub fn manual_axis(&self) -> Vec2 {
        let x = if self.is_down(InputAction::MoveLeft) {
            -1.0
        } else if self.is_down(InputAction::MoveRight) {
            1.0
        } else {
            0.0
        };
        let y = if self.is_down(InputAction::MoveUp) {
            -1.0
        } else if self.is_down(InputAction::MoveDown) {
            1.0
        } else {
            0.0
        };
        Vec2 { x, y }
    }
}
