use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{determine_ending_id, StatLevel};

pub const STAT_MIN: i32 = 0;
pub const STAT_MAX: i32 = 100;
const ACADEMIC_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub initial_hunger: i32,
    pub initial_t_value: i32,
    pub initial_academic_score: i32,
    pub initial_closeness: i32,
    pub initial_money: i64,
    pub initial_week: u32,
    pub hunger_decay_interval_seconds: f32,
    pub hunger_decay_amount: i32,
    pub lesson_hunger_cost: i32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            initial_hunger: 100,
            initial_t_value: 50,
            initial_academic_score: 0,
            initial_closeness: 50,
            initial_money: 100,
            initial_week: 1,
            hunger_decay_interval_seconds: 60.0,
            hunger_decay_amount: 1,
            lesson_hunger_cost: 20,
        }
    }
}

/// What caused a stats mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsSource {
    Init,
    Decay,
    Consume,
    Lesson,
    Buy,
    GrantMoney,
    Closeness,
    UnlockEnding,
}

impl StatsSource {
    pub const fn as_token(self) -> &'static str {
        match self {
            StatsSource::Init => "init",
            StatsSource::Decay => "decay",
            StatsSource::Consume => "consume",
            StatsSource::Lesson => "lesson",
            StatsSource::Buy => "buy",
            StatsSource::GrantMoney => "grant-money",
            StatsSource::Closeness => "closeness",
            StatsSource::UnlockEnding => "unlock-ending",
        }
    }
}

impl fmt::Display for StatsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonRecord {
    pub lesson_id: String,
    pub score: i32,
    pub week: u32,
}

/// Story text the player unlocked during a given week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryEntry {
    pub week: u32,
    pub content: String,
}

/// First time an ending was reached, with the stats that led there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndingRecord {
    pub ending_id: String,
    pub week: u32,
    pub t_value: i32,
    pub academic_ranking: StatLevel,
}

/// Result of a graded lesson, as handed over by the minigame.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonOutcome {
    pub lesson_id: String,
    pub score: i32,
    pub t_value_factor: f32,
    pub money_reward: i64,
    pub closeness_reward: i32,
    /// Story beat shown after the lesson, kept in the story history.
    pub story: Option<String>,
}

impl LessonOutcome {
    pub fn new(lesson_id: impl Into<String>, score: i32, t_value_factor: f32) -> Self {
        Self {
            lesson_id: lesson_id.into(),
            score,
            t_value_factor,
            money_reward: 0,
            closeness_reward: 0,
            story: None,
        }
    }

    pub fn with_story(mut self, story: impl Into<String>) -> Self {
        self.story = Some(story.into());
        self
    }

    pub fn with_rewards(mut self, money_reward: i64, closeness_reward: i32) -> Self {
        self.money_reward = money_reward;
        self.closeness_reward = closeness_reward;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Purchase {
    pub cost: i64,
    pub hunger_gain: i32,
    pub t_value_gain: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStats {
    pub hunger: i32,
    pub t_value: i32,
    pub academic_score: i32,
    pub closeness: i32,
    pub money: i64,
    pub week: u32,
    /// Week of the most recent ending, repeated or not. `0` until one is reached.
    pub latest_ending_week: u32,
    academic_history: Vec<LessonRecord>,
    story_history: Vec<StoryEntry>,
    ending_history: Vec<EndingRecord>,
    #[serde(skip)]
    hunger_timer_seconds: f32,
    #[serde(skip)]
    config: StatsConfig,
}

impl PlayerStats {
    pub fn new(config: StatsConfig) -> Self {
        Self {
            hunger: config.initial_hunger,
            t_value: config.initial_t_value,
            academic_score: config.initial_academic_score,
            closeness: config.initial_closeness,
            money: config.initial_money,
            week: config.initial_week,
            latest_ending_week: 0,
            academic_history: Vec::new(),
            story_history: Vec::new(),
            ending_history: Vec::new(),
            hunger_timer_seconds: 0.0,
            config,
        }
    }

    pub fn academic_history(&self) -> &[LessonRecord] {
        &self.academic_history
    }

    pub fn story_history(&self) -> &[StoryEntry] {
        &self.story_history
    }

    pub fn ending_history(&self) -> &[EndingRecord] {
        &self.ending_history
    }

    /// Ending the current stats lead to.
    pub fn ending_id(&self) -> &'static str {
        determine_ending_id(self.t_value, self.academic_score, self.closeness)
    }

    /// Marks `ending_id` as reached this week. Only the first visit is kept in the history.
    pub fn unlock_ending(&mut self, ending_id: &str) -> StatsSource {
        self.latest_ending_week = self.week;
        if self.ending_history.iter().any(|record| record.ending_id == ending_id) {
            debug!(ending = ending_id, "ending_already_unlocked");
        } else {
            info!(ending = ending_id, week = self.week, "ending_unlocked");
            self.ending_history.push(EndingRecord {
                ending_id: ending_id.to_string(),
                week: self.week,
                t_value: self.t_value,
                academic_ranking: StatLevel::from_value(self.academic_score),
            });
        }
        StatsSource::UnlockEnding
    }

    /// Advances the hunger clock. At most one decay step is applied per call.
    pub fn tick(&mut self, dt_seconds: f32) -> Option<StatsSource> {
        let interval = self.config.hunger_decay_interval_seconds;
        if interval <= 0.0 {
            return None;
        }
        self.hunger_timer_seconds += dt_seconds;
        if self.hunger_timer_seconds < interval {
            return None;
        }
        self.hunger = (self.hunger - self.config.hunger_decay_amount).max(STAT_MIN);
        self.hunger_timer_seconds -= interval;
        debug!(hunger = self.hunger, "hunger_decayed");
        Some(StatsSource::Decay)
    }

    pub fn consume_hunger(&mut self, amount: i32) -> StatsSource {
        self.hunger = clamp_stat(self.hunger - amount);
        StatsSource::Consume
    }

    pub fn complete_lesson(&mut self, outcome: &LessonOutcome) -> StatsSource {
        self.academic_history.push(LessonRecord {
            lesson_id: outcome.lesson_id.clone(),
            score: outcome.score,
            week: self.week,
        });
        if let Some(story) = &outcome.story {
            self.story_history.push(StoryEntry {
                week: self.week,
                content: story.clone(),
            });
        }

        let window_start = self.academic_history.len().saturating_sub(ACADEMIC_WINDOW);
        let recent = &self.academic_history[window_start..];
        let sum: i64 = recent.iter().map(|record| i64::from(record.score)).sum();
        self.academic_score = round_half_up(sum as f32 / recent.len() as f32);

        let t_delta = round_half_up(outcome.score as f32 * outcome.t_value_factor);
        self.t_value = clamp_stat(self.t_value + t_delta);
        self.money += outcome.money_reward;
        self.closeness = clamp_stat(self.closeness + outcome.closeness_reward);
        self.hunger = (self.hunger - self.config.lesson_hunger_cost).max(STAT_MIN);
        self.week = self.week.saturating_add(1);
        StatsSource::Lesson
    }

    /// Applies a purchase if affordable. `None` means the stats are unchanged.
    pub fn buy(&mut self, purchase: Purchase) -> Option<StatsSource> {
        if self.money < purchase.cost {
            debug!(money = self.money, cost = purchase.cost, "purchase_rejected");
            return None;
        }
        self.money -= purchase.cost;
        self.hunger = (self.hunger + purchase.hunger_gain).min(STAT_MAX);
        self.t_value = clamp_stat(self.t_value + purchase.t_value_gain);
        Some(StatsSource::Buy)
    }

    pub fn grant_money(&mut self, amount: i64) -> StatsSource {
        self.money += amount;
        StatsSource::GrantMoney
    }

    pub fn update_closeness(&mut self, amount: i32) -> StatsSource {
        self.closeness = clamp_stat(self.closeness + amount);
        StatsSource::Closeness
    }
}

fn clamp_stat(value: i32) -> i32 {
    value.clamp(STAT_MIN, STAT_MAX)
}

/// Rounds halves toward positive infinity (`-2.5 -> -2`, `2.5 -> 3`).
pub fn round_half_up(value: f32) -> i32 {
    (value + 0.5).floor() as i32
}
