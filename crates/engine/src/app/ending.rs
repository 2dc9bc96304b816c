use std::fmt;

use serde::Serialize;

/// Ending used when no row of [`ENDING_TABLE`] matches.
pub const DEFAULT_ENDING_ID: &str = "story_trapped_wait";

const MEDIUM_THRESHOLD: i32 = 40;
const HIGH_THRESHOLD: i32 = 70;

/// Coarse bucket of a 0..=100 stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatLevel {
    Low,
    Medium,
    High,
}

impl StatLevel {
    pub fn from_value(value: i32) -> Self {
        if value < MEDIUM_THRESHOLD {
            StatLevel::Low
        } else if value < HIGH_THRESHOLD {
            StatLevel::Medium
        } else {
            StatLevel::High
        }
    }

    pub const fn as_token(self) -> &'static str {
        match self {
            StatLevel::Low => "low",
            StatLevel::Medium => "medium",
            StatLevel::High => "high",
        }
    }
}

impl fmt::Display for StatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndingScenario {
    pub t_value: StatLevel,
    pub academic: StatLevel,
    pub closeness: StatLevel,
    pub ending_id: &'static str,
}

const fn scenario(
    t_value: StatLevel,
    academic: StatLevel,
    closeness: StatLevel,
    ending_id: &'static str,
) -> EndingScenario {
    EndingScenario {
        t_value,
        academic,
        closeness,
        ending_id,
    }
}

use StatLevel::{High, Low, Medium};

/// One row per (t-value, academic, closeness) bucket combination.
pub const ENDING_TABLE: [EndingScenario; 27] = [
    scenario(High, Low, Low, "story_trapped_wait"),
    scenario(High, Low, Medium, "story_trapped_wait"),
    scenario(High, Low, High, "story_trapped_wait"),
    scenario(High, Medium, Low, "story_father_busy"),
    scenario(High, Medium, Medium, "story_stay_with_friends"),
    scenario(High, Medium, High, "story_stowaway_police"),
    scenario(High, High, Low, "story_lonely_study"),
    scenario(High, High, Medium, "story_forgot_id"),
    scenario(High, High, High, "story_vietnam_move_friends"),
    scenario(Medium, Low, Low, "story_waning_interest"),
    scenario(Medium, Low, Medium, "story_waning_interest"),
    scenario(Medium, Low, High, "story_stowaway_police"),
    scenario(Medium, Medium, Low, "story_mom_worry_lonely"),
    scenario(Medium, Medium, Medium, "story_save_money_stay"),
    scenario(Medium, Medium, High, "story_robbery_move_back"),
    scenario(Medium, High, Low, "story_stranger_friend"),
    scenario(Medium, High, Medium, "story_tension_parting"),
    scenario(Medium, High, High, "story_vietnam_move_disconnected"),
    scenario(Low, Low, Low, "story_adapted_ghost_island"),
    scenario(Low, Low, Medium, "story_accent_change"),
    scenario(Low, Low, High, "story_chicken_feet"),
    scenario(Low, Medium, Low, "story_adapted_ghost_island"),
    scenario(Low, Medium, Medium, "story_study_harder"),
    scenario(Low, Medium, High, "story_ximending_disillusion"),
    scenario(Low, High, Low, "story_characters_lost"),
    scenario(Low, High, Medium, "story_vote_ticket_noodles"),
    scenario(Low, High, High, "story_vote_ticket_lonely"),
];

/// Ending story for the given raw stats.
pub fn determine_ending_id(t_value: i32, academic_score: i32, closeness: i32) -> &'static str {
    let t_value = StatLevel::from_value(t_value);
    let academic = StatLevel::from_value(academic_score);
    let closeness = StatLevel::from_value(closeness);
    ENDING_TABLE
        .iter()
        .find(|row| row.t_value == t_value && row.academic == academic && row.closeness == closeness)
        .map_or(DEFAULT_ENDING_ID, |row| row.ending_id)
}
