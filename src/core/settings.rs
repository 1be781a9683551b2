use super::{Result, TrackerError};
use chrono::Weekday;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TARGET_PER_CYCLE: u32 = 40;

/// Operator settings stored next to the manuscripts.
///
/// The core only stores and validates these; scheduling math lives elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub target_per_cycle: u32,
    #[serde(default)]
    pub user_schedule: UserSchedule,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            target_per_cycle: DEFAULT_TARGET_PER_CYCLE,
            user_schedule: UserSchedule::default(),
        }
    }
}

impl UserSettings {
    pub fn target_per_cycle(mut self, target: u32) -> Self {
        self.target_per_cycle = target;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_per_cycle == 0 {
            return Err(TrackerError::validation(
                "target per cycle must be greater than zero",
            ));
        }
        self.user_schedule.validate()
    }
}

/// Weekly schedule: days off plus one weight per weekday, Monday first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSchedule {
    #[serde(default)]
    days_off: Vec<Weekday>,
    pub weekly_weights: [f64; 7],
}

impl Default for UserSchedule {
    fn default() -> Self {
        Self {
            days_off: vec![Weekday::Sat, Weekday::Sun],
            weekly_weights: [1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0],
        }
    }
}

impl UserSchedule {
    pub fn new(days_off: impl IntoIterator<Item = Weekday>, weekly_weights: [f64; 7]) -> Self {
        let mut schedule = Self {
            days_off: Vec::new(),
            weekly_weights,
        };
        for day in days_off {
            schedule.add_day_off(day);
        }
        schedule
    }

    /// Days off ordered Monday to Sunday, without repeats.
    pub fn days_off(&self) -> &[Weekday] {
        &self.days_off
    }

    pub fn is_day_off(&self, day: Weekday) -> bool {
        self.days_off.contains(&day)
    }

    pub fn add_day_off(&mut self, day: Weekday) {
        if !self.is_day_off(day) {
            self.days_off.push(day);
            self.days_off.sort_by_key(|day| day.num_days_from_monday());
        }
    }

    pub fn remove_day_off(&mut self, day: Weekday) {
        self.days_off.retain(|existing| *existing != day);
    }

    pub fn weight(&self, day: Weekday) -> f64 {
        self.weekly_weights[day.num_days_from_monday() as usize]
    }

    fn validate(&self) -> Result<()> {
        if let Some(bad) = self
            .weekly_weights
            .iter()
            .find(|weight| !weight.is_finite() || **weight < 0.0)
        {
            return Err(TrackerError::validation(format!(
                "weekly weights must be finite and non-negative, got {}",
                bad
            )));
        }
        Ok(())
    }
}
