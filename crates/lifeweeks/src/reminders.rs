//! Weekly and daily reminder preferences
//!
//! Delivery belongs to the platform's notification service. This module only
//! persists the preferences and computes what to schedule next.

use anyhow::{bail, Result};
use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use weekcache::LifeStats;

/// Settings key holding the reminder JSON
pub const REMINDERS_KEY: &str = "reminders";

/// Longest accepted custom message
pub const MAX_MESSAGE_LEN: usize = 200;

const TITLE: &str = "Your life in weeks";

/// How often the reminder repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly { weekday: Weekday },
}

/// Stored reminder preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPrefs {
    pub enabled: bool,
    pub frequency: Frequency,
    /// Local wall-clock time of day
    pub time: NaiveTime,
    /// Body text; `{lived}` and `{remaining}` are replaced with week counts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Default for ReminderPrefs {
    fn default() -> Self {
        Self {
            enabled: false,
            frequency: Frequency::Weekly {
                weekday: Weekday::Sun,
            },
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            message: None,
        }
    }
}

/// Repeating trigger handed to the notification service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "repeats", rename_all = "snake_case")]
pub enum Trigger {
    Daily { hour: u32, minute: u32 },
    /// `weekday` is ISO numbered, Monday = 1
    Weekly { weekday: u32, hour: u32, minute: u32 },
}

/// A fully resolved reminder
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderSchedule {
    pub trigger: Trigger,
    pub next_fire: NaiveDateTime,
    pub title: String,
    pub body: String,
}

impl ReminderPrefs {
    /// Reject messages the notification service would truncate
    pub fn validate(&self) -> Result<()> {
        if let Some(message) = &self.message {
            if message.trim().is_empty() {
                bail!("Reminder message is empty");
            }
            if message.chars().count() > MAX_MESSAGE_LEN {
                bail!("Reminder message is longer than {} characters", MAX_MESSAGE_LEN);
            }
        }
        Ok(())
    }

    /// What to schedule, or `None` when reminders are off
    ///
    /// Without `stats` (no profile yet) the body carries no week counts.
    pub fn schedule(
        &self,
        now: NaiveDateTime,
        stats: Option<LifeStats>,
    ) -> Option<ReminderSchedule> {
        if !self.enabled {
            return None;
        }

        let (hour, minute) = (self.time.hour(), self.time.minute());
        let trigger = match self.frequency {
            Frequency::Daily => Trigger::Daily { hour, minute },
            Frequency::Weekly { weekday } => Trigger::Weekly {
                weekday: weekday.number_from_monday(),
                hour,
                minute,
            },
        };

        Some(ReminderSchedule {
            trigger,
            next_fire: self.next_fire(now),
            title: TITLE.to_string(),
            body: self.body(stats),
        })
    }

    /// First firing strictly after `now`
    pub fn next_fire(&self, now: NaiveDateTime) -> NaiveDateTime {
        let time = self.time.with_second(0).unwrap_or(self.time);

        match self.frequency {
            Frequency::Daily => {
                let candidate = now.date().and_time(time);
                if candidate > now {
                    candidate
                } else {
                    candidate + Duration::days(1)
                }
            }
            Frequency::Weekly { weekday } => {
                let ahead = (7 + weekday.num_days_from_monday()
                    - now.weekday().num_days_from_monday())
                    % 7;
                let candidate = (now.date() + Duration::days(i64::from(ahead))).and_time(time);
                if candidate > now {
                    candidate
                } else {
                    candidate + Duration::days(7)
                }
            }
        }
    }

    fn body(&self, stats: Option<LifeStats>) -> String {
        let Some(stats) = stats else {
            return match &self.message {
                Some(message) if !has_placeholders(message) => message.clone(),
                _ => "A new week is here. Make this one count.".to_string(),
            };
        };

        let lived = stats.weeks_lived().to_string();
        let remaining = stats.weeks_remaining().to_string();

        match &self.message {
            Some(template) => template
                .replace("{lived}", &lived)
                .replace("{remaining}", &remaining),
            None => format!(
                "You have lived {} weeks. {} weeks remain. Make this one count.",
                lived, remaining
            ),
        }
    }
}

fn has_placeholders(message: &str) -> bool {
    message.contains("{lived}") || message.contains("{remaining}")
}
