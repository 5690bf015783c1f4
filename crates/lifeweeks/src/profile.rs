//! The user's birth date and life-expectancy source

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use weekcache::LifeStats;

use crate::expectancy;

/// Settings key holding the profile JSON
pub const PROFILE_KEY: &str = "profile";

/// Where the total number of weeks comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpectancySource {
    /// Country average from the expectancy table
    Country {
        /// ISO alpha-2 code
        code: String,
    },
    /// A date picked by the user
    TargetDate {
        /// Last day of the table
        date: NaiveDate,
    },
}

/// Everything the life table is derived from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub birth_date: NaiveDate,
    pub expectancy: ExpectancySource,
}

impl Profile {
    /// Check the profile against `today` and canonicalise the country code
    pub fn validated(mut self, today: NaiveDate) -> Result<Self> {
        if self.birth_date > today {
            bail!("Birth date {} is in the future", self.birth_date);
        }

        match &mut self.expectancy {
            ExpectancySource::Country { code } => {
                let Some(country) = expectancy::lookup(code) else {
                    bail!("Unknown country '{}' (see `lifeweeks countries`)", code);
                };
                *code = country.code.to_string();
            }
            ExpectancySource::TargetDate { date } => {
                if *date <= self.birth_date {
                    bail!("Target date {} must be after birth date {}", date, self.birth_date);
                }
            }
        }

        Ok(self)
    }

    /// Weeks lived and total weeks as of `today`
    ///
    /// `weeks_lived` counts completed 7-day spans since birth. Country
    /// expectancies use 52 weeks per year so that whole years fill whole rows.
    pub fn life_stats(&self, today: NaiveDate) -> Result<LifeStats> {
        let weeks_lived = weeks_between(self.birth_date, today);

        let total_weeks = match &self.expectancy {
            ExpectancySource::Country { code } => {
                let Some(country) = expectancy::lookup(code) else {
                    bail!("Unknown country '{}'", code);
                };
                (country.expectancy_years * 52.0).round() as u32
            }
            ExpectancySource::TargetDate { date } => weeks_between(self.birth_date, *date),
        };

        Ok(LifeStats::new(weeks_lived, total_weeks.max(1))?)
    }
}

/// Completed weeks from `from` to `to`, zero if `to` is earlier
pub fn weeks_between(from: NaiveDate, to: NaiveDate) -> u32 {
    let days = (to - from).num_days();
    if days <= 0 {
        0
    } else {
        u32::try_from(days / 7).unwrap_or(u32::MAX)
    }
}
