//! Two-week scoring seasons and the season leaderboard
//!
//! A season covers two consecutive ISO weeks of one ISO week-year. Its id is
//! derived from the date alone (`2026-S21` holds ISO weeks 41 and 42), so any
//! process computes the same boundaries for the same day. Week 53 of a long
//! ISO year forms a one-week season of its own.

use crate::profile::{ProfileStore, StoreError};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use shared::{LeaderboardEntry, SeasonInfo};
use std::fmt;
use std::sync::Arc;

/// Number of top players frozen as winners when a season closes
pub const WINNER_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeasonId {
    pub iso_year: i32,
    pub index: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SeasonId {
    pub fn for_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        let week = iso.week();
        let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));

        let start = if week % 2 == 0 {
            monday - Duration::days(7)
        } else {
            monday
        };
        let end = if week == 53 {
            monday + Duration::days(6)
        } else {
            start + Duration::days(13)
        };

        Self {
            iso_year: iso.year(),
            index: (week + 1) / 2,
            start,
            end,
        }
    }

    pub fn current() -> Self {
        Self::for_date(Utc::now().date_naive())
    }
}

impl fmt::Display for SeasonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-S{:02}", self.iso_year, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonRecord {
    pub id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub winners: Vec<LeaderboardEntry>,
    pub updated_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}

impl SeasonRecord {
    pub fn open(season: &SeasonId, now: DateTime<Utc>) -> Self {
        Self {
            id: season.to_string(),
            start_date: season.start,
            end_date: season.end,
            is_active: true,
            leaderboard: Vec::new(),
            winners: Vec::new(),
            updated_at: now,
            finalized_at: None,
        }
    }

    pub fn info(&self) -> SeasonInfo {
        SeasonInfo {
            id: self.id.clone(),
            start_date: self.start_date.format("%Y-%m-%d").to_string(),
            end_date: self.end_date.format("%Y-%m-%d").to_string(),
            is_active: self.is_active,
        }
    }
}

/// Maintains season records and leaderboard snapshots in the profile store.
pub struct SeasonKeeper {
    store: Arc<dyn ProfileStore>,
    leaderboard_size: usize,
}

impl SeasonKeeper {
    pub fn new(store: Arc<dyn ProfileStore>, leaderboard_size: usize) -> Self {
        Self {
            store,
            leaderboard_size,
        }
    }

    /// Closes every active season other than the one containing `today`, then
    /// recomputes and persists the current season's leaderboard.
    pub fn refresh(&self, today: NaiveDate) -> Result<SeasonRecord, StoreError> {
        let current = SeasonId::for_date(today);
        let current_id = current.to_string();
        let now = Utc::now();

        for season in self.store.active_seasons()? {
            if season.id != current_id {
                self.finalize(&season.id)?;
            }
        }

        let mut record = match self.store.get_season(&current_id)? {
            Some(record) => record,
            None => {
                info!(
                    "Opening season {} ({} to {})",
                    current_id, current.start, current.end
                );
                SeasonRecord::open(&current, now)
            }
        };
        record.leaderboard = self
            .store
            .season_standings(&current_id, self.leaderboard_size)?;
        record.updated_at = now;
        self.store.save_season(record.clone())?;

        debug!(
            "Refreshed leaderboard for season {} ({} entries)",
            current_id,
            record.leaderboard.len()
        );
        Ok(record)
    }

    /// Freezes the final standings and top three of a season and marks it
    /// inactive. Finalizing an inactive season changes nothing and returns the
    /// stored record; an unknown season returns `None`.
    pub fn finalize(&self, season_id: &str) -> Result<Option<SeasonRecord>, StoreError> {
        let mut record = match self.store.get_season(season_id)? {
            Some(record) => record,
            None => return Ok(None),
        };
        if !record.is_active {
            debug!("Season {} already finalized", season_id);
            return Ok(Some(record));
        }

        let standings = self
            .store
            .season_standings(season_id, self.leaderboard_size.max(WINNER_COUNT))?;
        record.winners = standings.iter().take(WINNER_COUNT).cloned().collect();
        record.leaderboard = standings.into_iter().take(self.leaderboard_size).collect();
        record.is_active = false;
        record.finalized_at = Some(Utc::now());
        self.store.save_season(record.clone())?;

        info!(
            "Finalized season {} with winners {:?}",
            season_id,
            record
                .winners
                .iter()
                .map(|w| w.display_name.as_str())
                .collect::<Vec<_>>()
        );
        Ok(Some(record))
    }

    /// Current season and its live standings. Opens the season record first
    /// if nobody has yet.
    pub fn leaderboard(
        &self,
        today: NaiveDate,
    ) -> Result<(SeasonInfo, Vec<LeaderboardEntry>), StoreError> {
        let current_id = SeasonId::for_date(today).to_string();
        let record = match self.store.get_season(&current_id)? {
            Some(record) => record,
            None => self.refresh(today)?,
        };
        let standings = self
            .store
            .season_standings(&current_id, self.leaderboard_size)?;
        Ok((record.info(), standings))
    }
}
