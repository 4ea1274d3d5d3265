//! Season calendar and the end-of-season reset.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::config::GameConfig;
use crate::game::battle_pass::{BattlePassError, BattlePassManager};
use crate::game::clans::{ClanError, ClanManager};
use crate::game::ranking::{RankingError, RankingManager, RankingNft};
use crate::observability::metrics::record_game_event;
use crate::store::{Repository, StoreError};

#[derive(Debug, Error)]
pub enum SeasonError {
    #[error("no season is active")]
    NoActiveSeason,

    #[error("a season has already been started")]
    AlreadyStarted,

    #[error(transparent)]
    Ranking(#[from] RankingError),

    #[error(transparent)]
    BattlePass(#[from] BattlePassError),

    #[error(transparent)]
    Clan(#[from] ClanError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type SeasonResult<T> = Result<T, SeasonError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SeasonStatus {
    Active,
    Ended { ended_at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub id: u32,
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: SeasonStatus,
}

impl Season {
    pub fn is_active(&self) -> bool {
        self.status == SeasonStatus::Active
    }
}

/// What a season reset did.
#[derive(Debug, Clone, Serialize)]
pub struct SeasonResetReport {
    pub ended: Season,
    pub started: Season,
    pub awards: Vec<RankingNft>,
    pub passes_reset: usize,
    pub clans_reset: usize,
}

pub struct SeasonManager {
    seasons: Arc<dyn Repository<Season>>,
    length: Duration,
    ranking: Arc<RankingManager>,
    battle_pass: Arc<BattlePassManager>,
    clans: Arc<ClanManager>,
    write_lock: Mutex<()>,
}

impl SeasonManager {
    /// Build the manager and point ranking and battle pass at the season
    /// that is active in storage, if any.
    pub fn new(
        seasons: Arc<dyn Repository<Season>>,
        config: &GameConfig,
        ranking: Arc<RankingManager>,
        battle_pass: Arc<BattlePassManager>,
        clans: Arc<ClanManager>,
    ) -> SeasonResult<Self> {
        let manager = Self {
            seasons,
            length: Duration::days(config.season_length_days as i64),
            ranking,
            battle_pass,
            clans,
            write_lock: Mutex::new(()),
        };

        if let Some(current) = manager.current_season()? {
            manager.ranking.set_season(current.id);
            manager.battle_pass.set_season(current.id);
            tracing::info!(season_id = current.id, name = %current.name, "Resumed season");
        }
        Ok(manager)
    }

    pub fn current_season(&self) -> SeasonResult<Option<Season>> {
        Ok(self.seasons.values()?.into_iter().find(Season::is_active))
    }

    /// Every season, oldest first.
    pub fn history(&self) -> SeasonResult<Vec<Season>> {
        let mut seasons = self.seasons.values()?;
        seasons.sort_by_key(|s| s.id);
        Ok(seasons)
    }

    fn open(&self, id: u32, name: &str, now: DateTime<Utc>) -> SeasonResult<Season> {
        let season = Season {
            id,
            name: name.to_string(),
            starts_at: now,
            ends_at: now + self.length,
            status: SeasonStatus::Active,
        };
        self.seasons.put(&id.to_string(), season.clone())?;
        self.ranking.set_season(id);
        self.battle_pass.set_season(id);
        Ok(season)
    }

    pub fn start_first_season(&self, name: &str, now: DateTime<Utc>) -> SeasonResult<Season> {
        let _guard = self.write_lock.lock().expect("season mutex poisoned");
        if !self.seasons.list()?.is_empty() {
            return Err(SeasonError::AlreadyStarted);
        }

        let season = self.open(1, name, now)?;
        record_game_event("season_started");
        tracing::info!(season_id = season.id, name, ends_at = %season.ends_at, "First season started");
        Ok(season)
    }

    /// True if the active season's end time has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> SeasonResult<bool> {
        Ok(self.current_season()?.is_some_and(|s| now >= s.ends_at))
    }

    /// End the active season, mint its awards, wipe passes and clan points,
    /// and open the next season.
    pub fn reset_season(&self, next_name: &str, now: DateTime<Utc>) -> SeasonResult<SeasonResetReport> {
        let _guard = self.write_lock.lock().expect("season mutex poisoned");
        let mut ended = self.current_season()?.ok_or(SeasonError::NoActiveSeason)?;

        ended.status = SeasonStatus::Ended { ended_at: now };
        self.seasons.put(&ended.id.to_string(), ended.clone())?;

        let awards = self.ranking.issue_season_awards(ended.id)?;
        let next_id = ended.id + 1;
        let passes_reset = self.battle_pass.reset_season(next_id)?;
        let clans_reset = self.clans.reset_points()?;
        let started = self.open(next_id, next_name, now)?;

        record_game_event("season_reset");
        tracing::info!(
            ended = ended.id,
            started = started.id,
            awards = awards.len(),
            passes_reset,
            clans_reset,
            "Season reset"
        );

        Ok(SeasonResetReport {
            ended,
            started,
            awards,
            passes_reset,
            clans_reset,
        })
    }

    /// Reset if the active season has run out, naming the next one
    /// "Season N".
    pub fn roll_over_if_expired(&self, now: DateTime<Utc>) -> SeasonResult<Option<SeasonResetReport>> {
        match self.current_season()? {
            Some(current) if now >= current.ends_at => {
                let name = format!("Season {}", current.id + 1);
                self.reset_season(&name, now).map(Some)
            }
            _ => Ok(None),
        }
    }
}

impl std::fmt::Debug for SeasonManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeasonManager")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}
