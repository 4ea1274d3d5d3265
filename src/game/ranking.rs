//! Seasonal standings and end-of-season ranking NFTs.

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::game::player_key;
use crate::observability::metrics::record_game_event;
use crate::store::{Repository, StoreError};

/// Points needed for the Legend tier, which only the season winner can hold.
const LEGEND_MIN_POINTS: u64 = 150;

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("no season is active")]
    NoActiveSeason,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type RankingResult<T> = Result<T, RankingError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    Win,
    Draw,
    Loss,
}

impl MatchOutcome {
    pub fn points(self) -> u64 {
        match self {
            MatchOutcome::Win => 3,
            MatchOutcome::Draw => 1,
            MatchOutcome::Loss => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
    Legend,
}

impl RankTier {
    /// Tier earned by points alone. Legend is never returned here.
    pub fn for_points(points: u64) -> Self {
        match points {
            150.. => RankTier::Diamond,
            100.. => RankTier::Platinum,
            60.. => RankTier::Gold,
            30.. => RankTier::Silver,
            _ => RankTier::Bronze,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStanding {
    pub player: Address,
    pub season_id: u32,
    pub points: u64,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
}

impl PlayerStanding {
    fn new(player: Address, season_id: u32) -> Self {
        Self {
            player,
            season_id,
            points: 0,
            wins: 0,
            draws: 0,
            losses: 0,
        }
    }

    pub fn matches_played(&self) -> u32 {
        self.wins + self.draws + self.losses
    }

    pub fn tier(&self) -> RankTier {
        RankTier::for_points(self.points)
    }
}

/// A minted end-of-season award.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingNft {
    pub token_id: u64,
    pub player: Address,
    pub season_id: u32,
    pub tier: RankTier,
    /// Final position, starting at 1.
    pub rank: u32,
    pub points: u64,
    pub minted_at: DateTime<Utc>,
}

fn standing_key(season_id: u32, player: &Address) -> String {
    format!("{}:{}", season_id, player_key(player))
}

pub struct RankingManager {
    standings: Arc<dyn Repository<PlayerStanding>>,
    nfts: Arc<dyn Repository<RankingNft>>,
    season_id: AtomicU32,
    write_lock: Mutex<()>,
}

impl RankingManager {
    pub fn new(standings: Arc<dyn Repository<PlayerStanding>>, nfts: Arc<dyn Repository<RankingNft>>) -> Self {
        Self {
            standings,
            nfts,
            season_id: AtomicU32::new(0),
            write_lock: Mutex::new(()),
        }
    }

    /// Season that new matches count towards. Zero means none.
    pub fn season_id(&self) -> u32 {
        self.season_id.load(Ordering::Acquire)
    }

    pub fn set_season(&self, season_id: u32) {
        self.season_id.store(season_id, Ordering::Release);
    }

    pub fn record_match(&self, player: Address, outcome: MatchOutcome) -> RankingResult<PlayerStanding> {
        let season_id = self.season_id();
        if season_id == 0 {
            return Err(RankingError::NoActiveSeason);
        }

        let _guard = self.write_lock.lock().expect("ranking mutex poisoned");
        let key = standing_key(season_id, &player);
        let mut standing = self
            .standings
            .get(&key)?
            .unwrap_or_else(|| PlayerStanding::new(player, season_id));

        standing.points += outcome.points();
        match outcome {
            MatchOutcome::Win => standing.wins += 1,
            MatchOutcome::Draw => standing.draws += 1,
            MatchOutcome::Loss => standing.losses += 1,
        }
        self.standings.put(&key, standing.clone())?;

        record_game_event("match_recorded");
        tracing::debug!(player = %player, season_id, outcome = ?outcome, points = standing.points, "Match recorded");
        Ok(standing)
    }

    /// The player's standing in the current season.
    pub fn standing(&self, player: Address) -> RankingResult<Option<PlayerStanding>> {
        Ok(self.standings.get(&standing_key(self.season_id(), &player))?)
    }

    /// Standings of a season, best first: points, then wins, then fewer
    /// losses, then address.
    pub fn standings(&self, season_id: u32) -> RankingResult<Vec<PlayerStanding>> {
        let mut standings: Vec<PlayerStanding> = self
            .standings
            .values()?
            .into_iter()
            .filter(|s| s.season_id == season_id)
            .collect();
        standings.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then(b.wins.cmp(&a.wins))
                .then(a.losses.cmp(&b.losses))
                .then(a.player.cmp(&b.player))
        });
        Ok(standings)
    }

    /// Mint one award per player who played in `season_id`.
    ///
    /// Calling it again for the same season returns the awards already
    /// minted.
    pub fn issue_season_awards(&self, season_id: u32) -> RankingResult<Vec<RankingNft>> {
        let _guard = self.write_lock.lock().expect("ranking mutex poisoned");

        let all = self.nfts.values()?;
        let mut existing: Vec<RankingNft> = all.iter().filter(|n| n.season_id == season_id).cloned().collect();
        if !existing.is_empty() {
            existing.sort_by_key(|n| n.token_id);
            return Ok(existing);
        }

        let mut next_token = all.iter().map(|n| n.token_id).max().unwrap_or(0) + 1;
        let minted_at = Utc::now();
        let mut awards = Vec::new();

        let played = self
            .standings(season_id)?
            .into_iter()
            .filter(|s| s.matches_played() > 0);
        for (position, standing) in played.enumerate() {
            let tier = if position == 0 && standing.points >= LEGEND_MIN_POINTS {
                RankTier::Legend
            } else {
                standing.tier()
            };
            let nft = RankingNft {
                token_id: next_token,
                player: standing.player,
                season_id,
                tier,
                rank: position as u32 + 1,
                points: standing.points,
                minted_at,
            };
            self.nfts.put(&nft.token_id.to_string(), nft.clone())?;
            awards.push(nft);
            next_token += 1;
        }

        record_game_event("season_awards");
        tracing::info!(season_id, awards = awards.len(), "Season ranking NFTs minted");
        Ok(awards)
    }

    /// Every award `player` holds, by token id.
    pub fn nfts_of(&self, player: Address) -> RankingResult<Vec<RankingNft>> {
        let mut nfts: Vec<RankingNft> = self
            .nfts
            .values()?
            .into_iter()
            .filter(|n| n.player == player)
            .collect();
        nfts.sort_by_key(|n| n.token_id);
        Ok(nfts)
    }
}

impl std::fmt::Debug for RankingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankingManager")
            .field("season_id", &self.season_id())
            .finish_non_exhaustive()
    }
}
