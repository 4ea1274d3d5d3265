//! Seasonal battle pass: XP, tiers and reward claims.
//!
//! Every tier from 1 to `max_tier` has a free reward and a premium reward.
//! Premium rewards need the premium pass to be unlocked first.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::config::GameConfig;
use crate::game::player_key;
use crate::observability::metrics::record_game_event;
use crate::store::{Repository, StoreError};

/// Coins per tier on the free track.
const FREE_COINS_PER_TIER: u64 = 100;
/// Coins per tier on the premium track.
const PREMIUM_COINS_PER_TIER: u64 = 250;
/// Every n-th premium tier awards a cosmetic kit instead of coins.
const KIT_EVERY: u32 = 5;

#[derive(Debug, Error)]
pub enum BattlePassError {
    #[error("XP amount must be greater than zero")]
    ZeroXp,

    #[error("premium pass already unlocked")]
    AlreadyPremium,

    #[error("tier {tier} is outside 1..={max}")]
    TierOutOfRange { tier: u32, max: u32 },

    #[error("tier {tier} not reached (current tier {current})")]
    TierNotReached { tier: u32, current: u32 },

    #[error("{track} reward for tier {tier} already claimed")]
    AlreadyClaimed { tier: u32, track: RewardTrack },

    #[error("premium pass required")]
    PremiumRequired,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type BattlePassResult<T> = Result<T, BattlePassError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardTrack {
    Free,
    Premium,
}

impl fmt::Display for RewardTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardTrack::Free => f.write_str("free"),
            RewardTrack::Premium => f.write_str("premium"),
        }
    }
}

/// What a claimed tier pays out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reward {
    Coins { amount: u64 },
    CosmeticKit { tier: u32 },
}

impl Reward {
    /// The reward table.
    pub fn for_tier(tier: u32, track: RewardTrack) -> Self {
        match track {
            RewardTrack::Free => Reward::Coins {
                amount: FREE_COINS_PER_TIER * tier as u64,
            },
            RewardTrack::Premium if tier % KIT_EVERY == 0 => Reward::CosmeticKit { tier },
            RewardTrack::Premium => Reward::Coins {
                amount: PREMIUM_COINS_PER_TIER * tier as u64,
            },
        }
    }
}

/// One player's pass for one season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPass {
    pub player: Address,
    pub season_id: u32,
    pub xp: u64,
    pub premium: bool,
    pub claimed_free: BTreeSet<u32>,
    pub claimed_premium: BTreeSet<u32>,
}

impl PlayerPass {
    fn new(player: Address, season_id: u32) -> Self {
        Self {
            player,
            season_id,
            xp: 0,
            premium: false,
            claimed_free: BTreeSet::new(),
            claimed_premium: BTreeSet::new(),
        }
    }

    pub fn tier(&self, xp_per_tier: u64, max_tier: u32) -> u32 {
        let reached = self.xp / xp_per_tier.max(1);
        reached.min(max_tier as u64) as u32
    }
}

/// Tier before and after an XP grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierProgress {
    pub previous_tier: u32,
    pub tier: u32,
}

impl TierProgress {
    pub fn tiers_gained(&self) -> u32 {
        self.tier - self.previous_tier
    }
}

pub struct BattlePassManager {
    passes: Arc<dyn Repository<PlayerPass>>,
    xp_per_tier: u64,
    max_tier: u32,
    season_id: AtomicU32,
    write_lock: Mutex<()>,
}

impl BattlePassManager {
    pub fn new(passes: Arc<dyn Repository<PlayerPass>>, config: &GameConfig) -> Self {
        Self {
            passes,
            xp_per_tier: config.xp_per_tier,
            max_tier: config.max_tier,
            season_id: AtomicU32::new(0),
            write_lock: Mutex::new(()),
        }
    }

    pub fn season_id(&self) -> u32 {
        self.season_id.load(Ordering::Acquire)
    }

    /// Point new passes at `season_id` without touching existing ones.
    pub fn set_season(&self, season_id: u32) {
        self.season_id.store(season_id, Ordering::Release);
    }

    pub fn max_tier(&self) -> u32 {
        self.max_tier
    }

    pub fn tier_of(&self, pass: &PlayerPass) -> u32 {
        pass.tier(self.xp_per_tier, self.max_tier)
    }

    /// Current pass for `player`. Players without a pass get an empty one.
    pub fn progress(&self, player: Address) -> BattlePassResult<PlayerPass> {
        Ok(self
            .passes
            .get(&player_key(&player))?
            .unwrap_or_else(|| PlayerPass::new(player, self.season_id())))
    }

    pub fn add_xp(&self, player: Address, amount: u64) -> BattlePassResult<TierProgress> {
        if amount == 0 {
            return Err(BattlePassError::ZeroXp);
        }

        let _guard = self.write_lock.lock().expect("battle pass mutex poisoned");
        let mut pass = self.progress(player)?;
        let previous_tier = self.tier_of(&pass);
        pass.xp = pass.xp.saturating_add(amount);
        let tier = self.tier_of(&pass);
        self.passes.put(&player_key(&player), pass)?;

        record_game_event("battle_pass_xp");
        if tier > previous_tier {
            tracing::info!(player = %player, previous_tier, tier, "Battle pass tier up");
        } else {
            tracing::debug!(player = %player, amount, "Battle pass XP added");
        }

        Ok(TierProgress { previous_tier, tier })
    }

    pub fn unlock_premium(&self, player: Address) -> BattlePassResult<PlayerPass> {
        let _guard = self.write_lock.lock().expect("battle pass mutex poisoned");
        let mut pass = self.progress(player)?;
        if pass.premium {
            return Err(BattlePassError::AlreadyPremium);
        }
        pass.premium = true;
        self.passes.put(&player_key(&player), pass.clone())?;

        record_game_event("battle_pass_premium");
        tracing::info!(player = %player, season_id = pass.season_id, "Premium pass unlocked");
        Ok(pass)
    }

    pub fn claim_reward(&self, player: Address, tier: u32, track: RewardTrack) -> BattlePassResult<Reward> {
        if tier == 0 || tier > self.max_tier {
            return Err(BattlePassError::TierOutOfRange {
                tier,
                max: self.max_tier,
            });
        }

        let _guard = self.write_lock.lock().expect("battle pass mutex poisoned");
        let mut pass = self.progress(player)?;

        let current = self.tier_of(&pass);
        if tier > current {
            return Err(BattlePassError::TierNotReached { tier, current });
        }
        if track == RewardTrack::Premium && !pass.premium {
            return Err(BattlePassError::PremiumRequired);
        }

        let claimed = match track {
            RewardTrack::Free => &mut pass.claimed_free,
            RewardTrack::Premium => &mut pass.claimed_premium,
        };
        if !claimed.insert(tier) {
            return Err(BattlePassError::AlreadyClaimed { tier, track });
        }
        self.passes.put(&player_key(&player), pass)?;

        let reward = Reward::for_tier(tier, track);
        record_game_event("battle_pass_claim");
        tracing::info!(player = %player, tier, track = %track, reward = ?reward, "Battle pass reward claimed");
        Ok(reward)
    }

    /// Wipe every pass and move to `new_season_id`. Returns how many passes
    /// were reset.
    pub fn reset_season(&self, new_season_id: u32) -> BattlePassResult<usize> {
        let _guard = self.write_lock.lock().expect("battle pass mutex poisoned");
        self.set_season(new_season_id);

        let passes = self.passes.list()?;
        let count = passes.len();
        for (key, pass) in passes {
            self.passes.put(&key, PlayerPass::new(pass.player, new_season_id))?;
        }

        record_game_event("battle_pass_reset");
        tracing::info!(season_id = new_season_id, passes = count, "Battle passes reset");
        Ok(count)
    }
}

impl fmt::Debug for BattlePassManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BattlePassManager")
            .field("xp_per_tier", &self.xp_per_tier)
            .field("max_tier", &self.max_tier)
            .field("season_id", &self.season_id())
            .finish()
    }
}
