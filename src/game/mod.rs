//! Game systems built on top of the repositories.
//!
//! # Data Flow
//! ```text
//! Admin / gameplay caller
//!     → battle_pass.rs, economy.rs, clans.rs, merch.rs, ranking.rs
//!     → Arc<dyn Repository<T>> (one collection each)
//!
//! SeasonManager::reset_season
//!     → ranking.rs (season awards)
//!     → battle_pass.rs (fresh passes)
//!     → clans.rs (points back to zero)
//! ```
//!
//! # Design Decisions
//! - Players are identified by wallet address; repository keys use the
//!   checksummed string form
//! - Each manager serializes its read-check-write sequences with a local
//!   mutex; the repositories themselves are only key-atomic

pub mod battle_pass;
pub mod clans;
pub mod economy;
pub mod merch;
pub mod ranking;
pub mod seasons;

use alloy::primitives::Address;

pub use battle_pass::{BattlePassError, BattlePassManager, PlayerPass, Reward, RewardTrack, TierProgress};
pub use clans::{Clan, ClanError, ClanManager, ClanMember, ClanRole};
pub use economy::{BurnRecord, BurnTotals, BurnedAsset, EconomyError, EconomyLedger, SinkKind};
pub use merch::{MerchError, MerchStore, Order, OrderItem, OrderStatus, ShippingAddress};
pub use ranking::{MatchOutcome, PlayerStanding, RankTier, RankingError, RankingManager, RankingNft};
pub use seasons::{Season, SeasonError, SeasonManager, SeasonResetReport, SeasonStatus};

/// Repository key for a player.
pub(crate) fn player_key(player: &Address) -> String {
    player.to_checksum(None)
}
