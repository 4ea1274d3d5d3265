//! Burn ledger for the in-game currency and NFT sinks.

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

use crate::observability::metrics::record_game_event;
use crate::store::{Repository, StoreError};

#[derive(Debug, Error)]
pub enum EconomyError {
    #[error("burn amount must be greater than zero")]
    ZeroAmount,

    #[error("NFT {0} has already been burned")]
    NftAlreadyBurned(u64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type EconomyResult<T> = Result<T, EconomyError>;

/// Where burned value goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    PlayerUpgrade,
    PackOpening,
    NameChange,
    ClanCreation,
    MerchDiscount,
    NftBurn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BurnedAsset {
    Currency { amount: u64 },
    Nft { token_id: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnRecord {
    pub id: Uuid,
    pub player: Address,
    pub kind: SinkKind,
    pub asset: BurnedAsset,
    pub season_id: u32,
    pub burned_at: DateTime<Utc>,
}

/// Aggregated burns. `by_kind` counts burn records per sink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BurnTotals {
    pub currency_burned: u64,
    pub nfts_burned: u64,
    pub by_kind: BTreeMap<SinkKind, u64>,
}

pub struct EconomyLedger {
    burns: Arc<dyn Repository<BurnRecord>>,
    write_lock: Mutex<()>,
}

impl EconomyLedger {
    pub fn new(burns: Arc<dyn Repository<BurnRecord>>) -> Self {
        Self {
            burns,
            write_lock: Mutex::new(()),
        }
    }

    pub fn record_burn(
        &self,
        player: Address,
        kind: SinkKind,
        asset: BurnedAsset,
        season_id: u32,
    ) -> EconomyResult<BurnRecord> {
        let _guard = self.write_lock.lock().expect("economy mutex poisoned");

        match asset {
            BurnedAsset::Currency { amount: 0 } => return Err(EconomyError::ZeroAmount),
            BurnedAsset::Nft { token_id } => {
                let burned = self
                    .burns
                    .values()?
                    .iter()
                    .any(|r| r.asset == BurnedAsset::Nft { token_id });
                if burned {
                    return Err(EconomyError::NftAlreadyBurned(token_id));
                }
            }
            BurnedAsset::Currency { .. } => {}
        }

        let record = BurnRecord {
            id: Uuid::new_v4(),
            player,
            kind,
            asset,
            season_id,
            burned_at: Utc::now(),
        };
        self.burns.put(&record.id.to_string(), record.clone())?;

        record_game_event("burn");
        tracing::info!(
            player = %player,
            kind = ?kind,
            asset = ?asset,
            season_id,
            "Burn recorded"
        );
        Ok(record)
    }

    /// Burns by `player`, oldest first.
    pub fn player_history(&self, player: Address) -> EconomyResult<Vec<BurnRecord>> {
        let mut history: Vec<BurnRecord> = self
            .burns
            .values()?
            .into_iter()
            .filter(|r| r.player == player)
            .collect();
        history.sort_by_key(|r| r.burned_at);
        Ok(history)
    }

    /// Totals across all seasons, or for one season.
    pub fn totals(&self, season_id: Option<u32>) -> EconomyResult<BurnTotals> {
        let mut totals = BurnTotals::default();
        for record in self.burns.values()? {
            if season_id.is_some_and(|s| s != record.season_id) {
                continue;
            }
            match record.asset {
                BurnedAsset::Currency { amount } => {
                    totals.currency_burned = totals.currency_burned.saturating_add(amount)
                }
                BurnedAsset::Nft { .. } => totals.nfts_burned += 1,
            }
            *totals.by_kind.entry(record.kind).or_insert(0) += 1;
        }
        Ok(totals)
    }
}

impl std::fmt::Debug for EconomyLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EconomyLedger").finish_non_exhaustive()
    }
}
