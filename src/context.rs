//! Composition root: builds every subsystem from one validated config.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::auth::SiweAuthenticator;
use crate::config::KickoffConfig;
use crate::failover::{FailoverError, FailoverManager};
use crate::game::{
    BattlePassManager, ClanManager, EconomyLedger, MerchStore, RankingManager, SeasonError, SeasonManager,
};
use crate::rpc::{Backoff, RpcClient};
use crate::store::{open_collection, Repository, StoreError, StoreResult};

#[derive(Debug, Error)]
pub enum ContextError {
    #[error(transparent)]
    Failover(#[from] FailoverError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Season(#[from] SeasonError),
}

/// Something that can persist pending writes.
trait Flushable: Send + Sync {
    fn collection(&self) -> &'static str;
    fn flush(&self) -> StoreResult<()>;
}

struct Collection<V> {
    name: &'static str,
    repo: Arc<dyn Repository<V>>,
}

impl<V: Send + Sync> Flushable for Collection<V> {
    fn collection(&self) -> &'static str {
        self.name
    }

    fn flush(&self) -> StoreResult<()> {
        self.repo.flush()
    }
}

/// Opens collections and remembers them for `flush_all`.
#[derive(Default)]
struct Collections {
    opened: Vec<Box<dyn Flushable>>,
}

impl Collections {
    fn open<V>(&mut self, config: &KickoffConfig, name: &'static str) -> StoreResult<Arc<dyn Repository<V>>>
    where
        V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let repo = open_collection::<V>(&config.storage, name)?;
        self.opened.push(Box::new(Collection {
            name,
            repo: repo.clone(),
        }));
        Ok(repo)
    }
}

/// Every long-lived service, wired together.
pub struct AppContext {
    pub config: KickoffConfig,
    pub failover: Arc<FailoverManager>,
    pub rpc: RpcClient,
    pub auth: Arc<SiweAuthenticator>,
    pub battle_pass: Arc<BattlePassManager>,
    pub economy: Arc<EconomyLedger>,
    pub clans: Arc<ClanManager>,
    pub merch: Arc<MerchStore>,
    pub ranking: Arc<RankingManager>,
    pub seasons: Arc<SeasonManager>,
    collections: Vec<Box<dyn Flushable>>,
}

impl AppContext {
    /// Build the context from a config that has already been validated.
    pub fn build(config: KickoffConfig) -> Result<Self, ContextError> {
        let failover = Arc::new(FailoverManager::from_config(&config)?);
        let rpc = RpcClient::new(failover.clone(), Backoff::from_config(&config.failover));
        let auth = Arc::new(SiweAuthenticator::new(config.auth.clone()));

        let mut collections = Collections::default();
        let battle_pass = Arc::new(BattlePassManager::new(
            collections.open(&config, "battle_passes")?,
            &config.game,
        ));
        let economy = Arc::new(EconomyLedger::new(collections.open(&config, "burns")?));
        let clans = Arc::new(ClanManager::new(collections.open(&config, "clans")?, &config.game));
        let merch = Arc::new(MerchStore::new(collections.open(&config, "merch_orders")?));
        let ranking = Arc::new(RankingManager::new(
            collections.open(&config, "standings")?,
            collections.open(&config, "ranking_nfts")?,
        ));
        let seasons = Arc::new(SeasonManager::new(
            collections.open(&config, "seasons")?,
            &config.game,
            ranking.clone(),
            battle_pass.clone(),
            clans.clone(),
        )?);

        tracing::info!(
            endpoints = failover.endpoints().len(),
            backend = ?config.storage.backend,
            collections = collections.opened.len(),
            "Application context built"
        );

        Ok(Self {
            config,
            failover,
            rpc,
            auth,
            battle_pass,
            economy,
            clans,
            merch,
            ranking,
            seasons,
            collections: collections.opened,
        })
    }

    /// Flush every collection. Keeps going past failures and returns the
    /// first one.
    pub fn flush_all(&self) -> StoreResult<()> {
        let mut first_error = None;
        for collection in &self.collections {
            if let Err(e) = collection.flush() {
                tracing::error!(collection = collection.collection(), error = %e, "Failed to flush collection");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                tracing::info!(collections = self.collections.len(), "Flushed all collections");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("failover", &self.failover)
            .field("collections", &self.collections.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EndpointSpec, StorageBackend};
    use crate::game::MatchOutcome;
    use alloy::primitives::Address;
    use chrono::Utc;

    fn config() -> KickoffConfig {
        let mut config = KickoffConfig::default();
        config.endpoints.push(EndpointSpec {
            name: "local".to_string(),
            url: "http://127.0.0.1:8545".to_string(),
            priority: 1,
            timeout_ms: None,
            max_retries: None,
        });
        config
    }

    #[test]
    fn test_build_in_memory() {
        let ctx = AppContext::build(config()).unwrap();
        assert_eq!(ctx.failover.active_endpoint().unwrap().name, "local");
        assert_eq!(ctx.collections.len(), 7);
        assert!(ctx.flush_all().is_ok());
    }

    #[test]
    fn test_file_backend_survives_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config();
        config.storage.backend = StorageBackend::File;
        config.storage.data_dir = dir.path().to_string_lossy().into_owned();

        let player = Address::repeat_byte(7);
        {
            let ctx = AppContext::build(config.clone()).unwrap();
            ctx.seasons.start_first_season("Kickoff", Utc::now()).unwrap();
            ctx.ranking.record_match(player, MatchOutcome::Win).unwrap();
            ctx.flush_all().unwrap();
        }

        let ctx = AppContext::build(config).unwrap();
        assert_eq!(ctx.ranking.season_id(), 1);
        assert_eq!(ctx.ranking.standing(player).unwrap().unwrap().points, 3);
        assert!(dir.path().join("seasons.json").exists());
    }
}
