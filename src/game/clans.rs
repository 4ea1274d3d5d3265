//! Clans: membership, roles and seasonal points.

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

use crate::config::GameConfig;
use crate::observability::metrics::record_game_event;
use crate::store::{Repository, StoreError};

const NAME_LEN: std::ops::RangeInclusive<usize> = 3..=24;
const TAG_LEN: std::ops::RangeInclusive<usize> = 2..=5;

#[derive(Debug, Error)]
pub enum ClanError {
    #[error("clan name must be {min}-{max} characters", min = NAME_LEN.start(), max = NAME_LEN.end())]
    InvalidName,

    #[error("clan tag must be {min}-{max} uppercase letters or digits", min = TAG_LEN.start(), max = TAG_LEN.end())]
    InvalidTag,

    #[error("clan name '{0}' is taken")]
    NameTaken(String),

    #[error("clan tag '{0}' is taken")]
    TagTaken(String),

    #[error("player {0} is already in a clan")]
    AlreadyInClan(Address),

    #[error("player {0} is not in this clan")]
    NotInClan(Address),

    #[error("clan {0} not found")]
    ClanNotFound(Uuid),

    #[error("clan is full ({0} members)")]
    ClanFull(usize),

    #[error("player {0} lacks the role for this action")]
    NotPermitted(Address),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ClanResult<T> = Result<T, ClanError>;

/// Ordered so that a higher role compares greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClanRole {
    Member,
    Officer,
    Leader,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClanMember {
    pub player: Address,
    pub role: ClanRole,
    pub joined_at: DateTime<Utc>,
}

/// A clan. `members` is kept in join order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clan {
    pub id: Uuid,
    pub name: String,
    pub tag: String,
    pub leader: Address,
    pub members: Vec<ClanMember>,
    pub points: u64,
    pub created_at: DateTime<Utc>,
}

impl Clan {
    pub fn member(&self, player: Address) -> Option<&ClanMember> {
        self.members.iter().find(|m| m.player == player)
    }

    fn member_mut(&mut self, player: Address) -> Option<&mut ClanMember> {
        self.members.iter_mut().find(|m| m.player == player)
    }

    /// Longest-serving member holding `role`.
    fn senior(&self, role: ClanRole) -> Option<Address> {
        self.members
            .iter()
            .filter(|m| m.role == role)
            .min_by_key(|m| m.joined_at)
            .map(|m| m.player)
    }
}

fn validate_name(name: &str) -> ClanResult<()> {
    if !NAME_LEN.contains(&name.chars().count()) || name.trim() != name {
        return Err(ClanError::InvalidName);
    }
    Ok(())
}

fn validate_tag(tag: &str) -> ClanResult<()> {
    let valid_chars = tag
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if !TAG_LEN.contains(&tag.len()) || !valid_chars {
        return Err(ClanError::InvalidTag);
    }
    Ok(())
}

pub struct ClanManager {
    clans: Arc<dyn Repository<Clan>>,
    max_members: usize,
    write_lock: Mutex<()>,
}

impl ClanManager {
    pub fn new(clans: Arc<dyn Repository<Clan>>, config: &GameConfig) -> Self {
        Self {
            clans,
            max_members: config.clan_max_members,
            write_lock: Mutex::new(()),
        }
    }

    pub fn clan(&self, id: Uuid) -> ClanResult<Clan> {
        self.clans
            .get(&id.to_string())?
            .ok_or(ClanError::ClanNotFound(id))
    }

    /// The clan `player` belongs to, if any.
    pub fn clan_of(&self, player: Address) -> ClanResult<Option<Clan>> {
        Ok(self
            .clans
            .values()?
            .into_iter()
            .find(|c| c.member(player).is_some()))
    }

    fn save(&self, clan: &Clan) -> ClanResult<()> {
        self.clans.put(&clan.id.to_string(), clan.clone())?;
        Ok(())
    }

    pub fn create_clan(&self, leader: Address, name: &str, tag: &str) -> ClanResult<Clan> {
        validate_name(name)?;
        validate_tag(tag)?;

        let _guard = self.write_lock.lock().expect("clan mutex poisoned");
        let existing = self.clans.values()?;
        if existing.iter().any(|c| c.name.to_lowercase() == name.to_lowercase()) {
            return Err(ClanError::NameTaken(name.to_string()));
        }
        if existing.iter().any(|c| c.tag == tag) {
            return Err(ClanError::TagTaken(tag.to_string()));
        }
        if existing.iter().any(|c| c.member(leader).is_some()) {
            return Err(ClanError::AlreadyInClan(leader));
        }

        let now = Utc::now();
        let clan = Clan {
            id: Uuid::new_v4(),
            name: name.to_string(),
            tag: tag.to_string(),
            leader,
            members: vec![ClanMember {
                player: leader,
                role: ClanRole::Leader,
                joined_at: now,
            }],
            points: 0,
            created_at: now,
        };
        self.save(&clan)?;

        record_game_event("clan_created");
        tracing::info!(clan_id = %clan.id, name, tag, leader = %leader, "Clan created");
        Ok(clan)
    }

    pub fn join(&self, player: Address, clan_id: Uuid) -> ClanResult<Clan> {
        let _guard = self.write_lock.lock().expect("clan mutex poisoned");
        if self.clan_of(player)?.is_some() {
            return Err(ClanError::AlreadyInClan(player));
        }

        let mut clan = self.clan(clan_id)?;
        if clan.members.len() >= self.max_members {
            return Err(ClanError::ClanFull(self.max_members));
        }
        clan.members.push(ClanMember {
            player,
            role: ClanRole::Member,
            joined_at: Utc::now(),
        });
        self.save(&clan)?;

        record_game_event("clan_joined");
        tracing::info!(clan_id = %clan.id, player = %player, "Player joined clan");
        Ok(clan)
    }

    /// Remove `player` from their clan. Returns the clan as it is afterwards,
    /// or `None` if the last member left and the clan was disbanded.
    pub fn leave(&self, player: Address) -> ClanResult<Option<Clan>> {
        let _guard = self.write_lock.lock().expect("clan mutex poisoned");
        let mut clan = self.clan_of(player)?.ok_or(ClanError::NotInClan(player))?;
        self.remove_member(&mut clan, player)
    }

    fn remove_member(&self, clan: &mut Clan, player: Address) -> ClanResult<Option<Clan>> {
        clan.members.retain(|m| m.player != player);

        if clan.members.is_empty() {
            self.clans.delete(&clan.id.to_string())?;
            record_game_event("clan_disbanded");
            tracing::info!(clan_id = %clan.id, name = %clan.name, "Clan disbanded");
            return Ok(None);
        }

        if clan.leader == player {
            let successor = clan
                .senior(ClanRole::Officer)
                .or_else(|| clan.senior(ClanRole::Member));
            if let Some(successor) = successor {
                if let Some(member) = clan.member_mut(successor) {
                    member.role = ClanRole::Leader;
                }
                clan.leader = successor;
                tracing::info!(clan_id = %clan.id, leader = %successor, "Clan leadership passed on");
            }
        }

        self.save(clan)?;
        record_game_event("clan_left");
        tracing::info!(clan_id = %clan.id, player = %player, "Player left clan");
        Ok(Some(clan.clone()))
    }

    /// `actor` removes `target`. The actor must be at least an officer and
    /// outrank the target.
    pub fn kick(&self, actor: Address, target: Address) -> ClanResult<Clan> {
        let _guard = self.write_lock.lock().expect("clan mutex poisoned");
        let mut clan = self.clan_of(actor)?.ok_or(ClanError::NotInClan(actor))?;

        let actor_role = clan.member(actor).map(|m| m.role).ok_or(ClanError::NotInClan(actor))?;
        let target_role = clan.member(target).map(|m| m.role).ok_or(ClanError::NotInClan(target))?;
        if actor_role < ClanRole::Officer || actor_role <= target_role {
            return Err(ClanError::NotPermitted(actor));
        }

        // Target is never the leader here, so the clan survives.
        let clan = self
            .remove_member(&mut clan, target)?
            .ok_or(ClanError::NotInClan(target))?;
        tracing::info!(clan_id = %clan.id, actor = %actor, target = %target, "Player kicked");
        Ok(clan)
    }

    /// Leader promotes a member to officer.
    pub fn promote(&self, actor: Address, target: Address) -> ClanResult<Clan> {
        let _guard = self.write_lock.lock().expect("clan mutex poisoned");
        let mut clan = self.clan_of(actor)?.ok_or(ClanError::NotInClan(actor))?;
        if clan.leader != actor {
            return Err(ClanError::NotPermitted(actor));
        }

        let member = clan.member_mut(target).ok_or(ClanError::NotInClan(target))?;
        if member.role != ClanRole::Member {
            return Err(ClanError::NotPermitted(actor));
        }
        member.role = ClanRole::Officer;
        self.save(&clan)?;

        record_game_event("clan_promotion");
        tracing::info!(clan_id = %clan.id, player = %target, "Member promoted to officer");
        Ok(clan)
    }

    /// Add points to a clan. Returns the new total.
    pub fn add_points(&self, clan_id: Uuid, points: u64) -> ClanResult<u64> {
        let _guard = self.write_lock.lock().expect("clan mutex poisoned");
        let mut clan = self.clan(clan_id)?;
        clan.points = clan.points.saturating_add(points);
        self.save(&clan)?;

        tracing::debug!(clan_id = %clan_id, points, total = clan.points, "Clan points added");
        Ok(clan.points)
    }

    /// Clans by points, highest first. Ties go to the older clan.
    pub fn leaderboard(&self, limit: usize) -> ClanResult<Vec<Clan>> {
        let mut clans = self.clans.values()?;
        clans.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then(a.created_at.cmp(&b.created_at))
                .then_with(|| a.name.cmp(&b.name))
        });
        clans.truncate(limit);
        Ok(clans)
    }

    /// Zero every clan's points. Returns how many clans were touched.
    pub fn reset_points(&self) -> ClanResult<usize> {
        let _guard = self.write_lock.lock().expect("clan mutex poisoned");
        let mut count = 0;
        for mut clan in self.clans.values()? {
            clan.points = 0;
            self.save(&clan)?;
            count += 1;
        }
        tracing::info!(clans = count, "Clan points reset");
        Ok(count)
    }
}

impl std::fmt::Debug for ClanManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClanManager")
            .field("max_members", &self.max_members)
            .finish_non_exhaustive()
    }
}
