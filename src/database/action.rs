// SPDX-License-Identifier: GPL-3.0-or-later
//
// mintgate
// Copyright (C) 2025  Nikita Podvirnyi <krypt0nn@vk.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::str::FromStr;

use rusqlite::Transaction;

use mintgate_protocol::prelude::*;

use super::{Database, StoreError};

/// Reward eligibility state of an upstream user action.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionStatus {
    /// Action can be included into a new mint request.
    #[default]
    Eligible,

    /// Action is linked to a mint request which awaits signatures.
    Pending,

    /// Linked mint request has the full governance quorum.
    Approved,

    /// Linked mint request transaction was broadcasted.
    Submitted,

    /// Reward for the action is minted.
    Minted,

    /// Linked mint request was rejected.
    Rejected
}

impl ActionStatus {
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eligible  => "ELIGIBLE",
            Self::Pending   => "PENDING",
            Self::Approved  => "APPROVED",
            Self::Submitted => "SUBMITTED",
            Self::Minted    => "MINTED",
            Self::Rejected  => "REJECTED"
        }
    }
}

impl std::fmt::Display for ActionStatus {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ELIGIBLE"  => Ok(Self::Eligible),
            "PENDING"   => Ok(Self::Pending),
            "APPROVED"  => Ok(Self::Approved),
            "SUBMITTED" => Ok(Self::Submitted),
            "MINTED"    => Ok(Self::Minted),
            "REJECTED"  => Ok(Self::Rejected),

            _ => Err(s.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionInfo {
    /// Owner of the action.
    pub user_id: String,

    /// Name of the rewarded action kind.
    pub kind: String
}

#[derive(Debug, Clone)]
pub struct ActionRecord(Database, i64);

impl ActionRecord {
    /// Create new eligible action record.
    pub fn create(
        database: Database,
        info: &ActionInfo
    ) -> rusqlite::Result<Self> {
        let lock = database.lock();

        let mut query = lock.prepare_cached("
            INSERT INTO actions (
                user_id,
                kind,
                created_at
            ) VALUES (?1, ?2, ?3)
        ")?;

        let id = query.insert((
            info.user_id.as_str(),
            info.kind.as_str(),
            time::UtcDateTime::now().unix_timestamp()
        ))?;

        drop(query);
        drop(lock);

        Ok(Self(database, id))
    }

    /// Open existing action from its ID.
    pub fn open(
        database: Database,
        id: i64
    ) -> rusqlite::Result<Self> {
        database.lock()
            .prepare_cached("SELECT 1 FROM actions WHERE id = ?1")?
            .query_row([id], |_| Ok(()))?;

        Ok(Self(database, id))
    }

    #[inline(always)]
    pub const fn database(&self) -> &Database {
        &self.0
    }

    /// Internal ID of the action.
    #[inline(always)]
    pub const fn id(&self) -> i64 {
        self.1
    }

    /// Owner of the action.
    pub fn user_id(&self) -> rusqlite::Result<String> {
        self.0.lock()
            .prepare_cached("SELECT user_id FROM actions WHERE id = ?1")?
            .query_row([self.1], |row| row.get("user_id"))
    }

    /// Name of the rewarded action kind.
    pub fn kind(&self) -> rusqlite::Result<String> {
        self.0.lock()
            .prepare_cached("SELECT kind FROM actions WHERE id = ?1")?
            .query_row([self.1], |row| row.get("kind"))
    }

    /// Reward eligibility state of the action.
    pub fn status(&self) -> Result<ActionStatus, StoreError> {
        let status = self.0.lock()
            .prepare_cached("SELECT status FROM actions WHERE id = ?1")?
            .query_row([self.1], |row| row.get::<_, String>("status"))?;

        ActionStatus::from_str(&status)
            .map_err(|_| StoreError::Corrupted { id: self.1, field: "actions.status" })
    }

    /// Mint request this action is linked to.
    pub fn mint_request_id(&self) -> rusqlite::Result<Option<i64>> {
        self.0.lock()
            .prepare_cached("SELECT mint_request_id FROM actions WHERE id = ?1")?
            .query_row([self.1], |row| row.get("mint_request_id"))
    }

    /// Hash of the mint transaction which settles this action.
    pub fn tx_hash(&self) -> rusqlite::Result<Option<B256>> {
        self.0.lock()
            .prepare_cached("SELECT tx_hash FROM actions WHERE id = ?1")?
            .query_row([self.1], |row| row.get::<_, Option<[u8; 32]>>("tx_hash"))
            .map(|hash| hash.map(B256::from))
    }
}

/// Link eligible unlinked actions to the mint request.
pub(super) fn link(
    tx: &Transaction,
    request_id: i64,
    action_ids: &[i64]
) -> Result<(), StoreError> {
    let mut query = tx.prepare_cached("
        UPDATE actions SET status = ?3, mint_request_id = ?1
        WHERE id = ?2 AND status = ?4 AND mint_request_id IS NULL
    ")?;

    for id in action_ids {
        let changed = query.execute((
            request_id,
            id,
            ActionStatus::Pending.as_str(),
            ActionStatus::Eligible.as_str()
        ))?;

        if changed != 1 {
            return Err(StoreError::ActionUnavailable(*id));
        }
    }

    Ok(())
}

/// Update status of all the actions linked to the mint request.
pub(super) fn set_status(
    tx: &Transaction,
    request_id: i64,
    status: ActionStatus
) -> rusqlite::Result<usize> {
    tx.prepare_cached("UPDATE actions SET status = ?2 WHERE mint_request_id = ?1")?
        .execute((request_id, status.as_str()))
}

/// Propagate mint transaction hash to all the linked actions.
pub(super) fn set_tx_hash(
    tx: &Transaction,
    request_id: i64,
    tx_hash: Option<&B256>
) -> rusqlite::Result<usize> {
    tx.prepare_cached("UPDATE actions SET tx_hash = ?2 WHERE mint_request_id = ?1")?
        .execute((request_id, tx_hash.map(|hash| hash.0)))
}

/// Unlink all the actions from the mint request, setting them the given
/// status and clearing transaction hash.
pub(super) fn release(
    tx: &Transaction,
    request_id: i64,
    status: ActionStatus
) -> rusqlite::Result<usize> {
    tx.prepare_cached("
        UPDATE actions SET status = ?2, mint_request_id = NULL, tx_hash = NULL
        WHERE mint_request_id = ?1
    ")?.execute((request_id, status.as_str()))
}

/// IDs of all the actions linked to the mint request.
pub(super) fn linked_ids(
    connection: &rusqlite::Connection,
    request_id: i64
) -> rusqlite::Result<Vec<i64>> {
    connection.prepare_cached("
        SELECT id FROM actions WHERE mint_request_id = ?1 ORDER BY id ASC
    ")?
        .query_map([request_id], |row| row.get("id"))?
        .collect()
}

