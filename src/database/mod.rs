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

use std::collections::BTreeMap;
use std::iter::FusedIterator;
use std::path::Path;
use std::sync::Arc;

use spin::{Mutex, MutexGuard};
use rusqlite::Connection;

use mintgate_protocol::prelude::*;

pub mod action;
pub mod request;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("mint request {0} doesn't exist")]
    NotFound(i64),

    #[error("mint request {0} was modified concurrently, reload it and try again")]
    Stale(i64),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("action {0} is not eligible or already linked to another mint request")]
    ActionUnavailable(i64),

    #[error("nonce {nonce} for recipient {recipient} must be greater than {last}")]
    NonceNotIncreasing {
        recipient: Address,
        nonce: u64,
        last: u64
    },

    #[error("mint request {id} can't be deleted in {status} status")]
    NotDeletable {
        id: i64,
        status: MintStatus
    },

    #[error("mint request {id} has corrupted field '{field}'")]
    Corrupted {
        id: i64,
        field: &'static str
    }
}

#[derive(Debug, Clone)]
pub struct Database(Arc<Mutex<Connection>>);

impl Database {
    pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open temporary database which lives in RAM.
    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(connection: Connection) -> rusqlite::Result<Self> {
        connection.execute_batch(r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS mint_requests (
                id            INTEGER NOT NULL UNIQUE,
                user_id       TEXT    NOT NULL,
                recipient     BLOB    NOT NULL,
                amount        TEXT    NOT NULL,
                evidence_hash BLOB    NOT NULL,
                action_name   TEXT    NOT NULL,
                action_hash   BLOB,
                nonce         INTEGER NOT NULL,

                status           TEXT    NOT NULL DEFAULT 'PENDING_SIG',
                signature        BLOB,
                tx_hash          BLOB,
                block_number     INTEGER,
                retry_count      INTEGER NOT NULL DEFAULT 0,
                error_message    TEXT,
                rejection_reason TEXT,

                version    INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,

                UNIQUE (recipient, nonce),
                CHECK (nonce >= 0),
                CHECK (retry_count >= 0),

                PRIMARY KEY (id)
            );

            CREATE INDEX IF NOT EXISTS mint_requests_idx ON mint_requests (
                id,
                status,
                recipient
            );

            CREATE TABLE IF NOT EXISTS mint_signatures (
                request_id  INTEGER NOT NULL,
                group_name  TEXT    NOT NULL,
                signer      BLOB    NOT NULL,
                signature   BLOB    NOT NULL,
                signer_name TEXT    NOT NULL,
                signed_at   INTEGER NOT NULL,

                UNIQUE (request_id, group_name),

                FOREIGN KEY (request_id) REFERENCES mint_requests (id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS actions (
                id              INTEGER NOT NULL UNIQUE,
                user_id         TEXT    NOT NULL,
                kind            TEXT    NOT NULL,
                status          TEXT    NOT NULL DEFAULT 'ELIGIBLE',
                mint_request_id INTEGER          DEFAULT NULL,
                tx_hash         BLOB             DEFAULT NULL,
                created_at      INTEGER NOT NULL,

                PRIMARY KEY (id),
                FOREIGN KEY (mint_request_id) REFERENCES mint_requests (id) ON DELETE SET NULL
            );

            CREATE INDEX IF NOT EXISTS actions_idx ON actions (
                id,
                mint_request_id,
                status
            );
        "#)?;

        Ok(Self(Arc::new(Mutex::new(connection))))
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.0.lock()
    }

    /// Get iterator over stored mint requests, optionally filtered by status.
    pub fn requests(&self, status: Option<MintStatus>) -> RequestsIter {
        RequestsIter {
            database: self.clone(),
            status,
            current: 0
        }
    }

    /// Submitted or failed mint requests which have a transaction hash, in
    /// creation order.
    pub fn reconciliation_candidates(&self) -> rusqlite::Result<Vec<request::MintRequestRecord>> {
        let lock = self.lock();

        let mut query = lock.prepare_cached("
            SELECT id FROM mint_requests
            WHERE status IN (?1, ?2) AND tx_hash IS NOT NULL
            ORDER BY id ASC
        ")?;

        let statuses = [
            MintStatus::Submitted.as_str(),
            MintStatus::Failed.as_str()
        ];

        let ids = query.query_map(statuses, |row| row.get::<_, i64>("id"))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        drop(query);
        drop(lock);

        Ok(ids.into_iter()
            .map(|id| request::MintRequestRecord::open_raw(self.clone(), id))
            .collect())
    }

    /// Calculate aggregated mint requests statistics. Values are derived from
    /// the stored rows on every call.
    pub fn stats(&self) -> Result<MintStats, StoreError> {
        let lock = self.lock();

        let mut query = lock.prepare_cached("
            SELECT id, status, amount, tx_hash IS NOT NULL AS has_tx_hash
            FROM mint_requests
        ")?;

        let rows = query.query_map([], |row| {
            Ok((
                row.get::<_, i64>("id")?,
                row.get::<_, String>("status")?,
                row.get::<_, String>("amount")?,
                row.get::<_, bool>("has_tx_hash")?
            ))
        })?;

        let mut stats = MintStats::default();

        for row in rows {
            let (id, status, amount, has_tx_hash) = row?;

            let status = status.parse::<MintStatus>()
                .map_err(|_| StoreError::Corrupted { id, field: "status" })?;

            let amount = amount.parse::<u128>()
                .map_err(|_| StoreError::Corrupted { id, field: "amount" })?;

            stats.total += 1;

            *stats.by_status.entry(status).or_default() += 1;

            match status {
                MintStatus::Confirmed => {
                    stats.confirmed_amount = stats.confirmed_amount.saturating_add(amount);
                }

                MintStatus::Rejected => (),

                _ => stats.pending_amount = stats.pending_amount.saturating_add(amount)
            }

            if matches!(status, MintStatus::Submitted | MintStatus::Failed) && has_tx_hash {
                stats.reconcilable += 1;
            }
        }

        Ok(stats)
    }
}

/// Aggregated view over all the stored mint requests.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct MintStats {
    pub total: u64,
    pub by_status: BTreeMap<MintStatus, u64>,

    /// Sum of amounts of confirmed requests, saturated at `u128::MAX`.
    pub confirmed_amount: u128,

    /// Sum of amounts of requests which are neither confirmed nor rejected,
    /// saturated at `u128::MAX`.
    pub pending_amount: u128,

    /// Submitted or failed requests which have a transaction hash and can be
    /// reconciled.
    pub reconcilable: u64
}

impl MintStats {
    #[inline]
    pub fn count(&self, status: MintStatus) -> u64 {
        self.by_status.get(&status).copied().unwrap_or_default()
    }
}

pub struct RequestsIter {
    database: Database,
    status: Option<MintStatus>,
    current: i64
}

impl Iterator for RequestsIter {
    type Item = request::MintRequestRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let lock = self.database.lock();

        let mut query = lock.prepare_cached("
            SELECT id FROM mint_requests
            WHERE id > ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY id ASC
            LIMIT 1
        ").ok()?;

        let id = query.query_row(
            (self.current, self.status.map(|status| status.as_str())),
            |row| row.get("id")
        ).ok()?;

        self.current = id;

        let record = request::MintRequestRecord::open_raw(
            self.database.clone(),
            id
        );

        Some(record)
    }
}

impl FusedIterator for RequestsIter {}
