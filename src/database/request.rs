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

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use rusqlite::{OptionalExtension, Transaction};
use time::UtcDateTime;

use mintgate_protocol::prelude::*;

use super::action::{self, ActionStatus};
use super::{Database, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRequestInfo {
    /// Owner of the rewarded actions.
    pub user_id: String,

    /// Chain address which receives minted tokens.
    pub recipient: Address,

    /// Amount of tokens in minor units.
    pub amount: u128,

    /// Content-addressed proof of the rewarded actions.
    pub evidence_hash: B256,

    pub action_name: String,

    /// Precomputed `keccak256(action_name)`. Missing for some legacy rows.
    pub action_hash: Option<B256>,

    /// Per-recipient replay protection nonce.
    pub nonce: u64,

    /// Signature of the legacy single-signer path.
    pub legacy_signature: Option<Signature>,

    /// Upstream actions settled by this request.
    pub action_ids: Vec<i64>
}

/// Signature of a governance group member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSignature {
    pub signer: Address,
    pub signature: Signature,
    pub signer_name: String,
    pub signed_at: UtcDateTime
}

/// Snapshot of a stored mint request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRequest {
    pub id: i64,
    pub user_id: String,
    pub recipient: Address,
    pub amount: u128,
    pub evidence_hash: B256,
    pub action_name: String,
    pub action_hash: Option<B256>,
    pub nonce: u64,

    pub status: MintStatus,
    pub signatures: BTreeMap<GovernanceGroup, GroupSignature>,

    /// Canonical single signature. Set to the last accepted governance
    /// signature once the quorum is reached, or holds the legacy signature.
    pub signature: Option<Signature>,

    pub tx_hash: Option<B256>,
    pub block_number: Option<u64>,
    pub retry_count: u32,
    pub error_message: Option<String>,
    pub rejection_reason: Option<String>,

    pub action_ids: Vec<i64>,

    /// Optimistic concurrency token, incremented on every status change.
    pub version: i64,

    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime
}

impl MintRequest {
    /// Governance groups which have already signed the request.
    #[inline]
    pub fn completed_groups(&self) -> BTreeSet<GovernanceGroup> {
        self.signatures.keys().copied().collect()
    }

    #[inline]
    pub fn has_quorum(&self) -> bool {
        is_quorum(&self.completed_groups())
    }

    /// Legacy request carries a single pre-quorum signature and no
    /// governance signatures at all.
    #[inline]
    pub fn is_legacy(&self) -> bool {
        self.signatures.is_empty() && self.signature.is_some()
    }

    /// Governance signatures in the canonical contract order. Return `None`
    /// if the quorum is not reached.
    pub fn ordered_signatures(&self) -> Option<[Signature; 3]> {
        let [will, wisdom, love] = GovernanceGroup::ALL
            .map(|group| self.signatures.get(&group).map(|entry| entry.signature));

        Some([will?, wisdom?, love?])
    }

    /// Typed payload signed by the governance groups. Return `None` if the
    /// action hash is missing.
    pub fn authorization(&self) -> Option<MintAuthorization> {
        Some(MintAuthorization {
            recipient: self.recipient,
            actionHash: self.action_hash?,
            amount: U256::from(self.amount),
            evidenceHash: self.evidence_hash,
            nonce: U256::from(self.nonce)
        })
    }
}

struct RawRequest {
    user_id: String,
    recipient: [u8; 20],
    amount: String,
    evidence_hash: [u8; 32],
    action_name: String,
    action_hash: Option<[u8; 32]>,
    nonce: u64,
    status: String,
    signature: Option<Vec<u8>>,
    tx_hash: Option<[u8; 32]>,
    block_number: Option<u64>,
    retry_count: u32,
    error_message: Option<String>,
    rejection_reason: Option<String>,
    version: i64,
    created_at: i64,
    updated_at: i64
}

struct RawSignature {
    group: String,
    signer: [u8; 20],
    signature: Vec<u8>,
    signer_name: String,
    signed_at: i64
}

#[inline]
fn now() -> i64 {
    UtcDateTime::now().unix_timestamp()
}

#[derive(Debug, Clone)]
pub struct MintRequestRecord(Database, i64);

impl MintRequestRecord {
    /// Create new mint request record and link provided actions to it.
    pub fn create(
        database: Database,
        info: &MintRequestInfo
    ) -> Result<Self, StoreError> {
        let mut lock = database.lock();

        let tx = lock.transaction()?;

        let last_nonce = tx.prepare_cached("
            SELECT MAX(nonce) FROM mint_requests WHERE recipient = ?1
        ")?.query_row([info.recipient.as_slice()], |row| row.get::<_, Option<u64>>(0))?;

        if let Some(last) = last_nonce && info.nonce <= last {
            return Err(StoreError::NonceNotIncreasing {
                recipient: info.recipient,
                nonce: info.nonce,
                last
            });
        }

        let timestamp = now();

        let id = tx.prepare_cached("
            INSERT INTO mint_requests (
                user_id,
                recipient,
                amount,
                evidence_hash,
                action_name,
                action_hash,
                nonce,
                signature,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
        ")?.insert((
            info.user_id.as_str(),
            info.recipient.as_slice(),
            info.amount.to_string(),
            info.evidence_hash.0,
            info.action_name.as_str(),
            info.action_hash.map(|hash| hash.0),
            info.nonce,
            info.legacy_signature.map(|signature| signature.as_bytes().to_vec()),
            timestamp
        ))?;

        action::link(&tx, id, &info.action_ids)?;

        tx.commit()?;

        drop(lock);

        tracing::info!(
            request_id = id,
            recipient = %info.recipient,
            nonce = info.nonce,
            actions = info.action_ids.len(),
            "mint request created"
        );

        Ok(Self(database, id))
    }

    /// Next unused nonce of the recipient.
    pub fn next_nonce(
        database: &Database,
        recipient: &Address
    ) -> rusqlite::Result<u64> {
        database.lock()
            .prepare_cached("SELECT MAX(nonce) FROM mint_requests WHERE recipient = ?1")?
            .query_row([recipient.as_slice()], |row| row.get::<_, Option<u64>>(0))
            .map(|nonce| nonce.map(|nonce| nonce + 1).unwrap_or_default())
    }

    /// Open mint request without verifying its existance.
    #[inline(always)]
    pub fn open_raw(database: Database, id: i64) -> Self {
        Self(database, id)
    }

    /// Open existing mint request from its ID.
    pub fn open(
        database: Database,
        id: i64
    ) -> Result<Self, StoreError> {
        database.lock()
            .prepare_cached("SELECT 1 FROM mint_requests WHERE id = ?1")?
            .query_row([id], |_| Ok(()))
            .optional()?
            .ok_or(StoreError::NotFound(id))?;

        Ok(Self(database, id))
    }

    #[inline(always)]
    pub const fn database(&self) -> &Database {
        &self.0
    }

    /// Internal ID of the mint request.
    #[inline(always)]
    pub const fn id(&self) -> i64 {
        self.1
    }

    /// Current lifecycle status of the mint request.
    pub fn status(&self) -> Result<MintStatus, StoreError> {
        let status = self.0.lock()
            .prepare_cached("SELECT status FROM mint_requests WHERE id = ?1")?
            .query_row([self.1], |row| row.get::<_, String>("status"))
            .optional()?
            .ok_or(StoreError::NotFound(self.1))?;

        MintStatus::from_str(&status)
            .map_err(|_| StoreError::Corrupted { id: self.1, field: "status" })
    }

    /// Read the whole mint request with its signatures and linked actions.
    pub fn load(&self) -> Result<MintRequest, StoreError> {
        let lock = self.0.lock();

        let raw = lock.prepare_cached("
            SELECT
                user_id, recipient, amount, evidence_hash, action_name,
                action_hash, nonce, status, signature, tx_hash, block_number,
                retry_count, error_message, rejection_reason, version,
                created_at, updated_at
            FROM mint_requests WHERE id = ?1
        ")?.query_row([self.1], |row| {
            Ok(RawRequest {
                user_id: row.get("user_id")?,
                recipient: row.get("recipient")?,
                amount: row.get("amount")?,
                evidence_hash: row.get("evidence_hash")?,
                action_name: row.get("action_name")?,
                action_hash: row.get("action_hash")?,
                nonce: row.get("nonce")?,
                status: row.get("status")?,
                signature: row.get("signature")?,
                tx_hash: row.get("tx_hash")?,
                block_number: row.get("block_number")?,
                retry_count: row.get("retry_count")?,
                error_message: row.get("error_message")?,
                rejection_reason: row.get("rejection_reason")?,
                version: row.get("version")?,
                created_at: row.get("created_at")?,
                updated_at: row.get("updated_at")?
            })
        }).optional()?;

        let Some(raw) = raw else {
            return Err(StoreError::NotFound(self.1));
        };

        let signatures = lock.prepare_cached("
            SELECT group_name, signer, signature, signer_name, signed_at
            FROM mint_signatures WHERE request_id = ?1
        ")?.query_map([self.1], |row| {
            Ok(RawSignature {
                group: row.get("group_name")?,
                signer: row.get("signer")?,
                signature: row.get("signature")?,
                signer_name: row.get("signer_name")?,
                signed_at: row.get("signed_at")?
            })
        })?.collect::<rusqlite::Result<Vec<_>>>()?;

        let action_ids = action::linked_ids(&lock, self.1)?;

        drop(lock);

        self.decode(raw, signatures, action_ids)
    }

    fn decode(
        &self,
        raw: RawRequest,
        raw_signatures: Vec<RawSignature>,
        action_ids: Vec<i64>
    ) -> Result<MintRequest, StoreError> {
        let id = self.1;

        let corrupted = |field: &'static str| StoreError::Corrupted { id, field };

        let mut signatures = BTreeMap::new();

        for entry in raw_signatures {
            let group = GovernanceGroup::from_str(&entry.group)
                .map_err(|_| corrupted("mint_signatures.group_name"))?;

            signatures.insert(group, GroupSignature {
                signer: Address::from(entry.signer),
                signature: Signature::from_raw(&entry.signature)
                    .map_err(|_| corrupted("mint_signatures.signature"))?,
                signer_name: entry.signer_name,
                signed_at: UtcDateTime::from_unix_timestamp(entry.signed_at)
                    .map_err(|_| corrupted("mint_signatures.signed_at"))?
            });
        }

        let signature = match raw.signature {
            Some(signature) => Some({
                Signature::from_raw(&signature)
                    .map_err(|_| corrupted("signature"))?
            }),

            None => None
        };

        Ok(MintRequest {
            id,
            user_id: raw.user_id,
            recipient: Address::from(raw.recipient),
            amount: raw.amount.parse()
                .map_err(|_| corrupted("amount"))?,
            evidence_hash: B256::from(raw.evidence_hash),
            action_name: raw.action_name,
            action_hash: raw.action_hash.map(B256::from),
            nonce: raw.nonce,
            status: MintStatus::from_str(&raw.status)
                .map_err(|_| corrupted("status"))?,
            signatures,
            signature,
            tx_hash: raw.tx_hash.map(B256::from),
            block_number: raw.block_number,
            retry_count: raw.retry_count,
            error_message: raw.error_message,
            rejection_reason: raw.rejection_reason,
            action_ids,
            version: raw.version,
            created_at: UtcDateTime::from_unix_timestamp(raw.created_at)
                .map_err(|_| corrupted("created_at"))?,
            updated_at: UtcDateTime::from_unix_timestamp(raw.updated_at)
                .map_err(|_| corrupted("updated_at"))?
        })
    }

    /// Move request from the `expected` snapshot state to the `to` status.
    ///
    /// The status update is conditional on the stored version and status
    /// matching the snapshot, so a concurrent writer makes this call fail
    /// with `StoreError::Stale` instead of being overwritten. The `update`
    /// callback runs in the same SQL transaction.
    fn transition(
        &self,
        expected: &MintRequest,
        to: MintStatus,
        update: impl FnOnce(&Transaction) -> Result<(), StoreError>
    ) -> Result<(), StoreError> {
        expected.status.validate_transition(to)?;

        let mut lock = self.0.lock();

        let tx = lock.transaction()?;

        let changed = tx.prepare_cached("
            UPDATE mint_requests
            SET status = ?4, version = version + 1, updated_at = ?5
            WHERE id = ?1 AND version = ?2 AND status = ?3
        ")?.execute((
            self.1,
            expected.version,
            expected.status.as_str(),
            to.as_str(),
            now()
        ))?;

        if changed != 1 {
            return Err(StoreError::Stale(self.1));
        }

        update(&tx)?;

        tx.commit()?;

        tracing::debug!(
            request_id = self.1,
            from = %expected.status,
            to = %to,
            "mint request status updated"
        );

        Ok(())
    }

    /// Store governance group signature. Moves the request to `SIGNING`, or
    /// to `SIGNED` if this signature completes the quorum.
    pub fn add_signature(
        &self,
        expected: &MintRequest,
        group: GovernanceGroup,
        signature: &GroupSignature
    ) -> Result<MintRequest, StoreError> {
        let mut completed = expected.completed_groups();

        if !completed.insert(group) {
            return Err(StoreError::Stale(self.1));
        }

        let to = if is_quorum(&completed) {
            MintStatus::Signed
        } else {
            MintStatus::Signing
        };

        self.transition(expected, to, |tx| {
            tx.prepare_cached("
                INSERT INTO mint_signatures (
                    request_id,
                    group_name,
                    signer,
                    signature,
                    signer_name,
                    signed_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ")?.execute((
                self.1,
                group.as_str(),
                signature.signer.as_slice(),
                signature.signature.as_bytes().to_vec(),
                signature.signer_name.as_str(),
                signature.signed_at.unix_timestamp()
            ))?;

            if to == MintStatus::Signed {
                tx.prepare_cached("UPDATE mint_requests SET signature = ?2 WHERE id = ?1")?
                    .execute((self.1, signature.signature.as_bytes().to_vec()))?;

                action::set_status(tx, self.1, ActionStatus::Approved)?;
            }

            Ok(())
        })?;

        self.load()
    }

    /// Record successfully broadcasted transaction.
    pub fn mark_submitted(
        &self,
        expected: &MintRequest,
        tx_hash: &B256
    ) -> Result<(), StoreError> {
        self.transition(expected, MintStatus::Submitted, |tx| {
            tx.prepare_cached("
                UPDATE mint_requests
                SET tx_hash = ?2, block_number = NULL, error_message = NULL
                WHERE id = ?1
            ")?.execute((self.1, tx_hash.0))?;

            action::set_status(tx, self.1, ActionStatus::Submitted)?;
            action::set_tx_hash(tx, self.1, Some(tx_hash))?;

            Ok(())
        })
    }

    /// Record on-chain finality of the request's transaction.
    pub fn mark_confirmed(
        &self,
        expected: &MintRequest,
        block_number: u64
    ) -> Result<(), StoreError> {
        self.transition(expected, MintStatus::Confirmed, |tx| {
            tx.prepare_cached("
                UPDATE mint_requests
                SET block_number = ?2, error_message = NULL
                WHERE id = ?1
            ")?.execute((self.1, block_number))?;

            action::set_status(tx, self.1, ActionStatus::Minted)?;

            Ok(())
        })
    }

    /// Record failed submission attempt and increment retry counter.
    ///
    /// Linked actions go back to `APPROVED`. Their transaction hash is kept
    /// so a failed but actually mined transaction can still be reconciled.
    pub fn mark_failed(
        &self,
        expected: &MintRequest,
        message: impl AsRef<str>
    ) -> Result<(), StoreError> {
        self.transition(expected, MintStatus::Failed, |tx| {
            tx.prepare_cached("
                UPDATE mint_requests
                SET error_message = ?2, retry_count = retry_count + 1
                WHERE id = ?1
            ")?.execute((self.1, message.as_ref()))?;

            action::set_status(tx, self.1, ActionStatus::Approved)?;

            Ok(())
        })
    }

    /// Reject the request. Linked actions are marked rejected and unlinked.
    pub fn reject(&self, reason: impl AsRef<str>) -> Result<MintRequest, StoreError> {
        let request = self.load()?;

        self.transition(&request, MintStatus::Rejected, |tx| {
            tx.prepare_cached("UPDATE mint_requests SET rejection_reason = ?2 WHERE id = ?1")?
                .execute((self.1, reason.as_ref()))?;

            action::release(tx, self.1, ActionStatus::Rejected)?;

            Ok(())
        })?;

        tracing::info!(request_id = self.1, reason = reason.as_ref(), "mint request rejected");

        self.load()
    }

    /// Reset failed request back to `PENDING_SIG`, dropping all the collected
    /// signatures, transaction hash and error state.
    pub fn reset(&self) -> Result<MintRequest, StoreError> {
        let request = self.load()?;

        self.transition(&request, MintStatus::PendingSig, |tx| {
            tx.prepare_cached("DELETE FROM mint_signatures WHERE request_id = ?1")?
                .execute([self.1])?;

            tx.prepare_cached("
                UPDATE mint_requests
                SET signature = NULL, tx_hash = NULL, block_number = NULL, error_message = NULL
                WHERE id = ?1
            ")?.execute([self.1])?;

            action::set_status(tx, self.1, ActionStatus::Pending)?;
            action::set_tx_hash(tx, self.1, None)?;

            Ok(())
        })?;

        tracing::info!(request_id = self.1, "mint request reset");

        self.load()
    }

    /// Delete the request and release linked actions back to the eligible
    /// state. Requests which may have a transaction on-chain can't be deleted.
    pub fn delete(self) -> Result<(), StoreError> {
        let status = self.status()?;

        if matches!(status, MintStatus::Submitted | MintStatus::Confirmed) {
            return Err(StoreError::NotDeletable { id: self.1, status });
        }

        let mut lock = self.0.lock();

        let tx = lock.transaction()?;

        let current = tx.prepare_cached("SELECT 1 FROM mint_requests WHERE id = ?1 AND status = ?2")?
            .query_row((self.1, status.as_str()), |_| Ok(()))
            .optional()?;

        if current.is_none() {
            return Err(StoreError::Stale(self.1));
        }

        action::release(&tx, self.1, ActionStatus::Eligible)?;

        tx.prepare_cached("DELETE FROM mint_signatures WHERE request_id = ?1")?
            .execute([self.1])?;

        tx.prepare_cached("DELETE FROM mint_requests WHERE id = ?1")?
            .execute([self.1])?;

        tx.commit()?;

        tracing::info!(request_id = self.1, "mint request deleted");

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::database::action::{ActionInfo, ActionRecord};

    pub fn create_actions(database: &Database, count: usize) -> Vec<i64> {
        (0..count)
            .map(|_| {
                ActionRecord::create(database.clone(), &ActionInfo {
                    user_id: String::from("user-1"),
                    kind: String::from("post")
                }).map(|action| action.id())
            })
            .collect::<rusqlite::Result<Vec<_>>>()
            .expect("failed to create actions")
    }

    pub fn request_info(action_ids: Vec<i64>, nonce: u64) -> MintRequestInfo {
        MintRequestInfo {
            user_id: String::from("user-1"),
            recipient: Address::repeat_byte(0x42),
            amount: 1000,
            evidence_hash: keccak256(b"evidence"),
            action_name: String::from("post_reward"),
            action_hash: Some(action_hash("post_reward")),
            nonce,
            legacy_signature: None,
            action_ids
        }
    }

    fn group_signature(byte: u8) -> GroupSignature {
        GroupSignature {
            signer: Address::repeat_byte(byte),
            signature: Signature::new(U256::from(byte), U256::from(byte), false),
            signer_name: format!("signer-{byte}"),
            signed_at: UtcDateTime::now()
        }
    }

    fn action_statuses(database: &Database, ids: &[i64]) -> Vec<ActionStatus> {
        ids.iter()
            .map(|id| {
                ActionRecord::open(database.clone(), *id)
                    .expect("failed to open action")
                    .status()
                    .expect("failed to read action status")
            })
            .collect()
    }

    #[test]
    fn test_create() -> Result<(), StoreError> {
        let database = Database::open_in_memory()?;
        let actions = create_actions(&database, 2);

        let record = MintRequestRecord::create(database.clone(), &request_info(actions.clone(), 0))?;
        let request = record.load()?;

        assert_eq!(request.status, MintStatus::PendingSig);
        assert_eq!(request.amount, 1000);
        assert_eq!(request.action_ids, actions);
        assert!(request.signatures.is_empty());
        assert!(request.tx_hash.is_none());
        assert!(!request.is_legacy());

        assert_eq!(action_statuses(&database, &actions), vec![ActionStatus::Pending; 2]);

        Ok(())
    }

    #[test]
    fn test_nonce_must_increase() -> Result<(), StoreError> {
        let database = Database::open_in_memory()?;
        let recipient = Address::repeat_byte(0x42);

        assert_eq!(MintRequestRecord::next_nonce(&database, &recipient)?, 0);

        MintRequestRecord::create(database.clone(), &request_info(vec![], 5))?;

        assert_eq!(MintRequestRecord::next_nonce(&database, &recipient)?, 6);

        for nonce in [5, 4] {
            let result = MintRequestRecord::create(database.clone(), &request_info(vec![], nonce));

            assert!(matches!(result, Err(StoreError::NonceNotIncreasing { last: 5, .. })));
        }

        // Nonces are tracked per recipient.
        let mut info = request_info(vec![], 0);

        info.recipient = Address::repeat_byte(0x43);

        MintRequestRecord::create(database.clone(), &info)?;

        Ok(())
    }

    #[test]
    fn test_action_linked_once() -> Result<(), StoreError> {
        let database = Database::open_in_memory()?;
        let actions = create_actions(&database, 2);

        MintRequestRecord::create(database.clone(), &request_info(vec![actions[0]], 0))?;

        let result = MintRequestRecord::create(database.clone(), &request_info(actions.clone(), 1));

        assert!(matches!(result, Err(StoreError::ActionUnavailable(id)) if id == actions[0]));

        // Failed creation must not link the second action either.
        assert_eq!(action_statuses(&database, &actions[1..]), vec![ActionStatus::Eligible]);
        assert_eq!(database.requests(None).count(), 1);

        Ok(())
    }

    #[test]
    fn test_signature_transitions() -> Result<(), StoreError> {
        let database = Database::open_in_memory()?;
        let actions = create_actions(&database, 1);

        let record = MintRequestRecord::create(database.clone(), &request_info(actions.clone(), 0))?;

        let request = record.load()?;
        let request = record.add_signature(&request, GovernanceGroup::Love, &group_signature(3))?;

        assert_eq!(request.status, MintStatus::Signing);
        assert!(request.signature.is_none());

        let request = record.add_signature(&request, GovernanceGroup::Will, &group_signature(1))?;

        assert_eq!(request.status, MintStatus::Signing);
        assert!(request.ordered_signatures().is_none());

        let last = group_signature(2);
        let request = record.add_signature(&request, GovernanceGroup::Wisdom, &last)?;

        assert_eq!(request.status, MintStatus::Signed);
        assert!(request.has_quorum());
        assert_eq!(request.signature, Some(last.signature));
        assert_eq!(action_statuses(&database, &actions), vec![ActionStatus::Approved]);

        let ordered = request.ordered_signatures().expect("quorum must be reached");

        assert_eq!(ordered.map(|signature| signature.r()), [1u8, 2, 3].map(U256::from));

        Ok(())
    }

    #[test]
    fn test_stale_snapshot() -> Result<(), StoreError> {
        let database = Database::open_in_memory()?;

        let record = MintRequestRecord::create(database.clone(), &request_info(vec![], 0))?;

        let snapshot = record.load()?;

        record.add_signature(&snapshot, GovernanceGroup::Will, &group_signature(1))?;

        // Second writer still holds the old snapshot.
        let result = record.add_signature(&snapshot, GovernanceGroup::Love, &group_signature(3));

        assert!(matches!(result, Err(StoreError::Stale(_))));

        let request = record.load()?;

        assert_eq!(request.completed_groups().len(), 1);
        assert_eq!(request.status, MintStatus::Signing);

        Ok(())
    }

    #[test]
    fn test_submit_confirm() -> Result<(), StoreError> {
        let database = Database::open_in_memory()?;
        let actions = create_actions(&database, 2);

        let record = MintRequestRecord::create(database.clone(), &request_info(actions.clone(), 0))?;

        let mut request = record.load()?;

        // Not submitted yet.
        assert!(matches!(
            record.mark_confirmed(&request, 1),
            Err(StoreError::InvalidTransition(_))
        ));

        for (i, group) in GovernanceGroup::ALL.into_iter().enumerate() {
            request = record.add_signature(&request, group, &group_signature(i as u8 + 1))?;
        }

        record.mark_submitted(&request, &B256::repeat_byte(9))?;

        let request = record.load()?;

        assert_eq!(request.status, MintStatus::Submitted);
        assert_eq!(request.tx_hash, Some(B256::repeat_byte(9)));

        for id in &actions {
            let action = ActionRecord::open(database.clone(), *id)?;

            assert_eq!(action.status()?, ActionStatus::Submitted);
            assert_eq!(action.tx_hash()?, Some(B256::repeat_byte(9)));
        }

        record.mark_confirmed(&request, 1234)?;

        let request = record.load()?;

        assert_eq!(request.status, MintStatus::Confirmed);
        assert_eq!(request.block_number, Some(1234));
        assert_eq!(action_statuses(&database, &actions), vec![ActionStatus::Minted; 2]);

        // Confirmed requests are terminal.
        assert!(record.reject("too late").is_err());
        assert!(record.reset().is_err());
        assert!(matches!(record.clone().delete(), Err(StoreError::NotDeletable { .. })));

        Ok(())
    }

    #[test]
    fn test_reset() -> Result<(), StoreError> {
        let database = Database::open_in_memory()?;
        let actions = create_actions(&database, 1);

        let record = MintRequestRecord::create(database.clone(), &request_info(actions.clone(), 0))?;

        let mut request = record.load()?;

        for (i, group) in GovernanceGroup::ALL.into_iter().enumerate() {
            request = record.add_signature(&request, group, &group_signature(i as u8 + 1))?;
        }

        // Reset is only allowed from FAILED.
        assert!(record.reset().is_err());

        record.mark_submitted(&request, &B256::repeat_byte(7))?;
        record.mark_failed(&record.load()?, "transaction reverted on-chain")?;

        let request = record.load()?;

        assert_eq!(request.status, MintStatus::Failed);
        assert_eq!(request.retry_count, 1);

        let action = ActionRecord::open(database.clone(), actions[0])?;

        assert_eq!(action.status()?, ActionStatus::Approved);
        assert_eq!(action.tx_hash()?, Some(B256::repeat_byte(7)));

        let request = record.reset()?;

        assert_eq!(request.status, MintStatus::PendingSig);
        assert!(request.signatures.is_empty());
        assert!(request.signature.is_none());
        assert!(request.tx_hash.is_none());
        assert!(request.error_message.is_none());
        assert_eq!(request.retry_count, 1);
        assert_eq!(request.action_ids, actions);

        let action = ActionRecord::open(database.clone(), actions[0])?;

        assert_eq!(action.status()?, ActionStatus::Pending);
        assert_eq!(action.tx_hash()?, None);

        Ok(())
    }

    #[test]
    fn test_failed_moves_actions() -> Result<(), StoreError> {
        let database = Database::open_in_memory()?;
        let actions = create_actions(&database, 2);

        let record = MintRequestRecord::create(database.clone(), &request_info(actions.clone(), 0))?;

        let mut request = record.load()?;

        for (i, group) in GovernanceGroup::ALL.into_iter().enumerate() {
            request = record.add_signature(&request, group, &group_signature(i as u8 + 1))?;
        }

        // Broadcast failure straight from SIGNED.
        record.mark_failed(&request, "insufficient funds")?;

        assert_eq!(action_statuses(&database, &actions), vec![ActionStatus::Approved; 2]);

        for id in &actions {
            assert_eq!(ActionRecord::open(database.clone(), *id)?.tx_hash()?, None);
        }

        // Failed request which turns out to be mined settles its actions.
        let second = MintRequestRecord::create(database.clone(), &request_info(vec![], 1))?;

        let mut request = second.load()?;

        for (i, group) in GovernanceGroup::ALL.into_iter().enumerate() {
            request = second.add_signature(&request, group, &group_signature(i as u8 + 1))?;
        }

        second.mark_submitted(&request, &B256::repeat_byte(5))?;
        second.mark_failed(&second.load()?, "timeout")?;
        second.mark_confirmed(&second.load()?, 77)?;

        assert_eq!(second.status()?, MintStatus::Confirmed);

        Ok(())
    }

    #[test]
    fn test_reject() -> Result<(), StoreError> {
        let database = Database::open_in_memory()?;
        let actions = create_actions(&database, 2);

        let record = MintRequestRecord::create(database.clone(), &request_info(actions.clone(), 0))?;

        let request = record.reject("duplicate evidence")?;

        assert_eq!(request.status, MintStatus::Rejected);
        assert_eq!(request.rejection_reason.as_deref(), Some("duplicate evidence"));
        assert!(request.action_ids.is_empty());

        for id in &actions {
            let action = ActionRecord::open(database.clone(), *id)?;

            assert_eq!(action.status()?, ActionStatus::Rejected);
            assert_eq!(action.mint_request_id()?, None);
        }

        assert!(record.reject("again").is_err());

        Ok(())
    }

    #[test]
    fn test_delete() -> Result<(), StoreError> {
        let database = Database::open_in_memory()?;
        let actions = create_actions(&database, 2);

        let record = MintRequestRecord::create(database.clone(), &request_info(actions.clone(), 0))?;

        let request = record.load()?;

        record.add_signature(&request, GovernanceGroup::Will, &group_signature(1))?;
        record.clone().delete()?;

        assert!(matches!(record.load(), Err(StoreError::NotFound(_))));
        assert_eq!(action_statuses(&database, &actions), vec![ActionStatus::Eligible; 2]);

        // Released actions can be linked to a new request.
        MintRequestRecord::create(database.clone(), &request_info(actions, 1))?;

        Ok(())
    }

    #[test]
    fn test_stats() -> Result<(), StoreError> {
        let database = Database::open_in_memory()?;

        let first = MintRequestRecord::create(database.clone(), &request_info(vec![], 0))?;
        let second = MintRequestRecord::create(database.clone(), &request_info(vec![], 1))?;

        MintRequestRecord::create(database.clone(), &request_info(vec![], 2))?;

        second.reject("spam")?;

        let mut request = first.load()?;

        for (i, group) in GovernanceGroup::ALL.into_iter().enumerate() {
            request = first.add_signature(&request, group, &group_signature(i as u8 + 1))?;
        }

        first.mark_submitted(&request, &B256::repeat_byte(1))?;
        first.mark_failed(&first.load()?, "timeout")?;

        let stats = database.stats()?;

        assert_eq!(stats.total, 3);
        assert_eq!(stats.count(MintStatus::Failed), 1);
        assert_eq!(stats.count(MintStatus::Rejected), 1);
        assert_eq!(stats.count(MintStatus::PendingSig), 1);
        assert_eq!(stats.pending_amount, 2000);
        assert_eq!(stats.confirmed_amount, 0);
        assert_eq!(stats.reconcilable, 1);

        assert_eq!(database.reconciliation_candidates()?.len(), 1);
        assert_eq!(database.requests(Some(MintStatus::Failed)).count(), 1);
        assert_eq!(database.requests(None).count(), 3);

        Ok(())
    }

    #[test]
    fn test_stats_saturate() -> Result<(), StoreError> {
        let database = Database::open_in_memory()?;

        let mut info = request_info(vec![], 0);

        info.amount = u128::MAX;

        MintRequestRecord::create(database.clone(), &info)?;

        info.nonce = 1;
        info.amount = 1;

        MintRequestRecord::create(database.clone(), &info)?;

        let stats = database.stats()?;

        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending_amount, u128::MAX);
        assert_eq!(stats.confirmed_amount, 0);

        Ok(())
    }
}
