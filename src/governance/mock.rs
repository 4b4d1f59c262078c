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

//! Scripted in-memory collaborators and fixtures of the governance tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use spin::Mutex;
use alloy::signers::local::PrivateKeySigner;

use mintgate_protocol::prelude::*;

use crate::database::Database;
use crate::database::action::{ActionInfo, ActionRecord};
use crate::database::request::{MintRequestInfo, MintRequestRecord};

use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainCall {
    EnsureNetwork(u64),
    SendTransaction(MintCall),
    GetReceipt(B256),
    BlockNumber
}

/// Chain client which records every call and answers with scripted values.
pub struct MockChain {
    connected: AtomicU64,
    decline_switch: bool,
    head: AtomicU64,
    nonce: AtomicU64,

    /// Receipt outcome of every broadcasted transaction. `None` means that
    /// transactions are never mined.
    mine: Mutex<Option<bool>>,

    network_error: Mutex<Option<ChainError>>,
    send_results: Mutex<VecDeque<Result<B256, ChainError>>>,
    receipts: Mutex<HashMap<B256, Receipt>>,
    calls: Mutex<Vec<(Instant, ChainCall)>>
}

impl MockChain {
    pub const HEAD: u64 = 100;

    pub fn new(chain_id: u64) -> Self {
        Self {
            connected: AtomicU64::new(chain_id),
            decline_switch: false,
            head: AtomicU64::new(Self::HEAD),
            nonce: AtomicU64::new(0),
            mine: Mutex::new(Some(true)),
            network_error: Mutex::new(None),
            send_results: Mutex::new(VecDeque::new()),
            receipts: Mutex::new(HashMap::new()),
            calls: Mutex::new(vec![])
        }
    }

    /// Client connected to another chain which refuses to switch.
    pub fn wrong_network(chain_id: u64) -> Self {
        Self {
            decline_switch: true,
            ..Self::new(chain_id)
        }
    }

    pub fn set_mine(&self, outcome: Option<bool>) {
        *self.mine.lock() = outcome;
    }

    /// Fail the next network check with the given error.
    pub fn fail_network_check(&self, error: ChainError) {
        *self.network_error.lock() = Some(error);
    }

    pub fn push_send_result(&self, result: Result<B256, ChainError>) {
        self.send_results.lock().push_back(result);
    }

    pub fn set_receipt(&self, tx_hash: B256, receipt: Receipt) {
        self.receipts.lock().insert(tx_hash, receipt);
    }

    pub fn remove_receipt(&self, tx_hash: &B256) {
        self.receipts.lock().remove(tx_hash);
    }

    pub fn calls(&self) -> Vec<ChainCall> {
        self.calls.lock().iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    /// Broadcasted contract calls with their timestamps.
    pub fn sent(&self) -> Vec<(Instant, MintCall)> {
        self.calls.lock().iter()
            .filter_map(|(time, call)| match call {
                ChainCall::SendTransaction(call) => Some((*time, call.clone())),
                _ => None
            })
            .collect()
    }

    fn record(&self, call: ChainCall) {
        self.calls.lock().push((Instant::now(), call));
    }
}

#[async_trait::async_trait]
impl ChainClient for MockChain {
    async fn ensure_network(&self, chain_id: u64) -> Result<(), ChainError> {
        self.record(ChainCall::EnsureNetwork(chain_id));

        if let Some(error) = self.network_error.lock().take() {
            return Err(error);
        }

        if self.connected.load(Ordering::Acquire) != chain_id {
            if self.decline_switch {
                return Err(ChainError::NetworkSwitchDeclined(chain_id));
            }

            self.connected.store(chain_id, Ordering::Release);
        }

        Ok(())
    }

    async fn send_transaction(&self, call: &MintCall) -> Result<B256, ChainError> {
        self.record(ChainCall::SendTransaction(call.clone()));

        let result = self.send_results.lock().pop_front();

        let tx_hash = match result {
            Some(result) => result?,
            None => {
                let nonce = self.nonce.fetch_add(1, Ordering::AcqRel);

                keccak256(nonce.to_be_bytes())
            }
        };

        let mine = *self.mine.lock();

        if let Some(success) = mine {
            self.set_receipt(tx_hash, Receipt {
                block_number: self.head.load(Ordering::Acquire) - 5,
                success
            });
        }

        Ok(tx_hash)
    }

    async fn get_receipt(&self, tx_hash: &B256) -> Result<Option<Receipt>, ChainError> {
        self.record(ChainCall::GetReceipt(*tx_hash));

        Ok(self.receipts.lock().get(tx_hash).copied())
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        self.record(ChainCall::BlockNumber);

        Ok(self.head.load(Ordering::Acquire))
    }
}

pub const CHAIN_ID: u64 = 137;

pub const CONTRACT: Address = Address::repeat_byte(0xcc);

pub fn domain() -> Eip712Domain {
    mint_domain("RewardMint", "1", CHAIN_ID, CONTRACT)
}

/// Signer with a secret key made of the repeated byte.
pub fn local_signer(byte: u8, name: &str) -> LocalSigner {
    let key = PrivateKeySigner::from_bytes(&B256::repeat_byte(byte))
        .expect("invalid secret key");

    LocalSigner::new(key, name)
}

/// Members of WILL, WISDOM and LOVE groups in this order.
pub fn signers() -> [LocalSigner; 3] {
    [(0x11u8, "will-1"), (0x22, "wisdom-1"), (0x33, "love-1")]
        .map(|(byte, name)| local_signer(byte, name))
}

pub fn registry(signers: &[LocalSigner; 3]) -> GroupRegistry {
    GroupRegistry::new(GovernanceGroup::ALL.into_iter().zip(signers).map(|(group, signer)| {
        (group, signer.address(), signer.display_name().to_string())
    })).expect("invalid registry")
}

pub fn collector(signers: &[LocalSigner; 3]) -> SignatureCollector {
    SignatureCollector::new(registry(signers), domain())
}

pub fn tracker(chain: Arc<MockChain>) -> ConfirmationTracker {
    ConfirmationTracker::new(chain, 2, Duration::from_millis(200), Duration::from_millis(10))
}

pub fn submitter(chain: Arc<MockChain>) -> ChainSubmitter {
    ChainSubmitter::new(
        chain.clone(),
        CONTRACT,
        CHAIN_ID,
        tracker(chain)
    )
}

/// Create mint request for a fresh recipient with two linked actions.
pub fn create_request(database: &Database, recipient: u8) -> MintRequestRecord {
    let action_ids = (0..2)
        .map(|_| {
            ActionRecord::create(database.clone(), &ActionInfo {
                user_id: format!("user-{recipient}"),
                kind: String::from("post")
            }).map(|action| action.id())
        })
        .collect::<rusqlite::Result<Vec<_>>>()
        .expect("failed to create actions");

    MintRequestRecord::create(database.clone(), &MintRequestInfo {
        user_id: format!("user-{recipient}"),
        recipient: Address::repeat_byte(recipient),
        amount: 1000,
        evidence_hash: keccak256([recipient]),
        action_name: String::from("post_reward"),
        action_hash: Some(action_hash("post_reward")),
        nonce: 0,
        legacy_signature: None,
        action_ids
    }).expect("failed to create mint request")
}

/// Create mint request which has signatures of all the governance groups.
pub async fn create_signed_request(
    database: &Database,
    signers: &[LocalSigner; 3],
    recipient: u8
) -> MintRequestRecord {
    let record = create_request(database, recipient);
    let collector = collector(signers);

    for signer in signers {
        collector.collect_signature(&record, signer).await
            .expect("failed to collect signature");
    }

    record
}
