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

use mintgate_protocol::prelude::*;

use crate::database::StoreError;

pub mod signer;
pub mod chain;
pub mod rpc;
pub mod collector;
pub mod submitter;
pub mod tracker;
pub mod reconciler;
pub mod batch;

#[cfg(test)]
pub(crate) mod mock;

pub use signer::{Signer, SignerError, LocalSigner};
pub use chain::{ChainClient, ChainError, Receipt};
pub use rpc::ProviderChainClient;
pub use collector::SignatureCollector;
pub use submitter::{ChainSubmitter, Submission};
pub use tracker::{ConfirmationTracker, Confirmation};
pub use reconciler::{Reconciler, ReconcileReport};
pub use batch::BatchOrchestrator;

/// Bucket of a failed transaction broadcast, used for operator messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Operator declined the transaction prompt.
    UserDeclined,

    /// Governance account can't pay for the transaction gas.
    InsufficientFunds,

    Other
}

impl FailureKind {
    /// Human-readable failure reason.
    pub const fn message(&self) -> &'static str {
        match self {
            Self::UserDeclined => "transaction was declined in the wallet",
            Self::InsufficientFunds => "governance account has insufficient funds to pay for gas",
            Self::Other => "transaction broadcast failed"
        }
    }
}

impl std::fmt::Display for FailureKind {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GovernanceError {
    #[error("address {0} doesn't belong to any governance group")]
    UngroupedSigner(Address),

    #[error("governance group {group} has already signed mint request {request_id}")]
    DuplicateGroupSignature {
        request_id: i64,
        group: GovernanceGroup
    },

    #[error("mint request {0} has no action hash and can't be signed")]
    MissingActionHash(i64),

    #[error("mint request {request_id} has action hash {stored} which doesn't match its action name (expected {expected})")]
    ActionHashMismatch {
        request_id: i64,
        expected: B256,
        stored: B256
    },

    #[error("mint request {request_id} is in {status} status")]
    InvalidStatus {
        request_id: i64,
        status: MintStatus
    },

    #[error("mint request {request_id} lacks signatures of groups {missing:?}")]
    QuorumIncomplete {
        request_id: i64,
        missing: Vec<GovernanceGroup>
    },

    #[error("signer {0} declined the signing request")]
    SigningDeclined(Address),

    #[error("signature was expected from {expected} but recovers to {recovered}")]
    SignatureMismatch {
        expected: Address,
        recovered: Address
    },

    #[error("wallet is not connected to chain {expected} and the network switch was declined")]
    WrongNetwork {
        expected: u64
    },

    #[error("can't check that the wallet is connected to chain {expected}, make sure the rpc endpoint is reachable")]
    NetworkUnavailable {
        expected: u64,

        #[source]
        source: ChainError
    },

    #[error("submission of mint request {0} was declined in the wallet")]
    SubmissionDeclined(i64),

    #[error("mint request {request_id} broadcast failed: {kind}")]
    BroadcastFailed {
        request_id: i64,
        kind: FailureKind
    },

    #[error("mint request {0} was modified concurrently, reload it and try again")]
    StaleRequest(i64),

    #[error("mint request {0} doesn't exist")]
    RequestNotFound(i64),

    #[error("action {0} is not eligible or already linked to another mint request")]
    ActionUnavailable(i64),

    #[error("nonce {nonce} for recipient {recipient} must be greater than {last}")]
    NonceNotIncreasing {
        recipient: Address,
        nonce: u64,
        last: u64
    },

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("failed to recover signer: {0}")]
    Recovery(#[from] SignatureError)
}

impl From<StoreError> for GovernanceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Sqlite(err) => Self::Database(err),
            StoreError::NotFound(id) => Self::RequestNotFound(id),
            StoreError::Stale(id) => Self::StaleRequest(id),
            StoreError::ActionUnavailable(id) => Self::ActionUnavailable(id),

            StoreError::NonceNotIncreasing { recipient, nonce, last } => {
                Self::NonceNotIncreasing { recipient, nonce, last }
            }

            err => Self::Store(err)
        }
    }
}
