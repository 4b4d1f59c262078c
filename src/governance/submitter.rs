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

use std::sync::Arc;

use mintgate_protocol::prelude::*;

use crate::database::request::{MintRequest, MintRequestRecord};

use super::{ChainClient, ChainError, ConfirmationTracker, Confirmation, GovernanceError};

/// Result of a successful broadcast followed by the finality wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Submission {
    pub tx_hash: B256,
    pub confirmation: Confirmation
}

/// Sends signed mint requests to the settlement contract.
#[derive(Clone)]
pub struct ChainSubmitter {
    chain: Arc<dyn ChainClient>,
    contract: Address,
    chain_id: u64,
    tracker: ConfirmationTracker
}

impl ChainSubmitter {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        contract: Address,
        chain_id: u64,
        tracker: ConfirmationTracker
    ) -> Self {
        Self {
            chain,
            contract,
            chain_id,
            tracker
        }
    }

    #[inline(always)]
    pub const fn tracker(&self) -> &ConfirmationTracker {
        &self.tracker
    }

    /// Build the contract call for the request.
    ///
    /// Signed requests use governance signatures in the WILL, WISDOM, LOVE
    /// order. Legacy requests which have a single pre-quorum signature and
    /// no governance signatures use the single signature entry point.
    pub fn prepare(&self, request: &MintRequest) -> Result<MintCall, GovernanceError> {
        let authority = match (request.status, request.signature) {
            (MintStatus::Signed, _) => {
                let signatures = request.ordered_signatures()
                    .ok_or_else(|| GovernanceError::QuorumIncomplete {
                        request_id: request.id,
                        missing: missing_groups(&request.completed_groups())
                    })?;

                MintAuthority::Quorum(signatures)
            }

            (MintStatus::PendingSig, Some(signature)) if request.signatures.is_empty() => {
                MintAuthority::Legacy(signature)
            }

            (MintStatus::PendingSig | MintStatus::Signing, _) => {
                return Err(GovernanceError::QuorumIncomplete {
                    request_id: request.id,
                    missing: missing_groups(&request.completed_groups())
                });
            }

            (status, _) => {
                return Err(GovernanceError::InvalidStatus {
                    request_id: request.id,
                    status
                });
            }
        };

        Ok(MintCall {
            contract: self.contract,
            recipient: request.recipient,
            action_name: request.action_name.clone(),
            amount: request.amount,
            evidence_hash: request.evidence_hash,
            authority
        })
    }

    /// Broadcast the request's mint transaction.
    ///
    /// Requests without the full quorum never reach the chain. If the
    /// operator declines the transaction the request stays untouched, any
    /// other broadcast error moves it to `FAILED`.
    pub async fn submit(&self, record: &MintRequestRecord) -> Result<B256, GovernanceError> {
        let request = record.load()?;
        let call = self.prepare(&request)?;

        match self.chain.ensure_network(self.chain_id).await {
            Ok(()) => (),

            Err(ChainError::NetworkSwitchDeclined(_) | ChainError::NetworkMismatch { .. }) => {
                tracing::warn!(request_id = request.id, chain_id = self.chain_id, "wrong network");

                return Err(GovernanceError::WrongNetwork {
                    expected: self.chain_id
                });
            }

            Err(err) => {
                tracing::warn!(request_id = request.id, chain_id = self.chain_id, ?err, "network check failed");

                return Err(GovernanceError::NetworkUnavailable {
                    expected: self.chain_id,
                    source: err
                });
            }
        }

        tracing::info!(
            request_id = request.id,
            function = call.function(),
            recipient = %call.recipient,
            amount = %call.amount,
            "broadcasting mint transaction"
        );

        match self.chain.send_transaction(&call).await {
            Ok(tx_hash) => {
                if let Err(err) = record.mark_submitted(&request, &tx_hash) {
                    tracing::error!(
                        request_id = request.id,
                        tx_hash = %tx_hash,
                        ?err,
                        "transaction was broadcasted but the request wasn't updated"
                    );

                    return Err(err.into());
                }

                tracing::info!(request_id = request.id, tx_hash = %tx_hash, "mint request submitted");

                Ok(tx_hash)
            }

            Err(ChainError::UserRejected) => {
                tracing::warn!(request_id = request.id, "mint transaction declined");

                Err(GovernanceError::SubmissionDeclined(request.id))
            }

            Err(err) => {
                let kind = err.failure_kind();

                tracing::warn!(request_id = request.id, ?kind, ?err, "mint transaction broadcast failed");

                record.mark_failed(&request, kind.message())?;

                Err(GovernanceError::BroadcastFailed {
                    request_id: request.id,
                    kind
                })
            }
        }
    }

    /// Broadcast the request's mint transaction and wait for its finality.
    pub async fn submit_and_confirm(
        &self,
        record: &MintRequestRecord
    ) -> Result<Submission, GovernanceError> {
        let tx_hash = self.submit(record).await?;
        let confirmation = self.tracker.await_confirmation(record, &tx_hash).await?;

        Ok(Submission {
            tx_hash,
            confirmation
        })
    }
}
