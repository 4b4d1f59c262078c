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

use std::time::Duration;

use mintgate_protocol::prelude::*;

use super::FailureKind;

/// Minimal view of a mined transaction receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Receipt {
    /// Block where the transaction was included.
    pub block_number: u64,

    /// Whether the transaction was executed without revert.
    pub success: bool
}

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("request was declined by the user")]
    UserRejected,

    #[error("switch to chain {0} was declined")]
    NetworkSwitchDeclined(u64),

    #[error("connected to chain {actual} instead of {expected}")]
    NetworkMismatch {
        expected: u64,
        actual: u64
    },

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("rpc error {code}: {message}")]
    Rpc {
        code: i64,
        message: String
    },

    #[error("invalid rpc endpoint url: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Transport(alloy::transports::TransportError)
}

impl ChainError {
    /// Classify broadcast error for operator messaging.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::UserRejected => FailureKind::UserDeclined,
            Self::InsufficientFunds(_) => FailureKind::InsufficientFunds,

            _ => FailureKind::Other
        }
    }
}

/// Connection to the settlement chain, usually through a wallet which holds
/// the governance submitter account.
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync {
    /// Make sure the client is connected to the given chain, asking to switch
    /// the network if it's not.
    async fn ensure_network(&self, chain_id: u64) -> Result<(), ChainError>;

    /// Broadcast contract call transaction and return its hash.
    async fn send_transaction(&self, call: &MintCall) -> Result<B256, ChainError>;

    /// Get receipt of the transaction. Return `None` if the transaction is
    /// unknown or not mined yet.
    async fn get_receipt(&self, tx_hash: &B256) -> Result<Option<Receipt>, ChainError>;

    /// Number of the latest block.
    async fn block_number(&self) -> Result<u64, ChainError>;

    /// Poll transaction receipt until it has at least `confirmations` blocks
    /// on top of it (including its own). Reverted receipts are returned as
    /// soon as they appear. This method never times out by itself.
    async fn wait_for_receipt(
        &self,
        tx_hash: &B256,
        confirmations: u64,
        poll_interval: Duration
    ) -> Result<Receipt, ChainError> {
        loop {
            if let Some(receipt) = self.get_receipt(tx_hash).await? {
                if !receipt.success {
                    return Ok(receipt);
                }

                let head = self.block_number().await?;
                let depth = head.saturating_sub(receipt.block_number) + 1;

                tracing::debug!(
                    tx_hash = %tx_hash,
                    block_number = receipt.block_number,
                    depth,
                    "transaction mined"
                );

                if depth >= confirmations {
                    return Ok(receipt);
                }
            }

            tokio::time::sleep(poll_interval).await;
        }
    }
}
