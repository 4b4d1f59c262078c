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
use std::time::Duration;

use mintgate_protocol::prelude::*;

use crate::database::request::MintRequestRecord;

use super::{ChainClient, GovernanceError};

/// Error message stored for transactions which were mined but reverted.
pub const REVERTED_MESSAGE: &str = "transaction reverted on-chain";

/// Outcome of waiting for a transaction finality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Confirmation {
    /// Transaction is mined in the given block and has enough confirmations.
    Confirmed(u64),

    /// Transaction is mined but reverted.
    Reverted,

    /// Transaction didn't reach enough confirmations in time. It may still
    /// land later, so the request stays submitted.
    TimedOut
}

impl std::fmt::Display for Confirmation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Confirmed(block_number) => write!(f, "confirmed in block {block_number}"),
            Self::Reverted => f.write_str(REVERTED_MESSAGE),
            Self::TimedOut => f.write_str("sent but unconfirmed")
        }
    }
}

/// Awaits on-chain finality of submitted transactions.
#[derive(Clone)]
pub struct ConfirmationTracker {
    chain: Arc<dyn ChainClient>,
    min_confirmations: u64,
    timeout: Duration,
    poll_interval: Duration
}

impl ConfirmationTracker {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        min_confirmations: u64,
        timeout: Duration,
        poll_interval: Duration
    ) -> Self {
        Self {
            chain,
            min_confirmations: min_confirmations.max(1),
            timeout,
            poll_interval
        }
    }

    /// Wait until the transaction gets enough confirmations or the timeout
    /// expires. Chain errors during the wait are reported as a timeout.
    pub async fn wait(&self, tx_hash: &B256) -> Confirmation {
        let receipt = self.chain.wait_for_receipt(
            tx_hash,
            self.min_confirmations,
            self.poll_interval
        );

        match tokio::time::timeout(self.timeout, receipt).await {
            Ok(Ok(receipt)) if receipt.success => Confirmation::Confirmed(receipt.block_number),
            Ok(Ok(_)) => Confirmation::Reverted,

            Ok(Err(err)) => {
                tracing::warn!(tx_hash = %tx_hash, ?err, "failed to poll transaction receipt");

                Confirmation::TimedOut
            }

            Err(_) => Confirmation::TimedOut
        }
    }

    /// Wait for the request's transaction finality and record it.
    pub async fn await_confirmation(
        &self,
        record: &MintRequestRecord,
        tx_hash: &B256
    ) -> Result<Confirmation, GovernanceError> {
        let confirmation = self.wait(tx_hash).await;

        let request = record.load()?;

        match confirmation {
            Confirmation::Confirmed(block_number) => {
                record.mark_confirmed(&request, block_number)?;

                tracing::info!(
                    request_id = request.id,
                    tx_hash = %tx_hash,
                    block_number,
                    "mint request confirmed"
                );
            }

            Confirmation::Reverted => {
                record.mark_failed(&request, REVERTED_MESSAGE)?;

                tracing::warn!(request_id = request.id, tx_hash = %tx_hash, "mint transaction reverted");
            }

            Confirmation::TimedOut => {
                tracing::warn!(
                    request_id = request.id,
                    tx_hash = %tx_hash,
                    timeout = ?self.timeout,
                    "mint transaction sent but unconfirmed"
                );
            }
        }

        Ok(confirmation)
    }
}
