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

use crate::database::{Database, StoreError};

use super::{ChainClient, GovernanceError};
use super::tracker::REVERTED_MESSAGE;

/// Counters of a reconciliation pass.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReconcileReport {
    /// Requests which turned out to be mined successfully.
    pub reconciled: u64,

    /// Requests with a reverted receipt.
    pub genuinely_failed: u64,

    /// Requests whose transaction has no receipt.
    pub no_receipt: u64
}

/// Re-derives the outcome of requests with a transaction hash from the
/// chain state: failed ones which may have been mined after all, and
/// submitted ones whose confirmation wait timed out.
#[derive(Clone)]
pub struct Reconciler {
    database: Database,
    chain: Arc<dyn ChainClient>
}

impl Reconciler {
    #[inline]
    pub fn new(database: Database, chain: Arc<dyn ChainClient>) -> Self {
        Self {
            database,
            chain
        }
    }

    /// Check receipts of all the submitted and failed requests with a
    /// transaction hash one by one.
    ///
    /// Successfully mined transactions move their request to `CONFIRMED`,
    /// reverted submitted ones move to `FAILED`. Requests without a receipt
    /// stay untouched, so it's safe to run this repeatedly.
    pub async fn reconcile(&self) -> Result<ReconcileReport, GovernanceError> {
        let mut report = ReconcileReport::default();

        for record in self.database.reconciliation_candidates()? {
            let request = record.load()?;

            let Some(tx_hash) = request.tx_hash else {
                continue;
            };

            if !matches!(request.status, MintStatus::Submitted | MintStatus::Failed) {
                continue;
            }

            let receipt = match self.chain.get_receipt(&tx_hash).await {
                Ok(receipt) => receipt,

                Err(err) => {
                    tracing::warn!(request_id = request.id, tx_hash = %tx_hash, ?err, "failed to fetch receipt");

                    report.no_receipt += 1;

                    continue;
                }
            };

            let result = match receipt {
                Some(receipt) if receipt.success => {
                    record.mark_confirmed(&request, receipt.block_number)
                        .map(|_| {
                            tracing::info!(
                                request_id = request.id,
                                tx_hash = %tx_hash,
                                from = %request.status,
                                block_number = receipt.block_number,
                                "mint request reconciled as confirmed"
                            );

                            report.reconciled += 1;
                        })
                }

                Some(_) if request.status == MintStatus::Submitted => {
                    record.mark_failed(&request, REVERTED_MESSAGE)
                        .map(|_| {
                            tracing::warn!(request_id = request.id, tx_hash = %tx_hash, "submitted mint transaction reverted");

                            report.genuinely_failed += 1;
                        })
                }

                Some(_) => {
                    report.genuinely_failed += 1;

                    Ok(())
                }

                None => {
                    report.no_receipt += 1;

                    Ok(())
                }
            };

            match result {
                Ok(()) => (),

                Err(StoreError::Stale(_)) => {
                    tracing::warn!(request_id = request.id, "mint request changed during reconciliation");
                }

                Err(err) => return Err(err.into())
            }
        }

        tracing::info!(
            reconciled = report.reconciled,
            genuinely_failed = report.genuinely_failed,
            no_receipt = report.no_receipt,
            "reconciliation finished"
        );

        Ok(report)
    }
}
