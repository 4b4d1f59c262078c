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

use crate::database::request::{MintRequest, MintRequestRecord};

use super::{ChainSubmitter, Confirmation, GovernanceError, SignatureCollector, Signer, Submission};

/// Progress report of a single batch item.
#[derive(Debug)]
pub struct Progress<'a, T> {
    /// Amount of processed items including the current one.
    pub done: usize,

    pub total: usize,
    pub request_id: i64,
    pub result: &'a Result<T, GovernanceError>
}

/// Drives signing and submission of many mint requests one at a time.
///
/// All the transactions are sent from the same governance account, so
/// requests are never processed concurrently and consecutive submissions
/// are separated by a fixed delay to let the previous nonce settle.
#[derive(Clone)]
pub struct BatchOrchestrator {
    collector: SignatureCollector,
    submitter: ChainSubmitter,
    delay: Duration
}

impl BatchOrchestrator {
    pub fn new(
        collector: SignatureCollector,
        submitter: ChainSubmitter,
        delay: Duration
    ) -> Self {
        Self {
            collector,
            submitter,
            delay
        }
    }

    /// Collect signer's signature for every request in the given order.
    /// Return amount of accepted signatures.
    pub async fn batch_sign(
        &self,
        records: &[MintRequestRecord],
        signer: &dyn Signer,
        mut on_progress: impl FnMut(Progress<'_, MintRequest>)
    ) -> usize {
        let mut success = 0;

        for (i, record) in records.iter().enumerate() {
            let result = self.collector.collect_signature(record, signer).await;

            if result.is_ok() {
                success += 1;
            }

            on_progress(Progress {
                done: i + 1,
                total: records.len(),
                request_id: record.id(),
                result: &result
            });
        }

        tracing::info!(total = records.len(), success, "batch signing finished");

        success
    }

    /// Submit every request in the given order and wait for its finality.
    /// Return amount of requests which were broadcasted and not reverted.
    pub async fn batch_submit(
        &self,
        records: &[MintRequestRecord],
        mut on_progress: impl FnMut(Progress<'_, Submission>)
    ) -> usize {
        let mut success = 0;

        for (i, record) in records.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.delay).await;
            }

            let result = self.submitter.submit_and_confirm(record).await;

            if let Ok(submission) = &result && submission.confirmation != Confirmation::Reverted {
                success += 1;
            }

            on_progress(Progress {
                done: i + 1,
                total: records.len(),
                request_id: record.id(),
                result: &result
            });
        }

        tracing::info!(total = records.len(), success, "batch submission finished");

        success
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mintgate_protocol::prelude::*;

    use crate::database::Database;
    use crate::governance::mock::*;

    use super::*;

    #[tokio::test]
    async fn test_batch_submit_sequential() -> Result<(), GovernanceError> {
        let database = Database::open_in_memory()?;
        let signers = signers();
        let chain = Arc::new(MockChain::new(CHAIN_ID));

        let delay = Duration::from_millis(30);
        let batch = BatchOrchestrator::new(collector(&signers), submitter(chain.clone()), delay);

        let mut records = vec![];

        for recipient in [3, 1, 2] {
            records.push(create_signed_request(&database, &signers, recipient).await);
        }

        // Unsigned request fails without reaching the chain.
        records.insert(1, create_request(&database, 4));

        let mut reports = vec![];

        let success = batch.batch_submit(&records, |progress| {
            reports.push((progress.done, progress.total, progress.request_id, progress.result.is_ok()));
        }).await;

        assert_eq!(success, 3);

        assert_eq!(reports, vec![
            (1, 4, records[0].id(), true),
            (2, 4, records[1].id(), false),
            (3, 4, records[2].id(), true),
            (4, 4, records[3].id(), true)
        ]);

        let sent = chain.sent();

        let recipients = sent.iter()
            .map(|(_, call)| call.recipient)
            .collect::<Vec<_>>();

        assert_eq!(recipients, [Address::repeat_byte(3), Address::repeat_byte(1), Address::repeat_byte(2)]);

        // Consecutive submissions are separated by the delay.
        for pair in sent.windows(2) {
            assert!(pair[1].0.duration_since(pair[0].0) >= delay);
        }

        for record in &records {
            let expected = if record.id() == records[1].id() {
                MintStatus::PendingSig
            } else {
                MintStatus::Confirmed
            };

            assert_eq!(record.status()?, expected);
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_batch_sign() -> Result<(), GovernanceError> {
        let database = Database::open_in_memory()?;
        let signers = signers();
        let chain = Arc::new(MockChain::new(CHAIN_ID));

        let batch = BatchOrchestrator::new(collector(&signers), submitter(chain.clone()), Duration::ZERO);

        let first = create_request(&database, 1);
        let second = create_request(&database, 2);

        collector(&signers).collect_signature(&second, &signers[0]).await?;

        let records = [first.clone(), second.clone()];

        let mut done = vec![];

        let success = batch.batch_sign(&records, &signers[0], |progress| done.push(progress.done)).await;

        assert_eq!(success, 1);
        assert_eq!(done, [1, 2]);

        let success = batch.batch_sign(&records, &signers[1], |_| ()).await;

        assert_eq!(success, 2);

        assert_eq!(first.load()?.completed_groups().len(), 2);
        assert_eq!(second.load()?.completed_groups().len(), 2);

        // Signing is off-chain.
        assert!(chain.calls().is_empty());

        Ok(())
    }
}
