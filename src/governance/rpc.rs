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

use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::TransactionRequest;
use alloy::transports::TransportError;
use alloy::transports::http::Http;
use alloy::transports::http::reqwest::{self, Url};

use serde_json::{json, Value as Json};

use mintgate_protocol::prelude::*;

use super::chain::{ChainClient, ChainError, Receipt};

/// EIP-1193 error code of a request rejected by the user.
pub const USER_REJECTED_CODE: i64 = 4001;

/// Translate JSON-RPC error object into a chain error.
pub fn classify_error(code: i64, message: impl ToString) -> ChainError {
    let message = message.to_string();

    if code == USER_REJECTED_CODE {
        ChainError::UserRejected
    } else if message.to_lowercase().contains("insufficient funds") {
        ChainError::InsufficientFunds(message)
    } else {
        ChainError::Rpc { code, message }
    }
}

/// Translate provider error into a chain error. Error responses of the
/// endpoint are classified, transport failures are kept as is.
pub fn chain_error(error: TransportError) -> ChainError {
    match error.as_error_resp() {
        Some(payload) => classify_error(payload.code, &payload.message),
        None => ChainError::Transport(error)
    }
}

/// Chain client on top of an alloy provider. Transactions are sent with
/// `eth_sendTransaction`, so the endpoint must hold the submitter account.
#[derive(Clone)]
pub struct ProviderChainClient {
    provider: DynProvider,
    from: Address
}

impl ProviderChainClient {
    /// Connect to the HTTP JSON-RPC endpoint. Every request is limited by
    /// the given timeout.
    pub fn connect_http(
        url: &str,
        from: Address,
        timeout: Duration
    ) -> Result<Self, ChainError> {
        let url = url.parse::<Url>()
            .map_err(|err| ChainError::InvalidUrl(format!("{url}: {err}")))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ChainError::InvalidUrl(err.to_string()))?;

        let client = RpcClient::new(Http::with_client(client, url), false);

        let provider = ProviderBuilder::new()
            .connect_client(client);

        Ok(Self::new(provider, from))
    }

    #[inline]
    pub fn new(provider: impl Provider + 'static, from: Address) -> Self {
        Self {
            provider: provider.erased(),
            from
        }
    }

    #[inline(always)]
    pub const fn from(&self) -> Address {
        self.from
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.provider.get_chain_id().await
            .map_err(chain_error)
    }
}

#[async_trait::async_trait]
impl ChainClient for ProviderChainClient {
    async fn ensure_network(&self, chain_id: u64) -> Result<(), ChainError> {
        let current = self.chain_id().await?;

        if current == chain_id {
            return Ok(());
        }

        tracing::warn!(current, expected = chain_id, "wrong network, requesting switch");

        let switch = self.provider.raw_request::<_, Json>(
            "wallet_switchEthereumChain".into(),
            (json!({ "chainId": format!("0x{chain_id:x}") }),)
        ).await;

        match switch.map_err(chain_error) {
            Ok(_) => (),
            Err(ChainError::UserRejected) => return Err(ChainError::NetworkSwitchDeclined(chain_id)),
            Err(err) => return Err(err)
        }

        let current = self.chain_id().await?;

        if current != chain_id {
            return Err(ChainError::NetworkMismatch {
                expected: chain_id,
                actual: current
            });
        }

        Ok(())
    }

    async fn send_transaction(&self, call: &MintCall) -> Result<B256, ChainError> {
        let tx = TransactionRequest::default()
            .from(self.from)
            .to(call.contract)
            .input(call.calldata().into());

        let pending = self.provider.send_transaction(tx).await
            .map_err(chain_error)?;

        Ok(*pending.tx_hash())
    }

    async fn get_receipt(&self, tx_hash: &B256) -> Result<Option<Receipt>, ChainError> {
        let receipt = self.provider.get_transaction_receipt(*tx_hash).await
            .map_err(chain_error)?;

        // Pending receipts of some nodes have no block number.
        Ok(receipt.and_then(|receipt| {
            Some(Receipt {
                block_number: receipt.block_number?,
                success: receipt.status()
            })
        }))
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        self.provider.get_block_number().await
            .map_err(chain_error)
    }
}
