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

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use mintgate_protocol::prelude::*;

/// Signer address assigned to a governance group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSigner {
    pub group: GovernanceGroup,
    pub address: Address,

    /// Human-readable name of the signer, stored next to its signatures.
    #[serde(default)]
    pub name: String
}

/// Mintgate configuration file. All the fields are optional and take default
/// values when missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON-RPC endpoint of the chain node or wallet.
    pub rpc_url: String,

    /// Chain id of the target network.
    pub chain_id: u64,

    /// Address of the settlement contract.
    pub contract: Address,

    /// Governance account which sends mint transactions.
    pub submitter: Address,

    /// EIP-712 domain name of the settlement contract.
    pub protocol_name: String,

    /// EIP-712 domain version of the settlement contract.
    pub protocol_version: String,

    /// Governance group members.
    pub groups: Vec<GroupSigner>,

    /// Amount of blocks built on top of the transaction's block (including
    /// it) before the transaction is considered final.
    pub min_confirmations: u64,

    pub confirmation_timeout_secs: u64,
    pub receipt_poll_interval_secs: u64,

    /// Delay between consecutive on-chain submissions of a batch.
    pub batch_delay_secs: u64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: String::from("http://127.0.0.1:8545"),
            chain_id: 137,
            contract: Address::default(),
            submitter: Address::default(),
            protocol_name: String::from("RewardMint"),
            protocol_version: String::from("1"),
            groups: vec![],
            min_confirmations: 2,
            confirmation_timeout_secs: 120,
            receipt_poll_interval_secs: 2,
            batch_delay_secs: 3
        }
    }
}

impl Config {
    /// Read config file. Return default config if the file doesn't exist.
    pub fn read(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let config = std::fs::read(path)
            .context("failed to read config file")?;

        let config = serde_json::from_slice::<Self>(&config)
            .context("failed to parse config file")?;

        config.registry()
            .context("invalid governance groups config")?;

        Ok(config)
    }

    /// Write config file.
    pub fn write(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;

        Ok(())
    }

    /// Build signer address to governance group registry.
    pub fn registry(&self) -> Result<GroupRegistry, RegistryError> {
        GroupRegistry::new(self.groups.iter().map(|signer| {
            (signer.group, signer.address, signer.name.clone())
        }))
    }

    /// EIP-712 signing domain of the settlement contract.
    pub fn domain(&self) -> Eip712Domain {
        mint_domain(
            &self.protocol_name,
            &self.protocol_version,
            self.chain_id,
            self.contract
        )
    }

    #[inline]
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    #[inline]
    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_secs(self.receipt_poll_interval_secs)
    }

    #[inline]
    pub fn batch_delay(&self) -> Duration {
        Duration::from_secs(self.batch_delay_secs)
    }
}
