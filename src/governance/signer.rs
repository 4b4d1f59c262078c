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

use alloy::signers::SignerSync;
use alloy::signers::local::PrivateKeySigner;

use mintgate_protocol::prelude::*;

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("signing request was declined")]
    Declined,

    #[error(transparent)]
    Signing(#[from] alloy::signers::Error)
}

/// Account which produces detached governance signatures, e.g. a wallet
/// session of a group member.
#[async_trait::async_trait]
pub trait Signer: Send + Sync {
    /// Chain address of the signing account.
    fn address(&self) -> Address;

    /// Human-readable name of the signer.
    fn display_name(&self) -> &str;

    /// Sign EIP-712 typed data. Return `SignerError::Declined` if the signer
    /// refused to sign it.
    async fn sign_typed_data(&self, data: &TypedData) -> Result<Signature, SignerError>;
}

/// Signer which holds its secret key in memory.
#[derive(Debug, Clone)]
pub struct LocalSigner {
    key: PrivateKeySigner,
    name: String
}

impl LocalSigner {
    #[inline]
    pub fn new(key: PrivateKeySigner, name: impl ToString) -> Self {
        Self {
            key,
            name: name.to_string()
        }
    }

    /// Sign raw 32 bytes digest.
    #[inline]
    pub fn sign_digest(&self, digest: &B256) -> Result<Signature, SignerError> {
        Ok(self.key.sign_hash_sync(digest)?)
    }
}

#[async_trait::async_trait]
impl Signer for LocalSigner {
    #[inline]
    fn address(&self) -> Address {
        self.key.address()
    }

    #[inline]
    fn display_name(&self) -> &str {
        &self.name
    }

    async fn sign_typed_data(&self, data: &TypedData) -> Result<Signature, SignerError> {
        self.sign_digest(&data.digest())
    }
}
