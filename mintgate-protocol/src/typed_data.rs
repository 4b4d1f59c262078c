// SPDX-License-Identifier: GPL-3.0-or-later
//
// mintgate-protocol
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

//! EIP-712 structured data hashing for governance signatures.
//!
//! Signatures are bound to the settlement contract address, chain id and
//! protocol name/version through the domain separator, so a signature made
//! for one network or contract can't be replayed on another one.

use alloy::primitives::{Address, B256, Signature, SignatureError, keccak256};
use alloy::sol_types::{Eip712Domain, SolStruct, eip712_domain};

alloy::sol! {
    #![sol(all_derives)]

    /// Typed payload authorizing the mint of `amount` tokens to `recipient`.
    struct MintAuthorization {
        address recipient;
        bytes32 actionHash;
        uint256 amount;
        bytes32 evidenceHash;
        uint256 nonce;
    }
}

/// Hash of the action name the same way the contract derives it:
/// `keccak256(bytes(actionName))`.
#[inline]
pub fn action_hash(action_name: impl AsRef<str>) -> B256 {
    keccak256(action_name.as_ref().as_bytes())
}

/// Signing domain of the settlement contract.
pub fn mint_domain(
    name: impl ToString,
    version: impl ToString,
    chain_id: u64,
    verifying_contract: Address
) -> Eip712Domain {
    eip712_domain! {
        name: name.to_string(),
        version: version.to_string(),
        chain_id: chain_id,
        verifying_contract: verifying_contract,
    }
}

/// Domain-separated typed data handed to signers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypedData {
    pub domain: Eip712Domain,
    pub message: MintAuthorization
}

impl TypedData {
    /// Final digest which is signed: `keccak256(0x1901 || domain || struct)`.
    #[inline]
    pub fn digest(&self) -> B256 {
        self.message.eip712_signing_hash(&self.domain)
    }

    /// Recover address of the account which produced the signature.
    #[inline]
    pub fn recover_signer(&self, signature: &Signature) -> Result<Address, SignatureError> {
        signature.recover_address_from_prehash(&self.digest())
    }
}
