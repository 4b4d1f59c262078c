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

//! Calls of the settlement contract.

use alloy::primitives::{Address, B256, Bytes, U256, Signature};
use alloy::sol_types::SolCall;

alloy::sol! {
    /// Quorum entry point of the settlement contract.
    function mintWithSignatures(
        address recipient,
        string actionName,
        uint256 amount,
        bytes32 evidenceHash,
        bytes[] signatures
    );

    /// Legacy single-signer entry point of the settlement contract.
    function mintWithSignature(
        address recipient,
        string actionName,
        uint256 amount,
        bytes32 evidenceHash,
        bytes signature
    );
}

/// Authority under which the mint is performed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MintAuthority {
    /// Governance signatures in the canonical group order.
    Quorum([Signature; 3]),

    /// Single signature of the legacy pre-quorum signer.
    Legacy(Signature)
}

/// Call of the settlement contract's mint entry point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MintCall {
    pub contract: Address,
    pub recipient: Address,
    pub action_name: String,
    pub amount: u128,
    pub evidence_hash: B256,
    pub authority: MintAuthority
}

#[inline]
fn signature_bytes(signature: &Signature) -> Bytes {
    Bytes::copy_from_slice(&signature.as_bytes())
}

impl MintCall {
    /// Signature of the called contract function.
    #[inline]
    pub const fn function(&self) -> &'static str {
        match self.authority {
            MintAuthority::Quorum(_) => mintWithSignaturesCall::SIGNATURE,
            MintAuthority::Legacy(_) => mintWithSignatureCall::SIGNATURE
        }
    }

    /// Signatures as passed to the contract, in positional order.
    pub fn signatures(&self) -> Vec<Signature> {
        match &self.authority {
            MintAuthority::Quorum(signatures) => signatures.to_vec(),
            MintAuthority::Legacy(signature) => vec![*signature]
        }
    }

    /// Encode transaction calldata.
    pub fn calldata(&self) -> Vec<u8> {
        match &self.authority {
            MintAuthority::Quorum(signatures) => mintWithSignaturesCall {
                recipient: self.recipient,
                actionName: self.action_name.clone(),
                amount: U256::from(self.amount),
                evidenceHash: self.evidence_hash,
                signatures: signatures.iter()
                    .map(signature_bytes)
                    .collect()
            }.abi_encode(),

            MintAuthority::Legacy(signature) => mintWithSignatureCall {
                recipient: self.recipient,
                actionName: self.action_name.clone(),
                amount: U256::from(self.amount),
                evidenceHash: self.evidence_hash,
                signature: signature_bytes(signature)
            }.abi_encode()
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::keccak256;

    use super::*;

    fn word(bytes: &[u8], index: usize) -> &[u8] {
        &bytes[index * 32..(index + 1) * 32]
    }

    fn uint(value: u64) -> [u8; 32] {
        U256::from(value).to_be_bytes()
    }

    fn signature(byte: u8) -> Signature {
        Signature::new(U256::from(byte), U256::from(byte), byte % 2 == 0)
    }

    #[test]
    fn test_selectors() {
        assert_eq!(
            mintWithSignaturesCall::SIGNATURE,
            "mintWithSignatures(address,string,uint256,bytes32,bytes[])"
        );

        assert_eq!(
            mintWithSignatureCall::SIGNATURE,
            "mintWithSignature(address,string,uint256,bytes32,bytes)"
        );

        for (function, selector) in [
            (mintWithSignaturesCall::SIGNATURE, mintWithSignaturesCall::SELECTOR),
            (mintWithSignatureCall::SIGNATURE, mintWithSignatureCall::SELECTOR)
        ] {
            assert_eq!(&keccak256(function)[..4], &selector);
        }
    }

    #[test]
    fn test_quorum_calldata() {
        let signatures = [signature(1), signature(2), signature(3)];

        let call = MintCall {
            contract: Address::repeat_byte(0xcc),
            recipient: Address::repeat_byte(0x42),
            action_name: String::from("post_reward"),
            amount: 1000,
            evidence_hash: B256::repeat_byte(0xee),
            authority: MintAuthority::Quorum(signatures)
        };

        let calldata = call.calldata();

        assert_eq!(&calldata[..4], &mintWithSignaturesCall::SELECTOR);
        assert_eq!(call.signatures(), signatures.to_vec());

        let args = &calldata[4..];

        // Head: recipient, string offset, amount, evidence hash, array offset.
        assert_eq!(word(args, 0), Address::repeat_byte(0x42).into_word().as_slice());
        assert_eq!(word(args, 1), &uint(0xa0));
        assert_eq!(word(args, 2), &uint(1000));
        assert_eq!(word(args, 3), &[0xee; 32]);
        assert_eq!(word(args, 4), &uint(0xe0));

        // Action name: length and right-padded bytes.
        assert_eq!(word(args, 5), &uint(11));
        assert_eq!(&word(args, 6)[..11], b"post_reward");
        assert!(word(args, 6)[11..].iter().all(|byte| *byte == 0));

        // Signatures array: length, element offsets, then 65 bytes padded to 96.
        assert_eq!(word(args, 7), &uint(3));
        assert_eq!(word(args, 8), &uint(0x60));
        assert_eq!(word(args, 9), &uint(0xe0));
        assert_eq!(word(args, 10), &uint(0x160));

        assert_eq!(word(args, 11), &uint(65));
        assert_eq!(&args[12 * 32..12 * 32 + 65], &signatures[0].as_bytes());

        assert_eq!(args.len(), 23 * 32);
    }

    #[test]
    fn test_legacy_calldata() {
        let call = MintCall {
            contract: Address::repeat_byte(0xcc),
            recipient: Address::repeat_byte(0x42),
            action_name: String::from("post_reward"),
            amount: 1000,
            evidence_hash: B256::repeat_byte(0xee),
            authority: MintAuthority::Legacy(signature(1))
        };

        let calldata = call.calldata();
        let args = &calldata[4..];

        assert_eq!(&calldata[..4], &mintWithSignatureCall::SELECTOR);
        assert_eq!(call.function(), mintWithSignatureCall::SIGNATURE);
        assert_eq!(call.signatures(), vec![signature(1)]);

        // Bytes offset follows the action name tail.
        assert_eq!(word(args, 4), &uint(0xe0));
        assert_eq!(word(args, 7), &uint(65));
        assert_eq!(args[7 * 32 + 32 + 64], 27);
    }
}
