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

use time::UtcDateTime;

use mintgate_protocol::prelude::*;

use crate::database::request::{MintRequest, MintRequestRecord, GroupSignature};

use super::{GovernanceError, Signer, SignerError};

/// Validates and records off-chain signatures of governance group members.
#[derive(Debug, Clone)]
pub struct SignatureCollector {
    registry: GroupRegistry,
    domain: Eip712Domain
}

impl SignatureCollector {
    #[inline]
    pub fn new(registry: GroupRegistry, domain: Eip712Domain) -> Self {
        Self {
            registry,
            domain
        }
    }

    #[inline(always)]
    pub const fn registry(&self) -> &GroupRegistry {
        &self.registry
    }

    #[inline(always)]
    pub const fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    /// Build the typed data which governance members sign for the request.
    pub fn typed_data(&self, request: &MintRequest) -> Result<TypedData, GovernanceError> {
        let Some(message) = request.authorization() else {
            return Err(GovernanceError::MissingActionHash(request.id));
        };

        let expected = action_hash(&request.action_name);

        if message.actionHash != expected {
            return Err(GovernanceError::ActionHashMismatch {
                request_id: request.id,
                expected,
                stored: message.actionHash
            });
        }

        Ok(TypedData {
            domain: self.domain.clone(),
            message
        })
    }

    /// Ask the signer for a signature of the mint request and store it.
    ///
    /// Nothing is written if the signer doesn't belong to a governance group,
    /// its group has already signed, or the signer declined the request.
    pub async fn collect_signature(
        &self,
        record: &MintRequestRecord,
        signer: &dyn Signer
    ) -> Result<MintRequest, GovernanceError> {
        let address = signer.address();

        let member = self.registry.resolve(&address)
            .ok_or(GovernanceError::UngroupedSigner(address))?;

        let request = record.load()?;

        if request.signatures.contains_key(&member.group) {
            return Err(GovernanceError::DuplicateGroupSignature {
                request_id: request.id,
                group: member.group
            });
        }

        if !request.status.accepts_signatures() {
            return Err(GovernanceError::InvalidStatus {
                request_id: request.id,
                status: request.status
            });
        }

        let data = self.typed_data(&request)?;

        tracing::info!(
            request_id = request.id,
            group = %member.group,
            signer = %address,
            "requesting governance signature"
        );

        let signature = match signer.sign_typed_data(&data).await {
            Ok(signature) => signature,

            Err(SignerError::Declined) => {
                tracing::warn!(request_id = request.id, signer = %address, "signing declined");

                return Err(GovernanceError::SigningDeclined(address));
            }

            Err(err) => return Err(err.into())
        };

        let recovered = data.recover_signer(&signature)?;

        if recovered != address {
            return Err(GovernanceError::SignatureMismatch {
                expected: address,
                recovered
            });
        }

        let signer_name = if member.name.is_empty() {
            signer.display_name().to_string()
        } else {
            member.name.clone()
        };

        let request = record.add_signature(&request, member.group, &GroupSignature {
            signer: address,
            signature,
            signer_name,
            signed_at: UtcDateTime::now()
        })?;

        tracing::info!(
            request_id = request.id,
            group = %member.group,
            status = %request.status,
            completed = request.signatures.len(),
            "governance signature accepted"
        );

        Ok(request)
    }
}
