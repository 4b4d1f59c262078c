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

use std::str::FromStr;

/// Lifecycle status of a mint request.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MintStatus {
    /// No governance signatures collected yet.
    #[default]
    PendingSig,

    /// Some, but not all governance groups have signed.
    Signing,

    /// All governance groups have signed, request can be submitted.
    Signed,

    /// Transaction was broadcasted and awaits confirmation.
    Submitted,

    /// Transaction is confirmed on-chain.
    Confirmed,

    /// Broadcast failed or transaction was reverted.
    Failed,

    /// Request was rejected by an operator.
    Rejected
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid mint request status transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: MintStatus,
    pub to: MintStatus
}

const VALID_TRANSITIONS: &[(MintStatus, MintStatus)] = &[
    (MintStatus::PendingSig, MintStatus::Signing),
    (MintStatus::Signing,    MintStatus::Signing),
    (MintStatus::Signing,    MintStatus::Signed),
    (MintStatus::Signed,     MintStatus::Submitted),
    (MintStatus::Submitted,  MintStatus::Confirmed),
    (MintStatus::Submitted,  MintStatus::Failed),
    (MintStatus::Failed,     MintStatus::Confirmed),
    (MintStatus::Failed,     MintStatus::PendingSig),

    // Broadcast failed before the transaction reached the chain.
    (MintStatus::Signed,     MintStatus::Failed),

    // Legacy single-signer requests skip the governance quorum.
    (MintStatus::PendingSig, MintStatus::Submitted),
    (MintStatus::PendingSig, MintStatus::Failed)
];

impl MintStatus {
    pub const ALL: [Self; 7] = [
        Self::PendingSig,
        Self::Signing,
        Self::Signed,
        Self::Submitted,
        Self::Confirmed,
        Self::Failed,
        Self::Rejected
    ];

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PendingSig => "PENDING_SIG",
            Self::Signing    => "SIGNING",
            Self::Signed     => "SIGNED",
            Self::Submitted  => "SUBMITTED",
            Self::Confirmed  => "CONFIRMED",
            Self::Failed     => "FAILED",
            Self::Rejected   => "REJECTED"
        }
    }

    /// Confirmed and rejected requests can't change their status anymore.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Rejected)
    }

    /// Check if governance signatures can be collected in this status.
    #[inline]
    pub const fn accepts_signatures(&self) -> bool {
        matches!(self, Self::PendingSig | Self::Signing)
    }

    /// Check if request can move from the current status to the `to` one.
    pub fn can_transition(&self, to: Self) -> bool {
        if to == Self::Rejected {
            return !self.is_terminal();
        }

        VALID_TRANSITIONS.contains(&(*self, to))
    }

    /// Same as `can_transition` but return an error.
    pub fn validate_transition(&self, to: Self) -> Result<(), InvalidTransition> {
        if self.can_transition(to) {
            Ok(())
        } else {
            Err(InvalidTransition { from: *self, to })
        }
    }
}

impl std::fmt::Display for MintStatus {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MintStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| s.to_string())
    }
}
