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

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use alloy::primitives::Address;

/// Independent governance key-group. Every mint request must be signed by
/// exactly one member of each group before it can be submitted on-chain.
///
/// Variants order is the canonical order in which the settlement contract
/// expects the signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GovernanceGroup {
    Will,
    Wisdom,
    Love
}

impl GovernanceGroup {
    /// All governance groups in the canonical contract order.
    pub const ALL: [Self; 3] = [
        Self::Will,
        Self::Wisdom,
        Self::Love
    ];

    /// Position of the group's signature in the contract call.
    #[inline]
    pub const fn index(&self) -> usize {
        match self {
            Self::Will   => 0,
            Self::Wisdom => 1,
            Self::Love   => 2
        }
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Will   => "WILL",
            Self::Wisdom => "WISDOM",
            Self::Love   => "LOVE"
        }
    }
}

impl std::fmt::Display for GovernanceGroup {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GovernanceGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "WILL"   => Ok(Self::Will),
            "WISDOM" => Ok(Self::Wisdom),
            "LOVE"   => Ok(Self::Love),

            _ => Err(s.to_string())
        }
    }
}

/// Check if the provided set of completed groups forms the quorum.
#[inline]
pub fn is_quorum(completed: &BTreeSet<GovernanceGroup>) -> bool {
    completed.len() == GovernanceGroup::ALL.len()
        && GovernanceGroup::ALL.iter().all(|group| completed.contains(group))
}

/// List groups which haven't signed yet, in canonical order.
pub fn missing_groups(completed: &BTreeSet<GovernanceGroup>) -> Vec<GovernanceGroup> {
    GovernanceGroup::ALL.into_iter()
        .filter(|group| !completed.contains(group))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("signer {address} is assigned to both {first} and {second} groups")]
pub struct RegistryError {
    pub address: Address,
    pub first: GovernanceGroup,
    pub second: GovernanceGroup
}

/// Group member resolved from a signer address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupMember {
    pub group: GovernanceGroup,
    pub name: String
}

/// Injective mapping of signer addresses to governance groups.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct GroupRegistry {
    members: HashMap<Address, GroupMember>
}

impl GroupRegistry {
    /// Build registry from `(group, address, display name)` entries. An
    /// address can belong to only one group.
    pub fn new(
        entries: impl IntoIterator<Item = (GovernanceGroup, Address, String)>
    ) -> Result<Self, RegistryError> {
        let mut members = HashMap::<Address, GroupMember>::new();

        for (group, address, name) in entries {
            if let Some(member) = members.get(&address) {
                if member.group == group {
                    continue;
                }

                return Err(RegistryError {
                    address,
                    first: member.group,
                    second: group
                });
            }

            members.insert(address, GroupMember { group, name });
        }

        Ok(Self { members })
    }

    /// Resolve signer address to its governance group. Return `None` if the
    /// address isn't a member of any group.
    #[inline]
    pub fn resolve(&self, address: &Address) -> Option<&GroupMember> {
        self.members.get(address)
    }

    /// Iterate over addresses of the given group.
    pub fn members_of(
        &self,
        group: GovernanceGroup
    ) -> impl Iterator<Item = (&Address, &GroupMember)> {
        self.members.iter()
            .filter(move |(_, member)| member.group == group)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
