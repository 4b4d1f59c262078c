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

use anyhow::Context;
use time::UtcDateTime;
use serde_json::{json, Value as Json};
use alloy::signers::local::PrivateKeySigner;

use mintgate_protocol::prelude::*;

use crate::consts::IDENTITIES_PATH;
use crate::governance::LocalSigner;

/// Read identities list from the data folder.
pub fn read() -> anyhow::Result<Vec<Identity>> {
    if !IDENTITIES_PATH.exists() {
        return Ok(vec![]);
    }

    let identities = std::fs::read(IDENTITIES_PATH.as_path())?;
    let identities = serde_json::from_slice::<Vec<Json>>(&identities)?;

    let mut identities = identities.into_iter()
        .map(|identity| {
            Identity::from_json(&identity)
                .context("failed to read identities list")
        })
        .collect::<Result<Vec<_>, _>>()?;

    identities.dedup_by(|a, b| a.secret_key().to_bytes() == b.secret_key().to_bytes());

    Ok(identities)
}

/// Write identities list to the data folder.
pub fn write(
    identities: impl IntoIterator<Item = Identity>
) -> anyhow::Result<()> {
    let identities = identities.into_iter()
        .map(|identity| identity.to_json())
        .collect::<Vec<_>>();

    std::fs::write(
        IDENTITIES_PATH.as_path(),
        serde_json::to_vec_pretty(&json!(identities))?
    )?;

    Ok(())
}

/// Find identity with the given title.
pub fn find(title: &str) -> anyhow::Result<Identity> {
    read()?.into_iter()
        .find(|identity| identity.title() == title)
        .ok_or_else(|| anyhow::anyhow!("identity '{title}' doesn't exist"))
}

/// Identity is a local governance signer key with a user-defined title used
/// as the signer display name.
#[derive(Debug, Clone)]
pub struct Identity {
    title: String,
    secret_key: PrivateKeySigner,
    created_at: UtcDateTime
}

impl Identity {
    pub fn new(
        title: impl ToString,
        secret_key: PrivateKeySigner
    ) -> Self {
        Self {
            title: title.to_string(),
            secret_key,
            created_at: UtcDateTime::now()
        }
    }

    #[inline(always)]
    pub const fn title(&self) -> &String {
        &self.title
    }

    #[inline(always)]
    pub const fn secret_key(&self) -> &PrivateKeySigner {
        &self.secret_key
    }

    #[inline(always)]
    pub const fn created_at(&self) -> &UtcDateTime {
        &self.created_at
    }

    /// Chain address of the identity.
    #[inline]
    pub fn address(&self) -> Address {
        self.secret_key.address()
    }

    /// Signer which signs with this identity's key.
    #[inline]
    pub fn signer(&self) -> LocalSigner {
        LocalSigner::new(self.secret_key.clone(), &self.title)
    }

    pub fn to_json(&self) -> Json {
        json!({
            "title": self.title.as_str(),
            "secret_key": alloy::hex::encode(self.secret_key.to_bytes()),
            "created_at": self.created_at.unix_timestamp()
        })
    }

    pub fn from_json(json: &Json) -> anyhow::Result<Self> {
        Ok(Self {
            title: json.get("title")
                .and_then(Json::as_str)
                .map(String::from)
                .ok_or_else(|| anyhow::anyhow!("identity field 'title' is missing"))?,

            secret_key: json.get("secret_key")
                .and_then(Json::as_str)
                .and_then(|secret_key| secret_key.parse::<PrivateKeySigner>().ok())
                .ok_or_else(|| anyhow::anyhow!("identity field 'secret_key' is invalid"))?,

            created_at: json.get("created_at")
                .and_then(Json::as_i64)
                .map(UtcDateTime::from_unix_timestamp)
                .ok_or_else(|| anyhow::anyhow!("identity field 'created_at' is missing"))??
        })
    }
}

#[test]
fn test_identity_json() -> anyhow::Result<()> {
    use crate::governance::Signer;

    let identity = Identity::new("alice", PrivateKeySigner::from_bytes(&B256::repeat_byte(0x11))?);

    let json = identity.to_json();

    assert_eq!(json["secret_key"], "11".repeat(32));
    assert_eq!(Identity::from_json(&json)?.address(), identity.address());
    assert_eq!(identity.signer().address(), identity.address());
    assert_eq!(identity.signer().display_name(), "alice");

    assert!(Identity::from_json(&json!({ "title": "bob", "secret_key": "00", "created_at": 0 })).is_err());

    Ok(())
}
