// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Bearer-token claims extraction
//!
//! The portal sits behind a transport that has already verified the token
//! signature, so this module only decodes the claims segment: the second
//! `.`-separated part, right-padded to a multiple of 4 and URL-safe
//! base64-decoded into JSON. Any failure yields the empty claims value -
//! never an error - and the handlers treat the missing identity or group
//! claims as their own error paths.

use anyhow::{Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use serde::Deserialize;

/// Claims carried by a bearer token, as far as the portal trusts them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenClaims {
    identity: Option<String>,
    groups: Option<String>,
}

#[derive(Deserialize)]
struct RawClaims {
    #[serde(default)]
    identities: Vec<RawIdentity>,
    #[serde(rename = "custom:ADGroups")]
    ad_groups: Option<String>,
}

#[derive(Deserialize)]
struct RawIdentity {
    #[serde(rename = "userId")]
    user_id: String,
}

impl TokenClaims {
    /// The bare claimed username, with any `DOMAIN\` prefix stripped
    pub fn username(&self) -> Option<&str> {
        self.identity
            .as_deref()
            .map(|id| id.split_once('\\').map_or(id, |(_, user)| user))
    }

    /// The raw group-membership string
    pub fn groups(&self) -> Option<&str> {
        self.groups.as_deref()
    }

    /// Whether the group-membership string names the given group
    pub fn is_member(&self, group: &str) -> bool {
        self.groups.as_deref().is_some_and(|g| g.contains(group))
    }
}

/// Decode the claims segment of a bearer token.
///
/// Failures are logged and swallowed; the caller sees empty claims.
pub fn decode(token: &str) -> TokenClaims {
    match decode_inner(token) {
        Ok(claims) => claims,
        Err(error) => {
            tracing::error!(%error, "could not parse bearer token claims");
            TokenClaims::default()
        }
    }
}

fn decode_inner(token: &str) -> Result<TokenClaims> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| anyhow!("token has no claims segment"))?;

    let mut padded = payload.to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }

    let bytes = URL_SAFE.decode(padded.as_bytes())?;
    let raw: RawClaims = serde_json::from_slice(&bytes)?;

    Ok(TokenClaims {
        identity: raw.identities.into_iter().next().map(|i| i.user_id),
        groups: raw.ad_groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_for(payload: &serde_json::Value) -> String {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let encoded = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        format!("hdr.{}.sig", encoded)
    }

    #[test]
    fn test_decode_identity_and_groups() {
        let token = token_for(&serde_json::json!({
            "identities": [{"userId": "CORP\\alice"}],
            "custom:ADGroups": "Users,AdminGroupMember",
        }));

        let claims = decode(&token);
        assert_eq!(claims.username(), Some("alice"));
        assert_eq!(claims.groups(), Some("Users,AdminGroupMember"));
        assert!(claims.is_member("AdminGroupMember"));
        assert!(!claims.is_member("Auditors"));
    }

    #[test]
    fn test_decode_is_idempotent() {
        let token = token_for(&serde_json::json!({
            "identities": [{"userId": "CORP\\bob"}],
            "custom:ADGroups": "Users",
        }));
        assert_eq!(decode(&token), decode(&token));
    }

    #[test]
    fn test_identity_without_domain_prefix() {
        let token = token_for(&serde_json::json!({
            "identities": [{"userId": "carol"}],
            "custom:ADGroups": "Users",
        }));
        assert_eq!(decode(&token).username(), Some("carol"));
    }

    #[test]
    fn test_malformed_tokens_yield_empty_claims() {
        for garbage in ["", "nodots", "a.!!!not-base64!!!.c", "a.aGVsbG8.c"] {
            let claims = decode(garbage);
            assert_eq!(claims, TokenClaims::default(), "token: {:?}", garbage);
            assert!(claims.username().is_none());
            assert!(claims.groups().is_none());
        }
    }

    #[test]
    fn test_missing_claims_are_none_not_errors() {
        // Valid JSON payload with neither identities nor groups
        let token = token_for(&serde_json::json!({"sub": "whatever"}));
        let claims = decode(&token);
        assert!(claims.username().is_none());
        assert!(claims.groups().is_none());
        assert!(!claims.is_member("AdminGroupMember"));
    }

    #[test]
    fn test_unpadded_segment_is_accepted() {
        // This payload's length is not a multiple of 3, so the unpadded
        // encoding is not a multiple of 4 and the right-padding path runs
        let token = token_for(&serde_json::json!({"identities": [{"userId": "x\\y"}]}));
        assert_eq!(decode(&token).username(), Some("y"));
    }
}
