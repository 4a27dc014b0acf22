// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Action gate: the state machine and authorization checks guarding
//! lifecycle dispatch
//!
//! The transition table is the contract between the portal and its users:
//! which actions are legal from which observed states, and which
//! in-progress label the index record is advanced to once the control
//! plane acknowledges the call. Denials here are `Warning` material
//! (expected user-facing guidance); authorization failures are `Error`
//! material.

use crate::claims::TokenClaims;
use portal_api::WorkspaceAction;
use vdi_api::DesktopState;

/// Outcome of checking an action against an instance's stored state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Action is legal; the record advances to this in-progress state once
    /// the control plane acknowledges the call
    Allow(DesktopState),
    /// Action is not legal from the current state; the message becomes the
    /// `Warning` body
    Deny(&'static str),
}

/// States each action may legally be requested from.
///
/// Decommission is the odd one out: legal from every state except
/// SUSPENDED, which `transition` special-cases rather than enumerating.
pub fn allowed_source_states(action: WorkspaceAction) -> &'static [DesktopState] {
    match action {
        WorkspaceAction::Start => &[DesktopState::Stopped],
        WorkspaceAction::Stop => &[
            DesktopState::Available,
            DesktopState::Impaired,
            DesktopState::Unhealthy,
            DesktopState::Error,
        ],
        WorkspaceAction::Reboot => &[
            DesktopState::Available,
            DesktopState::Impaired,
            DesktopState::Inoperable,
        ],
        WorkspaceAction::Rebuild => &[DesktopState::Available, DesktopState::Error],
        WorkspaceAction::Decommission => &[],
    }
}

/// The in-progress state recorded after the control plane accepts the call.
///
/// Decommission maps to STOPPING: a terminate acknowledgment means the
/// desktop is shutting down, and the record disappears on a later reaper
/// pass rather than transitioning further here.
pub fn in_progress_state(action: WorkspaceAction) -> DesktopState {
    match action {
        WorkspaceAction::Start => DesktopState::Starting,
        WorkspaceAction::Stop => DesktopState::Stopping,
        WorkspaceAction::Reboot => DesktopState::Rebooting,
        WorkspaceAction::Rebuild => DesktopState::Rebuilding,
        WorkspaceAction::Decommission => DesktopState::Stopping,
    }
}

/// The (action, state) compatibility table
pub fn transition(action: WorkspaceAction, state: DesktopState) -> Transition {
    let legal = match action {
        WorkspaceAction::Decommission => state != DesktopState::Suspended,
        _ => allowed_source_states(action).contains(&state),
    };

    if legal {
        Transition::Allow(in_progress_state(action))
    } else {
        Transition::Deny(denial_message(action))
    }
}

fn denial_message(action: WorkspaceAction) -> &'static str {
    match action {
        WorkspaceAction::Start => "You cannot start a Workspace that is not in a STOPPED state.",
        WorkspaceAction::Stop => {
            "You cannot stop a Workspace that is not in an AVAILABLE, IMPAIRED, UNHEALTHY or ERROR state."
        }
        WorkspaceAction::Reboot => {
            "You cannot reboot a Workspace unless it is in an AVAILABLE, IMPAIRED or INOPERABLE state."
        }
        WorkspaceAction::Rebuild => {
            "You cannot rebuild a Workspace unless it is in an AVAILABLE or ERROR state."
        }
        WorkspaceAction::Decommission => {
            "You cannot decommission a Workspace when it is in a SUSPENDED state."
        }
    }
}

/// Decommission is admin-only regardless of ownership; checked before the
/// record is even fetched.
pub fn require_decommission_rights(
    action: WorkspaceAction,
    claims: &TokenClaims,
    admin_group: &str,
) -> Result<(), &'static str> {
    if action == WorkspaceAction::Decommission && !claims.is_member(admin_group) {
        return Err("You are not authorised to decommission instances.");
    }
    Ok(())
}

/// Acting on someone else's instance requires admin membership; owners act
/// on their own instances freely (username match is case-insensitive).
pub fn require_ownership(
    claims: &TokenClaims,
    username: &str,
    owner: &str,
    admin_group: &str,
) -> Result<(), &'static str> {
    if !claims.is_member(admin_group) && !owner.eq_ignore_ascii_case(username) {
        return Err("You are not authorised to modify other users instances.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const ALL_STATES: [DesktopState; 11] = [
        DesktopState::Available,
        DesktopState::Stopped,
        DesktopState::Starting,
        DesktopState::Stopping,
        DesktopState::Rebooting,
        DesktopState::Rebuilding,
        DesktopState::Impaired,
        DesktopState::Unhealthy,
        DesktopState::Inoperable,
        DesktopState::Error,
        DesktopState::Suspended,
    ];

    fn claims_with_groups(groups: &str) -> TokenClaims {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let payload = serde_json::json!({
            "identities": [{"userId": "CORP\\alice"}],
            "custom:ADGroups": groups,
        });
        let token = format!("h.{}.s", URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes()));
        crate::claims::decode(&token)
    }

    #[test_case(WorkspaceAction::Start, DesktopState::Stopped, DesktopState::Starting)]
    #[test_case(WorkspaceAction::Stop, DesktopState::Available, DesktopState::Stopping)]
    #[test_case(WorkspaceAction::Stop, DesktopState::Impaired, DesktopState::Stopping)]
    #[test_case(WorkspaceAction::Stop, DesktopState::Unhealthy, DesktopState::Stopping)]
    #[test_case(WorkspaceAction::Stop, DesktopState::Error, DesktopState::Stopping)]
    #[test_case(WorkspaceAction::Reboot, DesktopState::Available, DesktopState::Rebooting)]
    #[test_case(WorkspaceAction::Reboot, DesktopState::Impaired, DesktopState::Rebooting)]
    #[test_case(WorkspaceAction::Reboot, DesktopState::Inoperable, DesktopState::Rebooting)]
    #[test_case(WorkspaceAction::Rebuild, DesktopState::Available, DesktopState::Rebuilding)]
    #[test_case(WorkspaceAction::Rebuild, DesktopState::Error, DesktopState::Rebuilding)]
    #[test_case(WorkspaceAction::Decommission, DesktopState::Available, DesktopState::Stopping)]
    #[test_case(WorkspaceAction::Decommission, DesktopState::Stopped, DesktopState::Stopping)]
    #[test_case(WorkspaceAction::Decommission, DesktopState::Error, DesktopState::Stopping)]
    fn test_legal_transitions(action: WorkspaceAction, state: DesktopState, next: DesktopState) {
        assert_eq!(transition(action, state), Transition::Allow(next));
    }

    /// Every (action, state) pair not in the compatibility table denies.
    #[test]
    fn test_illegal_pairs_deny_exhaustively() {
        for action in [
            WorkspaceAction::Start,
            WorkspaceAction::Stop,
            WorkspaceAction::Reboot,
            WorkspaceAction::Rebuild,
        ] {
            for state in ALL_STATES {
                let expected = allowed_source_states(action).contains(&state);
                match transition(action, state) {
                    Transition::Allow(_) => assert!(expected, "{action} from {state} should deny"),
                    Transition::Deny(_) => assert!(!expected, "{action} from {state} should allow"),
                }
            }
        }

        // Decommission denies only from SUSPENDED
        for state in ALL_STATES {
            let outcome = transition(WorkspaceAction::Decommission, state);
            if state == DesktopState::Suspended {
                assert!(matches!(outcome, Transition::Deny(_)));
            } else {
                assert_eq!(outcome, Transition::Allow(DesktopState::Stopping));
            }
        }
    }

    #[test]
    fn test_denial_messages_name_the_legal_states() {
        match transition(WorkspaceAction::Start, DesktopState::Available) {
            Transition::Deny(msg) => assert!(msg.contains("STOPPED")),
            other => panic!("expected denial, got {other:?}"),
        }
        match transition(WorkspaceAction::Decommission, DesktopState::Suspended) {
            Transition::Deny(msg) => assert!(msg.contains("SUSPENDED")),
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[test]
    fn test_decommission_requires_admin_even_for_owner() {
        let user = claims_with_groups("Users");
        let admin = claims_with_groups("Users,AdminGroupMember");

        assert!(
            require_decommission_rights(WorkspaceAction::Decommission, &user, "AdminGroupMember")
                .is_err()
        );
        assert!(
            require_decommission_rights(WorkspaceAction::Decommission, &admin, "AdminGroupMember")
                .is_ok()
        );
        // Non-decommission actions pass regardless of membership
        assert!(require_decommission_rights(WorkspaceAction::Stop, &user, "AdminGroupMember").is_ok());
    }

    #[test_case("alice", "alice", "Users", true; "owner may act")]
    #[test_case("alice", "ALICE", "Users", true; "ownership is case-insensitive")]
    #[test_case("alice", "bob", "Users", false; "non-owner denied")]
    #[test_case("alice", "bob", "Users,AdminGroupMember", true; "admin may act on any instance")]
    fn test_ownership(username: &str, owner: &str, groups: &str, allowed: bool) {
        let claims = claims_with_groups(groups);
        let outcome = require_ownership(&claims, username, owner, "AdminGroupMember");
        assert_eq!(outcome.is_ok(), allowed);
    }
}
