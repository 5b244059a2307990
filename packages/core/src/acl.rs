//! Path-based access control.
//!
//! A pure decision function over (operation, caller, path). It holds no
//! state, caches nothing, and is re-evaluated on every router call.

use crate::Error;

/// Caller identity attached to every namespace operation.
///
/// The transport layer constructs only `Anon` and `User` (from a verified
/// request signature). `System` is reserved for internally generated work -
/// watcher cascades and server-side queries - and bypasses the policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Auth {
    /// No caller identity.
    Anon,
    /// A verified user id (16 lowercase hex chars).
    User(String),
    /// Internal, non-attacker-controlled origin.
    System,
}

impl Auth {
    /// Convenience constructor for a user identity.
    pub fn user(uid: &str) -> Auth {
        Auth::User(uid.to_string())
    }

    fn uid(&self) -> Option<&str> {
        match self {
            Auth::User(uid) => Some(uid),
            _ => None,
        }
    }
}

/// The four access-controlled operation classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AclOp {
    Read,
    Write,
    List,
    Delete,
}

const USERS: &str = "users";
const PROFILE: &str = "profile";
const CHATS: &str = "chats";

/// Decide whether `auth` may perform `op` on the path given as segments
/// (mount root first; empty slice is the namespace root `/`).
///
/// Rules, in precedence order:
/// 1. listing the namespace root is always allowed;
/// 2. public profiles (`/users/<uid>/profile...`) are readable by anyone;
/// 3. a caller's own subtree (`/users/<me>/...`) is fully accessible;
/// 4. a peer chat (`/users/<a>/chats/<b>/...`) is readable by `a` and `b`;
/// 5. listing `/users` is allowed (the listing itself is filtered, see
///    [`filter_listing`]);
/// 6. everything else is denied.
pub fn test(op: AclOp, auth: &Auth, segments: &[String]) -> bool {
    if matches!(auth, Auth::System) {
        return true;
    }
    if segments.is_empty() {
        return op == AclOp::List;
    }
    if segments[0] != USERS {
        return false;
    }
    if op == AclOp::Read && segments.len() >= 3 && segments[2] == PROFILE {
        return true;
    }
    if let Some(uid) = auth.uid() {
        if segments.len() >= 2 && segments[1] == uid {
            return true;
        }
        if op == AclOp::Read
            && segments.len() >= 4
            && segments[2] == CHATS
            && segments[3] == uid
        {
            return true;
        }
    }
    op == AclOp::List && segments.len() == 1
}

/// Like [`test`], but failing with [`Error::AccessDenied`].
pub fn check(op: AclOp, auth: &Auth, segments: &[String], path: &str) -> Result<(), Error> {
    if test(op, auth, segments) {
        Ok(())
    } else {
        Err(Error::AccessDenied {
            op: op_name(op),
            path: path.to_string(),
        })
    }
}

/// Filter a directory listing for the caller.
///
/// Listing `/users` never enumerates user ids: an authenticated caller sees
/// only their own id, an anonymous caller sees none. Every other listing
/// passes through unchanged, as does everything for `System`.
pub fn filter_listing(auth: &Auth, segments: &[String], children: Vec<String>) -> Vec<String> {
    if matches!(auth, Auth::System) {
        return children;
    }
    if segments.len() == 1 && segments[0] == USERS {
        return match auth.uid() {
            Some(uid) => children.into_iter().filter(|c| c == uid).collect(),
            None => Vec::new(),
        };
    }
    children
}

fn op_name(op: AclOp) -> &'static str {
    match op {
        AclOp::Read => "read",
        AclOp::Write => "write",
        AclOp::List => "list",
        AclOp::Delete => "delete",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(path: &str) -> Vec<String> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    const ALICE: &str = "0123456789abcdef";
    const BOB: &str = "fedcba9876543210";
    const EVE: &str = "7777777777777777";

    #[test]
    fn root_listing_open_to_all() {
        assert!(test(AclOp::List, &Auth::Anon, &[]));
        assert!(test(AclOp::List, &Auth::user(ALICE), &[]));
        assert!(!test(AclOp::Read, &Auth::Anon, &[]));
    }

    #[test]
    fn public_profiles_readable_by_anyone() {
        let path = segs(&format!("/users/{}/profile/name", ALICE));
        assert!(test(AclOp::Read, &Auth::Anon, &path));
        assert!(test(AclOp::Read, &Auth::user(EVE), &path));
        assert!(!test(AclOp::Write, &Auth::Anon, &path));
    }

    #[test]
    fn own_subtree_fully_accessible() {
        let path = segs(&format!("/users/{}/places/00f2bc17/lat", ALICE));
        let alice = Auth::user(ALICE);
        assert!(test(AclOp::Read, &alice, &path));
        assert!(test(AclOp::Write, &alice, &path));
        assert!(test(AclOp::Delete, &alice, &path));
        assert!(test(AclOp::List, &alice, &path));
        assert!(!test(AclOp::Write, &Auth::user(EVE), &path));
        assert!(!test(AclOp::Write, &Auth::Anon, &path));
    }

    #[test]
    fn peer_chat_readable_by_both_participants_only() {
        let path = segs(&format!(
            "/users/{}/chats/{}/2015-01-02-12-30-00/text",
            ALICE, BOB
        ));
        assert!(test(AclOp::Read, &Auth::user(ALICE), &path));
        assert!(test(AclOp::Read, &Auth::user(BOB), &path));
        assert!(!test(AclOp::Read, &Auth::user(EVE), &path));
        assert!(!test(AclOp::Read, &Auth::Anon, &path));
        // The recipient cannot write into the sender's subtree.
        assert!(!test(AclOp::Write, &Auth::user(BOB), &path));
    }

    #[test]
    fn users_listing_allowed_but_filtered() {
        let path = segs("/users");
        assert!(test(AclOp::List, &Auth::Anon, &path));
        assert!(test(AclOp::List, &Auth::user(ALICE), &path));

        let all = vec![ALICE.to_string(), BOB.to_string()];
        assert_eq!(
            filter_listing(&Auth::user(ALICE), &path, all.clone()),
            vec![ALICE.to_string()]
        );
        assert!(filter_listing(&Auth::Anon, &path, all.clone()).is_empty());
        assert_eq!(filter_listing(&Auth::System, &path, all.clone()), all);
    }

    #[test]
    fn other_mounts_denied_to_clients() {
        for path in ["/vmap/0a1b2c3d4e", "/feedbacks/2015-01-02-12-30-00", "/reports/x"] {
            assert!(!test(AclOp::Read, &Auth::user(ALICE), &segs(path)));
            assert!(!test(AclOp::Write, &Auth::user(ALICE), &segs(path)));
        }
    }

    #[test]
    fn system_bypasses_everything() {
        assert!(test(AclOp::Write, &Auth::System, &segs("/vmap/0a1b2c3d4e")));
        assert!(test(
            AclOp::Write,
            &Auth::System,
            &segs(&format!("/users/{}/unread/{}", BOB, ALICE))
        ));
    }

    #[test]
    fn check_reports_op_and_path() {
        let err = check(
            AclOp::Write,
            &Auth::Anon,
            &segs("/vmap/0a1b2c3d4e"),
            "/vmap/0a1b2c3d4e",
        )
        .unwrap_err();
        assert!(err.to_string().contains("write"));
        assert!(err.to_string().contains("/vmap/0a1b2c3d4e"));
    }

    #[test]
    fn unfiltered_listings_pass_through() {
        let path = segs(&format!("/users/{}/unread", BOB));
        let children = vec![ALICE.to_string()];
        assert_eq!(
            filter_listing(&Auth::user(BOB), &path, children.clone()),
            children
        );
    }
}
