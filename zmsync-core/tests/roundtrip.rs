//! Identifier roundtrips and set-diff laws for `zmsync-core`.
//!
//! Each `#[case]` is isolated; no shared state.

use std::collections::BTreeSet;

use rstest::rstest;
use zmsync_core::{
    diff::{diff, diff_members},
    Member, RoleId, ROLE_SEPARATOR,
};

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Role identifier
// ---------------------------------------------------------------------------

#[rstest]
#[case("sports", "readers")]
#[case("home.alice", "admin")]
#[case("a-b_c", "x.y.z")]
fn role_id_roundtrip(#[case] domain: &str, #[case] role: &str) {
    let id = RoleId::new(domain, role);
    let encoded = id.to_string();
    assert_eq!(encoded, format!("{domain}{ROLE_SEPARATOR}{role}"));
    let back: RoleId = encoded.parse().expect("parse");
    assert_eq!(back.domain.as_str(), domain);
    assert_eq!(back.role.as_str(), role);
}

#[rstest]
#[case("sports")]
#[case("sports:readers")]
#[case("sports:role.")]
#[case(":role.readers")]
#[case("sports:role.readers:role.extra")]
fn malformed_role_id_is_rejected(#[case] raw: &str) {
    assert!(raw.parse::<RoleId>().is_err(), "{raw} should not parse");
}

// ---------------------------------------------------------------------------
// Set diff laws
// ---------------------------------------------------------------------------

#[rstest]
#[case(&[], &[])]
#[case(&["user.alice"], &[])]
#[case(&[], &["user.alice"])]
#[case(&["user.alice", "user.bob"], &["user.bob", "user.carol"])]
#[case(&["user.alice", "user.bob"], &["user.alice", "user.bob"])]
#[case(&["a", "b", "c"], &["d", "e"])]
fn diff_laws(#[case] old: &[&str], #[case] new: &[&str]) {
    let old = set(old);
    let new = set(new);
    let d = diff(&old, &new);
    let remove: BTreeSet<String> = d.remove.iter().cloned().collect();
    let add: BTreeSet<String> = d.add.iter().cloned().collect();

    assert_eq!(remove, old.difference(&new).cloned().collect());
    assert_eq!(add, new.difference(&old).cloned().collect());
    assert!(remove.is_disjoint(&add));

    let converged: BTreeSet<String> = old.difference(&remove).cloned().chain(add).collect();
    assert_eq!(converged, new);
}

#[test]
fn membership_scenario() {
    let old = vec![Member::new("user.alice"), Member::new("user.bob")];
    let new = vec![Member::new("user.bob"), Member::new("user.carol")];
    let d = diff_members(&old, &new);
    assert_eq!(d.remove, vec![Member::new("user.alice")]);
    assert_eq!(d.add, vec![Member::new("user.carol")]);
}
