use std::collections::BTreeSet;

use tempfile::TempDir;

use zmsync_client::memory::{Call, Fault, MemoryZms};
use zmsync_core::{
    DomainName, Manifest, Member, MemberName, Role, RoleId, TagValues, Tags, TopLevelDomain,
    ZmsSettings,
};
use zmsync_reconcile::{
    pipeline::{self, apply_at, destroy_at, plan_at},
    state, ReconcileError,
};

fn domain(name: &str, ypm_id: i32) -> TopLevelDomain {
    TopLevelDomain {
        name: name.into(),
        admin_users: BTreeSet::from([MemberName::from("user.alice")]),
        ypm_id,
        audit_ref: "TICKET-7".into(),
    }
}

fn role(domain: &str, name: &str, members: &[&str], tags: &[(&str, &[&str])]) -> Role {
    Role {
        domain: domain.into(),
        name: name.into(),
        members: members.iter().map(|m| Member::new(*m)).collect(),
        tags: tags
            .iter()
            .map(|(k, v)| ((*k).to_owned(), TagValues::new(v.iter().copied())))
            .collect::<Tags>(),
        audit_ref: "TICKET-7".into(),
    }
}

fn manifest(domains: Vec<TopLevelDomain>, roles: Vec<Role>) -> Manifest {
    Manifest {
        workspace: "prod".into(),
        zms: ZmsSettings {
            url: "https://zms.example.com/zms/v1".into(),
            timeout_secs: 30,
            principal_token: None,
        },
        domains,
        roles,
    }
}

#[test]
fn apply_creates_everything_and_persists_state() {
    let home = TempDir::new().expect("home");
    let zms = MemoryZms::new();
    let m = manifest(
        vec![domain("sports", 12)],
        vec![role("sports", "readers", &["user.bob"], &[("env", &["prod"])])],
    );

    let report = apply_at(&zms, home.path(), &m).expect("apply");
    let verbs: Vec<&str> = report.applied.iter().map(|a| a.verb).collect();
    assert_eq!(verbs, ["create", "create"]);

    assert_eq!(zms.member_names("sports", "admin"), ["user.alice"]);
    assert_eq!(zms.member_names("sports", "readers"), ["user.bob"]);

    let saved = state::load_at(home.path(), "prod").expect("load");
    assert!(saved.domain(&DomainName::from("sports")).is_some());
    assert_eq!(
        saved.role(&RoleId::new("sports", "readers")),
        Some(&role("sports", "readers", &["user.bob"], &[("env", &["prod"])]))
    );
}

#[test]
fn second_apply_issues_no_writes() {
    let home = TempDir::new().expect("home");
    let zms = MemoryZms::new();
    let m = manifest(
        vec![domain("sports", 12)],
        vec![role("sports", "readers", &["user.bob"], &[("env", &["prod"])])],
    );
    apply_at(&zms, home.path(), &m).expect("first apply");
    zms.clear_calls();

    let report = apply_at(&zms, home.path(), &m).expect("second apply");
    assert!(report.applied.is_empty());
    assert!(zms.writes().is_empty(), "writes: {:?}", zms.writes());
}

#[test]
fn membership_change_removes_before_adding() {
    let home = TempDir::new().expect("home");
    let zms = MemoryZms::new();
    let before = manifest(
        vec![domain("sports", 12)],
        vec![role("sports", "readers", &["user.alice", "user.bob"], &[])],
    );
    apply_at(&zms, home.path(), &before).expect("first apply");
    zms.clear_calls();

    let after = manifest(
        vec![domain("sports", 12)],
        vec![role("sports", "readers", &["user.bob", "user.carol"], &[])],
    );
    let report = apply_at(&zms, home.path(), &after).expect("second apply");

    let writes = zms.writes();
    assert_eq!(writes.len(), 2, "bob must be left alone: {writes:?}");
    assert!(matches!(&writes[0], Call::DeleteMembership { member, audit_ref, .. }
        if member == "user.alice" && audit_ref == "TICKET-7"));
    assert!(matches!(&writes[1], Call::PutMembership { member, .. } if member == "user.carol"));

    let changes = report.applied[0].changes.as_ref().expect("role changes");
    assert_eq!(changes.writes(), 2);
}

#[test]
fn tag_change_is_one_whole_role_write() {
    let home = TempDir::new().expect("home");
    let zms = MemoryZms::new();
    let before = manifest(
        vec![domain("sports", 12)],
        vec![role("sports", "readers", &["user.bob"], &[("env", &["prod"])])],
    );
    apply_at(&zms, home.path(), &before).expect("first apply");
    zms.clear_calls();

    let after = manifest(
        vec![domain("sports", 12)],
        vec![role(
            "sports",
            "readers",
            &["user.bob"],
            &[("env", &["staging"]), ("owner", &["team-x"])],
        )],
    );
    apply_at(&zms, home.path(), &after).expect("second apply");

    let writes = zms.writes();
    assert_eq!(writes.len(), 1);
    let Call::PutRole { body, .. } = &writes[0] else {
        panic!("expected a whole-role write, got {:?}", writes[0]);
    };
    let keys: Vec<&str> = body.tags.keys().map(String::as_str).collect();
    assert_eq!(keys, ["env", "owner"]);
    assert_eq!(body.tags["env"].list, ["staging"]);
}

#[test]
fn out_of_band_deletion_is_dropped_and_recreated() {
    let home = TempDir::new().expect("home");
    let zms = MemoryZms::new();
    let m = manifest(
        vec![domain("sports", 12)],
        vec![role("sports", "readers", &["user.bob"], &[])],
    );
    apply_at(&zms, home.path(), &m).expect("first apply");
    zms.forget_role("sports", "readers");

    let (plan, refresh) = plan_at(&zms, home.path(), &m).expect("plan");
    assert_eq!(refresh.dropped, ["sports:role.readers"]);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.actions[0].verb(), "create");

    apply_at(&zms, home.path(), &m).expect("second apply");
    assert_eq!(zms.member_names("sports", "readers"), ["user.bob"]);
}

#[test]
fn existing_untracked_role_is_rejected_until_imported() {
    let home = TempDir::new().expect("home");
    let zms = MemoryZms::new();
    zms.seed_domain("weather", 1, &["user.alice"]);
    zms.seed_role("weather", "readers", &["user.zed"], &[]);
    zms.clear_calls();

    let m = manifest(
        vec![],
        vec![role("weather", "readers", &["user.bob"], &[])],
    );
    let err = apply_at(&zms, home.path(), &m).unwrap_err();
    assert!(matches!(err, ReconcileError::AlreadyExists { .. }), "got: {err}");
    assert!(zms.writes().is_empty());

    pipeline::import_role(&zms, home.path(), "prod", "weather:role.readers", "TICKET-7")
        .expect("import");
    apply_at(&zms, home.path(), &m).expect("apply after import");
    assert_eq!(zms.member_names("weather", "readers"), ["user.bob"]);
}

#[test]
fn changed_domain_is_replaced_with_its_roles() {
    let home = TempDir::new().expect("home");
    let zms = MemoryZms::new();
    let roles = vec![role("sports", "readers", &["user.bob"], &[])];
    apply_at(&zms, home.path(), &manifest(vec![domain("sports", 12)], roles.clone()))
        .expect("first apply");
    zms.clear_calls();

    apply_at(&zms, home.path(), &manifest(vec![domain("sports", 99)], roles))
        .expect("second apply");

    let writes = zms.writes();
    assert!(matches!(&writes[0], Call::DeleteTopLevelDomain { .. }));
    assert!(matches!(&writes[1], Call::PostTopLevelDomain { .. }));
    assert!(matches!(&writes[2], Call::PutRole { .. }));
    assert_eq!(zms.domain("sports").and_then(|d| d.ypm_id), Some(99));
}

#[test]
fn failure_stops_the_run_and_keeps_completed_work_in_state() {
    let home = TempDir::new().expect("home");
    let zms = MemoryZms::new();
    zms.inject(
        |c| matches!(c, Call::PutRole { role, .. } if role == "writers"),
        Fault::Status {
            code: 403,
            message: "principal not authorized".into(),
        },
    );
    let m = manifest(
        vec![domain("sports", 12)],
        vec![
            role("sports", "readers", &["user.bob"], &[]),
            role("sports", "writers", &["user.carol"], &[]),
        ],
    );

    let err = apply_at(&zms, home.path(), &m).unwrap_err();
    assert!(err.to_string().contains("principal not authorized"), "got: {err}");

    let saved = state::load_at(home.path(), "prod").expect("load");
    assert!(saved.role(&RoleId::new("sports", "readers")).is_some());
    assert!(saved.role(&RoleId::new("sports", "writers")).is_none());
}

#[test]
fn ambiguous_create_is_reported() {
    let home = TempDir::new().expect("home");
    let zms = MemoryZms::new();
    zms.inject(
        |c| matches!(c, Call::PostTopLevelDomain { .. }),
        Fault::EmptyBody,
    );
    let err = apply_at(&zms, home.path(), &manifest(vec![domain("sports", 12)], vec![]))
        .unwrap_err();
    assert!(matches!(err, ReconcileError::AmbiguousResult { .. }), "got: {err}");
}

#[test]
fn destroy_removes_everything_tracked() {
    let home = TempDir::new().expect("home");
    let zms = MemoryZms::new();
    zms.seed_domain("weather", 1, &["user.alice"]);
    let m = manifest(
        vec![domain("sports", 12)],
        vec![
            role("sports", "readers", &["user.bob"], &[]),
            role("weather", "readers", &["user.bob"], &[]),
        ],
    );
    apply_at(&zms, home.path(), &m).expect("apply");
    zms.clear_calls();

    let report = destroy_at(&zms, home.path(), "prod").expect("destroy");
    let addresses: Vec<&str> = report.applied.iter().map(|a| a.address.as_str()).collect();
    assert_eq!(addresses, ["weather:role.readers", "sports"]);
    assert!(zms.domain("sports").is_none());
    assert!(zms.role("weather", "readers").is_none());
    assert!(zms.domain("weather").is_some(), "untracked domain stays");
    assert!(state::load_at(home.path(), "prod").expect("load").is_empty());
}

#[test]
fn missing_admin_role_fails_without_replacing_the_domain() {
    let home = TempDir::new().expect("home");
    let zms = MemoryZms::new();
    let m = manifest(vec![domain("sports", 12)], vec![]);
    apply_at(&zms, home.path(), &m).expect("first apply");
    zms.forget_role("sports", "admin");
    zms.clear_calls();

    let err = apply_at(&zms, home.path(), &m).unwrap_err();
    assert!(
        matches!(&err, ReconcileError::Client { call: "get admin role", .. }),
        "got: {err}"
    );
    assert!(zms.writes().is_empty(), "got: {:?}", zms.writes());
    assert!(zms.domain("sports").is_some());
    let saved = state::load_at(home.path(), "prod").expect("load");
    assert!(saved.domain(&DomainName::from("sports")).is_some());
}

#[test]
fn role_kept_under_a_dropped_domain_stops_before_any_write() {
    let home = TempDir::new().expect("home");
    let zms = MemoryZms::new();
    let roles = vec![role("sports", "readers", &["user.bob"], &[])];
    apply_at(&zms, home.path(), &manifest(vec![domain("sports", 12)], roles.clone()))
        .expect("first apply");
    zms.clear_calls();

    let err = apply_at(&zms, home.path(), &manifest(vec![], roles)).unwrap_err();
    assert!(
        matches!(err, ReconcileError::RoleUnderDeletedDomain { .. }),
        "got: {err}"
    );
    assert!(err.to_string().contains("keep the domain in the manifest"), "got: {err}");
    assert!(zms.writes().is_empty());
    assert_eq!(zms.member_names("sports", "readers"), ["user.bob"]);
}
