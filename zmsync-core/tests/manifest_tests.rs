//! Manifest load error-message, validation, and environment override tests.

use assert_fs::prelude::*;
use zmsync_core::{
    manifest::{self, ENV_PRINCIPAL_TOKEN, ENV_ZMS_URL},
    CoreError, DomainName, MemberName, RoleId, TagValues,
};

const FULL: &str = r#"
workspace: sports-prod
zms:
  url: https://zms.example.com:4443/zms/v1
  timeout_secs: 10
audit_ref: TICKET-42
domains:
  - name: sports
    admin_users: [user.alice, user.bob]
    ypm_id: 12
roles:
  - domain: sports
    name: readers
    members:
      - user.bob
      - name: user.carol
        expiration: 2030-01-01T00:00:00Z
    tags:
      env: prod
      owners: [team-b, team-a]
  - domain: sports
    name: writers
"#;

fn no_env(_: &str) -> Option<String> {
    None
}

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_manifest_returns_not_found() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let err = manifest::load_with_env(&dir.path().join("zmsync.yaml"), no_env).unwrap_err();
    assert!(matches!(err, CoreError::ManifestNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("manifest not found"));
    assert!(err.to_string().contains("zmsync.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("zmsync.yaml");
    file.write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = manifest::load_with_env(file.path(), no_env).unwrap_err();
    assert!(matches!(err, CoreError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("zmsync.yaml"), "must contain file path, got: {err}");
}

#[test]
fn unknown_field_is_a_parse_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("zmsync.yaml");
    file.write_str("workspace: w\nzms: { url: http://x }\ngroups: []\n")
        .expect("write");

    let err = manifest::load_with_env(file.path(), no_env).unwrap_err();
    assert!(matches!(err, CoreError::Parse { .. }), "got: {err}");
}

#[test]
fn misspelled_member_key_is_a_parse_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("zmsync.yaml");
    file.write_str(&FULL.replace("expiration: 2030", "expiry: 2030"))
        .expect("write");

    let err = manifest::load_with_env(file.path(), no_env).unwrap_err();
    assert!(matches!(err, CoreError::Parse { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Resolution
// ---------------------------------------------------------------------------

#[test]
fn full_manifest_resolves_typed_records() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("zmsync.yaml");
    file.write_str(FULL).expect("write");

    let m = manifest::load_with_env(file.path(), no_env).expect("load");
    assert_eq!(m.zms.timeout_secs, 10);

    let sports = m.domain(&DomainName::from("sports")).expect("domain");
    assert_eq!(sports.ypm_id, 12);
    assert!(sports.admin_users.contains(&MemberName::from("user.alice")));
    assert_eq!(sports.audit_ref, "TICKET-42");

    let readers = m.role(&RoleId::new("sports", "readers")).expect("role");
    assert_eq!(readers.members.len(), 2);
    assert!(readers.members[1].expiration.is_some());
    assert_eq!(readers.tags["owners"], TagValues::new(["team-a", "team-b"]));

    let writers = m.role(&RoleId::new("sports", "writers")).expect("role");
    assert!(writers.members.is_empty());
    assert!(writers.tags.is_empty());
}

#[test]
fn duplicate_role_is_invalid() {
    let yaml = "workspace: w\nzms: { url: http://x }\nroles:\n  - { domain: d, name: r }\n  - { domain: d, name: r }\n";
    let err = manifest::parse(std::path::Path::new("m.yaml"), yaml).unwrap_err();
    assert!(matches!(err, CoreError::Invalid { .. }), "got: {err}");
    assert!(err.to_string().contains("duplicate role 'd:role.r'"));
}

#[test]
fn duplicate_member_is_invalid() {
    let yaml = "workspace: w\nzms: { url: http://x }\nroles:\n  - { domain: d, name: r, members: [user.a, user.a] }\n";
    let err = manifest::parse(std::path::Path::new("m.yaml"), yaml).unwrap_err();
    assert!(err.to_string().contains("twice"), "got: {err}");
}

#[test]
fn domain_without_admins_is_invalid() {
    let yaml = "workspace: w\nzms: { url: http://x }\ndomains:\n  - { name: d, admin_users: [], ypm_id: 1 }\n";
    let err = manifest::parse(std::path::Path::new("m.yaml"), yaml).unwrap_err();
    assert!(err.to_string().contains("admin user"), "got: {err}");
}

#[test]
fn workspace_with_path_separator_is_invalid() {
    let yaml = "workspace: ../escape\nzms: { url: http://x }\n";
    let err = manifest::parse(std::path::Path::new("m.yaml"), yaml).unwrap_err();
    assert!(matches!(err, CoreError::Invalid { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 3. Environment overrides
// ---------------------------------------------------------------------------

#[test]
fn env_overrides_apply_on_load() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("zmsync.yaml");
    file.write_str(FULL).expect("write");

    let m = manifest::load_with_env(file.path(), |key| match key {
        ENV_ZMS_URL => Some("https://other:4443/zms/v1".into()),
        ENV_PRINCIPAL_TOKEN => Some("token".into()),
        _ => None,
    })
    .expect("load");
    assert_eq!(m.zms.url, "https://other:4443/zms/v1");
    assert_eq!(m.zms.principal_token.as_deref(), Some("token"));
}

#[test]
fn empty_url_without_override_is_invalid() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("zmsync.yaml");
    file.write_str("workspace: w\nzms: { url: '' }\n").expect("write");

    let err = manifest::load_with_env(file.path(), no_env).unwrap_err();
    assert!(err.to_string().contains("zms.url"), "got: {err}");

    let m = manifest::load_with_env(file.path(), |key| {
        (key == ENV_ZMS_URL).then(|| "http://from-env".to_string())
    })
    .expect("env supplies url");
    assert_eq!(m.zms.url, "http://from-env");
}
