//! Conversion between the ZMS wire model and local records.

use std::collections::BTreeMap;

use zmsync_client::model;
use zmsync_core::{Member, MemberName, Role, RoleId, TagValues, Tags, TopLevelDomain};

/// Local members to wire members.
pub fn expand_role_members(members: &[Member]) -> Vec<model::RoleMember> {
    members
        .iter()
        .map(|m| model::RoleMember {
            member_name: m.name.to_string(),
            expiration: m.expiration,
            ..Default::default()
        })
        .collect()
}

/// Wire members to local members, sorted by identity with duplicates dropped.
pub fn flatten_role_members(members: &[model::RoleMember]) -> Vec<Member> {
    let by_name: BTreeMap<MemberName, Member> = members
        .iter()
        .map(|m| {
            let name = MemberName::from(m.member_name.as_str());
            (
                name.clone(),
                Member {
                    name,
                    expiration: m.expiration,
                },
            )
        })
        .collect();
    by_name.into_values().collect()
}

pub fn expand_tags(tags: &Tags) -> BTreeMap<String, model::TagValueList> {
    tags.iter()
        .map(|(key, values)| {
            (
                key.clone(),
                model::TagValueList {
                    list: values.as_slice().to_vec(),
                },
            )
        })
        .collect()
}

pub fn flatten_tags(tags: &BTreeMap<String, model::TagValueList>) -> Tags {
    tags.iter()
        .map(|(key, values)| (key.clone(), TagValues::new(values.list.iter().cloned())))
        .collect()
}

/// Body for a single add-member call.
pub fn membership(id: &RoleId, member: &Member) -> model::Membership {
    model::Membership {
        member_name: member.name.to_string(),
        is_member: Some(true),
        role_name: Some(id.role.to_string()),
        expiration: member.expiration,
    }
}

/// Create-domain request for a desired top-level domain.
pub fn top_level_domain_detail(desired: &TopLevelDomain) -> model::TopLevelDomain {
    model::TopLevelDomain {
        name: desired.name.to_string(),
        admin_users: desired.admin_users.iter().map(ToString::to_string).collect(),
        ypm_id: Some(desired.ypm_id),
        ..Default::default()
    }
}

/// Whole-role body for a desired role.
pub fn role_body(desired: &Role) -> model::Role {
    model::Role {
        name: desired.id().to_string(),
        role_members: expand_role_members(&desired.members),
        tags: expand_tags(&desired.tags),
        ..Default::default()
    }
}

/// Local role record from a fetched wire role. `audit_ref` is local-only and
/// carried over from the caller.
pub fn role_from_remote(id: &RoleId, remote: &model::Role, audit_ref: &str) -> Role {
    Role {
        domain: id.domain.clone(),
        name: id.role.clone(),
        members: flatten_role_members(&remote.role_members),
        tags: flatten_tags(&remote.tags),
        audit_ref: audit_ref.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_sorts_and_dedups_members() {
        let wire = vec![
            model::RoleMember {
                member_name: "user.carol".into(),
                ..Default::default()
            },
            model::RoleMember {
                member_name: "user.bob".into(),
                ..Default::default()
            },
            model::RoleMember {
                member_name: "user.carol".into(),
                ..Default::default()
            },
        ];
        let names: Vec<String> = flatten_role_members(&wire)
            .into_iter()
            .map(|m| m.name.0)
            .collect();
        assert_eq!(names, ["user.bob", "user.carol"]);
    }

    #[test]
    fn tags_survive_expand_then_flatten() {
        let mut tags = Tags::new();
        tags.insert("owners".into(), TagValues::new(["team-b", "team-a"]));
        assert_eq!(flatten_tags(&expand_tags(&tags)), tags);
    }

    #[test]
    fn role_body_uses_composite_name() {
        let role = Role {
            domain: "sports".into(),
            name: "readers".into(),
            members: vec![Member::new("user.bob")],
            tags: Tags::new(),
            audit_ref: "ref".into(),
        };
        let body = role_body(&role);
        assert_eq!(body.name, "sports:role.readers");
        assert_eq!(body.role_members[0].member_name, "user.bob");
        assert!(body.tags.is_empty());
    }

    #[test]
    fn membership_carries_expiration() {
        let expiry = "2030-01-01T00:00:00Z".parse().expect("timestamp");
        let m = membership(
            &RoleId::new("sports", "readers"),
            &Member::expiring("user.carol", expiry),
        );
        assert_eq!(m.member_name, "user.carol");
        assert_eq!(m.role_name.as_deref(), Some("readers"));
        assert_eq!(m.expiration, Some(expiry));
    }
}
