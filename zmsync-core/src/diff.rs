//! Set difference used to converge membership and tag collections.
//!
//! `remove = old - new`, `add = new - old`. Comparison is by key only; the
//! element carried in the result is the one from the side it was taken from
//! (removals from `old`, additions from `new`).

use std::collections::BTreeSet;

use crate::types::{Member, MemberName, TagValues, Tags};

/// Elements to drop and elements to introduce to turn `old` into `new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<T> {
    pub remove: Vec<T>,
    pub add: Vec<T>,
}

impl<T> SetDiff<T> {
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty()
    }
}

impl<T> Default for SetDiff<T> {
    fn default() -> Self {
        Self {
            remove: Vec::new(),
            add: Vec::new(),
        }
    }
}

/// Diff two sets of directly comparable elements. Results are in set order.
pub fn diff<T: Ord + Clone>(old: &BTreeSet<T>, new: &BTreeSet<T>) -> SetDiff<T> {
    SetDiff {
        remove: old.difference(new).cloned().collect(),
        add: new.difference(old).cloned().collect(),
    }
}

/// Diff two collections whose elements are identified by `key`.
///
/// Duplicate keys within one side collapse to their first occurrence.
/// Input order is preserved in each output list.
pub fn diff_by_key<T, K, F>(old: &[T], new: &[T], key: F) -> SetDiff<T>
where
    T: Clone,
    K: Ord,
    F: Fn(&T) -> K,
{
    let old_keys: BTreeSet<K> = old.iter().map(&key).collect();
    let new_keys: BTreeSet<K> = new.iter().map(&key).collect();

    SetDiff {
        remove: only_in(old, &new_keys, &key),
        add: only_in(new, &old_keys, &key),
    }
}

fn only_in<T, K, F>(side: &[T], other_keys: &BTreeSet<K>, key: &F) -> Vec<T>
where
    T: Clone,
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut seen = BTreeSet::new();
    side.iter()
        .filter(|item| {
            let k = key(*item);
            !other_keys.contains(&k) && seen.insert(k)
        })
        .cloned()
        .collect()
}

/// Membership diff keyed by member identity; expiration is ignored.
pub fn diff_members(old: &[Member], new: &[Member]) -> SetDiff<Member> {
    diff_by_key(old, new, |m: &Member| m.name.clone())
}

/// Tag diff keyed by the full `(key, values)` pair.
///
/// A key whose values changed shows up in both `remove` and `add`.
pub fn diff_tags(old: &Tags, new: &Tags) -> SetDiff<(String, TagValues)> {
    let old: BTreeSet<(String, TagValues)> =
        old.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    let new: BTreeSet<(String, TagValues)> =
        new.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    diff(&old, &new)
}

/// Names only, for reporting.
pub fn member_names(members: &[Member]) -> Vec<MemberName> {
    members.iter().map(|m| m.name.clone()).collect()
}
