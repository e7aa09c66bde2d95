//! Integration property tests for audit-scope.
//!
//! These tests validate the diff and row-scoping invariants over arbitrary
//! inputs using property-based testing.

use std::collections::BTreeMap;
use std::sync::Arc;

use audit_scope::tracker::diff_snapshots;
use audit_scope::{
    AccessScope, Actor, ActorId, Entity, GroupPolicy, MemoryStore, Policy, RequestContext,
    ScopedRepository, Snapshot,
};
use proptest::prelude::*;
use serde::Serialize;
use serde_json::Value;

const EXCLUDED: [&str; 4] = ["id", "created_at", "updated_at", "owner"];

fn excluded() -> Vec<String> {
    EXCLUDED.iter().map(|s| s.to_string()).collect()
}

// Strategy: field names, sometimes colliding with excluded ones
fn arb_field() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => prop::string::string_regex("[a-z]{1,6}").unwrap(),
        1 => prop::sample::select(EXCLUDED.to_vec()).prop_map(str::to_string),
    ]
}

// Strategy: scalar JSON values
fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (-1000i64..1000).prop_map(Value::from),
        prop::string::string_regex("[a-z0-9]{0,5}").unwrap().prop_map(Value::from),
    ]
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, Serialize)]
struct Row {
    id: Option<String>,
    owner: Option<ActorId>,
}

impl Entity for Row {
    const TYPE_NAME: &'static str = "Row";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn owner(&self) -> Option<&ActorId> {
        self.owner.as_ref()
    }

    fn set_owner(&mut self, owner: Option<ActorId>) {
        self.owner = owner;
    }

    fn label(&self) -> String {
        String::new()
    }
}

proptest! {
    /// Property: the diff holds exactly the non-excluded fields whose text differs
    #[test]
    fn proptest_diff_reports_exactly_the_differing_fields(
        before in prop::collection::btree_map(arb_field(), arb_value(), 0..8),
        edits in prop::collection::btree_map(arb_field(), arb_value(), 0..8),
    ) {
        let mut after = before.clone();
        after.extend(edits);

        let b: Snapshot = before.clone().into_iter().collect();
        let a: Snapshot = after.clone().into_iter().collect();
        let changes = diff_snapshots(&b, &a, &excluded());

        let expected: BTreeMap<String, (Option<String>, Option<String>)> = before
            .iter()
            .filter(|(field, _)| !EXCLUDED.contains(&field.as_str()))
            .filter_map(|(field, old)| {
                let old = as_text(old);
                let new = after.get(field).and_then(as_text);
                (old != new).then(|| (field.clone(), (old, new)))
            })
            .collect();

        prop_assert_eq!(changes.len(), expected.len());
        for (field, (old, new)) in &expected {
            let change = &changes[field];
            prop_assert_eq!(change.before(), old.as_deref());
            prop_assert_eq!(change.after(), new.as_deref());
        }
        for field in EXCLUDED {
            prop_assert!(!changes.contains_key(field));
        }
    }

    /// Property: a snapshot never differs from itself
    #[test]
    fn proptest_identical_snapshots_never_differ(
        fields in prop::collection::btree_map(arb_field(), arb_value(), 0..8),
    ) {
        let s: Snapshot = fields.into_iter().collect();
        prop_assert!(diff_snapshots(&s, &s.clone(), &[]).is_empty());
    }

    /// Property: non-admins list exactly their own rows, admins list all
    #[test]
    fn proptest_list_is_scoped_to_owner(
        owners in prop::collection::vec(0usize..4, 0..20),
        viewer in 0usize..4,
    ) {
        let repo = ScopedRepository::new(Arc::new(MemoryStore::<Row>::new()));
        let actor = |n: usize| Actor::new(format!("u{n}"), format!("user{n}"));

        for &owner in &owners {
            RequestContext::new(Some(actor(owner)))
                .sync_scope(|| repo.create(Row { id: None, owner: None }))
                .unwrap();
        }

        let listed = RequestContext::new(Some(actor(viewer)))
            .sync_scope(|| repo.list())
            .unwrap();
        let own = owners.iter().filter(|&&o| o == viewer).count();
        prop_assert_eq!(listed.len(), own);
        let viewer_id = ActorId::new(format!("u{viewer}"));
        prop_assert!(listed.iter().all(|r| r.owner() == Some(&viewer_id)));

        let admin = actor(viewer).with_capability(AccessScope::default().admin_capability());
        let all = RequestContext::new(Some(admin))
            .sync_scope(|| repo.list())
            .unwrap();
        prop_assert_eq!(all.len(), owners.len());
    }

    /// Property: a group policy admits exactly holders of a listed capability
    #[test]
    fn proptest_group_policy_admits_holders(
        required in prop::collection::btree_set("[a-d]", 1..3),
        held in prop::collection::btree_set("[a-d]", 0..4),
    ) {
        let policy = GroupPolicy::any_of(required.iter().cloned());
        let actor = held
            .iter()
            .fold(Actor::new("u1", "alice"), |a, cap| a.with_capability(cap.clone()));

        let expected = required.iter().any(|cap| held.contains(cap));
        prop_assert_eq!(policy.allow(Some(&actor)), expected);
        prop_assert!(!policy.allow(None));
    }
}
