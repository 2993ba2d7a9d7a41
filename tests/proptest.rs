mod common;

use proptest::prelude::*;
use serde_json::{Value, json};

use trellis::{Atom, AtomStore, ErrorKind, Options, RecursionGuard};

fn bare() -> Options {
    Options {
        include_meta_data: false,
        include_nav_ifcs: false,
        ..Options::default()
    }
}

/// Property test strategies for generating test data
pub mod strategies {
    use super::*;
    use proptest::collection::{btree_set, vec};
    use proptest::string::string_regex;

    /// Atom identifiers that are valid path segments
    pub fn atom_id_strategy() -> impl Strategy<Value = String> {
        string_regex(r"[a-z][a-z0-9_]{0,11}").unwrap()
    }

    /// Distinct tag values in a stable order
    pub fn tags_strategy() -> impl Strategy<Value = Vec<String>> {
        btree_set(string_regex(r"[a-z]{1,6}").unwrap(), 0..6)
            .prop_map(|tags| tags.into_iter().collect())
    }

    /// Role sets that never include the administrator role
    pub fn roles_strategy() -> impl Strategy<Value = Vec<String>> {
        vec(string_regex(r"[A-Z][a-z]{2,8}").unwrap(), 0..4).prop_map(|roles| {
            roles
                .into_iter()
                .filter(|r| r != "Administrator")
                .collect()
        })
    }

    /// Patch entries that are valid against the People interface
    pub fn valid_patch_strategy() -> impl Strategy<Value = Value> {
        prop_oneof![
            string_regex(r"[a-z]{1,6}")
                .unwrap()
                .prop_map(|t| json!({"op": "add", "path": "Tags", "value": t})),
            string_regex(r"[A-Z][a-z]{1,6}")
                .unwrap()
                .prop_map(|n| json!({"op": "replace", "path": "Name", "value": n})),
            any::<bool>().prop_map(|b| json!({"op": "replace", "path": "Active", "value": b})),
        ]
    }
}

use strategies::*;

proptest! {
    #[test]
    fn identity_steps_keep_parent_path(id in atom_id_strategy()) {
        let ctx = common::context(&[]);
        let entry = ctx.resource("Person", &id).unwrap();
        let me = entry.walk_path_to_resource("People").unwrap();
        let details = entry.walk_path_to_resource("People/Details").unwrap();
        let expected = format!("resource/Person/{}", id);
        prop_assert_eq!(me.path(), expected.as_str());
        prop_assert_eq!(details.path(), expected.as_str());
        prop_assert_eq!(details.id(), id.as_str());
    }

    #[test]
    fn cardinality_follows_univalence(tags in tags_strategy(), name in proptest::option::of("[A-Z][a-z]{0,8}")) {
        let ctx = common::context(&[]);
        let me = ctx
            .resource("Person", "p2")
            .unwrap()
            .walk_path_to_resource("People")
            .unwrap();

        let tag_list = me.all("Tags").unwrap();
        tag_list.put(&json!(tags)).unwrap();
        let got = tag_list.get(&bare(), None, &RecursionGuard::new()).unwrap();
        prop_assert_eq!(got, json!(tags));

        let name_list = me.all("Name").unwrap();
        let value = name.clone().map(Value::String).unwrap_or(Value::Null);
        name_list.put(&value).unwrap();
        let got = name_list.get(&bare(), None, &RecursionGuard::new()).unwrap();
        prop_assert_eq!(got, value);
    }

    #[test]
    fn property_round_trip(steps in proptest::collection::vec(any::<bool>(), 1..8)) {
        let ctx = common::context(&[]);
        let me = ctx
            .resource("Person", "p1")
            .unwrap()
            .walk_path_to_resource("People")
            .unwrap();
        let active = ctx.model().relation("active[Person*Person]").unwrap();
        for step in steps {
            let list = me.all("Active").unwrap();
            list.set(&Value::Bool(step)).unwrap();
            let got = list.get(&bare(), None, &RecursionGuard::new()).unwrap();
            prop_assert_eq!(got, Value::Bool(step));
            let linked = ctx.store().targets(active, "p1", false).unwrap() == vec!["p1".to_string()];
            prop_assert_eq!(linked, step);
        }
    }

    #[test]
    fn put_null_changes_nothing(patches in proptest::collection::vec(valid_patch_strategy(), 0..5)) {
        let ctx = common::context(&[]);
        let me = ctx
            .resource("Person", "p1")
            .unwrap()
            .walk_path_to_resource("People")
            .unwrap();
        me.patch(&Value::Array(patches)).unwrap();
        let before = me.get(&bare(), None, &RecursionGuard::new()).unwrap();
        me.put(Some(&Value::Null)).unwrap();
        let after = me.get(&bare(), None, &RecursionGuard::new()).unwrap();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn access_denial_precedes_crud(roles in roles_strategy()) {
        let role_refs: Vec<&str> = roles.iter().map(String::as_str).collect();
        let ctx = common::context(&role_refs);
        let entry = ctx.resource("Person", "p1").unwrap();
        let err = entry.walk_path("Admin").unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::Unauthorized);
        let err = entry
            .walk_path("Admin/Name")
            .unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn post_creates_and_links(count in 1usize..5) {
        let ctx = common::context(&[]);
        let me = ctx
            .resource("Person", "p1")
            .unwrap()
            .walk_path_to_resource("People")
            .unwrap();
        let mut created = Vec::new();
        for _ in 0..count {
            let project = me.all("Projects").unwrap().post(&json!({})).unwrap();
            prop_assert!(ctx.store().exists(project.atom()).unwrap());
            created.push(project.id().to_string());
        }
        let ids = me.get_list("Projects", &bare(), Some(0)).unwrap();
        let ids: Vec<String> = serde_json::from_value(ids).unwrap();
        prop_assert_eq!(ids.len(), 2 + count);
        for id in created {
            prop_assert!(ids.contains(&id));
        }
    }

    #[test]
    fn remove_by_value_matches_remove_by_path(extra in tags_strategy(), pick in any::<prop::sample::Index>()) {
        let mut projects = vec!["prj1".to_string(), "prj2".to_string()];
        projects.extend(extra.iter().map(|t| format!("x{}", t)));
        let victim = projects[pick.index(projects.len())].clone();

        let run = |patch: Value| -> Value {
            let ctx = common::context(&[]);
            let entry = ctx.resource("Person", "p1").unwrap();
            let adds: Vec<Value> = extra
                .iter()
                .map(|t| json!({"op": "add", "path": "People/Projects", "value": format!("x{}", t)}))
                .collect();
            entry.patch(&Value::Array(adds)).unwrap();
            entry.patch(&json!([patch])).unwrap();
            entry
                .walk_path_to_resource("People")
                .unwrap()
                .get_list("Projects", &bare(), Some(0))
                .unwrap()
        };

        let by_value = run(json!({"op": "remove", "path": "People/Projects", "value": victim}));
        let by_path = run(json!({"op": "remove", "path": format!("People/Projects/{}", victim)}));
        prop_assert_eq!(&by_value, &by_path);
        let remaining: Vec<String> = serde_json::from_value(by_value).unwrap();
        prop_assert_eq!(remaining.len(), projects.len() - 1);
        prop_assert!(!remaining.contains(&victim));
    }

    #[test]
    fn malformed_patch_names_its_index(prefix in proptest::collection::vec(valid_patch_strategy(), 0..4), op in prop_oneof![Just("replace"), Just("add")]) {
        let ctx = common::context(&[]);
        let me = ctx
            .resource("Person", "p1")
            .unwrap()
            .walk_path_to_resource("People")
            .unwrap();
        let index = prefix.len();
        let mut patches = prefix;
        patches.push(json!({"op": op, "path": "Tags"}));
        let err = me.patch(&Value::Array(patches)).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::BadRequest);
        let expected = format!("#{}", index);
        prop_assert!(err.message().contains(&expected));
    }
}

#[test]
fn materialized_root_is_a_person() {
    let ctx = common::context(&[]);
    ctx.resource("Person", "fresh")
        .unwrap()
        .walk_path("People")
        .unwrap();
    assert!(ctx.store().exists(&Atom::new("fresh", "Person")).unwrap());
}
