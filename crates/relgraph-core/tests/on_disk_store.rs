//! File-backed store behavior: persistence across connections, config
//! driven store location, and duplicate rejection from a second writer.

use relgraph_core::config::{PROJECT_DIR, load_project_config};
use relgraph_core::db::objects::{get_object, insert_object};
use relgraph_core::db::{open_store, open_store_with_timeout};
use relgraph_core::relationship::{self, NewRelationship};
use relgraph_core::{Actor, GraphError, Object, Stub, TypeRegistry};
use std::time::Duration;

#[test]
fn edges_survive_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(PROJECT_DIR).join("relgraph.db");
    let registry = TypeRegistry::builtin();
    let actor = Actor::internal(1);

    let rel_id = {
        let conn = open_store(&path).expect("open store");
        let control = insert_object(&conn, &registry, &Object::new("Control", 1, "c")).expect("insert");
        let issue = insert_object(&conn, &registry, &Object::new("Issue", 2, "i")).expect("insert");
        relationship::create(&conn, &registry, &actor, NewRelationship::between(&control, &issue))
            .expect("create")
            .id
    };

    let conn = open_store(&path).expect("reopen store");
    let rel = relationship::get(&conn, rel_id).expect("get").expect("edge persisted");
    assert_eq!(rel.display_name(), "Control:1 <-> Issue:2");
    assert!(get_object(&conn, &Stub::new("Issue", 2)).expect("get").is_some());
}

#[test]
fn second_connection_sees_conflict() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("graph.sqlite3");
    let registry = TypeRegistry::builtin();
    let actor = Actor::internal(1);

    let first = open_store(&path).expect("open first");
    let second = open_store_with_timeout(&path, Duration::from_millis(500)).expect("open second");

    let control = insert_object(&first, &registry, &Object::new("Control", 1, "c")).expect("insert");
    let issue = insert_object(&first, &registry, &Object::new("Issue", 2, "i")).expect("insert");

    relationship::create(&first, &registry, &actor, NewRelationship::between(&control, &issue))
        .expect("first writer");
    let err = relationship::create(
        &second,
        &registry,
        &actor,
        NewRelationship::between(&control, &issue),
    )
    .expect_err("second writer");
    assert!(matches!(err, GraphError::Conflict(_)), "got {err:?}");
}

#[test]
fn project_config_selects_store_path() {
    let root = tempfile::tempdir().expect("temp dir");
    let dir = root.path().join(PROJECT_DIR);
    std::fs::create_dir_all(&dir).expect("create project dir");
    std::fs::write(dir.join("config.toml"), "[store]\npath = \"custom.db\"\n").expect("write config");

    let cfg = load_project_config(root.path()).expect("load config");
    let path = cfg.store_path(root.path());
    assert_eq!(path, dir.join("custom.db"));

    open_store(&path).expect("open configured store");
    assert!(path.exists());
}
