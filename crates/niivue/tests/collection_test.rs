//! Collection management tests: bulk load, lookup, frontend-initiated adds
//! and snapshot isolation.

use std::rc::Rc;

use proptest::prelude::*;
use serde_json::json;

use niivue::*;

fn viewer() -> (NiiVue, Rc<MessageLog>) {
    let log = Rc::new(MessageLog::new());
    let nv = NiiVue::new(log.clone());
    (nv, log)
}

fn with_id(id: &str) -> VolumeFields {
    VolumeFields::default().with_id(id)
}

fn volume_ids(nv: &NiiVue) -> Vec<String> {
    nv.volumes().iter().map(Volume::id).collect()
}

fn frontend_add(nv: &NiiVue, event: &str, data: serde_json::Value) -> Result<()> {
    nv.handle_custom_message(CustomMessage::new(event, data))
}

#[test]
fn test_lookup_by_id() {
    let (nv, _) = viewer();
    nv.load_volumes([with_id("a"), with_id("b"), with_id("c")])
        .unwrap();

    assert_eq!(nv.get_volume_index_by_id("b"), Some(1));
    assert_eq!(nv.get_volume_index_by_id("z"), None);
    assert_eq!(nv.get_volume_index_by_id(""), None);
}

#[test]
fn test_lookup_returns_first_match_and_empty_id_matches_unset() {
    let (nv, _) = viewer();
    nv.load_volumes([with_id("a"), VolumeFields::default(), with_id("a")])
        .unwrap();
    assert_eq!(nv.get_volume_index_by_id("a"), Some(0));
    assert_eq!(nv.get_volume_index_by_id(""), Some(1));
}

#[test]
fn test_load_replaces_collection() {
    let (nv, _) = viewer();
    nv.load_volumes([with_id("a"), with_id("b")]).unwrap();
    let old = nv.volumes();

    nv.load_volumes([with_id("c")]).unwrap();
    assert_eq!(volume_ids(&nv), vec!["c"]);
    assert!(!old[0].same_entity(&nv.volumes()[0]));
}

#[test]
fn test_failed_load_leaves_collection_unchanged() {
    let (nv, _) = viewer();
    nv.load_volumes([with_id("a")]).unwrap();

    let result = nv.load_volumes([
        with_id("b"),
        VolumeFields::from_path(DataSource::file("/no/such/volume.nii")),
    ]);
    assert!(matches!(result, Err(NiivueError::IoError(_))));
    assert_eq!(volume_ids(&nv), vec!["a"]);
}

#[test]
fn test_frontend_add_at_index() {
    let (nv, _) = viewer();
    nv.load_volumes([with_id("v0"), with_id("v1")]).unwrap();

    frontend_add(&nv, "add_volume", json!({"id": "v2", "index": 1})).unwrap();
    assert_eq!(volume_ids(&nv), vec!["v0", "v2", "v1"]);
}

#[test]
fn test_frontend_add_out_of_range_or_missing_index_appends() {
    for data in [
        json!({"id": "v2", "index": 5}),
        json!({"id": "v2", "index": -1}),
        json!({"id": "v2"}),
    ] {
        let (nv, _) = viewer();
        nv.load_volumes([with_id("v0"), with_id("v1")]).unwrap();
        frontend_add(&nv, "add_volume", data).unwrap();
        assert_eq!(volume_ids(&nv), vec!["v0", "v1", "v2"]);
    }
}

#[test]
fn test_frontend_add_at_end_index() {
    let (nv, _) = viewer();
    nv.load_volumes([with_id("v0"), with_id("v1")]).unwrap();
    frontend_add(&nv, "add_volume", json!({"id": "v2", "index": 2})).unwrap();
    assert_eq!(volume_ids(&nv), vec!["v0", "v1", "v2"]);
}

#[test]
fn test_frontend_add_mesh() {
    let (nv, log) = viewer();
    nv.load_meshes([MeshFields::default().with_id("m0")]).unwrap();
    log.take();

    frontend_add(
        &nv,
        "add_mesh",
        json!({"id": "m1", "path": "brain.mz3", "rgba255": [255, 0, 0, 255], "index": 0}),
    )
    .unwrap();

    let meshes = nv.meshes();
    assert_eq!(meshes[0].id(), "m1");
    assert_eq!(meshes[0].rgba255(), [255, 0, 0, 255]);
    assert_eq!(nv.get_mesh_index_by_id("m0"), Some(1));

    // open frame for the mirror, then the reordered mesh list
    let frames = log.take();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].kind(), "open");
    assert_eq!(frames[1].kind(), "update");
}

#[test]
fn test_frontend_add_never_reaches_callbacks() {
    let (nv, _) = viewer();
    let hits = Rc::new(std::cell::Cell::new(0));
    let counter = Rc::clone(&hits);
    nv.on_volume_updated(move || counter.set(counter.get() + 1));

    frontend_add(&nv, "add_volume", json!({"id": "x"})).unwrap();
    assert_eq!(hits.get(), 0);
    assert_eq!(nv.volumes().len(), 1);
}

#[test]
fn test_frontend_add_with_bad_fields_is_rejected() {
    let (nv, _) = viewer();
    assert!(frontend_add(&nv, "add_volume", json!({"opacity": "opaque"})).is_err());
    assert!(frontend_add(&nv, "add_mesh", json!("not a mapping")).is_err());
    assert!(nv.volumes().is_empty());
    assert!(nv.meshes().is_empty());
}

#[test]
fn test_snapshot_isolation() {
    let (nv, _) = viewer();
    nv.load_volumes([with_id("a")]).unwrap();

    let snapshot = nv.volumes();
    nv.add_volume(with_id("b")).unwrap();

    assert_eq!(snapshot.len(), 1);
    assert_eq!(nv.volumes().len(), 2);
}

#[test]
fn test_snapshot_entities_are_live() {
    let (nv, _) = viewer();
    nv.load_volumes([with_id("a")]).unwrap();
    let snapshot = nv.volumes();
    snapshot[0].set_opacity(0.4);
    assert_eq!(nv.volumes()[0].opacity(), 0.4);
}

proptest! {
    #[test]
    fn prop_insert_position(len in 0usize..8, index in proptest::option::of(-3i64..12)) {
        let (nv, _) = viewer();
        let ids: Vec<String> = (0..len).map(|i| format!("v{i}")).collect();
        nv.load_volumes(ids.iter().map(|id| with_id(id))).unwrap();

        let mut data = json!({"id": "new"});
        if let Some(index) = index {
            data["index"] = json!(index);
        }
        frontend_add(&nv, "add_volume", data).unwrap();

        let expected = match index {
            Some(i) if i >= 0 && (i as usize) <= len => i as usize,
            _ => len,
        };
        prop_assert_eq!(nv.get_volume_index_by_id("new"), Some(expected));
        prop_assert_eq!(nv.volumes().len(), len + 1);

        let others: Vec<String> = volume_ids(&nv).into_iter().filter(|id| id != "new").collect();
        prop_assert_eq!(others, ids);
    }

    #[test]
    fn prop_id_is_write_once(first in "[a-z]{1,6}", second in "[a-z]{1,6}") {
        let (nv, _) = viewer();
        let volume = nv.add_volume(VolumeFields::default()).unwrap();

        prop_assert!(volume.set_id(first.clone()).is_ok());
        prop_assert!(volume.set_id(first.clone()).is_ok());
        let result = volume.set_id(second.clone());
        prop_assert_eq!(result.is_ok(), first == second);
        prop_assert_eq!(volume.id(), first);
    }

    #[test]
    fn prop_mesh_path_is_write_once(first in "[a-z]{1,6}\\.mz3", second in "[a-z]{1,6}\\.mz3") {
        let (nv, _) = viewer();
        let mesh = nv.add_mesh(MeshFields::default()).unwrap();

        prop_assert!(mesh.set_path(first.as_str()).is_ok());
        let result = mesh.set_path(second.as_str());
        prop_assert_eq!(result.is_ok(), first == second);
        prop_assert_eq!(mesh.path(), Some(DataSource::url(first)));
    }
}
