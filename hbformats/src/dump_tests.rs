use crate::test_support;
use crate::{JsonDump, ModuleTable, MotionDatabase, ObjectSet, TextureSet};
use serde_json::Value;

#[test]
fn motion_database_dump_has_sets_and_bones() {
    let db = MotionDatabase::from_slice(&test_support::motion_db_blob()).unwrap();
    let json: Value = serde_json::from_str(&db.to_json(false).unwrap()).unwrap();

    assert_eq!(json["motion_sets"][0]["name"], "PV001");
    assert_eq!(json["motion_sets"][0]["motions"][1]["id"], 1201);
    assert_eq!(json["bone_names"][1], "kg_ya_ex");
}

#[test]
fn texture_payloads_are_left_out_of_dumps() {
    let set = TextureSet::from_slice(&test_support::texture_set_blob()).unwrap();
    let json: Value = serde_json::from_str(&set.to_json(true).unwrap()).unwrap();

    let mipmap = &json["textures"][0]["mipmaps"][0];
    assert_eq!(mipmap["width"], 2);
    assert_eq!(mipmap["format"], "Rgba8");
    assert!(mipmap.get("data").is_none());
}

#[test]
fn object_set_dump_omits_lookup_index() {
    let set = ObjectSet::from_slice(&test_support::object_set_blob(5, 0)).unwrap();
    let json: Value = serde_json::from_str(&set.to_json(false).unwrap()).unwrap();

    assert!(json.get("object_index_by_name").is_none());
    assert_eq!(json["objects"][0]["name"], "STGTST001_OBJ");
    assert_eq!(json["objects"][0]["meshes"][0]["submeshes"][0]["primitive"], "TriangleStrip");
}

#[test]
fn dump_json_writes_pretty_file() {
    let table = ModuleTable::parse("module.0.id=12\nmodule.0.chara=LUKA\n", None).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("modules.json");

    table.dump_json(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains('\n'));
    let json: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["modules"]["12"]["chara"], "Luka");
}

#[test]
fn dump_json_reports_io_errors() {
    let table = ModuleTable::default();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("modules.json");

    assert!(matches!(table.dump_json(&path), Err(crate::Error::Io(_))));
}
