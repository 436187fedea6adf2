//! Export to the normalized format and import back

use dual_layout::export::{ExportMap, ASSETS_DIR, LAYOUT_FILE};
use dual_layout::{
    AssetTransformPatch, ContainerPosition, ContainerPositionPatch, Editor, ImportError,
    LayoutArchive, NormalizedRect, Orientation, Reference,
};
use pretty_assertions::assert_eq;

const EPSILON: f64 = 1e-6;

fn assert_rect_close(a: &NormalizedRect, b: &NormalizedRect, path: &str) {
    for (x, y) in [(a.x, b.x), (a.y, b.y), (a.width, b.width), (a.height, b.height)] {
        assert!((x - y).abs() < EPSILON, "{}: {:?} != {:?}", path, a, b);
    }
}

fn assert_maps_close(a: &ExportMap, b: &ExportMap, path: &str) {
    assert_eq!(a.keys().collect::<Vec<_>>(), b.keys().collect::<Vec<_>>(), "{}", path);
    for (name, left) in a {
        let right = &b[name];
        let here = format!("{}/{}", path, name);
        assert_rect_close(&left.portrait, &right.portrait, &here);
        assert_rect_close(&left.landscape, &right.landscape, &here);
        assert_eq!(left.depth, right.depth);
        assert_eq!(left.locked, right.locked);
        assert_eq!(left.assets, right.assets);
        match (&left.children, &right.children) {
            (Some(l), Some(r)) => assert_maps_close(l, r, &here),
            (l, r) => assert_eq!(l.is_none(), r.is_none(), "{}", here),
        }
    }
}

fn sample_editor() -> Editor {
    let mut editor = Editor::default();
    let header = editor.add_container(None).unwrap();
    editor.rename_container(&header, "Header").unwrap();
    editor
        .update_container(
            &header,
            &ContainerPositionPatch::replace(ContainerPosition::new(195.0, 42.2, 390.0, 84.4)),
            Orientation::Portrait,
        )
        .unwrap();
    editor
        .update_container(
            &header,
            &ContainerPositionPatch::replace(ContainerPosition::new(422.0, 19.5, 844.0, 39.0)),
            Orientation::Landscape,
        )
        .unwrap();

    let logo_box = editor.add_container(Some(&header)).unwrap();
    editor.rename_container(&logo_box, "Logo box").unwrap();
    editor.move_container_by(&logo_box, -101.3, 3.7, Orientation::Portrait).unwrap();

    let logo = editor.add_asset(&logo_box).unwrap();
    let badge = editor.add_asset(&logo_box).unwrap();
    editor.update_asset_key(&logo_box, &logo, "logo").unwrap();
    editor
        .update_asset(
            &logo_box,
            &badge,
            &AssetTransformPatch::new()
                .with_reference(Reference::Asset(logo.clone()))
                .with_position(0.5, -0.5)
                .with_rotation(15.0),
            Orientation::Portrait,
        )
        .unwrap();

    let footer = editor.add_container(None).unwrap();
    editor.rename_container(&footer, "Header").unwrap();
    editor.toggle_container_lock(&footer).unwrap();
    editor
}

#[test]
fn test_round_trip_preserves_fractions() {
    let source = sample_editor();
    let exported = source.export_document();
    let archive = source.export_archive().unwrap();

    let mut target = Editor::default();
    target.import_archive(&archive).expect("archive should import");
    let reexported = target.export_document();

    assert_eq!(exported.device, reexported.device);
    let (a, b) = (exported.containers.unwrap(), reexported.containers.unwrap());
    assert_eq!(a.keys().collect::<Vec<_>>(), vec!["Header", "Header (2)"]);
    assert_maps_close(&a, &b, "");
}

#[test]
fn test_round_trip_through_json_text() {
    let source = sample_editor();
    let json = source.export_json().unwrap();

    let mut archive = LayoutArchive::new();
    archive.insert(LAYOUT_FILE, json.into_bytes());
    archive.insert_dir(ASSETS_DIR);

    let mut target = Editor::default();
    target.import_archive(&archive).unwrap();
    assert_eq!(target.state().containers.len(), 3);
    assert_eq!(target.state().asset_count(), 2);
    assert_maps_close(
        &source.export_document().containers.unwrap(),
        &target.export_document().containers.unwrap(),
        "",
    );
}

#[test]
fn test_rejected_import_leaves_editor_untouched() {
    let mut editor = sample_editor();
    let before = editor.state().clone();
    let entries = editor.history().len();

    let mut archive = LayoutArchive::new();
    archive.insert(LAYOUT_FILE, br#"{"device": "iphone-14"}"#.to_vec());
    archive.insert_dir(ASSETS_DIR);

    assert!(matches!(editor.import_archive(&archive), Err(ImportError::MissingContainers)));
    assert_eq!(editor.state(), &before);
    assert_eq!(editor.history().len(), entries);
}

#[test]
fn test_import_uses_selected_device() {
    let source = sample_editor();
    let archive = source.export_archive().unwrap();

    let mut target = Editor::default();
    target.set_device("ipad-air").unwrap();
    target.import_archive(&archive).unwrap();

    let header = target
        .state()
        .containers
        .values()
        .find(|c| c.name == "Header" && c.parent_id.is_none() && !c.is_locked)
        .unwrap();
    assert!((header.position.portrait.width - 820.0).abs() < EPSILON);
    assert!((header.position.landscape.width - 1180.0).abs() < EPSILON);
}

#[test]
fn test_json_error_report_points_into_layout() {
    let mut archive = LayoutArchive::new();
    let source = "{\n  \"containers\": {\n    \"Box\": 12,\n  }\n}";
    archive.insert(LAYOUT_FILE, source.as_bytes().to_vec());
    archive.insert_dir(ASSETS_DIR);

    let err = Editor::default().import_archive(&archive).unwrap_err();
    assert!(matches!(err, ImportError::Json { .. }));
    let report = err.format(source, LAYOUT_FILE);
    assert!(report.contains("layout.json"));
}
