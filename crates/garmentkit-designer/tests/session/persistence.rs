use garmentkit_core::{
    Color, DesignFileError, ImageRef, MemoryAssetStore, PartId, SessionContext, UserId,
};
use garmentkit_designer::{
    DesignFile, DesignStore, DrawingMode, LayerId, Point, ReorderOp, SurfaceBlob, TextStyle,
};

use crate::common::{png_bytes, session, stroke};

fn alice() -> SessionContext {
    SessionContext::for_user(UserId::new("alice")).with_display_name("Alice")
}

#[test]
fn test_store_round_trip_restores_design_and_history() {
    let dir = tempfile::tempdir().unwrap();
    let store = DesignStore::new(dir.path());
    let body = PartId::new("body");

    let mut s = session();
    s.set_part_color(&body, Color::rgb(200, 10, 10)).unwrap();
    stroke(&mut s, Point::new(2.0, 2.0), Point::new(30.0, 30.0));
    s.set_mode(DrawingMode::TextInsert);
    let text = s.apply_text("TEAM", TextStyle::default()).unwrap();
    s.select_part(&PartId::new("collar")).unwrap();
    stroke(&mut s, Point::new(1.0, 1.0), Point::new(9.0, 9.0));
    let path = s.save_to_store(&store, &alice(), "jersey").unwrap();
    assert!(path.exists());

    let mut restored = session();
    restored.load_from_store(&store, &alice(), "jersey").unwrap();
    assert_eq!(restored.state().color(&body), Color::rgb(200, 10, 10));
    assert_eq!(restored.state().text(text).unwrap().text, "TEAM");
    assert_eq!(restored.active_part(), &PartId::new("body"));
    assert_eq!(restored.objects().len(), 2);
    assert_eq!(
        restored.engine(&PartId::new("collar")).unwrap().objects().len(),
        1
    );

    // Histories survive: undoing the text insert drops the element again.
    assert!(restored.undo());
    assert!(restored.state().text(text).is_none());
    assert_eq!(restored.objects().len(), 1);

    let texture = restored.texture(&body).unwrap();
    assert_eq!(texture.image.dimensions(), (64, 64));
}

#[tokio::test]
async fn test_saved_file_reproduces_elements_materials_and_surfaces() {
    let store = MemoryAssetStore::new();
    let fabric = ImageRef::new("fabric.png");
    store.insert(fabric.clone(), png_bytes(4, 4, [20, 40, 60, 255]));
    let body = PartId::new("body");
    let collar = PartId::new("collar");

    let mut s = session();
    s.set_part_color(&collar, Color::rgb(1, 2, 3)).unwrap();
    s.set_fill_texture(&store, fabric.clone()).await.unwrap();
    stroke(&mut s, Point::new(3.0, 5.0), Point::new(41.0, 17.0));

    s.set_mode(DrawingMode::TextInsert);
    let title = s.apply_text("TEAM", TextStyle::default()).unwrap();
    s.set_layer_visible(&LayerId::Text(title), false).unwrap();
    let loose = s.add_text("No. 9", TextStyle::default(), [0.1, 0.2, 0.0]);
    s.set_element_locked(loose, true).unwrap();

    let logo = s.add_logo(ImageRef::new("crest.png"), [0.0, 0.3, 0.0]);
    s.add_logo(ImageRef::new("badge.png"), [0.0, -0.3, 0.0]);
    s.reorder_layer(&LayerId::Logo(logo), ReorderOp::BringToFront)
        .unwrap();
    s.set_element_visible(logo, false).unwrap();
    s.set_element_locked(logo, true).unwrap();

    s.select_part(&collar).unwrap();
    stroke(&mut s, Point::new(1.0, 1.0), Point::new(9.0, 13.0));

    let saved = s.state().logo(logo).unwrap().clone();
    assert_ne!(saved.z_index, 300);
    assert!(!saved.visible && saved.locked);

    let json = s.save(&alice()).to_json_pretty().unwrap();
    let mut restored = session();
    restored.load(&DesignFile::from_json(&json).unwrap()).unwrap();

    assert_eq!(restored.state().text_elements(), s.state().text_elements());
    assert_eq!(restored.state().logo_elements(), s.state().logo_elements());
    assert_eq!(restored.state().colors(), s.state().colors());
    assert_eq!(restored.state().fill_textures(), s.state().fill_textures());
    assert_eq!(restored.state().fill_texture(&body), Some(&fabric));
    for part in [&body, &collar] {
        assert_eq!(
            restored.engine(part).unwrap().surface(),
            s.engine(part).unwrap().surface(),
            "surface of {}",
            part
        );
    }
}

#[test]
fn test_saved_json_uses_camel_case_keys() {
    let mut s = session();
    stroke(&mut s, Point::new(2.0, 2.0), Point::new(30.0, 30.0));
    let json = s.save(&alice()).to_json_pretty().unwrap();
    for key in ["\"canvasData\"", "\"canvasHistory\"", "\"historyIndex\"", "\"backgroundColor\""] {
        assert!(json.contains(key), "missing {}", key);
    }
    let file = DesignFile::from_json(&json).unwrap();
    assert_eq!(file.meta.unwrap().author.as_deref(), Some("Alice"));
}

#[test]
fn test_failed_load_leaves_live_design_untouched() {
    let mut s = session();
    let body = PartId::new("body");
    stroke(&mut s, Point::new(2.0, 2.0), Point::new(30.0, 30.0));
    let mut file = s.save(&alice());

    stroke(&mut s, Point::new(30.0, 2.0), Point::new(2.0, 30.0));
    let epoch = s.arena().epoch();
    let history = s.active_engine().unwrap().history().len();

    file.canvas_history
        .canvas_history
        .get_mut(&body)
        .unwrap()[0] = SurfaceBlob::from_value(serde_json::json!("not a surface"));
    let err = s.load(&file).unwrap_err();
    assert!(matches!(err, DesignFileError::Surface { .. }));

    assert_eq!(s.objects().len(), 2);
    assert_eq!(s.arena().epoch(), epoch);
    assert_eq!(s.active_engine().unwrap().history().len(), history);

    file.model = "cape".to_string();
    assert!(s.load(&file).is_err());
    assert_eq!(s.state().model().name, "tshirt");
}

#[test]
fn test_anonymous_save_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = DesignStore::new(dir.path());
    let s = session();
    let err = s
        .save_to_store(&store, &SessionContext::anonymous(), "mine")
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<DesignFileError>(),
        Some(&DesignFileError::Unauthenticated)
    );
}
