use garmentkit_core::{ImageRef, MemoryAssetStore, PartId};
use garmentkit_designer::{
    DesignSession, DrawingMode, ImageOutcome, LayerKind, ObjectKind, Placement,
};

use crate::common::{png_bytes, session};

fn store_with(image: &str, rgba: [u8; 4]) -> (MemoryAssetStore, ImageRef) {
    let store = MemoryAssetStore::new();
    let image = ImageRef::new(image);
    store.insert(image.clone(), png_bytes(8, 8, rgba));
    (store, image)
}

#[tokio::test]
async fn test_logo_lands_on_part_captured_at_apply() {
    let (store, logo) = store_with("logo.png", [0, 0, 255, 255]);
    let mut s = session();
    let body = PartId::new("body");
    let collar = PartId::new("collar");

    s.set_mode(DrawingMode::LogoInsert);
    let pending = s.begin_logo(logo.clone()).unwrap();
    s.select_part(&collar).unwrap();

    let load = pending.fetch(&store).await;
    let outcome = s.complete_image(load).unwrap();
    let ImageOutcome::Inserted { part, element, .. } = outcome else {
        panic!("expected an insert, got {:?}", outcome);
    };
    assert_eq!(part, body);
    let element = element.unwrap();
    assert_eq!(s.state().logo(element).unwrap().part, Some(body.clone()));
    assert_eq!(s.state().logo(element).unwrap().z_index, 300);
    assert_eq!(s.engine(&body).unwrap().objects().len(), 1);
    assert!(s.objects().is_empty());
    assert_eq!(s.mode(), DrawingMode::Select);
}

#[tokio::test]
async fn test_load_after_model_switch_is_discarded() {
    let (store, logo) = store_with("logo.png", [0, 0, 255, 255]);
    let mut s = session();
    s.set_mode(DrawingMode::LogoInsert);
    let pending = s.begin_logo(logo).unwrap();

    s.select_model("hoodie").unwrap();
    let load = pending.fetch(&store).await;
    assert_eq!(s.complete_image(load).unwrap(), ImageOutcome::Discarded);
    assert!(s.state().logo_elements().is_empty());
    assert!(s.objects().is_empty());
    assert!(s.images().is_empty());
}

#[tokio::test]
async fn test_failed_fetch_changes_nothing() {
    let store = MemoryAssetStore::new();
    let mut s = session();
    s.set_mode(DrawingMode::LogoInsert);
    let history = s.active_engine().unwrap().history().len();

    let result = s
        .insert_logo_from(&store, ImageRef::new("missing.png"))
        .await;
    assert!(result.is_err());
    assert!(s.state().logo_elements().is_empty());
    assert_eq!(s.active_engine().unwrap().history().len(), history);
    assert_eq!(s.mode(), DrawingMode::LogoInsert);
}

#[tokio::test]
async fn test_fill_texture_becomes_base_layer() {
    let (store, fabric) = store_with("fabric.png", [255, 0, 0, 255]);
    let mut s = session();
    let body = PartId::new("body");

    let outcome = s.set_fill_texture(&store, fabric.clone()).await.unwrap();
    assert_eq!(outcome, ImageOutcome::FillTextureSet { part: body.clone() });
    assert_eq!(s.state().fill_texture(&body), Some(&fabric));
    assert!(s.objects()[0].is_base_layer());

    let pixel = s.texture(&body).unwrap().image.get_pixel(32, 32).0;
    assert!(pixel[0] > 250 && pixel[1] < 5 && pixel[2] < 5);

    s.clear_fill_texture(&body).unwrap();
    assert!(s.objects().is_empty());
    assert_eq!(s.state().fill_texture(&body), None);
}

/// The base layer drawn on `part` and the fill texture recorded for it
fn fill_views(s: &DesignSession, part: &PartId) -> (Option<ImageRef>, Option<ImageRef>) {
    let drawn = s
        .engine(part)
        .unwrap()
        .surface()
        .base_layer()
        .and_then(|base| match &base.kind {
            ObjectKind::BaseLayer { image } => Some(image.clone()),
            _ => None,
        });
    (drawn, s.state().fill_texture(part).cloned())
}

fn texture_layers(s: &DesignSession) -> usize {
    s.layers()
        .iter()
        .filter(|layer| layer.kind() == LayerKind::Texture)
        .count()
}

#[tokio::test]
async fn test_fill_texture_follows_undo_and_redo() {
    let (store, fabric) = store_with("fabric.png", [255, 0, 0, 255]);
    let mut s = session();
    let body = PartId::new("body");

    s.set_fill_texture(&store, fabric.clone()).await.unwrap();
    assert_eq!(fill_views(&s, &body), (Some(fabric.clone()), Some(fabric.clone())));

    assert!(s.undo());
    assert_eq!(fill_views(&s, &body), (None, None));
    assert_eq!(texture_layers(&s), 0);

    assert!(s.redo());
    assert_eq!(fill_views(&s, &body), (Some(fabric.clone()), Some(fabric.clone())));
    assert_eq!(texture_layers(&s), 1);

    s.clear_fill_texture(&body).unwrap();
    assert_eq!(fill_views(&s, &body), (None, None));
    assert!(s.undo());
    assert_eq!(fill_views(&s, &body), (Some(fabric.clone()), Some(fabric)));
}

#[tokio::test]
async fn test_image_insert_uses_requested_placement() {
    let (store, photo) = store_with("photo.png", [0, 255, 0, 255]);
    let mut s = session();
    let placement = Placement::new(4.0, 4.0, 16.0, 16.0);

    let outcome = s
        .insert_image(&store, photo.clone(), Some(placement))
        .await
        .unwrap();
    let ImageOutcome::Inserted { object, element, .. } = outcome else {
        panic!("expected an insert");
    };
    assert!(element.is_none());
    let inserted = s.objects().iter().find(|o| o.id == object).unwrap();
    assert_eq!(inserted.placement, placement);
    assert!(matches!(&inserted.kind, ObjectKind::Image(data) if data.image == photo));
    assert!(s.images().contains(&photo));
}

#[tokio::test]
async fn test_preload_decodes_referenced_images() {
    let (store, fabric) = store_with("fabric.png", [9, 9, 9, 255]);
    let mut s = session();
    s.set_fill_texture(&store, fabric.clone()).await.unwrap();
    let file = s.save(&garmentkit_core::SessionContext::anonymous());

    let mut restored = session();
    restored.load(&file).unwrap();
    assert!(!restored.images().contains(&fabric));

    let failures = restored.preload_images(&store).await;
    assert!(failures.is_empty());
    assert!(restored.images().contains(&fabric));
}
