use garmentkit_core::{ElementId, ImageRef, ModelCatalog, PartId};
use garmentkit_designer::{
    apply_reorder, build_layers, DesignSession, DesignState, DrawingMode, LayerId, LayerKind,
    ReorderOp, TextStyle,
};
use garmentkit_settings::LayerSettings;
use proptest::prelude::*;
use std::collections::HashSet;

use crate::common::session;

fn state() -> DesignState {
    let model = ModelCatalog::builtin().get("tshirt").unwrap().clone();
    DesignState::new(model, LayerSettings::default()).unwrap()
}

fn op_strategy() -> impl Strategy<Value = ReorderOp> {
    prop_oneof![
        Just(ReorderOp::MoveForward),
        Just(ReorderOp::MoveBackward),
        Just(ReorderOp::BringToFront),
        Just(ReorderOp::SendToBack),
    ]
}

proptest! {
    #[test]
    fn prop_reorders_keep_text_z_indices_unique(
        count in 1usize..6,
        ops in prop::collection::vec((0usize..6, op_strategy()), 1..16),
    ) {
        let mut state = state();
        let ids: Vec<_> = (0..count)
            .map(|i| state.add_text(format!("T{}", i), TextStyle::default(), [0.0; 3]))
            .collect();
        let logo = state.add_logo(ImageRef::new("logo.png"), [0.0; 3]);
        let logo_z = state.logo(logo).unwrap().z_index;

        for (index, op) in ops {
            apply_reorder(&mut state, &LayerId::Text(ids[index % ids.len()]), op);
        }

        let z: HashSet<i64> = state.text_elements().iter().map(|e| e.z_index).collect();
        prop_assert_eq!(z.len(), count);
        prop_assert_eq!(state.logo(logo).unwrap().z_index, logo_z);
    }
}

#[test]
fn test_layer_list_is_sorted_descending() {
    let mut state = state();
    let text = state.add_text("A", TextStyle::default(), [0.0; 3]);
    let logo = state.add_logo(ImageRef::new("logo.png"), [0.0; 3]);
    state
        .set_fill_texture(&PartId::new("body"), Some(ImageRef::new("denim.png")))
        .unwrap();

    let layers = build_layers(&state);
    let z: Vec<i64> = layers.iter().map(|l| l.z_index).collect();
    let mut sorted = z.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(z, sorted);
    assert_eq!(layers[0].id, LayerId::Logo(logo));
    assert_eq!(layers[1].id, LayerId::Text(text));
    assert_eq!(
        layers
            .iter()
            .filter(|l| l.id.kind() == LayerKind::Texture)
            .count(),
        1
    );
}

#[test]
fn test_move_forward_at_top_is_noop() {
    let mut state = state();
    let a = state.add_text("A", TextStyle::default(), [0.0; 3]);
    let b = state.add_text("B", TextStyle::default(), [0.0; 3]);
    assert!(apply_reorder(&mut state, &LayerId::Text(b), ReorderOp::MoveForward).is_none());

    let plan = apply_reorder(&mut state, &LayerId::Text(a), ReorderOp::MoveForward).unwrap();
    assert_eq!(plan.from, 200);
    assert_eq!(plan.to, 201);
    assert_eq!(state.text(b).unwrap().z_index, 200);
}

#[test]
fn test_duplicate_sits_above_source() {
    let mut s = session();
    let source = s.add_text("A", TextStyle::default(), [0.1, 0.2, 0.0]);
    let copy = s.duplicate_element(source).unwrap();
    let original = s.state().text(source).unwrap();
    let duplicate = s.state().text(copy).unwrap();
    assert_eq!(duplicate.z_index, original.z_index + 1);
    assert_eq!(duplicate.part, None);
    assert_ne!(duplicate.position, original.position);
}

#[test]
fn test_hidden_layer_keeps_z_index() {
    let mut s = session();
    let id = s.add_text("A", TextStyle::default(), [0.0; 3]);
    s.set_layer_visible(&LayerId::Text(id), false).unwrap();
    let element = s.state().text(id).unwrap();
    assert!(!element.visible);
    assert_eq!(element.z_index, 200);

    s.set_layer_locked(&LayerId::Color(PartId::new("body")), true)
        .unwrap();
    let layer = s
        .layers()
        .into_iter()
        .find(|l| l.id == LayerId::Color(PartId::new("body")))
        .unwrap();
    assert!(layer.locked);
    assert!(s
        .set_layer_visible(&LayerId::Color(PartId::new("cape")), false)
        .is_err());
}

fn text_z(s: &DesignSession, id: ElementId) -> i64 {
    s.state().text(id).unwrap().z_index
}

#[test]
fn test_undo_on_one_part_ties_until_next_reorder() {
    let mut s = session();
    s.set_mode(DrawingMode::TextInsert);
    let front = s.apply_text("FRONT", TextStyle::default()).unwrap();
    s.select_part(&PartId::new("collar")).unwrap();
    s.set_mode(DrawingMode::TextInsert);
    let neck = s.apply_text("NECK", TextStyle::default()).unwrap();
    let (front_z, neck_z) = (text_z(&s, front), text_z(&s, neck));
    assert!(front_z < neck_z);

    // The swap snapshots both parts; undo on the collar restores only its element.
    s.reorder_layer(&LayerId::Text(front), ReorderOp::MoveForward)
        .unwrap()
        .unwrap();
    assert_eq!((text_z(&s, front), text_z(&s, neck)), (neck_z, front_z));
    assert!(s.undo());
    assert_eq!(text_z(&s, front), text_z(&s, neck));

    // The next reorder of the type renumbers the tie.
    s.reorder_layer(&LayerId::Text(front), ReorderOp::MoveBackward)
        .unwrap();
    assert_ne!(text_z(&s, front), text_z(&s, neck));
}
