use garmentkit_core::{Color, ImageRef, PartId};
use garmentkit_designer::{
    Point, ReorderOp, StrokeMode, StrokeStyle, SurfaceBlob, SurfaceCommand, SurfaceEngine,
    SurfaceState, TextStyle,
};
use proptest::prelude::*;

use crate::common::small_config;

fn engine() -> SurfaceEngine {
    SurfaceEngine::new(PartId::new("body"), &small_config())
}

fn draw(engine: &mut SurfaceEngine, x: f64, y: f64) {
    engine
        .apply_command(SurfaceCommand::BeginStroke {
            point: Point::new(x, y),
            style: StrokeStyle {
                mode: StrokeMode::Paint,
                color: Color::BLACK,
                width: 3.0,
            },
        })
        .unwrap();
    engine
        .apply_command(SurfaceCommand::ExtendStroke(Point::new(x + 4.0, y + 2.0)))
        .unwrap();
    let outcome = engine.apply_command(SurfaceCommand::EndStroke).unwrap();
    assert!(outcome.committed);
}

fn op_strategy() -> impl Strategy<Value = ReorderOp> {
    prop_oneof![
        Just(ReorderOp::MoveForward),
        Just(ReorderOp::MoveBackward),
        Just(ReorderOp::BringToFront),
        Just(ReorderOp::SendToBack),
    ]
}

#[derive(Debug, Clone)]
enum Action {
    Stroke(f64, f64),
    Text(f64, f64),
    Image(u32, u32),
    Base(bool),
    Reorder(usize, ReorderOp),
    Visible(usize, bool),
    Locked(usize, bool),
    Rotate(usize, f64, f64),
    Remove(usize),
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0.0f64..50.0, 0.0f64..50.0).prop_map(|(x, y)| Action::Stroke(x, y)),
        (5.0f64..60.0, 5.0f64..60.0).prop_map(|(x, y)| Action::Text(x, y)),
        (1u32..300, 1u32..300).prop_map(|(w, h)| Action::Image(w, h)),
        any::<bool>().prop_map(Action::Base),
        (0usize..8, op_strategy()).prop_map(|(i, op)| Action::Reorder(i, op)),
        (0usize..8, any::<bool>()).prop_map(|(i, v)| Action::Visible(i, v)),
        (0usize..8, any::<bool>()).prop_map(|(i, v)| Action::Locked(i, v)),
        (0usize..8, -80.0f64..80.0, -80.0f64..80.0).prop_map(|(i, x, y)| Action::Rotate(i, x, y)),
        (0usize..8).prop_map(Action::Remove),
    ]
}

/// Run one action; index-based actions pick among the user objects
fn perform(engine: &mut SurfaceEngine, action: Action) {
    let ids: Vec<_> = engine
        .objects()
        .iter()
        .filter(|o| !o.is_base_layer())
        .map(|o| o.id)
        .collect();
    let pick = |i: usize| (!ids.is_empty()).then(|| ids[i % ids.len()]);

    let commands = match action {
        Action::Stroke(x, y) => {
            draw(engine, x, y);
            Vec::new()
        }
        Action::Text(x, y) => vec![SurfaceCommand::InsertText {
            text: "GO".to_string(),
            style: TextStyle::default(),
            at: Point::new(x, y),
            overlay: None,
        }],
        Action::Image(natural_width, natural_height) => vec![SurfaceCommand::InsertImage {
            image: ImageRef::new("photo.png"),
            natural_width,
            natural_height,
            placement: None,
            overlay: None,
        }],
        Action::Base(on) => vec![SurfaceCommand::SetBaseLayer(
            on.then(|| ImageRef::new("fabric.png")),
        )],
        Action::Reorder(i, op) => pick(i)
            .map(|object| vec![SurfaceCommand::Reorder { object, op }])
            .unwrap_or_default(),
        Action::Visible(i, visible) => pick(i)
            .map(|object| vec![SurfaceCommand::SetVisible { object, visible }])
            .unwrap_or_default(),
        Action::Locked(i, locked) => pick(i)
            .map(|object| vec![SurfaceCommand::SetLocked { object, locked }])
            .unwrap_or_default(),
        Action::Rotate(i, x, y) => pick(i)
            .map(|object| {
                vec![
                    SurfaceCommand::Rotate {
                        object,
                        pointer: Point::new(32.0 + x, 32.0 + y),
                    },
                    SurfaceCommand::Release,
                ]
            })
            .unwrap_or_default(),
        Action::Remove(i) => pick(i)
            .map(|object| vec![SurfaceCommand::RemoveObject(object)])
            .unwrap_or_default(),
    };
    for command in commands {
        engine.apply_command(command).unwrap();
    }
}

proptest! {
    #[test]
    fn prop_reachable_surfaces_survive_serialization(
        actions in prop::collection::vec(action_strategy(), 1..16),
    ) {
        let mut engine = engine();
        for action in actions {
            perform(&mut engine, action);
        }
        let surface = engine.surface();

        let restored = SurfaceState::deserialize(&surface.serialize()).unwrap();
        prop_assert_eq!(&restored, surface);

        // Through JSON text as well, the way design files are stored.
        let text = serde_json::to_string(surface.serialize().as_value()).unwrap();
        let blob = SurfaceBlob::from_value(serde_json::from_str(&text).unwrap());
        prop_assert_eq!(&SurfaceState::deserialize(&blob).unwrap(), surface);
    }

    #[test]
    fn prop_undo_then_redo_restores_snapshot(
        points in prop::collection::vec((0.0f64..50.0, 0.0f64..50.0), 1..8),
        steps in 1usize..8,
    ) {
        let mut engine = engine();
        for (x, y) in &points {
            draw(&mut engine, *x, *y);
        }
        let before = engine.snapshot();
        let steps = steps.min(points.len());

        for _ in 0..steps {
            prop_assert!(engine.undo().unwrap().is_ok());
        }
        prop_assert_eq!(engine.objects().len(), points.len() - steps);
        for _ in 0..steps {
            prop_assert!(engine.redo().unwrap().is_ok());
        }
        prop_assert_eq!(engine.snapshot(), before);
        prop_assert!(engine.redo().is_none());
    }

    #[test]
    fn prop_commit_after_undo_drops_redo_branch(
        strokes in 2usize..6,
        undos in 1usize..4,
    ) {
        let mut engine = engine();
        for i in 0..strokes {
            draw(&mut engine, i as f64 * 5.0, 10.0);
        }
        let undos = undos.min(strokes);
        for _ in 0..undos {
            engine.undo();
        }
        draw(&mut engine, 40.0, 40.0);

        let history = engine.history();
        prop_assert_eq!(history.cursor(), history.len() - 1);
        prop_assert_eq!(history.len(), strokes - undos + 2);
        prop_assert!(!history.can_redo());
    }

    #[test]
    fn prop_base_layer_stays_first(
        count in 1usize..6,
        ops in prop::collection::vec((0usize..6, op_strategy()), 0..12),
    ) {
        let mut engine = engine();
        for i in 0..count {
            draw(&mut engine, i as f64 * 6.0, 5.0);
        }
        engine
            .apply_command(SurfaceCommand::SetBaseLayer(Some(ImageRef::new("fabric.png"))))
            .unwrap();
        let ids: Vec<_> = engine.objects().iter().map(|o| o.id).collect();

        for (index, op) in ops {
            let object = ids[index % ids.len()];
            engine
                .apply_command(SurfaceCommand::Reorder { object, op })
                .unwrap();
        }

        prop_assert!(engine.objects()[0].is_base_layer());
        prop_assert_eq!(engine.objects().iter().filter(|o| o.is_base_layer()).count(), 1);
        prop_assert_eq!(engine.objects().len(), count + 1);
    }
}
