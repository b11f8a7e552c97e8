use garmentkit_core::{Color, DesignEvent, EventFilter, HistoryEvent, PartId};
use garmentkit_designer::{
    DrawingMode, LayerId, ObjectKind, Point, ReorderOp, SurfaceCommand, TextStyle, TextUpdate,
};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::common::{session, stroke};

#[test]
fn test_hello_bring_to_front_then_undo_twice() {
    let mut s = session();
    s.set_mode(DrawingMode::TextInsert);
    let style = TextStyle {
        font_size: 24.0,
        color: Color::BLACK,
        ..TextStyle::default()
    };

    let id = s.apply_text("HELLO", style).unwrap();
    assert_eq!(s.active_engine().unwrap().history().len(), 2);
    assert_eq!(s.state().text_elements().len(), 1);
    let inserted = s.state().text(id).unwrap().clone();
    assert_eq!(inserted.z_index, 200);

    let plan = s
        .reorder_layer(&LayerId::Text(id), ReorderOp::BringToFront)
        .unwrap()
        .unwrap();
    assert_eq!(plan.to, 220);
    let moved = s.state().text(id).unwrap();
    assert!(moved.z_index > 200);
    assert!((moved.position[2] - inserted.position[2] - 0.1).abs() < 1e-9);

    assert!(s.undo());
    assert_eq!(s.state().text(id).unwrap().z_index, 200);
    assert!(s.undo());
    assert!(s.state().text_elements().is_empty());
    assert!(s.objects().is_empty());
    assert!(!s.undo());
}

#[test]
fn test_two_strokes_then_clear() {
    let mut s = session();
    stroke(&mut s, Point::new(5.0, 5.0), Point::new(40.0, 40.0));
    stroke(&mut s, Point::new(40.0, 5.0), Point::new(5.0, 40.0));
    assert_eq!(s.objects().len(), 2);
    let before = s.active_engine().unwrap().history().len();

    s.clear().unwrap();
    assert!(s.objects().is_empty());
    assert_eq!(s.active_engine().unwrap().history().len(), before + 1);
}

#[test]
fn test_each_commit_pushes_one_history_event() {
    let mut s = session();
    let pushes = Arc::new(AtomicUsize::new(0));
    let counter = pushes.clone();
    s.bus().subscribe(EventFilter::All, move |event| {
        if matches!(event, DesignEvent::History(HistoryEvent::Pushed { .. })) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    stroke(&mut s, Point::new(1.0, 1.0), Point::new(30.0, 30.0));
    assert_eq!(pushes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_part_switch_aborts_stroke_and_keeps_histories_apart() {
    let mut s = session();
    let body = PartId::new("body");
    let collar = PartId::new("collar");
    stroke(&mut s, Point::new(5.0, 5.0), Point::new(20.0, 20.0));

    s.pointer_down(Point::new(1.0, 1.0)).unwrap();
    s.pointer_move(Point::new(9.0, 9.0)).unwrap();
    s.select_part(&collar).unwrap();
    assert!(s.objects().is_empty());
    assert!(!s.engine(&body).unwrap().is_busy());
    assert_eq!(s.engine(&body).unwrap().objects().len(), 1);

    stroke(&mut s, Point::new(5.0, 5.0), Point::new(20.0, 20.0));
    assert!(s.undo());
    assert!(s.objects().is_empty());
    assert_eq!(s.engine(&body).unwrap().objects().len(), 1);
}

#[test]
fn test_eraser_paints_the_part_color() {
    let mut s = session();
    let body = PartId::new("body");
    s.set_part_color(&body, Color::rgb(10, 200, 30)).unwrap();
    stroke(&mut s, Point::new(0.0, 32.0), Point::new(63.0, 32.0));

    s.set_mode(DrawingMode::Eraser);
    s.pointer_down(Point::new(0.0, 32.0)).unwrap();
    s.pointer_up(Point::new(63.0, 32.0)).unwrap();

    let erase = s.objects().last().unwrap();
    match &erase.kind {
        ObjectKind::Stroke(data) => assert_eq!(data.style.color, Color::rgb(10, 200, 30)),
        other => panic!("expected a stroke, got {}", other.name()),
    }
    let texture = s.texture(&body).unwrap();
    assert_eq!(texture.image.get_pixel(32, 31).0, [10, 200, 30, 255]);
}

#[test]
fn test_select_drag_moves_text_and_commits_once() {
    let mut s = session();
    s.set_mode(DrawingMode::TextInsert);
    s.apply_text("HI", TextStyle::default()).unwrap();
    let object = s.selected_object().unwrap().clone();
    let center = object.placement.center();
    let len = s.active_engine().unwrap().history().len();

    s.pointer_down(center).unwrap();
    s.pointer_move(Point::new(center.x + 3.0, center.y)).unwrap();
    s.pointer_up(Point::new(center.x + 5.0, center.y + 1.0)).unwrap();

    let moved = s.selected_object().unwrap();
    assert!((moved.placement.center().x - center.x - 5.0).abs() < 1e-9);
    assert_eq!(s.active_engine().unwrap().history().len(), len + 1);
    assert_eq!(s.object_at(moved.placement.center()), Some(moved.id));
}

#[test]
fn test_update_text_follows_linked_run() {
    let mut s = session();
    s.set_mode(DrawingMode::TextInsert);
    let id = s.apply_text("HI", TextStyle::default()).unwrap();
    let update = TextUpdate {
        text: Some("HELLO THERE".to_string()),
        ..TextUpdate::default()
    };
    assert!(s.update_text(id, &update).unwrap());

    let run = s.objects().iter().find_map(|o| match &o.kind {
        ObjectKind::Text(run) => Some(run.text.clone()),
        _ => None,
    });
    assert_eq!(run.as_deref(), Some("HELLO THERE"));

    assert!(s.undo());
    assert_eq!(s.state().text(id).unwrap().text, "HI");
}

#[test]
fn test_rejected_text_update_leaves_element_and_run() {
    let mut s = session();
    s.set_mode(DrawingMode::TextInsert);
    let id = s.apply_text("HI", TextStyle::default()).unwrap();
    let history = s.active_engine().unwrap().history().len();

    let blank = TextUpdate {
        text: Some("   ".to_string()),
        ..TextUpdate::default()
    };
    assert!(s.update_text(id, &blank).is_err());

    let bad_size = TextUpdate {
        style: Some(TextStyle {
            font_size: -4.0,
            ..TextStyle::default()
        }),
        ..TextUpdate::default()
    };
    assert!(s.update_text(id, &bad_size).is_err());

    let element = s.state().text(id).unwrap();
    assert_eq!(element.text, "HI");
    assert_eq!(element.style, TextStyle::default());
    let run = s.objects().iter().find_map(|o| match &o.kind {
        ObjectKind::Text(run) => Some(run.clone()),
        _ => None,
    });
    let run = run.unwrap();
    assert_eq!(run.text, "HI");
    assert_eq!(run.style, TextStyle::default());
    assert_eq!(s.active_engine().unwrap().history().len(), history);
}

#[test]
fn test_removing_linked_object_removes_element() {
    let mut s = session();
    s.set_mode(DrawingMode::TextInsert);
    let id = s.apply_text("HI", TextStyle::default()).unwrap();
    let object = s.selected_object().unwrap().id;

    s.remove_object(object).unwrap();
    assert!(s.state().text(id).is_none());
    assert!(s.undo());
    assert!(s.state().text(id).is_some());
}

#[test]
fn test_insert_commands_rejected_outside_select() {
    let mut s = session();
    s.set_mode(DrawingMode::Brush);
    let err = s.apply_surface_command(SurfaceCommand::BeginGesture(Point::new(1.0, 1.0)));
    assert!(err.is_err());
    assert_eq!(s.active_engine().unwrap().history().len(), 1);
}
