use garmentkit_core::{EventBus, ModelCatalog};
use garmentkit_designer::{DesignSession, DrawingMode, Point};
use garmentkit_settings::EditorConfig;
use std::io::Cursor;
use std::sync::Arc;

pub fn small_config() -> EditorConfig {
    let mut config = EditorConfig::default();
    config.canvas.width = 64;
    config.canvas.height = 64;
    config
}

pub fn session() -> DesignSession {
    DesignSession::new(
        ModelCatalog::builtin(),
        small_config(),
        "tshirt",
        Arc::new(EventBus::new()),
    )
    .unwrap()
}

/// One brush stroke from `from` to `to`
pub fn stroke(session: &mut DesignSession, from: Point, to: Point) {
    if session.mode() != DrawingMode::Brush {
        session.set_mode(DrawingMode::Brush);
    }
    session.pointer_down(from).unwrap();
    session.pointer_move(Point::new((from.x + to.x) / 2.0, (from.y + to.y) / 2.0)).unwrap();
    let outcome = session.pointer_up(to).unwrap();
    assert!(outcome.committed);
}

pub fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
