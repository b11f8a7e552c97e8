//! System font lookup and text measurement for glyph runs.

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use rusttype::{point as rt_point, Font, Scale};
use std::{
    collections::HashMap,
    fs,
    sync::{Mutex, OnceLock},
};

use crate::object::{FontStyle, FontWeight, TextStyle};

/// Advance per character, as a fraction of the font size, when no font is available.
const FALLBACK_ADVANCE: f64 = 0.6;
/// Line height as a fraction of the font size when no font is available.
const FALLBACK_LINE_HEIGHT: f64 = 1.2;

#[derive(Clone, Eq, PartialEq, Hash)]
struct FontKey {
    family: String,
    bold: bool,
    italic: bool,
}

fn db() -> &'static Database {
    static DB: OnceLock<Database> = OnceLock::new();
    DB.get_or_init(|| {
        let mut db = Database::new();
        db.load_system_fonts();
        tracing::debug!("Loaded {} system font faces", db.len());
        db
    })
}

/// Font for a text style, or `None` if the system has no usable face.
pub fn font_for(style: &TextStyle) -> Option<&'static Font<'static>> {
    get_font_for(
        &style.font_family,
        style.font_weight == FontWeight::Bold,
        style.font_style == FontStyle::Italic,
    )
}

pub fn get_font_for(family: &str, bold: bool, italic: bool) -> Option<&'static Font<'static>> {
    type Cache = Mutex<HashMap<FontKey, Option<&'static Font<'static>>>>;
    static CACHE: OnceLock<Cache> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));

    let key = FontKey {
        family: family.to_string(),
        bold,
        italic,
    };

    if let Some(font) = cache.lock().unwrap_or_else(|p| p.into_inner()).get(&key) {
        return *font;
    }

    let loaded = load_font_from_system(family, bold, italic)
        .or_else(|| load_font_from_system("Sans", bold, italic))
        .map(|font| &*Box::leak(Box::new(font)));
    if loaded.is_none() {
        tracing::warn!("No font found for '{}'; text runs will not be rasterized", family);
    }

    cache
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .insert(key, loaded);
    loaded
}

fn load_font_from_system(family: &str, bold: bool, italic: bool) -> Option<Font<'static>> {
    let families: Vec<Family<'_>> = match family.trim() {
        "" | "Sans" => vec![Family::SansSerif],
        "Serif" => vec![Family::Serif],
        "Monospace" => vec![Family::Monospace],
        other => vec![Family::Name(other)],
    };

    let query = Query {
        families: &families,
        weight: if bold { Weight::BOLD } else { Weight::NORMAL },
        stretch: Stretch::Normal,
        style: if italic { Style::Italic } else { Style::Normal },
    };

    let id = db().query(&query)?;
    let face = db().face(id)?;

    match &face.source {
        fontdb::Source::File(path) | fontdb::Source::SharedFile(path, _) => {
            let bytes = fs::read(path).ok()?;
            Font::try_from_vec_and_index(bytes, face.index)
        }
        fontdb::Source::Binary(bytes) => {
            Font::try_from_vec_and_index(bytes.as_ref().as_ref().to_vec(), face.index)
        }
    }
}

/// Width and height of a single-line run at its font size.
pub fn measure_text(text: &str, style: &TextStyle) -> (f64, f64) {
    let size = style.font_size.max(1.0);
    match font_for(style) {
        Some(font) => {
            let scale = Scale::uniform(size as f32);
            let v = font.v_metrics(scale);
            let width = font
                .layout(text, scale, rt_point(0.0, v.ascent))
                .last()
                .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
                .unwrap_or(0.0);
            let height = v.ascent - v.descent + v.line_gap;
            (f64::from(width).max(1.0), f64::from(height).max(1.0))
        }
        None => fallback_measure(text, size),
    }
}

fn fallback_measure(text: &str, size: f64) -> (f64, f64) {
    let chars = text.chars().count().max(1) as f64;
    (chars * size * FALLBACK_ADVANCE, size * FALLBACK_LINE_HEIGHT)
}
