//! Surface rasterizer.
//!
//! Flattens a part surface into an RGBA image with tiny-skia, in standard
//! 2D orientation (origin top-left). Objects paint in draw order. Each
//! object is drawn in its own frame (top-left origin, natural size) and
//! mapped to the surface by its placement, so resize and rotation apply
//! uniformly to every kind.

use garmentkit_core::Color;
use image::{Rgba, RgbaImage};
use rusttype::{point as rt_point, Scale};
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, LineCap, LineJoin, Paint, PathBuilder, Pixmap,
    PixmapPaint, Stroke, Transform,
};

use crate::assets::AssetCache;
use crate::font_manager;
use crate::geometry::Placement;
use crate::object::{ImageData, ObjectKind, StrokeData, StrokeMode, SurfaceObject, TextRun};
use crate::surface::SurfaceState;

/// Flatten `surface` over `background`.
///
/// Erase strokes paint `background`. Images missing from `images` and text
/// runs with no usable font are skipped.
pub fn flatten(surface: &SurfaceState, background: Color, images: &AssetCache) -> RgbaImage {
    let (width, height) = (surface.width(), surface.height());
    let Some(mut pixmap) = Pixmap::new(width, height) else {
        return RgbaImage::new(width, height);
    };
    pixmap.fill(skia_color(background, 1.0));

    for object in surface.objects().iter().filter(|o| o.visible) {
        match &object.kind {
            ObjectKind::Stroke(stroke) => draw_stroke(&mut pixmap, object, stroke, background),
            ObjectKind::Text(run) => draw_text(&mut pixmap, object, run),
            ObjectKind::Image(data) => draw_image(&mut pixmap, object, data, images),
            ObjectKind::BaseLayer { image } => {
                if let Some(pixels) = images.get(image) {
                    blit(&mut pixmap, object, pixels);
                } else {
                    tracing::trace!("Base layer {} not decoded yet, skipped", image);
                }
            }
        }
    }

    to_image(&pixmap)
}

fn skia_color(color: Color, opacity: f64) -> tiny_skia::Color {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, alpha)
}

/// Map an object's natural frame (`natural_w` x `natural_h`, top-left origin) onto its placement
fn object_transform(placement: &Placement, natural_w: f64, natural_h: f64) -> Transform {
    let center = placement.center();
    let sx = if natural_w > 0.0 { placement.width / natural_w } else { 1.0 };
    let sy = if natural_h > 0.0 { placement.height / natural_h } else { 1.0 };
    Transform::from_translate(center.x as f32, center.y as f32)
        .pre_concat(Transform::from_rotate(placement.rotation as f32))
        .pre_translate(
            (-placement.width / 2.0) as f32,
            (-placement.height / 2.0) as f32,
        )
        .pre_scale(sx as f32, sy as f32)
}

fn draw_stroke(pixmap: &mut Pixmap, object: &SurfaceObject, stroke: &StrokeData, background: Color) {
    let color = match stroke.style.mode {
        StrokeMode::Paint => stroke.style.color,
        StrokeMode::Erase => background,
    };
    let mut paint = Paint::default();
    paint.set_color(skia_color(color, object.opacity));
    paint.anti_alias = true;

    let transform = object_transform(&object.placement, stroke.base_width, stroke.base_height);
    let width = stroke.style.width as f32;

    if let [only] = stroke.points.as_slice() {
        if let Some(dot) = PathBuilder::from_circle(only.x as f32, only.y as f32, width / 2.0) {
            pixmap.fill_path(&dot, &paint, FillRule::Winding, transform, None);
        }
        return;
    }

    let mut pb = PathBuilder::new();
    for (i, p) in stroke.points.iter().enumerate() {
        if i == 0 {
            pb.move_to(p.x as f32, p.y as f32);
        } else {
            pb.line_to(p.x as f32, p.y as f32);
        }
    }
    let Some(path) = pb.finish() else {
        return;
    };
    let style = Stroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    };
    pixmap.stroke_path(&path, &paint, &style, transform, None);
}

fn draw_text(pixmap: &mut Pixmap, object: &SurfaceObject, run: &TextRun) {
    let Some(font) = font_manager::font_for(&run.style) else {
        return;
    };
    let (natural_w, natural_h) = font_manager::measure_text(&run.text, &run.style);
    let Some(mut glyphs) = Pixmap::new(natural_w.ceil() as u32, natural_h.ceil() as u32) else {
        return;
    };

    let scale = Scale::uniform(run.style.font_size as f32);
    let v_metrics = font.v_metrics(scale);
    let (gw, gh) = (glyphs.width() as i32, glyphs.height() as i32);
    let color = run.style.color;
    let pixels = glyphs.pixels_mut();

    for glyph in font.layout(&run.text, scale, rt_point(0.0, v_metrics.ascent)) {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, coverage| {
            let px = gx as i32 + bb.min.x;
            let py = gy as i32 + bb.min.y;
            if px < 0 || py < 0 || px >= gw || py >= gh {
                return;
            }
            let alpha = (coverage * 255.0) as u8;
            let pixel = &mut pixels[(py * gw + px) as usize];
            if alpha > pixel.alpha() {
                *pixel = ColorU8::from_rgba(color.r, color.g, color.b, alpha).premultiply();
            }
        });
    }

    let paint = PixmapPaint {
        opacity: object.opacity.clamp(0.0, 1.0) as f32,
        quality: FilterQuality::Bilinear,
        ..Default::default()
    };
    let transform = object_transform(&object.placement, natural_w, natural_h);
    pixmap.draw_pixmap(0, 0, glyphs.as_ref(), &paint, transform, None);
}

fn draw_image(pixmap: &mut Pixmap, object: &SurfaceObject, data: &ImageData, images: &AssetCache) {
    match images.get(&data.image) {
        Some(pixels) => blit(pixmap, object, pixels),
        None => tracing::trace!("Image {} not decoded yet, skipped", data.image),
    }
}

fn blit(pixmap: &mut Pixmap, object: &SurfaceObject, image: &RgbaImage) {
    let Some(source) = to_pixmap(image) else {
        return;
    };
    let paint = PixmapPaint {
        opacity: object.opacity.clamp(0.0, 1.0) as f32,
        quality: FilterQuality::Bilinear,
        ..Default::default()
    };
    let transform = object_transform(
        &object.placement,
        f64::from(image.width()),
        f64::from(image.height()),
    );
    pixmap.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
}

fn to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

fn to_image(pixmap: &Pixmap) -> RgbaImage {
    let mut out = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::DecodedImage;
    use crate::geometry::Point;
    use crate::object::StrokeStyle;
    use garmentkit_core::ImageRef;
    use std::sync::Arc;

    fn stroke(mode: StrokeMode, from: Point, to: Point, width: f64) -> SurfaceObject {
        let style = StrokeStyle {
            mode,
            color: Color::BLACK,
            width,
        };
        let (data, placement) = StrokeData::from_points(style, &[from, to]).unwrap();
        SurfaceObject::new(ObjectKind::Stroke(data), placement)
    }

    #[test]
    fn test_empty_surface_is_background() {
        let surface = SurfaceState::new(8, 4);
        let raster = flatten(&surface, Color::rgb(10, 20, 30), &AssetCache::new());
        assert_eq!(raster.dimensions(), (8, 4));
        assert!(raster.pixels().all(|p| p.0 == [10, 20, 30, 255]));
    }

    #[test]
    fn test_stroke_paints_then_erase_restores() {
        let mut surface = SurfaceState::new(40, 40);
        surface.push(stroke(
            StrokeMode::Paint,
            Point::new(5.0, 20.0),
            Point::new(35.0, 20.0),
            6.0,
        ));
        let painted = flatten(&surface, Color::WHITE, &AssetCache::new());
        assert_eq!(painted.get_pixel(20, 20).0, [0, 0, 0, 255]);
        assert_eq!(painted.get_pixel(20, 5).0, [255, 255, 255, 255]);

        surface.push(stroke(
            StrokeMode::Erase,
            Point::new(5.0, 20.0),
            Point::new(35.0, 20.0),
            10.0,
        ));
        let erased = flatten(&surface, Color::WHITE, &AssetCache::new());
        assert_eq!(erased.get_pixel(20, 20).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_hidden_objects_are_skipped() {
        let mut surface = SurfaceState::new(20, 20);
        let id = surface.push(stroke(
            StrokeMode::Paint,
            Point::new(2.0, 10.0),
            Point::new(18.0, 10.0),
            6.0,
        ));
        if let Some(o) = surface.get_mut(id) {
            o.visible = false;
        }
        let raster = flatten(&surface, Color::WHITE, &AssetCache::new());
        assert_eq!(raster.get_pixel(10, 10).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_base_layer_covers_canvas() {
        let image = ImageRef::new("mem://tex");
        let mut cache = AssetCache::new();
        cache.insert(&DecodedImage {
            image: image.clone(),
            pixels: Arc::new(RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 255]))),
        });
        let mut surface = SurfaceState::new(16, 16);
        surface.set_base_layer(Some(SurfaceObject::base_layer(image, 16, 16)));
        let raster = flatten(&surface, Color::WHITE, &cache);
        assert_eq!(raster.get_pixel(8, 8).0, [0, 255, 0, 255]);
    }
}
