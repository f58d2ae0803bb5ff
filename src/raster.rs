use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut};
use imageproc::rect::Rect;
use swash::FontRef;
use swash::scale::{Render, ScaleContext, Source, StrikeWith};
use swash::shape::ShapeContext;
use swash::zeno::{Format, Vector};

use crate::error::Error;
use crate::fonts::{FontSet, font_set};
use crate::render::{BoxElement, Element, ImageBox, RenderedDocument, Stroke, TextRun};

// An A4 page at 2x is about 1588 x 2244; overflowing content only grows
// the height.
const MAX_RASTER_WIDTH: u32 = 8_192;
const MAX_RASTER_HEIGHT: u32 = 32_768;
// 64M pixels, 256 MiB of RGBA.
const MAX_RASTER_PIXELS: u64 = 1 << 26;

const GLYPH_SOURCES: [Source; 3] = [
    Source::ColorOutline(0),
    Source::ColorBitmap(StrikeWith::BestFit),
    Source::Outline,
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterOptions {
    /// Device pixels per CSS pixel.
    pub scale: f32,
    /// Opaque colour every pixel starts from.
    pub background: [u8; 3],
    /// Whether images flagged as cross-origin may be painted.
    pub allow_cross_origin: bool,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            background: [0xff, 0xff, 0xff],
            allow_cross_origin: true,
        }
    }
}

/// Captures a rendered document as pixels.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, doc: &RenderedDocument, options: &RasterOptions) -> Result<RgbaImage, Error>;
}

/// Pure-Rust rasterizer: shapes are drawn with `imageproc`, text with `swash`
/// using the first preferred sans-serif face found on the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct SoftwareRasterizer;

impl Rasterizer for SoftwareRasterizer {
    fn rasterize(&self, doc: &RenderedDocument, options: &RasterOptions) -> Result<RgbaImage, Error> {
        paint_document(doc, options, font_set())
    }
}

fn paint_document(doc: &RenderedDocument, options: &RasterOptions, fonts: &FontSet) -> Result<RgbaImage, Error> {
    let t0 = std::time::Instant::now();
    let (width, height) = canvas_size(doc, options.scale)?;
    if fonts.regular.is_none() && doc.texts().next().is_some() {
        return Err(Error::PdfGenerationFailed(
            "no font available to rasterize text (set BIODATA_FONTS)".into(),
        ));
    }
    let [r, g, b] = options.background;
    let mut painter = Painter {
        canvas: RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255])),
        scale: options.scale,
        allow_cross_origin: options.allow_cross_origin,
        fonts,
        scale_ctx: ScaleContext::new(),
        shape_ctx: ShapeContext::new(),
    };
    for element in &doc.elements {
        painter.paint(element)?;
    }
    log::info!(
        "Rasterize: {}x{} px at {:.1}x, {} elements in {:.1}ms",
        width,
        height,
        options.scale,
        doc.elements.len(),
        t0.elapsed().as_secs_f64() * 1000.0,
    );
    Ok(painter.canvas)
}

/// Device size of `doc` at `scale`, rejecting degenerate and absurd sizes.
pub fn canvas_size(doc: &RenderedDocument, scale: f32) -> Result<(u32, u32), Error> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(Error::PdfGenerationFailed(format!("invalid raster scale {scale}")));
    }
    let width = (doc.width * scale).ceil();
    let height = (doc.height * scale).ceil();
    if !(width >= 1.0 && height >= 1.0) {
        return Err(Error::PdfGenerationFailed(format!(
            "document has no area ({}x{} px)",
            doc.width, doc.height
        )));
    }
    if width > MAX_RASTER_WIDTH as f32 || height > MAX_RASTER_HEIGHT as f32 {
        return Err(Error::PdfGenerationFailed(format!(
            "raster of {width}x{height} px exceeds {MAX_RASTER_WIDTH}x{MAX_RASTER_HEIGHT}"
        )));
    }
    let (width, height) = (width as u32, height as u32);
    if width as u64 * height as u64 > MAX_RASTER_PIXELS {
        return Err(Error::PdfGenerationFailed(format!(
            "raster of {width}x{height} px is too large"
        )));
    }
    Ok((width, height))
}

fn rgba(color: [u8; 3]) -> Rgba<u8> {
    Rgba([color[0], color[1], color[2], 255])
}

fn blend(pixel: &mut Rgba<u8>, color: [u8; 3], alpha: f32) {
    let inv = 1.0 - alpha;
    for c in 0..3 {
        pixel[c] = (color[c] as f32 * alpha + pixel[c] as f32 * inv).round() as u8;
    }
    pixel[3] = 255;
}

fn fill_rect(img: &mut RgbaImage, x: i32, y: i32, w: i32, h: i32, color: Rgba<u8>) {
    if w > 0 && h > 0 {
        draw_filled_rect_mut(img, Rect::at(x, y).of_size(w as u32, h as u32), color);
    }
}

/// Two overlapping bands plus four corner discs.
fn fill_rounded_rect(img: &mut RgbaImage, x: i32, y: i32, w: i32, h: i32, r: i32, color: Rgba<u8>) {
    if w <= 0 || h <= 0 {
        return;
    }
    let r = r.min(w / 2).min(h / 2).max(0);
    if r == 0 {
        fill_rect(img, x, y, w, h, color);
        return;
    }
    fill_rect(img, x, y + r, w, h - 2 * r, color);
    fill_rect(img, x + r, y, w - 2 * r, h, color);
    for (cx, cy) in [
        (x + r, y + r),
        (x + w - 1 - r, y + r),
        (x + r, y + h - 1 - r),
        (x + w - 1 - r, y + h - 1 - r),
    ] {
        draw_filled_circle_mut(img, (cx, cy), r, color);
    }
}

/// Inside test for a rounded rectangle anchored at the origin.
fn inside_rounded(px: i32, py: i32, w: i32, h: i32, r: i32) -> bool {
    let r = r.min(w / 2).min(h / 2);
    if r <= 0 {
        return true;
    }
    let cx = if px < r {
        r
    } else if px >= w - r {
        w - 1 - r
    } else {
        return true;
    };
    let cy = if py < r {
        r
    } else if py >= h - r {
        h - 1 - r
    } else {
        return true;
    };
    let (dx, dy) = (px - cx, py - cy);
    dx * dx + dy * dy <= r * r
}

struct Painter<'f> {
    canvas: RgbaImage,
    scale: f32,
    allow_cross_origin: bool,
    fonts: &'f FontSet,
    scale_ctx: ScaleContext,
    shape_ctx: ShapeContext,
}

impl Painter<'_> {
    fn px(&self, v: f32) -> i32 {
        (v * self.scale).round() as i32
    }

    /// Stroke widths never vanish, however small the scale.
    fn stroke_px(&self, v: f32) -> i32 {
        self.px(v).max(1)
    }

    fn paint(&mut self, element: &Element) -> Result<(), Error> {
        match element {
            Element::Box(b) => self.paint_box(b),
            Element::Rule {
                x,
                y,
                width,
                thickness,
                color,
            } => {
                let (x, y, w, t) = (self.px(*x), self.px(*y), self.px(*width), self.stroke_px(*thickness));
                fill_rect(&mut self.canvas, x, y, w, t, rgba(*color));
            }
            Element::Circle {
                cx,
                cy,
                radius,
                fill,
                stroke,
            } => self.paint_circle(*cx, *cy, *radius, *fill, *stroke),
            Element::Text(run) => return self.paint_text(run),
            Element::Image(img) => self.paint_image(img),
        }
        Ok(())
    }

    fn paint_box(&mut self, b: &BoxElement) {
        let (x, y, w, h, r) = (self.px(b.x), self.px(b.y), self.px(b.width), self.px(b.height), self.px(b.radius));
        match b.stroke {
            Some(stroke) if !stroke.dashed => {
                let sw = self.stroke_px(stroke.width);
                match b.fill {
                    Some(fill) => {
                        fill_rounded_rect(&mut self.canvas, x, y, w, h, r, rgba(stroke.color));
                        fill_rounded_rect(
                            &mut self.canvas,
                            x + sw,
                            y + sw,
                            w - 2 * sw,
                            h - 2 * sw,
                            (r - sw).max(0),
                            rgba(fill),
                        );
                    }
                    None => {
                        let c = rgba(stroke.color);
                        fill_rect(&mut self.canvas, x, y, w, sw, c);
                        fill_rect(&mut self.canvas, x, y + h - sw, w, sw, c);
                        fill_rect(&mut self.canvas, x, y, sw, h, c);
                        fill_rect(&mut self.canvas, x + w - sw, y, sw, h, c);
                    }
                }
            }
            Some(stroke) => {
                if let Some(fill) = b.fill {
                    fill_rounded_rect(&mut self.canvas, x, y, w, h, r, rgba(fill));
                }
                self.paint_dashes(x, y, w, h, stroke);
            }
            None => {
                if let Some(fill) = b.fill {
                    fill_rounded_rect(&mut self.canvas, x, y, w, h, r, rgba(fill));
                }
            }
        }
    }

    fn paint_dashes(&mut self, x: i32, y: i32, w: i32, h: i32, stroke: Stroke) {
        let sw = self.stroke_px(stroke.width);
        let dash = sw * 3;
        let period = dash + sw * 2;
        let c = rgba(stroke.color);
        let mut offset = 0;
        while offset < w {
            let len = dash.min(w - offset);
            fill_rect(&mut self.canvas, x + offset, y, len, sw, c);
            fill_rect(&mut self.canvas, x + offset, y + h - sw, len, sw, c);
            offset += period;
        }
        let mut offset = 0;
        while offset < h {
            let len = dash.min(h - offset);
            fill_rect(&mut self.canvas, x, y + offset, sw, len, c);
            fill_rect(&mut self.canvas, x + w - sw, y + offset, sw, len, c);
            offset += period;
        }
    }

    fn paint_circle(&mut self, cx: f32, cy: f32, radius: f32, fill: Option<[u8; 3]>, stroke: Option<Stroke>) {
        let center = (self.px(cx), self.px(cy));
        let r = self.px(radius);
        if let Some(fill) = fill {
            draw_filled_circle_mut(&mut self.canvas, center, r, rgba(fill));
        }
        if let Some(stroke) = stroke {
            let sw = self.stroke_px(stroke.width);
            for t in 0..sw {
                if r - t > 0 {
                    draw_hollow_circle_mut(&mut self.canvas, center, r - t, rgba(stroke.color));
                }
            }
        }
    }

    /// `object-fit: cover`: crop the source to the box aspect, then resize.
    fn paint_image(&mut self, img: &ImageBox) {
        if img.cross_origin && !self.allow_cross_origin {
            log::debug!("skipping cross-origin image");
            return;
        }
        let (x, y) = (self.px(img.x), self.px(img.y));
        let (w, h) = (self.px(img.width), self.px(img.height));
        let (sw, sh) = img.image.dimensions();
        if w <= 0 || h <= 0 || sw == 0 || sh == 0 {
            return;
        }

        let target_aspect = w as f32 / h as f32;
        let source_aspect = sw as f32 / sh as f32;
        let (cw, ch) = if source_aspect > target_aspect {
            (((sh as f32 * target_aspect).round() as u32).clamp(1, sw), sh)
        } else {
            (sw, ((sw as f32 / target_aspect).round() as u32).clamp(1, sh))
        };
        let cropped = imageops::crop_imm(img.image.as_ref(), (sw - cw) / 2, (sh - ch) / 2, cw, ch).to_image();
        let scaled = imageops::resize(&cropped, w as u32, h as u32, FilterType::Triangle);

        let r = self.px(img.radius);
        let (canvas_w, canvas_h) = (self.canvas.width() as i32, self.canvas.height() as i32);
        for (ix, iy, pixel) in scaled.enumerate_pixels() {
            let (ix, iy) = (ix as i32, iy as i32);
            let (dx, dy) = (x + ix, y + iy);
            if dx < 0 || dy < 0 || dx >= canvas_w || dy >= canvas_h || pixel[3] == 0 {
                continue;
            }
            if !inside_rounded(ix, iy, w, h, r) {
                continue;
            }
            let dest = self.canvas.get_pixel_mut(dx as u32, dy as u32);
            blend(dest, [pixel[0], pixel[1], pixel[2]], pixel[3] as f32 / 255.0);
        }
    }

    fn paint_text(&mut self, run: &TextRun) -> Result<(), Error> {
        let fonts = self.fonts;
        let face = fonts
            .face(run.bold)
            .ok_or_else(|| Error::PdfGenerationFailed("no font available to rasterize text".into()))?;
        let font = FontRef::from_index(&face.data[..], face.index as usize)
            .ok_or_else(|| Error::PdfGenerationFailed(format!("font {} could not be read by the shaper", face.family)))?;
        let size = run.size * self.scale;
        let synthetic_bold = run.bold && !face.bold;
        let mut pen_x = run.x * self.scale;
        let pen_y = run.baseline * self.scale;

        let Painter {
            canvas,
            scale_ctx,
            shape_ctx,
            ..
        } = self;
        let mut shaper = shape_ctx.builder(font).size(size).build();
        shaper.add_str(&run.text);
        let mut scaler = scale_ctx.builder(font).size(size).hint(true).build();
        let (width, height) = (canvas.width() as i32, canvas.height() as i32);

        shaper.shape_with(|cluster| {
            for glyph in cluster.glyphs {
                let mut render = Render::new(&GLYPH_SOURCES);
                render.format(Format::Alpha).offset(Vector::new(glyph.x, glyph.y));
                if synthetic_bold {
                    render.embolden(size / 24.0);
                }

                if let Some(mask) = render.render(&mut scaler, glyph.id) {
                    let gx = (pen_x + mask.placement.left as f32) as i32;
                    let gy = (pen_y - mask.placement.top as f32) as i32;
                    for py in 0..mask.placement.height as i32 {
                        for px in 0..mask.placement.width as i32 {
                            let alpha = mask.data[(py * mask.placement.width as i32 + px) as usize];
                            let (dx, dy) = (gx + px, gy + py);
                            if alpha == 0 || dx < 0 || dy < 0 || dx >= width || dy >= height {
                                continue;
                            }
                            blend(canvas.get_pixel_mut(dx as u32, dy as u32), run.color, alpha as f32 / 255.0);
                        }
                    }
                }
                pen_x += glyph.advance;
            }
        });
        Ok(())
    }
}
