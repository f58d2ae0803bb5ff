use std::sync::Arc;

use chrono::NaiveDate;
use image::RgbaImage;

use super::layout::{text_width, wrap_text};
use super::{BoxElement, DocumentRenderer, Element, ImageBox, RenderedDocument, Stroke, TextRun};
use crate::dates::long_date;
use crate::model::FormRecord;
use crate::photo::decode_data_uri;

/// 210 mm at 96 px per inch.
pub const PAGE_WIDTH_PX: f32 = 794.0;
/// Tallest height that still maps onto one A4 page at 794 px width.
pub const MIN_PAGE_HEIGHT_PX: f32 = 1122.0;

const PAGE_PADDING: f32 = 30.0;
const EMBLEM_SIZE: f32 = 40.0;
const EMBLEM_GAP: f32 = 8.0;
const FRAME_BORDER: f32 = 3.0;
const FRAME_PADDING: f32 = 15.0;
const SECTION_GAP: f32 = 15.0;
const PHOTO_SLOT: f32 = 90.0;
const LABEL_MIN_WIDTH: f32 = 80.0;
const LABEL_GAP: f32 = 10.0;

const ACCENT: [u8; 3] = [0x66, 0x7e, 0xea];
const ACCENT_SOFT: [u8; 3] = [0xe0, 0xe7, 0xff];
const FRAME_FILL: [u8; 3] = [0xfa, 0xfb, 0xff];
const PHOTO_FILL: [u8; 3] = [0xf8, 0xf9, 0xff];
const LABEL_COLOR: [u8; 3] = [0x37, 0x41, 0x51];
const VALUE_COLOR: [u8; 3] = [0x6b, 0x72, 0x80];
const WHITE: [u8; 3] = [0xff, 0xff, 0xff];

const FALLBACK: &str = "Not specified";

/// The printable biodata sheet: emblem, framed title, personal details with
/// photo, professional, family and hobbies blocks, generation-date footer.
#[derive(Clone)]
pub struct BiodataTemplate {
    pub generated_on: NaiveDate,
    /// Optional artwork shown in the circle above the frame.
    pub emblem: Option<Arc<RgbaImage>>,
}

impl BiodataTemplate {
    pub fn new(generated_on: NaiveDate) -> Self {
        Self {
            generated_on,
            emblem: None,
        }
    }

    pub fn with_emblem(mut self, emblem: RgbaImage) -> Self {
        self.emblem = Some(Arc::new(emblem));
        self
    }
}

fn or_fallback(value: &str) -> &str {
    if value.trim().is_empty() { FALLBACK } else { value }
}

fn decode_photo(record: &FormRecord) -> Option<Arc<RgbaImage>> {
    let uri = record.photo_preview.as_deref()?;
    let bytes = decode_data_uri(uri)?;
    match image::load_from_memory(&bytes) {
        Ok(img) => Some(Arc::new(img.to_rgba8())),
        Err(e) => {
            log::warn!("photo preview could not be decoded, drawing placeholder: {e}");
            None
        }
    }
}

/// Baseline for text of `size` centred in a line box of `line_h`.
fn baseline_in(top: f32, size: f32, line_h: f32) -> f32 {
    top + (line_h - size) / 2.0 + size * 0.8
}

struct Cursor {
    elements: Vec<Element>,
    x: f32,
    width: f32,
    y: f32,
}

impl Cursor {
    fn text(&mut self, x: f32, top: f32, line_h: f32, size: f32, bold: bool, color: [u8; 3], text: &str) {
        self.elements.push(Element::Text(TextRun {
            x,
            baseline: baseline_in(top, size, line_h),
            size,
            bold,
            color,
            text: text.to_string(),
        }));
    }

    fn centered(&mut self, top: f32, line_h: f32, size: f32, bold: bool, color: [u8; 3], text: &str) {
        let w = text_width(text, size, bold);
        let x = self.x + (self.width - w).max(0.0) / 2.0;
        self.text(x, top, line_h, size, bold, color, text);
    }

    fn rule(&mut self, y: f32, thickness: f32, color: [u8; 3]) {
        self.elements.push(Element::Rule {
            x: self.x,
            y,
            width: self.width,
            thickness,
            color,
        });
    }

    fn heading(&mut self, title: &str, width: f32) {
        let size = 14.0;
        let line_h = size * 1.4;
        self.text(self.x, self.y, line_h, size, true, ACCENT, title);
        self.y += line_h + 3.0;
        self.elements.push(Element::Rule {
            x: self.x,
            y: self.y,
            width,
            thickness: 1.0,
            color: ACCENT_SOFT,
        });
        self.y += 1.0 + 8.0;
    }

    /// Label/value rows, values wrapped in whatever width is left.
    fn rows(&mut self, rows: &[(&str, &str)], width: f32) {
        let size = 10.0;
        let line_h = size * 1.4;
        for (label, value) in rows {
            let label = format!("{label}:");
            let label_w = text_width(&label, size, true).max(LABEL_MIN_WIDTH);
            let value_x = self.x + label_w + LABEL_GAP;
            let value_w = (width - label_w - LABEL_GAP).max(size);

            self.text(self.x, self.y, line_h, size, true, LABEL_COLOR, &label);
            let lines = wrap_text(or_fallback(value), size, false, value_w);
            for (i, line) in lines.iter().enumerate() {
                self.text(value_x, self.y + i as f32 * line_h, line_h, size, false, VALUE_COLOR, line);
            }
            self.y += lines.len().max(1) as f32 * line_h + 2.0 + 4.0;
        }
    }
}

impl BiodataTemplate {
    fn emblem(&self, elements: &mut Vec<Element>) {
        let cx = PAGE_WIDTH_PX / 2.0;
        let cy = PAGE_PADDING + EMBLEM_SIZE / 2.0;
        let r = EMBLEM_SIZE / 2.0;
        elements.push(Element::Circle {
            cx,
            cy,
            radius: r,
            fill: Some(WHITE),
            stroke: None,
        });
        if let Some(img) = &self.emblem {
            elements.push(Element::Image(ImageBox {
                x: cx - r,
                y: cy - r,
                width: EMBLEM_SIZE,
                height: EMBLEM_SIZE,
                radius: r,
                image: Arc::clone(img),
                cross_origin: true,
            }));
        }
        elements.push(Element::Circle {
            cx,
            cy,
            radius: r,
            fill: None,
            stroke: Some(Stroke::solid(2.0, ACCENT)),
        });
    }

    fn photo_slot(&self, cur: &mut Cursor, x: f32, y: f32, photo: Option<Arc<RgbaImage>>) {
        match photo {
            Some(image) => {
                cur.elements.push(Element::Box(BoxElement {
                    x,
                    y,
                    width: PHOTO_SLOT,
                    height: PHOTO_SLOT,
                    radius: 8.0,
                    fill: Some(PHOTO_FILL),
                    stroke: Some(Stroke::solid(2.0, ACCENT)),
                }));
                let inset = 2.0 + 3.0;
                cur.elements.push(Element::Image(ImageBox {
                    x: x + inset,
                    y: y + inset,
                    width: PHOTO_SLOT - 2.0 * inset,
                    height: PHOTO_SLOT - 2.0 * inset,
                    radius: 5.0,
                    image,
                    cross_origin: false,
                }));
            }
            None => {
                cur.elements.push(Element::Box(BoxElement {
                    x,
                    y,
                    width: PHOTO_SLOT,
                    height: PHOTO_SLOT,
                    radius: 8.0,
                    fill: Some(PHOTO_FILL),
                    stroke: Some(Stroke::dashed(2.0, ACCENT)),
                }));
                let size = 10.0;
                let w = text_width("Photo", size, false);
                cur.text(
                    x + (PHOTO_SLOT - w) / 2.0,
                    y + (PHOTO_SLOT - size * 1.4) / 2.0,
                    size * 1.4,
                    size,
                    false,
                    ACCENT,
                    "Photo",
                );
            }
        }
    }
}

impl DocumentRenderer for BiodataTemplate {
    fn render(&self, record: &FormRecord) -> RenderedDocument {
        let t0 = std::time::Instant::now();
        let mut elements = Vec::new();
        self.emblem(&mut elements);

        let frame_x = PAGE_PADDING;
        let frame_y = PAGE_PADDING + EMBLEM_SIZE + EMBLEM_GAP;
        let frame_w = PAGE_WIDTH_PX - 2.0 * PAGE_PADDING;
        let inset = FRAME_BORDER + FRAME_PADDING;

        // Frame goes in first so everything else paints over it; its height
        // is patched once the content height is known.
        let frame_index = elements.len();
        elements.push(Element::Box(BoxElement {
            x: frame_x,
            y: frame_y,
            width: frame_w,
            height: 0.0,
            radius: 10.0,
            fill: Some(FRAME_FILL),
            stroke: Some(Stroke::solid(FRAME_BORDER, ACCENT)),
        }));

        let mut cur = Cursor {
            elements,
            x: frame_x + inset,
            width: frame_w - 2.0 * inset,
            y: frame_y + inset,
        };
        let content_w = cur.width;

        // Title block
        let title_size = 22.0;
        let title_h = title_size * 1.2;
        cur.centered(cur.y, title_h, title_size, true, ACCENT, "BIODATA");
        cur.y += title_h + 5.0 + 10.0;
        cur.rule(cur.y, 2.0, ACCENT);
        cur.y += 2.0 + 15.0;

        // Personal details beside the photo slot
        let section_top = cur.y;
        let details_w = content_w - SECTION_GAP - PHOTO_SLOT;
        cur.heading("Personal Details", details_w);
        cur.rows(
            &[
                ("Name", record.name.as_str()),
                ("Date of Birth", record.date_of_birth.as_str()),
                ("Age", record.age.as_str()),
                ("Height", record.height.as_str()),
                ("Religion", record.religion.as_str()),
                ("Caste", record.caste.as_str()),
            ],
            details_w,
        );
        let slot_x = cur.x + content_w - PHOTO_SLOT;
        self.photo_slot(&mut cur, slot_x, section_top, decode_photo(record));
        cur.y = cur.y.max(section_top + PHOTO_SLOT) + SECTION_GAP;

        let work_from_home = if record.work_from_home { "Yes" } else { "No" };
        cur.heading("Professional Details", content_w);
        cur.rows(
            &[
                ("Education", record.education.as_str()),
                ("Job Title", record.job_title.as_str()),
                ("Company", record.company.as_str()),
                ("Work Location", record.display_work_location()),
                ("Work From Home", work_from_home),
            ],
            content_w,
        );
        cur.y += SECTION_GAP;

        cur.heading("Family Details", content_w);
        cur.rows(
            &[
                ("Father's Name", record.father_name.as_str()),
                ("Father's Occupation", record.father_occupation.as_str()),
                ("Mother's Name", record.mother_name.as_str()),
                ("Mother's Occupation", record.mother_occupation.as_str()),
                ("Siblings", record.siblings.as_str()),
            ],
            content_w,
        );
        cur.y += SECTION_GAP;

        cur.heading("Hobbies & Interests", content_w);
        let size = 10.0;
        let line_h = size * 1.3;
        for line in wrap_text(or_fallback(&record.hobbies), size, false, content_w) {
            cur.text(cur.x, cur.y, line_h, size, false, VALUE_COLOR, &line);
            cur.y += line_h;
        }
        cur.y += 10.0;

        // Footer sits at the bottom of the frame unless content pushes it down.
        let footer_size = 9.0;
        let footer_h = 1.0 + 8.0 + footer_size * 1.4;
        let min_inner_bottom = MIN_PAGE_HEIGHT_PX - PAGE_PADDING - inset;
        let inner_bottom = min_inner_bottom.max(cur.y + footer_h);
        let footer_top = inner_bottom - footer_h;
        cur.rule(footer_top, 1.0, ACCENT);
        let footer = format!("Generated on {}", long_date(self.generated_on));
        cur.centered(footer_top + 9.0, footer_size * 1.4, footer_size, false, VALUE_COLOR, &footer);

        let frame_bottom = inner_bottom + inset;
        let mut elements = cur.elements;
        if let Element::Box(frame) = &mut elements[frame_index] {
            frame.height = frame_bottom - frame_y;
        }

        let height = frame_bottom + PAGE_PADDING;
        log::debug!(
            "render: {} elements, {:.0}x{:.0} px in {:.1}ms",
            elements.len(),
            PAGE_WIDTH_PX,
            height,
            t0.elapsed().as_secs_f64() * 1000.0,
        );

        RenderedDocument {
            width: PAGE_WIDTH_PX,
            height,
            elements,
        }
    }
}
