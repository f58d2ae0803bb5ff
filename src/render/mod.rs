mod layout;
pub mod review;
mod template;

use std::collections::HashMap;
use std::sync::Arc;

use image::RgbaImage;

use crate::model::FormRecord;

pub use layout::{text_width, wrap_text};
pub use template::{BiodataTemplate, MIN_PAGE_HEIGHT_PX, PAGE_WIDTH_PX};

/// Handle of the off-screen instance the export pipeline captures.
pub const CONTENT_HANDLE: &str = "pdf-content";
/// Handle of the visible instance shown on the review screen.
pub const PREVIEW_HANDLE: &str = "pdf-preview";

/// Turns a record into a fixed-layout document. Implementations must be pure:
/// the same record always yields the same document.
pub trait DocumentRenderer {
    fn render(&self, record: &FormRecord) -> RenderedDocument;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    pub width: f32,
    pub color: [u8; 3],
    pub dashed: bool,
}

impl Stroke {
    pub fn solid(width: f32, color: [u8; 3]) -> Self {
        Self {
            width,
            color,
            dashed: false,
        }
    }

    pub fn dashed(width: f32, color: [u8; 3]) -> Self {
        Self {
            width,
            color,
            dashed: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoxElement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub radius: f32,
    pub fill: Option<[u8; 3]>,
    pub stroke: Option<Stroke>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    pub x: f32,
    pub baseline: f32,
    pub size: f32,
    pub bold: bool,
    pub color: [u8; 3],
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct ImageBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub radius: f32,
    pub image: Arc<RgbaImage>,
    /// Loaded from somewhere other than the record itself (e.g. a bundled
    /// asset served from another origin).
    pub cross_origin: bool,
}

/// One drawing instruction. Coordinates are CSS pixels from the top-left
/// corner of the document.
#[derive(Clone, Debug)]
pub enum Element {
    Box(BoxElement),
    Rule {
        x: f32,
        y: f32,
        width: f32,
        thickness: f32,
        color: [u8; 3],
    },
    Circle {
        cx: f32,
        cy: f32,
        radius: f32,
        fill: Option<[u8; 3]>,
        stroke: Option<Stroke>,
    },
    Text(TextRun),
    Image(ImageBox),
}

/// Display list produced by a [`DocumentRenderer`].
#[derive(Clone, Debug)]
pub struct RenderedDocument {
    pub width: f32,
    pub height: f32,
    pub elements: Vec<Element>,
}

impl RenderedDocument {
    pub fn texts(&self) -> impl Iterator<Item = &TextRun> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text(t) => Some(t),
            _ => None,
        })
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageBox> {
        self.elements.iter().filter_map(|e| match e {
            Element::Image(img) => Some(img),
            _ => None,
        })
    }

    /// True when any text run reads exactly `text`.
    pub fn contains_text(&self, text: &str) -> bool {
        self.texts().any(|t| t.text == text)
    }
}

/// Rendered documents currently mounted, keyed by a stable handle.
#[derive(Default)]
pub struct Surfaces {
    mounted: HashMap<String, RenderedDocument>,
}

impl Surfaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `doc` under `handle`, replacing whatever was there.
    pub fn mount(&mut self, handle: impl Into<String>, doc: RenderedDocument) {
        let handle = handle.into();
        log::debug!("mount {handle} ({}x{} px)", doc.width, doc.height);
        self.mounted.insert(handle, doc);
    }

    pub fn unmount(&mut self, handle: &str) -> Option<RenderedDocument> {
        self.mounted.remove(handle)
    }

    pub fn get(&self, handle: &str) -> Option<&RenderedDocument> {
        self.mounted.get(handle)
    }

    pub fn is_mounted(&self, handle: &str) -> bool {
        self.mounted.contains_key(handle)
    }

    pub fn handles(&self) -> Vec<&str> {
        let mut handles: Vec<&str> = self.mounted.keys().map(String::as_str).collect();
        handles.sort_unstable();
        handles
    }

    pub fn clear(&mut self) {
        self.mounted.clear();
    }
}
