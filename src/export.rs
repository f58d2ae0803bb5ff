use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use image::RgbaImage;
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref};

use crate::dates::iso_date;
use crate::error::Error;
use crate::model::FormRecord;
use crate::photo::data_uri;
use crate::raster::{RasterOptions, Rasterizer};
use crate::render::{CONTENT_HANDLE, PREVIEW_HANDLE, Surfaces};

const PT_PER_MM: f32 = 72.0 / 25.4;

/// Physical page size in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSize {
    pub width_mm: f32,
    pub height_mm: f32,
}

impl PageSize {
    pub const A4: PageSize = PageSize {
        width_mm: 210.0,
        height_mm: 297.0,
    };

    pub fn width_pt(&self) -> f32 {
        self.width_mm * PT_PER_MM
    }

    pub fn height_pt(&self) -> f32 {
        self.height_mm * PT_PER_MM
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportOptions {
    /// Upscale factor for the downloadable PDF (print quality).
    pub scale: f32,
    /// Scale for the on-screen preview capture.
    pub preview_scale: f32,
    pub background: [u8; 3],
    pub allow_cross_origin: bool,
    pub page: PageSize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            preview_scale: 1.0,
            background: [0xff, 0xff, 0xff],
            allow_cross_origin: true,
            page: PageSize::A4,
        }
    }
}

impl ExportOptions {
    fn raster(&self, scale: f32) -> RasterOptions {
        RasterOptions {
            scale,
            background: self.background,
            allow_cross_origin: self.allow_cross_origin,
        }
    }
}

/// Where the raster lands on the page, in millimetres from the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub x_mm: f32,
    pub y_mm: f32,
    pub width_mm: f32,
    pub height_mm: f32,
    /// True when the raster had to be shrunk to fit one page.
    pub scaled: bool,
}

/// Single-page fit policy: full page width, height from the aspect ratio; a
/// raster taller than the page is shrunk uniformly until its height matches
/// the page and is centred horizontally.
pub fn fit_to_page(raster_width: u32, raster_height: u32, page: PageSize) -> Placement {
    let width_mm = page.width_mm;
    let height_mm = raster_height as f32 * width_mm / raster_width.max(1) as f32;

    if height_mm > page.height_mm {
        let factor = page.height_mm / height_mm;
        let scaled_width = width_mm * factor;
        Placement {
            x_mm: (width_mm - scaled_width) / 2.0,
            y_mm: 0.0,
            width_mm: scaled_width,
            height_mm: page.height_mm,
            scaled: true,
        }
    } else {
        Placement {
            x_mm: 0.0,
            y_mm: 0.0,
            width_mm,
            height_mm,
            scaled: false,
        }
    }
}

/// `<Name_with_underscores>_Biodata_<YYYY-MM-DD>.pdf`. Every whitespace run in
/// the name becomes one underscore.
pub fn export_file_name(name: &str, today: NaiveDate) -> String {
    let mut stem = String::with_capacity(name.len());
    let mut in_space = false;
    for ch in name.chars() {
        if ch.is_whitespace() {
            if !in_space {
                stem.push('_');
            }
            in_space = true;
        } else {
            stem.push(ch);
            in_space = false;
        }
    }
    format!("{stem}_Biodata_{}.pdf", iso_date(today))
}

/// A finished artifact the host should offer to the user as a download.
#[derive(Clone, Debug, PartialEq)]
pub struct DownloadRequest {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl DownloadRequest {
    /// Write the artifact into `dir` under its file name.
    pub fn save_in(&self, dir: &Path) -> Result<PathBuf, Error> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        log::info!("Saved {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }
}

/// Embed `raster` as the only content of a fresh one-page PDF.
pub fn embed_single_page(raster: &RgbaImage, placement: &Placement, page: PageSize) -> Result<Vec<u8>, Error> {
    let (w, h) = raster.dimensions();
    if w == 0 || h == 0 {
        return Err(Error::PdfGenerationFailed("empty raster".to_string()));
    }

    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };
    let catalog_id = alloc();
    let pages_id = alloc();
    let page_id = alloc();
    let content_id = alloc();
    let image_id = alloc();
    let image_name = Name(b"Im1");

    // The background is opaque, so the alpha channel carries nothing.
    let rgb_data: Vec<u8> = raster
        .pixels()
        .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
        .collect();
    let compressed_rgb = miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6);
    {
        let mut xobj = pdf.image_xobject(image_id, &compressed_rgb);
        xobj.filter(Filter::FlateDecode);
        xobj.width(w as i32);
        xobj.height(h as i32);
        xobj.color_space().device_rgb();
        xobj.bits_per_component(8);
    }

    let page_w = page.width_pt();
    let page_h = page.height_pt();
    let img_w = placement.width_mm * PT_PER_MM;
    let img_h = placement.height_mm * PT_PER_MM;
    let x = placement.x_mm * PT_PER_MM;
    // PDF space grows upwards from the bottom-left corner.
    let y = page_h - placement.y_mm * PT_PER_MM - img_h;

    let mut content = Content::new();
    content.save_state();
    content.transform([img_w, 0.0, 0.0, img_h, x, y]);
    content.x_object(image_name);
    content.restore_state();
    let raw = content.finish();
    let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
    pdf.stream(content_id, &compressed).filter(Filter::FlateDecode);

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id).kids([page_id]).count(1);
    {
        let mut page_writer = pdf.page(page_id);
        page_writer
            .media_box(Rect::new(0.0, 0.0, page_w, page_h))
            .parent(pages_id)
            .contents(content_id);
        page_writer.resources().x_objects().pair(image_name, image_id);
    }

    Ok(pdf.finish())
}

/// Releases the in-flight flag on every exit path.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, Error> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight(flag))
            .map_err(|_| Error::ExportAlreadyInProgress)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn generation_failed(e: Error) -> Error {
    match e {
        Error::PdfGenerationFailed(_) => e,
        other => Error::PdfGenerationFailed(other.to_string()),
    }
}

/// Captures a mounted document and turns it into a downloadable PDF or an
/// inline preview image. At most one capture runs at a time.
pub struct ExportPipeline<R: Rasterizer> {
    rasterizer: R,
    options: ExportOptions,
    in_flight: AtomicBool,
}

impl<R: Rasterizer> ExportPipeline<R> {
    pub fn new(rasterizer: R) -> Self {
        Self::with_options(rasterizer, ExportOptions::default())
    }

    pub fn with_options(rasterizer: R, options: ExportOptions) -> Self {
        Self {
            rasterizer,
            options,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Rasterize the export instance (`pdf-content`) of `surfaces` and embed
    /// it into a one-page PDF named after the record.
    pub fn export(&self, surfaces: &Surfaces, record: &FormRecord, today: NaiveDate) -> Result<DownloadRequest, Error> {
        let _guard = InFlight::acquire(&self.in_flight)?;
        let t0 = std::time::Instant::now();

        let doc = surfaces
            .get(CONTENT_HANDLE)
            .ok_or_else(|| Error::RenderTargetMissing(CONTENT_HANDLE.to_string()))?;

        let raster = self
            .rasterizer
            .rasterize(doc, &self.options.raster(self.options.scale))
            .map_err(generation_failed)?;
        let t_raster = t0.elapsed();

        let placement = fit_to_page(raster.width(), raster.height(), self.options.page);
        let bytes = embed_single_page(&raster, &placement, self.options.page).map_err(generation_failed)?;
        let t_total = t0.elapsed();

        log::info!(
            "Export timing: rasterize={:.1}ms, embed={:.1}ms, total={:.1}ms (raster {}x{}, {}, output {} bytes)",
            t_raster.as_secs_f64() * 1000.0,
            (t_total - t_raster).as_secs_f64() * 1000.0,
            t_total.as_secs_f64() * 1000.0,
            raster.width(),
            raster.height(),
            if placement.scaled { "shrunk to fit" } else { "natural size" },
            bytes.len(),
        );

        Ok(DownloadRequest {
            file_name: export_file_name(&record.name, today),
            mime_type: "application/pdf",
            bytes,
        })
    }

    /// Rasterize whichever instance is mounted (the visible preview first) at
    /// preview scale and return it as a PNG `data:` URI.
    pub fn capture_preview(&self, surfaces: &Surfaces) -> Result<String, Error> {
        let _guard = InFlight::acquire(&self.in_flight)?;

        let doc = surfaces
            .get(PREVIEW_HANDLE)
            .or_else(|| surfaces.get(CONTENT_HANDLE))
            .ok_or_else(|| Error::RenderTargetMissing(PREVIEW_HANDLE.to_string()))?;

        let raster = self
            .rasterizer
            .rasterize(doc, &self.options.raster(self.options.preview_scale))
            .map_err(generation_failed)?;

        let mut png = Vec::new();
        raster
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| Error::PdfGenerationFailed(format!("PNG encoding failed: {e}")))?;
        Ok(data_uri("image/png", &png))
    }
}
