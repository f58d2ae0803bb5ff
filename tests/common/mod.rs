#![allow(dead_code)]

use std::io::Cursor;
use std::sync::{Arc, Mutex, mpsc};

use biodata_wizard::render::RenderedDocument;
use biodata_wizard::{Error, FixedClock, FormRecord, RasterOptions, Rasterizer, RecordPatch, Submitter};
use chrono::NaiveDate;
use image::{Rgba, RgbaImage};

/// Route library logs through the test harness; safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// The date every test runs "on".
pub fn today() -> NaiveDate {
    day(2024, 6, 14)
}

pub fn clock() -> FixedClock {
    FixedClock(today())
}

pub fn personal() -> RecordPatch {
    RecordPatch::new()
        .name("Asha Rao")
        .date_of_birth("2000-06-15")
        .height("5'6\"")
        .caste("Iyer")
        .religion("Hindu")
}

pub fn professional() -> RecordPatch {
    RecordPatch::new()
        .education("B.Tech")
        .job_title("Engineer")
        .company("Acme")
        .work_location("Pune")
}

pub fn family() -> RecordPatch {
    RecordPatch::new()
        .mother_name("Lata")
        .mother_occupation("Teacher")
        .father_name("Ravi")
        .father_occupation("Doctor")
}

pub fn hobbies() -> RecordPatch {
    RecordPatch::new().hobbies("Reading, Music")
}

/// Steps are applied one after another, like a user filling the form.
pub fn complete_patches() -> Vec<RecordPatch> {
    vec![personal(), professional(), family(), hobbies()]
}

pub fn complete_record() -> FormRecord {
    FormRecord {
        name: "Asha Rao".into(),
        date_of_birth: "2000-06-15".into(),
        age: "23".into(),
        height: "5'6\"".into(),
        caste: "Iyer".into(),
        religion: "Hindu".into(),
        education: "B.Tech".into(),
        job_title: "Engineer".into(),
        company: "Acme".into(),
        work_location: "Pune".into(),
        mother_name: "Lata".into(),
        mother_occupation: "Teacher".into(),
        father_name: "Ravi".into(),
        father_occupation: "Doctor".into(),
        hobbies: "Reading, Music".into(),
        ..FormRecord::default()
    }
}

pub fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .expect("encode png");
    out
}

/// Ignores the document and returns a blank raster of a fixed size.
pub struct FixedRasterizer {
    pub width: u32,
    pub height: u32,
}

impl Rasterizer for FixedRasterizer {
    fn rasterize(&self, _doc: &RenderedDocument, _options: &RasterOptions) -> Result<RgbaImage, Error> {
        Ok(RgbaImage::from_pixel(self.width, self.height, Rgba([255, 255, 255, 255])))
    }
}

/// Rasterizes at the document's own size times the requested scale.
pub struct ScaledBlankRasterizer;

impl Rasterizer for ScaledBlankRasterizer {
    fn rasterize(&self, doc: &RenderedDocument, options: &RasterOptions) -> Result<RgbaImage, Error> {
        let (w, h) = biodata_wizard::canvas_size(doc, options.scale)?;
        Ok(RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255])))
    }
}

pub struct FailingRasterizer;

impl Rasterizer for FailingRasterizer {
    fn rasterize(&self, _doc: &RenderedDocument, _options: &RasterOptions) -> Result<RgbaImage, Error> {
        Err(Error::PdfGenerationFailed("canvas unavailable".into()))
    }
}

/// Announces that it started, then blocks until released.
pub struct StallingRasterizer {
    pub started: Mutex<mpsc::Sender<()>>,
    pub release: Mutex<mpsc::Receiver<()>>,
}

impl Rasterizer for StallingRasterizer {
    fn rasterize(&self, _doc: &RenderedDocument, _options: &RasterOptions) -> Result<RgbaImage, Error> {
        self.started.lock().expect("lock").send(()).expect("send started");
        self.release.lock().expect("lock").recv().expect("recv release");
        Ok(RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255])))
    }
}

/// Records what it was asked to submit; fails while `fail` is set.
#[derive(Clone, Default)]
pub struct RecordingSubmitter {
    pub fail: bool,
    pub received: Arc<Mutex<Vec<FormRecord>>>,
}

impl Submitter for RecordingSubmitter {
    fn submit(&mut self, record: &FormRecord) -> Result<(), Error> {
        if self.fail {
            return Err(Error::SubmissionFailed("backend unavailable".into()));
        }
        self.received.lock().expect("lock").push(record.clone());
        Ok(())
    }
}

fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, w)| *w == needle)
        .map(|(i, _)| i)
        .collect()
}

/// Page objects (`/Type /Page`, not `/Pages`) in a PDF.
pub fn page_count(pdf: &[u8]) -> usize {
    find_all(pdf, b"/Type /Page")
        .into_iter()
        .filter(|&i| pdf.get(i + b"/Type /Page".len()) != Some(&b's'))
        .count()
}

fn numbers_before(text: &str, op: &str) -> Option<Vec<f32>> {
    let line = text.lines().find(|l| l.trim_end().ends_with(op))?;
    let nums: Vec<f32> = line
        .split_whitespace()
        .filter_map(|s| s.parse().ok())
        .collect();
    Some(nums)
}

/// `(width, height)` in points of the first media box.
pub fn media_box(pdf: &[u8]) -> Option<(f32, f32)> {
    let start = find_all(pdf, b"/MediaBox [").into_iter().next()? + b"/MediaBox [".len();
    let end = start + pdf[start..].iter().position(|&b| b == b']')?;
    let nums: Vec<f32> = String::from_utf8_lossy(&pdf[start..end])
        .split_whitespace()
        .filter_map(|s| s.parse().ok())
        .collect();
    match nums.as_slice() {
        [x0, y0, x1, y1] => Some((x1 - x0, y1 - y0)),
        _ => None,
    }
}

/// Inflated payloads of every Flate stream in the file.
pub fn streams(pdf: &[u8]) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    for i in find_all(pdf, b"stream") {
        if i >= 3 && &pdf[i - 3..i] == b"end" {
            continue;
        }
        let mut start = i + b"stream".len();
        if pdf.get(start) == Some(&b'\r') {
            start += 1;
        }
        if pdf.get(start) == Some(&b'\n') {
            start += 1;
        }
        let Some(mut len) = find_all(&pdf[start..], b"endstream").into_iter().next() else {
            continue;
        };
        while len > 0 && matches!(pdf[start + len - 1], b'\n' | b'\r') {
            len -= 1;
        }
        if let Ok(data) = miniz_oxide::inflate::decompress_to_vec_zlib(&pdf[start..start + len]) {
            out.push(data);
        }
    }
    out
}

/// The `cm` matrix that places the page image, in points.
pub fn image_matrix(pdf: &[u8]) -> Option<Vec<f32>> {
    streams(pdf).into_iter().find_map(|s| {
        let text = String::from_utf8_lossy(&s).into_owned();
        if !text.contains("Do") {
            return None;
        }
        numbers_before(&text, "cm")
    })
}

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 0.05
}
