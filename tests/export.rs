mod common;

use std::sync::{Arc, Mutex, mpsc};
use std::thread;

use biodata_wizard::render::{
    BiodataTemplate, CONTENT_HANDLE, DocumentRenderer, Element, PREVIEW_HANDLE, RenderedDocument, Surfaces,
};
use biodata_wizard::{
    Error, ExportOptions, ExportPipeline, FormRecord, PageSize, Placement, RasterOptions, Rasterizer,
    SoftwareRasterizer, decode_data_uri, embed_single_page, export_file_name, export_record_pdf, fit_to_page,
};
use common::approx;
use image::{Rgba, RgbaImage};
use pretty_assertions::assert_eq;

fn mounted(record: &FormRecord) -> Surfaces {
    let mut surfaces = Surfaces::new();
    surfaces.mount(CONTENT_HANDLE, BiodataTemplate::new(common::today()).render(record));
    surfaces
}

#[test]
fn short_raster_is_placed_at_natural_scale() {
    let p = fit_to_page(1588, 2244, PageSize::A4);
    assert!(!p.scaled);
    assert_eq!(p.x_mm, 0.0);
    assert_eq!(p.y_mm, 0.0);
    assert_eq!(p.width_mm, 210.0);
    assert!(approx(p.height_mm, 2244.0 * 210.0 / 1588.0));
    assert!(p.height_mm <= 297.0);
}

#[test]
fn tall_raster_is_shrunk_and_centred() {
    // derived height 420mm
    let p = fit_to_page(1000, 2000, PageSize::A4);
    assert!(p.scaled);
    assert!(approx(p.height_mm, 297.0));
    assert!(approx(p.width_mm, 210.0 * 297.0 / 420.0));
    assert!(approx(p.x_mm, (210.0 - p.width_mm) / 2.0));
    assert_eq!(p.y_mm, 0.0);
}

#[test]
fn exact_page_ratio_is_not_scaled() {
    let p = fit_to_page(210, 297, PageSize::A4);
    assert!(!p.scaled);
    assert!(approx(p.height_mm, 297.0));
}

#[test]
fn file_name_collapses_whitespace() {
    let today = common::today();
    assert_eq!(export_file_name("Asha Rao", today), "Asha_Rao_Biodata_2024-06-14.pdf");
    assert_eq!(export_file_name("Asha  \t Rao", today), "Asha_Rao_Biodata_2024-06-14.pdf");
    assert_eq!(export_file_name("Asha", today), "Asha_Biodata_2024-06-14.pdf");
}

#[test]
fn embedded_pdf_has_one_a4_page() {
    let raster = RgbaImage::from_pixel(40, 56, Rgba([255, 255, 255, 255]));
    let placement = fit_to_page(40, 56, PageSize::A4);
    let pdf = embed_single_page(&raster, &placement, PageSize::A4).expect("embed");

    assert!(pdf.starts_with(b"%PDF-"));
    assert_eq!(common::page_count(&pdf), 1);
    let (w, h) = common::media_box(&pdf).expect("media box");
    assert!(approx(w, PageSize::A4.width_pt()));
    assert!(approx(h, PageSize::A4.height_pt()));
}

#[test]
fn shrunk_image_is_centred_on_the_page() {
    let raster = RgbaImage::from_pixel(100, 200, Rgba([255, 255, 255, 255]));
    let placement = fit_to_page(100, 200, PageSize::A4);
    let pdf = embed_single_page(&raster, &placement, PageSize::A4).expect("embed");

    let m = common::image_matrix(&pdf).expect("placement matrix");
    let page_w = PageSize::A4.width_pt();
    let page_h = PageSize::A4.height_pt();
    let (img_w, img_h, x, y) = (m[0], m[3], m[4], m[5]);
    assert!(approx(img_h, page_h));
    assert!(img_w < page_w);
    assert!(approx(x, (page_w - img_w) / 2.0));
    assert!(approx(y, 0.0));
}

#[test]
fn natural_image_hangs_from_the_top_left() {
    let raster = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
    let placement = fit_to_page(100, 100, PageSize::A4);
    let pdf = embed_single_page(&raster, &placement, PageSize::A4).expect("embed");

    let m = common::image_matrix(&pdf).expect("placement matrix");
    let page_w = PageSize::A4.width_pt();
    let page_h = PageSize::A4.height_pt();
    assert!(approx(m[0], page_w));
    assert!(approx(m[3], page_w));
    assert!(approx(m[4], 0.0));
    assert!(approx(m[5] + m[3], page_h));
}

#[test]
fn empty_raster_cannot_be_embedded() {
    let placement = Placement {
        x_mm: 0.0,
        y_mm: 0.0,
        width_mm: 210.0,
        height_mm: 297.0,
        scaled: false,
    };
    let err = embed_single_page(&RgbaImage::new(0, 0), &placement, PageSize::A4).expect_err("empty");
    assert!(matches!(err, Error::PdfGenerationFailed(_)));
}

#[test]
fn missing_target_is_reported() {
    let pipeline = ExportPipeline::new(common::FixedRasterizer { width: 10, height: 10 });
    let err = pipeline
        .export(&Surfaces::new(), &common::complete_record(), common::today())
        .expect_err("nothing mounted");
    assert!(matches!(err, Error::RenderTargetMissing(ref h) if h == "pdf-content"));
    assert!(!pipeline.is_busy());
}

#[test]
fn only_the_export_instance_is_captured() {
    let mut surfaces = Surfaces::new();
    surfaces.mount(PREVIEW_HANDLE, BiodataTemplate::new(common::today()).render(&common::complete_record()));
    let pipeline = ExportPipeline::new(common::FixedRasterizer { width: 10, height: 10 });
    let err = pipeline
        .export(&surfaces, &common::complete_record(), common::today())
        .expect_err("preview is not exported");
    assert!(matches!(err, Error::RenderTargetMissing(_)));
}

#[test]
fn export_uses_the_configured_scale() {
    let record = common::complete_record();
    let pipeline = ExportPipeline::new(common::ScaledBlankRasterizer);
    let download = pipeline
        .export(&mounted(&record), &record, common::today())
        .expect("export");
    assert_eq!(download.mime_type, "application/pdf");
    assert_eq!(download.file_name, "Asha_Rao_Biodata_2024-06-14.pdf");
    assert_eq!(common::page_count(&download.bytes), 1);
    // /Width of the image XObject
    let pdf = String::from_utf8_lossy(&download.bytes);
    assert!(pdf.contains("/Width 1588"), "raster should be 2x the 794px page");
}

#[test]
fn overflowing_document_still_exports_one_page() {
    let record = FormRecord {
        hobbies: vec!["Chess"; 200].join("\n"),
        ..common::complete_record()
    };
    let pipeline = ExportPipeline::with_options(
        common::ScaledBlankRasterizer,
        ExportOptions {
            scale: 1.0,
            ..ExportOptions::default()
        },
    );
    let download = pipeline
        .export(&mounted(&record), &record, common::today())
        .expect("export");
    assert_eq!(common::page_count(&download.bytes), 1);

    let m = common::image_matrix(&download.bytes).expect("placement matrix");
    assert!(approx(m[3], PageSize::A4.height_pt()));
    assert!(m[4] > 0.0);
}

#[test]
fn rasterizer_failure_becomes_generation_failure() {
    struct BadScale;
    impl Rasterizer for BadScale {
        fn rasterize(
            &self,
            doc: &biodata_wizard::render::RenderedDocument,
            _options: &RasterOptions,
        ) -> Result<RgbaImage, Error> {
            biodata_wizard::canvas_size(doc, f32::NAN)?;
            unreachable!()
        }
    }

    let record = common::complete_record();
    let pipeline = ExportPipeline::new(BadScale);
    let err = pipeline
        .export(&mounted(&record), &record, common::today())
        .expect_err("bad scale");
    assert!(matches!(err, Error::PdfGenerationFailed(_)));
    assert!(!pipeline.is_busy());
}

#[test]
fn second_export_while_one_is_running_is_rejected() {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let pipeline = Arc::new(ExportPipeline::new(common::StallingRasterizer {
        started: Mutex::new(started_tx),
        release: Mutex::new(release_rx),
    }));
    let record = common::complete_record();
    let surfaces = Arc::new(mounted(&record));

    let first = {
        let pipeline = Arc::clone(&pipeline);
        let surfaces = Arc::clone(&surfaces);
        let record = record.clone();
        thread::spawn(move || pipeline.export(&surfaces, &record, common::today()))
    };

    started_rx.recv().expect("first export started");
    assert!(pipeline.is_busy());
    let err = pipeline
        .export(&surfaces, &record, common::today())
        .expect_err("second export");
    assert!(matches!(err, Error::ExportAlreadyInProgress));
    let err = pipeline.capture_preview(&surfaces).expect_err("capture while busy");
    assert!(matches!(err, Error::ExportAlreadyInProgress));

    release_tx.send(()).expect("release");
    let download = first.join().expect("join").expect("first export");
    assert_eq!(common::page_count(&download.bytes), 1);
    assert!(!pipeline.is_busy());
}

#[test]
fn capture_preview_returns_png_data_uri() {
    let record = common::complete_record();
    let mut surfaces = mounted(&record);
    let pipeline = ExportPipeline::new(common::ScaledBlankRasterizer);

    let uri = pipeline.capture_preview(&surfaces).expect("capture");
    assert!(uri.starts_with("data:image/png;base64,"));
    let png = decode_data_uri(&uri).expect("base64");
    let img = image::load_from_memory(&png).expect("png");
    // preview scale is 1.0
    assert_eq!(img.width(), 794);

    surfaces.clear();
    let err = pipeline.capture_preview(&surfaces).expect_err("nothing mounted");
    assert!(matches!(err, Error::RenderTargetMissing(_)));
}

#[test]
fn software_rasterizer_paints_the_document() {
    common::init_logging();
    let png = common::png_bytes(16, 16, [0, 0, 255, 255]);
    let record = FormRecord {
        photo_preview: Some(biodata_wizard::data_uri("image/png", &png)),
        ..common::complete_record()
    };
    let doc = BiodataTemplate::new(common::today()).render(&record);
    let raster = SoftwareRasterizer
        .rasterize(&doc, &RasterOptions::default())
        .expect("rasterize");
    assert_eq!(raster.dimensions(), (794, 1122));

    // background stays white, the frame border is accent coloured
    assert_eq!(raster.get_pixel(2, 2).0, [255, 255, 255, 255]);
    let non_white = raster.pixels().filter(|p| p.0 != [255, 255, 255, 255]).count();
    assert!(non_white > 1000);
    let blue = raster
        .pixels()
        .filter(|p| p.0[0] < 40 && p.0[1] < 40 && p.0[2] > 215)
        .count();
    assert!(blue > 100, "photo should be painted");

    // the same page without its text runs must differ: labels and values are inked
    let bare = RenderedDocument {
        elements: doc
            .elements
            .iter()
            .filter(|e| !matches!(e, Element::Text(_)))
            .cloned()
            .collect(),
        ..doc.clone()
    };
    let blank = SoftwareRasterizer
        .rasterize(&bare, &RasterOptions::default())
        .expect("rasterize");
    let inked = raster
        .pixels()
        .zip(blank.pixels())
        .filter(|(a, b)| a != b)
        .count();
    assert!(inked > 1000, "text should be painted, {inked} pixels differ");
}

#[test]
fn end_to_end_export() {
    common::init_logging();
    let record = common::complete_record();
    let download = export_record_pdf(
        &record,
        common::today(),
        ExportOptions {
            scale: 1.0,
            ..ExportOptions::default()
        },
    )
    .expect("export");
    assert_eq!(download.file_name, "Asha_Rao_Biodata_2024-06-14.pdf");
    assert_eq!(common::page_count(&download.bytes), 1);

    let dir = std::env::temp_dir().join(format!("biodata-wizard-test-{}", std::process::id()));
    let path = download.save_in(&dir).expect("save");
    assert_eq!(std::fs::read(&path).expect("read back"), download.bytes);
    let _ = std::fs::remove_dir_all(&dir);
}
