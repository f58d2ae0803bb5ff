mod dates;
mod error;
mod export;
mod fonts;
mod model;
mod photo;
mod raster;
pub mod render;
mod session;
mod validate;
mod wizard;

pub use dates::{Clock, FixedClock, SystemClock, age_on, derive_age, iso_date, long_date, parse_iso_date};
pub use error::{Error, PhotoRejection};
pub use export::{
    DownloadRequest, ExportOptions, ExportPipeline, PageSize, Placement, embed_single_page, export_file_name,
    fit_to_page,
};
pub use model::{ErrorSet, Field, FormRecord, POPULAR_HOBBIES, RELIGIONS, RecordPatch, Step};
pub use photo::{ACCEPTED_PHOTO_TYPES, MAX_PHOTO_BYTES, Photo, PhotoUpload, data_uri, decode_data_uri};
pub use raster::{RasterOptions, Rasterizer, SoftwareRasterizer, canvas_size};
pub use session::{Effect, NotificationLevel, SUBMITTED_MESSAGE, Session, UserNotification};
pub use validate::{validate_photo, validate_step};
pub use wizard::{Phase, SimulatedSubmitter, Submitter, Transition, Wizard};

use std::time::Instant;

use chrono::NaiveDate;
use render::{BiodataTemplate, CONTENT_HANDLE, DocumentRenderer, Surfaces};

/// Render `record` with the built-in template and export it in one go,
/// without going through the wizard.
pub fn export_record_pdf(
    record: &FormRecord,
    today: NaiveDate,
    options: ExportOptions,
) -> Result<DownloadRequest, Error> {
    let t0 = Instant::now();

    let doc = BiodataTemplate::new(today).render(record);
    let mut surfaces = Surfaces::new();
    surfaces.mount(CONTENT_HANDLE, doc);
    let t_render = t0.elapsed();

    let pipeline = ExportPipeline::with_options(SoftwareRasterizer, options);
    let download = pipeline.export(&surfaces, record, today)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: render={:.1}ms, export={:.1}ms, total={:.1}ms (output {} bytes)",
        t_render.as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        download.bytes.len(),
    );

    Ok(download)
}
