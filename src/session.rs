use crate::dates::Clock;
use crate::error::Error;
use crate::export::{DownloadRequest, ExportOptions, ExportPipeline};
use crate::model::{RecordPatch, Step};
use crate::photo::PhotoUpload;
use crate::raster::Rasterizer;
use crate::render::{BiodataTemplate, CONTENT_HANDLE, DocumentRenderer, PREVIEW_HANDLE, Surfaces};
use crate::wizard::{Phase, SimulatedSubmitter, Submitter, Transition, Wizard};

pub const SUBMITTED_MESSAGE: &str = "Biodata form submitted successfully!";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// A message the host shows to the user (an alert, a toast, a line on stderr).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserNotification {
    pub level: NotificationLevel,
    pub message: String,
}

impl UserNotification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Something the session asks its host to do.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Download(DownloadRequest),
    Notify(UserNotification),
    /// The record was submitted; the host shows its completion screen.
    Completed,
}

/// The host page: a wizard plus the document views mounted while the review
/// screen is up, the export pipeline and the submission sink.
///
/// While the wizard is in preview the export instance (`pdf-content`) is
/// always mounted; the visible instance (`pdf-preview`) is mounted only while
/// the user has it toggled on. Leaving preview unmounts both. Record changes
/// made while in preview re-render whatever is mounted.
pub struct Session<C: Clock, R: Rasterizer> {
    wizard: Wizard<C>,
    renderer: Option<Box<dyn DocumentRenderer>>,
    surfaces: Surfaces,
    pipeline: ExportPipeline<R>,
    submitter: Box<dyn Submitter>,
    show_pdf_preview: bool,
}

impl<C: Clock, R: Rasterizer> Session<C, R> {
    pub fn new(clock: C, rasterizer: R) -> Self {
        Self::with_options(clock, rasterizer, ExportOptions::default())
    }

    pub fn with_options(clock: C, rasterizer: R, options: ExportOptions) -> Self {
        Self {
            wizard: Wizard::new(clock),
            renderer: None,
            surfaces: Surfaces::new(),
            pipeline: ExportPipeline::with_options(rasterizer, options),
            submitter: Box::new(SimulatedSubmitter::default()),
            show_pdf_preview: false,
        }
    }

    /// Use `renderer` instead of the built-in template dated by the clock.
    pub fn with_renderer(mut self, renderer: impl DocumentRenderer + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    pub fn with_submitter(mut self, submitter: impl Submitter + 'static) -> Self {
        self.submitter = Box::new(submitter);
        self
    }

    pub fn wizard(&self) -> &Wizard<C> {
        &self.wizard
    }

    pub fn surfaces(&self) -> &Surfaces {
        &self.surfaces
    }

    pub fn pipeline(&self) -> &ExportPipeline<R> {
        &self.pipeline
    }

    pub fn pdf_preview_visible(&self) -> bool {
        self.show_pdf_preview
    }

    /// Bring the mounted views in line with the wizard's phase.
    fn sync_surfaces(&mut self) {
        if !self.wizard.in_preview() {
            self.show_pdf_preview = false;
            self.surfaces.clear();
            return;
        }
        let doc = match &self.renderer {
            Some(renderer) => renderer.render(self.wizard.record()),
            None => BiodataTemplate::new(self.wizard.clock().today()).render(self.wizard.record()),
        };
        if self.show_pdf_preview {
            self.surfaces.mount(PREVIEW_HANDLE, doc.clone());
        } else {
            self.surfaces.unmount(PREVIEW_HANDLE);
        }
        self.surfaces.mount(CONTENT_HANDLE, doc);
    }

    fn navigated(&mut self, transition: Transition) -> Transition {
        if transition.moved() {
            self.sync_surfaces();
        }
        transition
    }

    /// Re-render the mounted views after the record changed under them.
    fn record_changed(&mut self) {
        if self.wizard.in_preview() {
            self.sync_surfaces();
        }
    }

    pub fn edit(&mut self, patch: RecordPatch) {
        self.wizard.edit(patch);
        self.record_changed();
    }

    pub fn upload_photo(&mut self, upload: PhotoUpload) -> Result<(), Error> {
        self.wizard.upload_photo(upload)?;
        self.record_changed();
        Ok(())
    }

    pub fn remove_photo(&mut self) {
        self.wizard.remove_photo();
        self.record_changed();
    }

    pub fn add_hobby(&mut self, hobby: &str) {
        self.wizard.add_hobby(hobby);
        self.record_changed();
    }

    pub fn advance(&mut self) -> Transition {
        let t = self.wizard.advance();
        self.navigated(t)
    }

    pub fn retreat(&mut self) -> Transition {
        let t = self.wizard.retreat();
        self.navigated(t)
    }

    pub fn enter_preview(&mut self) -> Transition {
        let t = self.wizard.enter_preview();
        self.navigated(t)
    }

    pub fn edit_from_preview(&mut self, step: Step) -> Transition {
        let t = self.wizard.edit_from_preview(step);
        self.navigated(t)
    }

    /// Show or hide the inline document view. Returns the new visibility.
    pub fn toggle_pdf_preview(&mut self) -> bool {
        if !self.wizard.in_preview() {
            return false;
        }
        self.show_pdf_preview = !self.show_pdf_preview;
        self.sync_surfaces();
        self.show_pdf_preview
    }

    /// "Download PDF" on the review screen.
    pub fn download_pdf(&mut self) -> Vec<Effect> {
        match self.wizard.export_pdf(&self.pipeline, &self.surfaces) {
            Ok(download) => vec![Effect::Download(download)],
            Err(e) => vec![Effect::Notify(UserNotification::error(e.user_message()))],
        }
    }

    /// Inline PNG image of the mounted document, for hosts that cannot show
    /// the display list directly.
    pub fn capture_preview(&self) -> Result<String, Error> {
        self.pipeline.capture_preview(&self.surfaces)
    }

    pub fn submit(&mut self) -> Vec<Effect> {
        match self.wizard.submit(self.submitter.as_mut()) {
            Ok(t) if t.moved() => {
                self.sync_surfaces();
                vec![
                    Effect::Notify(UserNotification::info(SUBMITTED_MESSAGE)),
                    Effect::Completed,
                ]
            }
            Ok(_) => Vec::new(),
            Err(e) => vec![Effect::Notify(UserNotification::error(e.user_message()))],
        }
    }

    /// "Create another biodata".
    pub fn reset(&mut self) {
        self.wizard.reset();
        self.sync_surfaces();
    }

    pub fn phase(&self) -> Phase {
        self.wizard.phase()
    }
}
