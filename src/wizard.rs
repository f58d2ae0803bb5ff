use crate::dates::Clock;
use crate::error::Error;
use crate::export::{DownloadRequest, ExportPipeline};
use crate::model::{ErrorSet, Field, FormRecord, RecordPatch, Step};
use crate::photo::{PhotoUpload, data_uri};
use crate::raster::Rasterizer;
use crate::render::Surfaces;
use crate::validate::{validate_photo, validate_step};

/// Where the wizard is. Preview and the step index cannot disagree because
/// there is only one of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Step(Step),
    Preview,
    /// Terminal: the record was handed to the submitter.
    Submitted,
}

/// Outcome of a navigation request.
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    Moved { from: Phase, to: Phase },
    /// Validation failed; the same errors are now the wizard's error set.
    Blocked(ErrorSet),
    /// The request has no meaning in the current phase.
    Ignored,
}

impl Transition {
    pub fn moved(&self) -> bool {
        matches!(self, Transition::Moved { .. })
    }
}

/// Receives the completed record.
pub trait Submitter {
    fn submit(&mut self, record: &FormRecord) -> Result<(), Error>;
}

/// Stand-in for a backend: logs the record and optionally waits, like a
/// network round trip would.
#[derive(Clone, Debug, Default)]
pub struct SimulatedSubmitter {
    pub delay: std::time::Duration,
    pub submitted: Vec<FormRecord>,
}

impl Submitter for SimulatedSubmitter {
    fn submit(&mut self, record: &FormRecord) -> Result<(), Error> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        log::info!(
            "Submitted biodata for {:?} (photo: {})",
            record.name,
            record.photo.as_ref().map_or(0, |p| p.size())
        );
        self.submitted.push(record.clone());
        Ok(())
    }
}

/// Sets a busy flag for as long as it lives.
struct Busy<'a>(&'a mut bool);

impl<'a> Busy<'a> {
    fn raise(flag: &'a mut bool) -> Self {
        *flag = true;
        Busy(flag)
    }
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

/// The multi-step form controller. Owns the record, the error set and the
/// current phase; views read it and send edits back through its methods.
pub struct Wizard<C: Clock> {
    clock: C,
    phase: Phase,
    record: FormRecord,
    errors: ErrorSet,
    exporting: bool,
    submitting: bool,
}

impl<C: Clock> Wizard<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            phase: Phase::Step(Step::Personal),
            record: FormRecord::default(),
            errors: ErrorSet::new(),
            exporting: false,
            submitting: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The step being edited, or the step "back" returns to from preview.
    pub fn current_step(&self) -> Step {
        match self.phase {
            Phase::Step(step) => step,
            Phase::Preview | Phase::Submitted => Step::Hobbies,
        }
    }

    pub fn in_preview(&self) -> bool {
        self.phase == Phase::Preview
    }

    pub fn record(&self) -> &FormRecord {
        &self.record
    }

    pub fn errors(&self) -> &ErrorSet {
        &self.errors
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn title(&self) -> &'static str {
        match self.phase {
            Phase::Step(step) => step.title(),
            Phase::Preview => "Preview Your Details",
            Phase::Submitted => "Success!",
        }
    }

    /// `(step number, total, percent complete)` for the progress bar.
    pub fn progress(&self) -> (u8, u8, u8) {
        let n = self.current_step().number();
        (n, Step::COUNT, n * 100 / Step::COUNT)
    }

    fn move_to(&mut self, to: Phase) -> Transition {
        let from = self.phase;
        log::debug!("wizard: {from:?} -> {to:?}");
        self.phase = to;
        Transition::Moved { from, to }
    }

    /// Replace the error set with a fresh validation of `step`.
    fn check(&mut self, step: Step) -> Result<(), ErrorSet> {
        self.errors = validate_step(step, &self.record);
        if self.errors.is_empty() {
            Ok(())
        } else {
            log::debug!("wizard: step {} blocked on {:?}", step.number(), self.errors.fields());
            Err(self.errors.clone())
        }
    }

    /// Validate the current step and go to the next one (steps 1..=3).
    pub fn advance(&mut self) -> Transition {
        let Phase::Step(step) = self.phase else {
            return Transition::Ignored;
        };
        let Some(next) = step.next() else {
            return Transition::Ignored;
        };
        if let Err(errors) = self.check(step) {
            return Transition::Blocked(errors);
        }
        self.errors = ErrorSet::new();
        self.move_to(Phase::Step(next))
    }

    /// One step back. From preview this returns to the last step.
    pub fn retreat(&mut self) -> Transition {
        match self.phase {
            Phase::Preview => self.move_to(Phase::Step(Step::Hobbies)),
            Phase::Step(step) => match step.previous() {
                Some(prev) => {
                    self.errors = ErrorSet::new();
                    self.move_to(Phase::Step(prev))
                }
                None => Transition::Ignored,
            },
            Phase::Submitted => Transition::Ignored,
        }
    }

    /// Validate the last step and show the review screen.
    pub fn enter_preview(&mut self) -> Transition {
        if self.phase != Phase::Step(Step::Hobbies) {
            return Transition::Ignored;
        }
        if let Err(errors) = self.check(Step::Hobbies) {
            return Transition::Blocked(errors);
        }
        self.move_to(Phase::Preview)
    }

    /// Jump straight into `step` (the review screen's "Edit" buttons).
    pub fn edit_from_preview(&mut self, step: Step) -> Transition {
        if self.phase == Phase::Submitted {
            return Transition::Ignored;
        }
        self.errors = ErrorSet::new();
        self.move_to(Phase::Step(step))
    }

    /// Merge `patch` into the record. Errors are left alone.
    pub fn update_record(&mut self, patch: RecordPatch) {
        patch.apply_to(&mut self.record, self.clock.today());
    }

    /// What a step view sends when the user edits fields: the patch is merged
    /// and the errors of the touched fields disappear.
    pub fn edit(&mut self, patch: RecordPatch) {
        let touched = patch.fields();
        self.update_record(patch);
        for field in touched {
            self.errors.clear(field);
        }
    }

    /// Check and read a picked photo. The record only changes when both the
    /// upload checks and the read succeed.
    pub fn upload_photo(&mut self, upload: PhotoUpload) -> Result<(), Error> {
        if let Err(reason) = validate_photo(&upload) {
            log::debug!("photo {} rejected: {reason}", upload.file_name);
            self.errors.insert(Field::Photo, reason.message());
            return Err(Error::PhotoRejected(reason));
        }
        let photo = match upload.read() {
            Ok(photo) => photo,
            Err(e) => {
                log::warn!("{e}");
                self.errors.insert(Field::Photo, e.user_message());
                return Err(e);
            }
        };
        let preview = data_uri(&photo.mime_type, &photo.data);
        self.update_record(RecordPatch::new().photo(Some(photo), Some(preview)));
        self.errors.clear(Field::Photo);
        Ok(())
    }

    pub fn remove_photo(&mut self) {
        self.update_record(RecordPatch::new().photo(None, None));
    }

    /// Append a quick-pick hobby unless it is already mentioned.
    pub fn add_hobby(&mut self, hobby: &str) {
        let current = &self.record.hobbies;
        let hobbies = if current.is_empty() {
            hobby.to_string()
        } else if current.to_lowercase().contains(&hobby.to_lowercase()) {
            return;
        } else {
            format!("{current}, {hobby}")
        };
        self.edit(RecordPatch::new().hobbies(hobbies));
    }

    /// Produce the PDF for the current record. The `exporting` flag is raised
    /// for the duration and dropped on every path; nothing else changes.
    /// Overlapping exports are refused by the pipeline's in-flight guard.
    pub fn export_pdf<R: Rasterizer>(
        &mut self,
        pipeline: &ExportPipeline<R>,
        surfaces: &Surfaces,
    ) -> Result<DownloadRequest, Error> {
        let today = self.clock.today();
        let _busy = Busy::raise(&mut self.exporting);
        pipeline.export(surfaces, &self.record, today).inspect_err(|e| {
            log::error!("PDF export failed: {e}");
        })
    }

    /// Hand the record to `submitter`. Only possible from preview; a failure
    /// keeps the wizard in preview so the user can retry.
    pub fn submit(&mut self, submitter: &mut dyn Submitter) -> Result<Transition, Error> {
        if self.phase != Phase::Preview || self.submitting {
            return Ok(Transition::Ignored);
        }
        let result = {
            let _busy = Busy::raise(&mut self.submitting);
            submitter.submit(&self.record)
        };
        match result {
            Ok(()) => Ok(self.move_to(Phase::Submitted)),
            Err(e) => {
                log::error!("submission failed: {e}");
                Err(match e {
                    Error::SubmissionFailed(_) => e,
                    other => Error::SubmissionFailed(other.to_string()),
                })
            }
        }
    }

    /// Start over with an empty record.
    pub fn reset(&mut self) {
        self.record = FormRecord::default();
        self.errors = ErrorSet::new();
        self.exporting = false;
        self.submitting = false;
        self.phase = Phase::Step(Step::Personal);
    }
}
