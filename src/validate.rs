use crate::error::PhotoRejection;
use crate::model::{ErrorSet, Field, FormRecord, Step};
use crate::photo::{ACCEPTED_PHOTO_TYPES, MAX_PHOTO_BYTES, PhotoUpload};

fn require(errors: &mut ErrorSet, field: Field, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.insert(field, message);
    }
}

/// Check the fields a step owns. An empty set means the step may be left
/// forwards. Runs against the whole record and never mutates it.
pub fn validate_step(step: Step, record: &FormRecord) -> ErrorSet {
    let mut errors = ErrorSet::new();
    match step {
        Step::Personal => {
            require(&mut errors, Field::Name, &record.name, "Name is required");
            if record.date_of_birth.is_empty() {
                errors.insert(Field::DateOfBirth, "Date of birth is required");
            }
            require(&mut errors, Field::Height, &record.height, "Height is required");
            require(&mut errors, Field::Caste, &record.caste, "Caste is required");
            require(&mut errors, Field::Religion, &record.religion, "Religion is required");
        }
        Step::Professional => {
            require(&mut errors, Field::Education, &record.education, "Education is required");
            require(&mut errors, Field::JobTitle, &record.job_title, "Job title is required");
            require(&mut errors, Field::Company, &record.company, "Company name is required");
            if !record.work_from_home {
                require(
                    &mut errors,
                    Field::WorkLocation,
                    &record.work_location,
                    "Work location is required when not working from home",
                );
            }
        }
        Step::Family => {
            require(&mut errors, Field::MotherName, &record.mother_name, "Mother's name is required");
            require(
                &mut errors,
                Field::MotherOccupation,
                &record.mother_occupation,
                "Mother's occupation is required",
            );
            require(&mut errors, Field::FatherName, &record.father_name, "Father's name is required");
            require(
                &mut errors,
                Field::FatherOccupation,
                &record.father_occupation,
                "Father's occupation is required",
            );
        }
        Step::Hobbies => {
            require(
                &mut errors,
                Field::Hobbies,
                &record.hobbies,
                "Please mention your hobbies and interests",
            );
        }
    }
    errors
}

/// Upload-time photo check: type first, then size.
pub fn validate_photo(upload: &PhotoUpload) -> Result<(), PhotoRejection> {
    if !ACCEPTED_PHOTO_TYPES.contains(&upload.mime_type.as_str()) {
        return Err(PhotoRejection::BadType);
    }
    if upload.size > MAX_PHOTO_BYTES {
        return Err(PhotoRejection::TooLarge);
    }
    Ok(())
}
