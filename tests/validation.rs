mod common;

use biodata_wizard::{
    Field, FormRecord, MAX_PHOTO_BYTES, PhotoRejection, PhotoUpload, Step, validate_photo, validate_step,
};
use pretty_assertions::assert_eq;

#[test]
fn empty_record_fails_every_step_with_its_own_fields() {
    let record = FormRecord::default();

    let expected = [
        (Step::Personal, vec![Field::Name, Field::DateOfBirth, Field::Height, Field::Caste, Field::Religion]),
        (Step::Professional, vec![Field::Education, Field::JobTitle, Field::Company, Field::WorkLocation]),
        (
            Step::Family,
            vec![Field::MotherName, Field::MotherOccupation, Field::FatherName, Field::FatherOccupation],
        ),
        (Step::Hobbies, vec![Field::Hobbies]),
    ];
    for (step, fields) in expected {
        assert_eq!(validate_step(step, &record).fields(), fields, "step {step:?}");
    }
}

#[test]
fn complete_record_passes_every_step() {
    let record = common::complete_record();
    for step in Step::ALL {
        assert!(validate_step(step, &record).is_empty(), "step {step:?}");
    }
}

#[test]
fn messages_match_the_form() {
    let errors = validate_step(Step::Personal, &FormRecord::default());
    assert_eq!(errors.get(Field::Name), Some("Name is required"));
    assert_eq!(errors.get(Field::DateOfBirth), Some("Date of birth is required"));

    let errors = validate_step(Step::Professional, &FormRecord::default());
    assert_eq!(errors.get(Field::Company), Some("Company name is required"));
    assert_eq!(
        errors.get(Field::WorkLocation),
        Some("Work location is required when not working from home")
    );

    let errors = validate_step(Step::Hobbies, &FormRecord::default());
    assert_eq!(errors.get(Field::Hobbies), Some("Please mention your hobbies and interests"));
}

#[test]
fn whitespace_only_counts_as_missing() {
    let record = FormRecord {
        name: "   ".into(),
        ..common::complete_record()
    };
    let errors = validate_step(Step::Personal, &record);
    assert_eq!(errors.fields(), vec![Field::Name]);
}

#[test]
fn work_from_home_waives_work_location() {
    let mut record = FormRecord {
        work_location: String::new(),
        ..common::complete_record()
    };
    assert!(validate_step(Step::Professional, &record).contains(Field::WorkLocation));

    record.work_from_home = true;
    assert!(validate_step(Step::Professional, &record).is_empty());
}

#[test]
fn siblings_are_optional() {
    let record = FormRecord {
        siblings: String::new(),
        ..common::complete_record()
    };
    assert!(validate_step(Step::Family, &record).is_empty());
}

#[test]
fn validation_only_looks_at_its_own_step() {
    // Later steps being empty must not block step 1.
    let record = FormRecord {
        name: "Asha".into(),
        date_of_birth: "2000-06-15".into(),
        height: "170cm".into(),
        caste: "Iyer".into(),
        religion: "Hindu".into(),
        ..FormRecord::default()
    };
    assert!(validate_step(Step::Personal, &record).is_empty());
    assert!(!validate_step(Step::Professional, &record).is_empty());
}

#[test]
fn photo_type_is_checked_before_size() {
    let oversized_pdf = PhotoUpload::from_bytes("cv.pdf", "application/pdf", vec![0; MAX_PHOTO_BYTES as usize + 1]);
    assert_eq!(validate_photo(&oversized_pdf), Err(PhotoRejection::BadType));

    let gif = PhotoUpload::from_bytes("a.gif", "image/gif", vec![0; 16]);
    assert_eq!(validate_photo(&gif), Err(PhotoRejection::BadType));
}

#[test]
fn photo_size_limit_is_inclusive() {
    let at_limit = PhotoUpload::from_bytes("a.jpg", "image/jpeg", vec![0; MAX_PHOTO_BYTES as usize]);
    assert_eq!(validate_photo(&at_limit), Ok(()));

    let over = PhotoUpload::from_bytes("a.webp", "image/webp", vec![0; MAX_PHOTO_BYTES as usize + 1]);
    assert_eq!(validate_photo(&over), Err(PhotoRejection::TooLarge));
    assert_eq!(over.size, 5 * 1024 * 1024 + 1);
}

#[test]
fn accepted_photo_types() {
    for mime in ["image/jpeg", "image/jpg", "image/png", "image/webp"] {
        let upload = PhotoUpload::from_bytes("photo", mime, vec![0; 10]);
        assert_eq!(validate_photo(&upload), Ok(()), "{mime}");
    }
}

#[test]
fn rejection_messages() {
    assert_eq!(
        PhotoRejection::BadType.message(),
        "Please select a valid image file (JPEG, PNG, WebP)"
    );
    assert_eq!(PhotoRejection::TooLarge.message(), "File size must be less than 5MB");
}
