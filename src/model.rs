use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::derive_age;
use crate::photo::Photo;

pub const RELIGIONS: [&str; 7] = ["Hindu", "Muslim", "Christian", "Sikh", "Buddhist", "Jain", "Other"];

pub const POPULAR_HOBBIES: [&str; 18] = [
    "Reading",
    "Traveling",
    "Music",
    "Dancing",
    "Cooking",
    "Photography",
    "Sports",
    "Yoga",
    "Meditation",
    "Painting",
    "Gaming",
    "Gardening",
    "Movies",
    "Swimming",
    "Cycling",
    "Writing",
    "Shopping",
    "Fitness",
];

/// The biodata record being assembled across the wizard steps.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormRecord {
    // Personal
    pub name: String,
    pub date_of_birth: String,
    pub age: String,
    pub height: String,
    pub caste: String,
    pub religion: String,
    #[serde(skip)]
    pub photo: Option<Photo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_preview: Option<String>,

    // Professional
    pub education: String,
    pub job_title: String,
    pub company: String,
    pub work_location: String,
    pub work_from_home: bool,

    // Family
    pub mother_name: String,
    pub mother_occupation: String,
    pub father_name: String,
    pub father_occupation: String,
    pub siblings: String,

    // Interests
    pub hobbies: String,
}

impl FormRecord {
    /// Work location as it should be displayed: working from home overrides
    /// whatever was typed into the location field.
    pub fn display_work_location(&self) -> &str {
        if self.work_from_home {
            "Work from Home"
        } else {
            &self.work_location
        }
    }
}

/// Partial update to a [`FormRecord`]. `None` leaves a field untouched.
///
/// There is no `age` member: age is always derived from the date
/// of birth when the patch is applied.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordPatch {
    pub name: Option<String>,
    pub date_of_birth: Option<String>,
    pub height: Option<String>,
    pub caste: Option<String>,
    pub religion: Option<String>,
    #[serde(skip)]
    pub photo: Option<Option<Photo>>,
    #[serde(skip)]
    pub photo_preview: Option<Option<String>>,
    pub education: Option<String>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub work_location: Option<String>,
    pub work_from_home: Option<bool>,
    pub mother_name: Option<String>,
    pub mother_occupation: Option<String>,
    pub father_name: Option<String>,
    pub father_occupation: Option<String>,
    pub siblings: Option<String>,
    pub hobbies: Option<String>,
}

macro_rules! text_setters {
    ($($setter:ident => $field:ident),* $(,)?) => {
        $(
            pub fn $setter(mut self, value: impl Into<String>) -> Self {
                self.$field = Some(value.into());
                self
            }
        )*
    };
}

impl RecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    text_setters! {
        name => name,
        date_of_birth => date_of_birth,
        height => height,
        caste => caste,
        religion => religion,
        education => education,
        job_title => job_title,
        company => company,
        work_location => work_location,
        mother_name => mother_name,
        mother_occupation => mother_occupation,
        father_name => father_name,
        father_occupation => father_occupation,
        siblings => siblings,
        hobbies => hobbies,
    }

    pub fn work_from_home(mut self, value: bool) -> Self {
        self.work_from_home = Some(value);
        self
    }

    pub(crate) fn photo(mut self, photo: Option<Photo>, preview: Option<String>) -> Self {
        self.photo = Some(photo);
        self.photo_preview = Some(preview);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Validated fields this patch writes to.
    pub fn fields(&self) -> Vec<Field> {
        let touched = [
            (Field::Name, self.name.is_some()),
            (Field::DateOfBirth, self.date_of_birth.is_some()),
            (Field::Height, self.height.is_some()),
            (Field::Caste, self.caste.is_some()),
            (Field::Religion, self.religion.is_some()),
            (Field::Photo, self.photo.is_some() || self.photo_preview.is_some()),
            (Field::Education, self.education.is_some()),
            (Field::JobTitle, self.job_title.is_some()),
            (Field::Company, self.company.is_some()),
            // toggling work-from-home changes whether the location is required
            (
                Field::WorkLocation,
                self.work_location.is_some() || self.work_from_home.is_some(),
            ),
            (Field::MotherName, self.mother_name.is_some()),
            (Field::MotherOccupation, self.mother_occupation.is_some()),
            (Field::FatherName, self.father_name.is_some()),
            (Field::FatherOccupation, self.father_occupation.is_some()),
            (Field::Hobbies, self.hobbies.is_some()),
        ];
        touched
            .into_iter()
            .filter_map(|(field, hit)| hit.then_some(field))
            .collect()
    }

    /// Merge into `record`, last write wins. A touched date of birth
    /// re-derives `age` against `today`.
    pub(crate) fn apply_to(self, record: &mut FormRecord, today: NaiveDate) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *slot = v;
            }
        }

        if let Some(dob) = self.date_of_birth {
            record.age = derive_age(&dob, today).unwrap_or_default();
            record.date_of_birth = dob;
        }
        set(&mut record.name, self.name);
        set(&mut record.height, self.height);
        set(&mut record.caste, self.caste);
        set(&mut record.religion, self.religion);
        set(&mut record.photo, self.photo);
        set(&mut record.photo_preview, self.photo_preview);
        set(&mut record.education, self.education);
        set(&mut record.job_title, self.job_title);
        set(&mut record.company, self.company);
        set(&mut record.work_location, self.work_location);
        set(&mut record.work_from_home, self.work_from_home);
        set(&mut record.mother_name, self.mother_name);
        set(&mut record.mother_occupation, self.mother_occupation);
        set(&mut record.father_name, self.father_name);
        set(&mut record.father_occupation, self.father_occupation);
        set(&mut record.siblings, self.siblings);
        set(&mut record.hobbies, self.hobbies);
    }
}

impl From<FormRecord> for RecordPatch {
    fn from(record: FormRecord) -> Self {
        Self {
            name: Some(record.name),
            date_of_birth: Some(record.date_of_birth),
            height: Some(record.height),
            caste: Some(record.caste),
            religion: Some(record.religion),
            photo: Some(record.photo),
            photo_preview: Some(record.photo_preview),
            education: Some(record.education),
            job_title: Some(record.job_title),
            company: Some(record.company),
            work_location: Some(record.work_location),
            work_from_home: Some(record.work_from_home),
            mother_name: Some(record.mother_name),
            mother_occupation: Some(record.mother_occupation),
            father_name: Some(record.father_name),
            father_occupation: Some(record.father_occupation),
            siblings: Some(record.siblings),
            hobbies: Some(record.hobbies),
        }
    }
}

/// Record fields that can carry a validation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    DateOfBirth,
    Height,
    Caste,
    Religion,
    Photo,
    Education,
    JobTitle,
    Company,
    WorkLocation,
    MotherName,
    MotherOccupation,
    FatherName,
    FatherOccupation,
    Hobbies,
}

impl Field {
    /// Record key, as used in the JSON form of the record.
    pub fn key(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::DateOfBirth => "dateOfBirth",
            Field::Height => "height",
            Field::Caste => "caste",
            Field::Religion => "religion",
            Field::Photo => "photo",
            Field::Education => "education",
            Field::JobTitle => "jobTitle",
            Field::Company => "company",
            Field::WorkLocation => "workLocation",
            Field::MotherName => "motherName",
            Field::MotherOccupation => "motherOccupation",
            Field::FatherName => "fatherName",
            Field::FatherOccupation => "fatherOccupation",
            Field::Hobbies => "hobbies",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Field → message. A missing key means the field has no error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorSet {
    entries: BTreeMap<Field, String>,
}

impl ErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.entries.insert(field, message.into());
    }

    pub fn clear(&mut self, field: Field) -> Option<String> {
        self.entries.remove(&field)
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.entries.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.entries.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn fields(&self) -> Vec<Field> {
        self.entries.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.entries.iter().map(|(f, m)| (*f, m.as_str()))
    }
}

/// The four form steps, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    Personal,
    Professional,
    Family,
    Hobbies,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::Personal, Step::Professional, Step::Family, Step::Hobbies];
    pub const COUNT: u8 = 4;

    /// 1-based position.
    pub fn number(self) -> u8 {
        match self {
            Step::Personal => 1,
            Step::Professional => 2,
            Step::Family => 3,
            Step::Hobbies => 4,
        }
    }

    pub fn from_number(n: u8) -> Option<Step> {
        match n {
            1 => Some(Step::Personal),
            2 => Some(Step::Professional),
            3 => Some(Step::Family),
            4 => Some(Step::Hobbies),
            _ => None,
        }
    }

    pub fn next(self) -> Option<Step> {
        Step::from_number(self.number() + 1)
    }

    pub fn previous(self) -> Option<Step> {
        Step::from_number(self.number() - 1)
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Personal => "Personal Details",
            Step::Professional => "Professional Details",
            Step::Family => "Family Details",
            Step::Hobbies => "Hobbies & Interests",
        }
    }
}
