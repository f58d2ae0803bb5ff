//! What the review (preview) screen shows before the user downloads or
//! submits: one section per step with an edit target, and a short summary.

use crate::dates::{long_date, parse_iso_date};
use crate::model::{FormRecord, Step};

const NOT_PROVIDED: &str = "Not provided";
const HOBBIES_SUMMARY_CHARS: usize = 100;

#[derive(Clone, Debug, PartialEq)]
pub struct ReviewItem {
    pub label: &'static str,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReviewSection {
    pub title: &'static str,
    /// Step that "Edit" jumps back to.
    pub step: Step,
    pub items: Vec<ReviewItem>,
}

fn item(label: &'static str, value: impl Into<String>) -> ReviewItem {
    let value = value.into();
    ReviewItem {
        label,
        value: if value.is_empty() {
            NOT_PROVIDED.to_string()
        } else {
            value
        },
    }
}

fn review_date(value: &str) -> String {
    if value.is_empty() {
        return NOT_PROVIDED.to_string();
    }
    parse_iso_date(value)
        .map(long_date)
        .unwrap_or_else(|| value.to_string())
}

pub fn review_sections(record: &FormRecord) -> Vec<ReviewSection> {
    let age = if record.age.is_empty() {
        "Not calculated".to_string()
    } else {
        format!("{} years", record.age)
    };
    let siblings = if record.siblings.is_empty() {
        "Not mentioned"
    } else {
        record.siblings.as_str()
    };

    vec![
        ReviewSection {
            title: Step::Personal.title(),
            step: Step::Personal,
            items: vec![
                item("Name", record.name.as_str()),
                item("Date of Birth", review_date(&record.date_of_birth)),
                item("Age", age),
                item("Height", record.height.as_str()),
                item("Caste", record.caste.as_str()),
                item("Religion", record.religion.as_str()),
            ],
        },
        ReviewSection {
            title: Step::Professional.title(),
            step: Step::Professional,
            items: vec![
                item("Education", record.education.as_str()),
                item("Job Title", record.job_title.as_str()),
                item("Company", record.company.as_str()),
                item("Work Location", record.display_work_location()),
            ],
        },
        ReviewSection {
            title: Step::Family.title(),
            step: Step::Family,
            items: vec![
                item("Mother's Name", record.mother_name.as_str()),
                item("Mother's Occupation", record.mother_occupation.as_str()),
                item("Father's Name", record.father_name.as_str()),
                item("Father's Occupation", record.father_occupation.as_str()),
                item("Siblings", siblings),
            ],
        },
        ReviewSection {
            title: Step::Hobbies.title(),
            step: Step::Hobbies,
            items: vec![item("Hobbies", record.hobbies.as_str())],
        },
    ]
}

/// Summary card lines: who, what they do, religion and caste, interests.
pub fn summary_lines(record: &FormRecord) -> Vec<String> {
    let mut lines = vec![
        format!("{}, {} years old", record.name, record.age),
        format!("{} at {}", record.job_title, record.company),
    ];
    if record.caste.is_empty() {
        lines.push(record.religion.clone());
    } else {
        lines.push(format!("{} \u{2022} {}", record.religion, record.caste));
    }
    if !record.hobbies.is_empty() {
        let hobbies: String = if record.hobbies.chars().count() > HOBBIES_SUMMARY_CHARS {
            let head: String = record.hobbies.chars().take(HOBBIES_SUMMARY_CHARS).collect();
            format!("{head}...")
        } else {
            record.hobbies.clone()
        };
        lines.push(format!("Interests: {hobbies}"));
    }
    lines
}
