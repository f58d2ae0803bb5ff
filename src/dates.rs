use chrono::{Datelike, Local, NaiveDate};

/// Source of "today" for age derivation, the document footer and the export filename.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Parse the `YYYY-MM-DD` form produced by a date input.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Full elapsed years between `birth` and `today`, rounded down.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

/// Age string for a date-of-birth field value. Empty, unparseable and future
/// dates have no age.
pub fn derive_age(date_of_birth: &str, today: NaiveDate) -> Option<String> {
    let birth = parse_iso_date(date_of_birth)?;
    if birth > today {
        return None;
    }
    Some(age_on(birth, today).to_string())
}

/// "June 15, 2000"
pub fn long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
