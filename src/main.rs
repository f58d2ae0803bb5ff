use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use biodata_wizard::render::review::{review_sections, summary_lines};
use biodata_wizard::{
    Clock, Effect, Error, ExportOptions, Field, FixedClock, FormRecord, NotificationLevel, POPULAR_HOBBIES, Phase,
    PhotoUpload, RELIGIONS, RecordPatch, Session, SoftwareRasterizer, Step, SystemClock, Transition,
    parse_iso_date,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "biodata-wizard", version, about = "Fill in a biodata and export it as a one-page PDF")]
struct Cli {
    /// Date used for age, footer and filename (YYYY-MM-DD); defaults to today
    #[arg(long, global = true, value_parser = parse_day)]
    today: Option<NaiveDate>,

    /// Raster scale for the exported PDF
    #[arg(long, global = true, default_value_t = 2.0)]
    scale: f32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk through the four steps on the terminal
    Interactive {
        /// Directory the PDF is saved into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Validate a JSON record and export it without prompting
    Export {
        /// Record in camelCase JSON (the same keys the form uses)
        #[arg(long)]
        record: PathBuf,
        /// Profile photo (JPEG, PNG or WebP, at most 5MB)
        #[arg(long)]
        photo: Option<PathBuf>,
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Also hand the record to the (simulated) submitter
        #[arg(long)]
        submit: bool,
    },
}

fn parse_day(s: &str) -> Result<NaiveDate, String> {
    parse_iso_date(s).ok_or_else(|| format!("expected YYYY-MM-DD, got '{s}'"))
}

type CliSession = Session<FixedClock, SoftwareRasterizer>;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let today = cli.today.unwrap_or_else(|| SystemClock.today());
    let options = ExportOptions {
        scale: cli.scale,
        ..ExportOptions::default()
    };
    let mut session = Session::with_options(FixedClock(today), SoftwareRasterizer, options);

    let result = match cli.command {
        Command::Interactive { out } => interactive(&mut session, &out),
        Command::Export {
            record,
            photo,
            out,
            submit,
        } => export(&mut session, &record, photo.as_deref(), &out, submit),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Carry out what the session asked for. Returns false if any effect
/// reported an error.
fn run_effects(effects: Vec<Effect>, out: &Path) -> Result<bool, Error> {
    let mut ok = true;
    for effect in effects {
        match effect {
            Effect::Download(download) => {
                let path = download.save_in(out)?;
                println!("Saved {}", path.display());
            }
            Effect::Notify(note) => match note.level {
                NotificationLevel::Info => println!("{}", note.message),
                NotificationLevel::Error => {
                    eprintln!("{}", note.message);
                    ok = false;
                }
            },
            Effect::Completed => {
                println!("Your biodata form has been submitted successfully. Thank you for providing your information.");
            }
        }
    }
    Ok(ok)
}

fn print_errors(transition: &Transition) {
    if let Transition::Blocked(errors) = transition {
        for (field, message) in errors.iter() {
            eprintln!("  {field}: {message}");
        }
    }
}

fn export(session: &mut CliSession, record: &Path, photo: Option<&Path>, out: &Path, submit: bool) -> Result<bool, Error> {
    let json = std::fs::read_to_string(record)?;
    let patch: RecordPatch = serde_json::from_str(&json)?;
    session.edit(patch);

    if let Some(path) = photo {
        session.upload_photo(PhotoUpload::from_path(path)?)?;
    }

    for step in Step::ALL {
        let t = if step == Step::Hobbies {
            session.enter_preview()
        } else {
            session.advance()
        };
        if !t.moved() {
            eprintln!("Step {} ({}) is incomplete:", step.number(), step.title());
            print_errors(&t);
            return Ok(false);
        }
    }

    let mut ok = run_effects(session.download_pdf(), out)?;
    if ok && submit {
        ok = run_effects(session.submit(), out)?;
    }
    Ok(ok)
}

fn prompt(input: &mut impl BufRead, label: &str, current: &str) -> io::Result<Option<String>> {
    if current.is_empty() {
        print!("{label}: ");
    } else {
        print!("{label} [{current}]: ");
    }
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn step_fields(step: Step) -> &'static [(Field, &'static str)] {
    match step {
        Step::Personal => &[
            (Field::Name, "Full name"),
            (Field::DateOfBirth, "Date of birth (YYYY-MM-DD)"),
            (Field::Height, "Height"),
            (Field::Caste, "Caste"),
            (Field::Religion, "Religion"),
        ],
        Step::Professional => &[
            (Field::Education, "Education"),
            (Field::JobTitle, "Job title"),
            (Field::Company, "Company"),
            (Field::WorkLocation, "Work location"),
        ],
        Step::Family => &[
            (Field::MotherName, "Mother's name"),
            (Field::MotherOccupation, "Mother's occupation"),
            (Field::FatherName, "Father's name"),
            (Field::FatherOccupation, "Father's occupation"),
        ],
        Step::Hobbies => &[(Field::Hobbies, "Hobbies & interests")],
    }
}

fn field_value(record: &FormRecord, field: Field) -> &str {
    match field {
        Field::Name => &record.name,
        Field::DateOfBirth => &record.date_of_birth,
        Field::Height => &record.height,
        Field::Caste => &record.caste,
        Field::Religion => &record.religion,
        Field::Photo => record.photo.as_ref().map_or("", |p| p.file_name.as_str()),
        Field::Education => &record.education,
        Field::JobTitle => &record.job_title,
        Field::Company => &record.company,
        Field::WorkLocation => &record.work_location,
        Field::MotherName => &record.mother_name,
        Field::MotherOccupation => &record.mother_occupation,
        Field::FatherName => &record.father_name,
        Field::FatherOccupation => &record.father_occupation,
        Field::Hobbies => &record.hobbies,
    }
}

fn patch_field(field: Field, value: String) -> RecordPatch {
    let patch = RecordPatch::new();
    match field {
        Field::Name => patch.name(value),
        Field::DateOfBirth => patch.date_of_birth(value),
        Field::Height => patch.height(value),
        Field::Caste => patch.caste(value),
        Field::Religion => patch.religion(value),
        Field::Education => patch.education(value),
        Field::JobTitle => patch.job_title(value),
        Field::Company => patch.company(value),
        Field::WorkLocation => patch.work_location(value),
        Field::MotherName => patch.mother_name(value),
        Field::MotherOccupation => patch.mother_occupation(value),
        Field::FatherName => patch.father_name(value),
        Field::FatherOccupation => patch.father_occupation(value),
        Field::Hobbies => patch.hobbies(value),
        Field::Photo => patch,
    }
}

/// Prompt for every field of `step`. Returns false on end of input.
fn fill_step(session: &mut CliSession, input: &mut impl BufRead, step: Step) -> io::Result<bool> {
    match step {
        Step::Personal => println!("Religions: {}", RELIGIONS.join(", ")),
        Step::Professional => {
            let wfh = if session.wizard().record().work_from_home { "y" } else { "n" };
            let Some(answer) = prompt(input, "Working from home? (y/n)", wfh)? else {
                return Ok(false);
            };
            if !answer.is_empty() {
                session.edit(RecordPatch::new().work_from_home(answer.eq_ignore_ascii_case("y")));
            }
        }
        Step::Family | Step::Hobbies => {}
    }

    for &(field, label) in step_fields(step) {
        if field == Field::WorkLocation && session.wizard().record().work_from_home {
            continue;
        }
        let current = field_value(session.wizard().record(), field).to_string();
        let Some(value) = prompt(input, label, &current)? else {
            return Ok(false);
        };
        if !value.is_empty() {
            session.edit(patch_field(field, value));
        }
    }

    match step {
        Step::Personal => {
            let record = session.wizard().record();
            if !record.age.is_empty() {
                println!("Age: {}", record.age);
            }
            let current = field_value(record, Field::Photo).to_string();
            let Some(path) = prompt(input, "Photo file (- to remove)", &current)? else {
                return Ok(false);
            };
            if path == "-" {
                session.remove_photo();
            } else if !path.is_empty() {
                let uploaded = PhotoUpload::from_path(Path::new(&path)).and_then(|u| session.upload_photo(u));
                if let Err(e) = uploaded {
                    eprintln!("  photo: {}", e.user_message());
                }
            }
        }
        Step::Hobbies => {
            for (i, hobby) in POPULAR_HOBBIES.iter().enumerate() {
                print!("{:>2}) {hobby:<12}", i + 1);
                if (i + 1) % 6 == 0 {
                    println!();
                }
            }
            let Some(picks) = prompt(input, "Add quick picks (numbers, comma-separated)", "")? else {
                return Ok(false);
            };
            for pick in picks.split(',') {
                if let Ok(n) = pick.trim().parse::<usize>()
                    && let Some(hobby) = n.checked_sub(1).and_then(|i| POPULAR_HOBBIES.get(i))
                {
                    session.add_hobby(hobby);
                }
            }
        }
        Step::Professional | Step::Family => {}
    }
    Ok(true)
}

fn print_review(session: &CliSession) {
    let record = session.wizard().record();
    println!();
    for line in summary_lines(record) {
        println!("  {line}");
    }
    for section in review_sections(record) {
        println!("\n[{}] {}", section.step.number(), section.title);
        for item in section.items {
            println!("  {:<20} {}", item.label, item.value);
        }
    }
    println!();
}

fn interactive(session: &mut CliSession, out: &Path) -> Result<bool, Error> {
    let stdin = io::stdin();
    let mut input = stdin.lock();

    loop {
        match session.phase() {
            Phase::Step(step) => {
                let (n, total, percent) = session.wizard().progress();
                println!("\n== Step {n} of {total} ({percent}%): {} ==", session.wizard().title());
                if !fill_step(session, &mut input, step)? {
                    return Ok(true);
                }
                let Some(choice) = prompt(&mut input, "Enter to continue, b to go back, q to quit", "")? else {
                    return Ok(true);
                };
                let t = match choice.as_str() {
                    "q" => return Ok(true),
                    "b" => session.retreat(),
                    _ if step == Step::Hobbies => session.enter_preview(),
                    _ => session.advance(),
                };
                print_errors(&t);
            }
            Phase::Preview => {
                println!("\n== {} ==", session.wizard().title());
                print_review(session);
                let Some(choice) = prompt(
                    &mut input,
                    "d download, p toggle PDF preview, e<N> edit step, b back, s submit, q quit",
                    "",
                )?
                else {
                    return Ok(true);
                };
                match choice.as_str() {
                    "d" => {
                        run_effects(session.download_pdf(), out)?;
                    }
                    "p" => {
                        if session.toggle_pdf_preview() {
                            match session.capture_preview() {
                                Ok(uri) => println!("PDF preview captured ({} bytes as data URI)", uri.len()),
                                Err(e) => eprintln!("{}", e.user_message()),
                            }
                        } else {
                            println!("PDF preview hidden");
                        }
                    }
                    "b" => {
                        session.retreat();
                    }
                    "s" => {
                        run_effects(session.submit(), out)?;
                    }
                    "q" => return Ok(true),
                    other => {
                        let step = other
                            .strip_prefix('e')
                            .and_then(|n| n.trim().parse::<u8>().ok())
                            .and_then(Step::from_number);
                        match step {
                            Some(step) => {
                                session.edit_from_preview(step);
                            }
                            None => eprintln!("Unknown choice '{other}'"),
                        }
                    }
                }
            }
            Phase::Submitted => {
                println!("\n== {} ==", session.wizard().title());
                let Some(again) = prompt(&mut input, "Create another biodata? (y/n)", "n")? else {
                    return Ok(true);
                };
                if !again.eq_ignore_ascii_case("y") {
                    return Ok(true);
                }
                session.reset();
            }
        }
    }
}
