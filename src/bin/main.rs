// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use clap::{Parser, ValueEnum};
use course_market::{CourseId, MarketConfig, MarketError, Marketplace, NewUser, UserId};
use csv::{ReaderBuilder, Trim, Writer};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Course Market - Replay marketplace command scripts
///
/// Reads marketplace commands from a CSV file, applies them in order and
/// writes a report to stdout. Commands that fail are logged and skipped.
#[derive(Parser, Debug)]
#[command(name = "course-market")]
#[command(about = "Replays course marketplace command CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with commands
    ///
    /// Expected format: op,user,course,target,amount,text
    /// Example: cargo run -- script.csv --report courses > courses.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// TOML file overriding capacities and starting bonuses
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Which report to write
    #[arg(long, value_enum, default_value_t = Report::Users)]
    report: Report,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Report {
    Users,
    Courses,
    Groups,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => match MarketConfig::from_toml_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        None => MarketConfig::default(),
    };

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let market = match Marketplace::with_config(config) {
        Ok(market) => market,
        Err(e) => {
            eprintln!("Error in config: {}", e);
            process::exit(1);
        }
    };

    let market = match process_commands(BufReader::new(file), market) {
        Ok(market) => market,
        Err(e) => {
            eprintln!("Error processing commands: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_report(&market, args.report, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Logs go to stderr so stdout stays a clean CSV.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "course_market=debug"
    } else {
        "course_market=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

/// Raw CSV record matching the input format.
///
/// Fields: `op, user, course, target, amount, text`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    op: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    user: Option<u32>,
    #[serde(deserialize_with = "csv::invalid_option")]
    course: Option<u32>,
    #[serde(deserialize_with = "csv::invalid_option")]
    target: Option<u32>,
    #[serde(deserialize_with = "csv::invalid_option")]
    amount: Option<u32>,
    #[serde(default)]
    text: String,
}

/// A parsed marketplace command.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Register(NewUser),
    CreateCourse {
        actor: UserId,
        title: String,
        price: u32,
    },
    Purchase {
        user: UserId,
        course: CourseId,
    },
    Remove {
        actor: UserId,
        course: CourseId,
        student: UserId,
    },
    Clear {
        actor: UserId,
        course: CourseId,
    },
}

impl CsvRecord {
    /// Converts CSV record to a command.
    ///
    /// Returns `None` for unknown ops or missing required fields.
    fn into_command(self) -> Option<Command> {
        let user = self.user.map(UserId);
        let course = self.course.map(CourseId);

        match self.op.to_lowercase().as_str() {
            "student" if !self.text.is_empty() => Some(Command::Register(NewUser::student(self.text))),
            "staff" if !self.text.is_empty() => Some(Command::Register(NewUser::staff(self.text))),
            "course" => Some(Command::CreateCourse {
                actor: user?,
                title: self.text,
                price: self.amount.unwrap_or(0),
            }),
            "purchase" => Some(Command::Purchase {
                user: user?,
                course: course?,
            }),
            "remove" => Some(Command::Remove {
                actor: user?,
                course: course?,
                student: UserId(self.target?),
            }),
            "clear" => Some(Command::Clear {
                actor: user?,
                course: course?,
            }),
            _ => None,
        }
    }
}

fn apply(market: &Marketplace, command: Command) -> Result<(), MarketError> {
    match command {
        Command::Register(registration) => market.register(registration).map(drop),
        Command::CreateCourse {
            actor,
            title,
            price,
        } => market.create_course(actor, title, price).map(drop),
        Command::Purchase { user, course } => market.purchase(user, course).map(drop),
        Command::Remove {
            actor,
            course,
            student,
        } => market.remove_student(actor, course, student),
        Command::Clear { actor, course } => market.clear_students(actor, course).map(drop),
    }
}

/// Applies commands from a CSV reader to `market`.
///
/// # CSV Format
///
/// Expected columns: `op, user, course, target, amount, text`
/// - `student` / `staff`: register a user, `text` is the email
/// - `course`: `user` creates a course priced `amount` titled `text`
/// - `purchase`: `user` buys `course`
/// - `remove`: `user` removes student `target` from `course`
/// - `clear`: `user` removes every student from `course`
///
/// Ids are assigned sequentially from 1 in the order users and courses are
/// created.
///
/// # Example
///
/// ```csv
/// op,user,course,target,amount,text
/// staff,,,,,admin@example.com
/// student,,,,,ivan@example.com
/// course,1,,,10,Rust basics
/// purchase,2,1,,,
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails. Malformed rows and rejected
/// commands are logged and skipped.
fn process_commands<R: Read>(reader: R, market: Marketplace) -> Result<Marketplace, csv::Error> {

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    for (line, result) in rdr.deserialize::<CsvRecord>().enumerate() {
        let row = line + 2;
        match result {
            Ok(record) => {
                let Some(command) = record.into_command() else {
                    tracing::warn!(row, "skipping invalid command");
                    continue;
                };
                if let Err(e) = apply(&market, command) {
                    tracing::warn!(row, error = %e, code = e.code(), "command rejected");
                }
            }
            Err(e) => {
                tracing::warn!(row, error = %e, "skipping malformed row");
            }
        }
    }

    Ok(market)
}

#[derive(Debug, Serialize)]
struct GroupRow<'a> {
    course: CourseId,
    group: u8,
    title: &'a str,
    members: usize,
}

/// Writes the selected report as CSV.
fn write_report<W: Write>(market: &Marketplace, report: Report, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    match report {
        Report::Users => {
            for user in market.users() {
                wtr.serialize(&*user)?;
            }
        }
        Report::Courses => {
            for course in market.courses() {
                wtr.serialize(&*course)?;
            }
        }
        Report::Groups => {
            for course in market.courses() {
                for group in course.groups() {
                    wtr.serialize(GroupRow {
                        course: course.id(),
                        group: group.number.0,
                        title: &group.title,
                        members: group.students.len(),
                    })?;
                }
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
