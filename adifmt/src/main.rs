//! # adifmt
//!
//! A command-line toolkit for amateur radio logbooks.
//!
//! ## Overview
//!
//! adifmt is built on top of adifmtlib. Each subcommand reads one or more
//! logs, applies one operation and writes the result to standard output
//! (or to a file, for `save`), so commands chain with pipes.
//!
//! ## Usage
//!
//! ```bash
//! # Convert a CSV export to ADI
//! adifmt cat --output adi log.csv
//!
//! # Fill in bands, keep 20 meter contacts, sort by time
//! adifmt infer --fields BAND log.adi | adifmt find --if BAND=20m | adifmt sort --fields QSO_DATE,TIME_ON
//!
//! # Check a log before uploading it
//! adifmt validate --required-fields CALL,QSO_DATE,TIME_ON,BAND,MODE log.adi
//!
//! # Write a Cabrillo file for a contest
//! adifmt save --cabrillo-header CONTEST=ARRL-SS-SSB log.adi contest.log
//! ```

mod commands;
mod render;

use std::process::ExitCode;

use clap::{Arg, ArgAction, Command};
use tracing_subscriber::EnvFilter;

/// Input and encoding flags shared by every subcommand
fn global_args() -> Vec<Arg> {
    let flag = |name: &'static str, help: &'static str| {
        Arg::new(name)
            .long(name)
            .global(true)
            .action(ArgAction::SetTrue)
            .help(help)
    };
    let value = |name: &'static str, help: &'static str| Arg::new(name).long(name).global(true).help(help);
    vec![
        value("input", "Input format (adi, adx, cabrillo, csv, json, tsv); guessed when omitted")
            .short('i'),
        value("output", "Output format (default adi; for save, taken from the file name)").short('o'),
        value("field-order", "Comma-separated fields to put first in each record")
            .value_delimiter(','),
        value("adi-field-separator", "Text after each ADI field (empty, space, tab, newline, 2newline, crlf, 2crlf)"),
        value("adi-record-separator", "Text after each ADI <EOR>"),
        flag("adi-lower-case", "Write ADI tags in lower case"),
        flag("adi-allow-unknown-tag", "Keep unknown ADI tags as comments instead of failing"),
        flag("adi-ascii-only", "Reject non-ASCII text in ADI string fields"),
        value("csv-delimiter", "CSV field delimiter, a single character or 'tab'"),
        value("csv-comment", "Skip CSV lines starting with this character"),
        flag("csv-lazy-quotes", "Accept stray quotes in unquoted CSV fields"),
        flag("csv-trim-space", "Ignore leading spaces in CSV fields"),
        flag("csv-require-full-record", "Fail on CSV rows with fewer fields than the header"),
        flag("csv-crlf", "End CSV lines with CRLF"),
        flag("tsv-crlf", "End TSV lines with CRLF"),
        flag("tsv-escape-special", "Escape tab, CR, LF and backslash in TSV values"),
        flag("tsv-ignore-empty-headers", "Skip TSV columns with an empty header"),
        flag("json-typed-output", "Write numbers and booleans as JSON values"),
        flag("json-html-safe", "Escape <, > and & in JSON strings"),
        value("cabrillo-my-exchange", "Cabrillo columns sent, as FIELD[/FIELD...][=DEFAULT]")
            .value_delimiter(','),
        value("cabrillo-their-exchange", "Cabrillo columns received").value_delimiter(','),
        value("cabrillo-extra-field", "Cabrillo columns after the received exchange")
            .action(ArgAction::Append),
        value("cabrillo-header", "Cabrillo header line as KEY=VALUE (repeatable)")
            .action(ArgAction::Append),
        flag("cabrillo-tab-delimiter", "Separate Cabrillo QSO columns with tabs"),
        value("cabrillo-qrp-max-power", "Highest power in watts for CATEGORY-POWER QRP"),
        value("cabrillo-low-max-power", "Highest power in watts for CATEGORY-POWER LOW"),
    ]
}

fn files_arg() -> Arg {
    Arg::new("files")
        .action(ArgAction::Append)
        .help("Input files; standard input when omitted or '-'")
}

fn fields_arg(help: &'static str) -> Arg {
    Arg::new("fields")
        .short('f')
        .long("fields")
        .value_delimiter(',')
        .action(ArgAction::Append)
        .help(help)
}

/// Build the clap Command structure
fn build_command() -> Command {
    Command::new("adifmt")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert, edit, filter, sort, infer and validate amateur radio logbooks")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .args(global_args())
        .subcommand(
            Command::new("cat")
                .about("Concatenate logs and write them in another format")
                .arg(files_arg()),
        )
        .subcommand(
            Command::new("edit")
                .about("Add, change or remove fields in every record")
                .arg(
                    Arg::new("add")
                        .short('a')
                        .long("add")
                        .action(ArgAction::Append)
                        .help("NAME=VALUE to set when the field is empty"),
                )
                .arg(
                    Arg::new("set")
                        .short('s')
                        .long("set")
                        .action(ArgAction::Append)
                        .help("NAME=VALUE to set in every record"),
                )
                .arg(
                    Arg::new("remove")
                        .short('r')
                        .long("remove")
                        .value_delimiter(',')
                        .action(ArgAction::Append)
                        .help("Fields to remove"),
                )
                .arg(
                    Arg::new("remove-blank")
                        .long("remove-blank")
                        .action(ArgAction::SetTrue)
                        .help("Remove fields with empty values"),
                )
                .arg(
                    Arg::new("time-zone-from")
                        .long("time-zone-from")
                        .help("Zone the QSO times are in, e.g. America/New_York"),
                )
                .arg(
                    Arg::new("time-zone-to")
                        .long("time-zone-to")
                        .help("Zone to convert QSO times to (default UTC)"),
                )
                .arg(files_arg()),
        )
        .subcommand(
            Command::new("find")
                .about("Keep records matching conditions such as BAND=20m|40m or FREQ>14.1")
                .arg(
                    Arg::new("if")
                        .long("if")
                        .action(ArgAction::Append)
                        .help("Condition that must hold"),
                )
                .arg(
                    Arg::new("if-not")
                        .long("if-not")
                        .action(ArgAction::Append)
                        .help("Condition that must not hold"),
                )
                .arg(
                    Arg::new("or-if")
                        .long("or-if")
                        .action(ArgAction::Append)
                        .help("Start an alternative group of conditions"),
                )
                .arg(
                    Arg::new("or-if-not")
                        .long("or-if-not")
                        .action(ArgAction::Append)
                        .help("Start an alternative group with a negated condition"),
                )
                .arg(files_arg()),
        )
        .subcommand(
            Command::new("fix")
                .about("Normalize dates, times, locations, booleans and enumeration spelling")
                .arg(files_arg()),
        )
        .subcommand(
            Command::new("select")
                .about("Keep only the named fields")
                .arg(fields_arg("Fields to keep, in output order").required(true))
                .arg(files_arg()),
        )
        .subcommand(
            Command::new("sort")
                .about("Sort records by fields; prefix a field with '-' for descending")
                .arg(fields_arg("Sort keys").required(true).allow_hyphen_values(true))
                .arg(files_arg()),
        )
        .subcommand(
            Command::new("count")
                .about("Count records, grouped by the given fields")
                .arg(fields_arg("Fields to group by"))
                .arg(
                    Arg::new("count-field-name")
                        .long("count-field-name")
                        .default_value("COUNT")
                        .help("Name of the count field"),
                )
                .arg(files_arg()),
        )
        .subcommand(
            Command::new("flatten")
                .about("Split list fields into one record per item")
                .arg(fields_arg("List fields to flatten").required(true))
                .arg(
                    Arg::new("delimiter")
                        .long("delimiter")
                        .action(ArgAction::Append)
                        .help("FIELD=DELIMITER for fields without a known list type"),
                )
                .arg(files_arg()),
        )
        .subcommand(
            Command::new("infer")
                .about("Fill empty fields from other fields, e.g. BAND from FREQ")
                .arg(fields_arg("Fields to infer; all known fields when omitted"))
                .arg(files_arg()),
        )
        .subcommand(
            Command::new("save")
                .about("Write logs to a file, choosing the format from its extension")
                .arg(
                    Arg::new("overwrite-existing")
                        .long("overwrite-existing")
                        .action(ArgAction::SetTrue)
                        .help("Replace the output file if it exists"),
                )
                .arg(
                    Arg::new("write-if-empty")
                        .long("write-if-empty")
                        .action(ArgAction::SetTrue)
                        .help("Write the file even when there are no records"),
                )
                .arg(
                    Arg::new("files")
                        .action(ArgAction::Append)
                        .num_args(1..)
                        .required(true)
                        .help("Input files followed by the output file"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Check records against the ADIF specification")
                .arg(
                    Arg::new("required-fields")
                        .long("required-fields")
                        .value_delimiter(',')
                        .action(ArgAction::Append)
                        .help("Fields every record must have"),
                )
                .arg(
                    Arg::new("attach-warnings")
                        .long("attach-warnings")
                        .action(ArgAction::SetTrue)
                        .help("Add warnings to record comments"),
                )
                .arg(files_arg()),
        )
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let matches = build_command().get_matches();
    let Some((name, sub)) = matches.subcommand() else {
        return ExitCode::FAILURE;
    };
    match commands::run(name, sub) {
        Ok(code) => code,
        Err(e) => {
            render::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
