//! Output helpers: header stamping and styled diagnostics on stderr.

use adifmtlib::{spec, Field, Logfile};
use chrono::Utc;
use console::Style;

pub const PROGRAM_ID: &str = "adifmt";

/// Record which program wrote the file, and when.
pub fn stamp_header(log: &mut Logfile) -> adifmtlib::Result<()> {
    let now = Utc::now().format("%Y%m%d %H%M%S").to_string();
    for (name, value) in [
        ("ADIF_VER", spec::ADIF_VERSION.to_string()),
        ("PROGRAMID", PROGRAM_ID.to_string()),
        ("PROGRAMVERSION", env!("CARGO_PKG_VERSION").to_string()),
        ("CREATED_TIMESTAMP", now),
    ] {
        log.header.set(Field::new(name, value))?;
    }
    Ok(())
}

fn print(prefix: &str, style: &Style, message: &str) {
    eprintln!("{} {}", style.apply_to(prefix), message);
}

/// Warning attributed to an input.
pub fn warning(input: &str, message: &str) {
    print("warning:", &Style::new().yellow().for_stderr(), &format!("{input}: {message}"));
}

pub fn error(message: &str) {
    print("error:", &Style::new().red().bold().for_stderr(), message);
}
