//! Readers and writers for each logbook encoding.
//!
//! Every encoding converts between a byte stream and a [`Logfile`]. The
//! codecs share no state; callers pick one with [`read`] and [`write`] or
//! construct it directly.

pub mod adi;
pub mod adx;
pub mod cabrillo;
pub mod csv;
pub mod detect;
pub mod json;
mod options;
pub mod tsv;

use std::io::{BufRead, Write};

pub use options::{
    AdiOptions, AdxOptions, CabrilloOptions, CodecOptions, CsvOptions, Format, JsonOptions,
    Separator, TsvOptions,
};

use crate::model::Logfile;
use crate::Result;

/// Decodes a whole logfile from a byte stream.
pub trait LogReader {
    fn read(&self, input: &mut dyn BufRead) -> Result<Logfile>;
}

/// Encodes a logfile to a byte sink, flushing when done.
pub trait LogWriter {
    fn write(&self, log: &Logfile, out: &mut dyn Write) -> Result<()>;
}

/// Read a logfile in the given format.
pub fn read(format: Format, options: &CodecOptions, input: &mut dyn BufRead) -> Result<Logfile> {
    tracing::debug!(%format, "reading logfile");
    match format {
        Format::Adi => adi::AdiCodec::new(options.adi.clone()).read(input),
        Format::Adx => adx::AdxCodec::new(options.adx.clone()).read(input),
        Format::Cabrillo => cabrillo::CabrilloCodec::new(options.cabrillo.clone()).read(input),
        Format::Csv => csv::CsvCodec::new(options.csv.clone()).read(input),
        Format::Json => json::JsonCodec::new(options.json.clone()).read(input),
        Format::Tsv => tsv::TsvCodec::new(options.tsv.clone()).read(input),
    }
}

/// Write a logfile in the given format.
pub fn write(format: Format, options: &CodecOptions, log: &Logfile, out: &mut dyn Write) -> Result<()> {
    tracing::debug!(%format, records = log.records.len(), "writing logfile");
    match format {
        Format::Adi => adi::AdiCodec::new(options.adi.clone()).write(log, out),
        Format::Adx => adx::AdxCodec::new(options.adx.clone()).write(log, out),
        Format::Cabrillo => cabrillo::CabrilloCodec::new(options.cabrillo.clone()).write(log, out),
        Format::Csv => csv::CsvCodec::new(options.csv.clone()).write(log, out),
        Format::Json => json::JsonCodec::new(options.json.clone()).write(log, out),
        Format::Tsv => tsv::TsvCodec::new(options.tsv.clone()).write(log, out),
    }
}

/// Decode a byte slice, mostly useful in tests.
pub fn read_bytes(format: Format, options: &CodecOptions, mut bytes: &[u8]) -> Result<Logfile> {
    read(format, options, &mut bytes)
}

/// Encode to a string, mostly useful in tests.
pub fn write_string(format: Format, options: &CodecOptions, log: &Logfile) -> Result<String> {
    let mut out = Vec::new();
    write(format, options, log, &mut out)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}
