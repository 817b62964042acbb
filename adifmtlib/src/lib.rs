//! # adifmtlib
//!
//! Read, write, check and transform amateur radio logbooks in the ADIF
//! family of formats.
//!
//! ## Overview
//!
//! Every encoding converts to and from one neutral model, a [`Logfile`]
//! holding a header, user-defined field declarations and an ordered list
//! of [`Record`]s. Supported encodings:
//!
//! - **ADI**: the tag-delimited text form of ADIF
//! - **ADX**: the XML form of ADIF
//! - **Cabrillo**: contest log submissions, version 3.0
//! - **CSV** and **TSV**: one column per field
//! - **JSON**: an object with `HEADER` and `RECORDS`
//!
//! ## Features
//!
//! - **Specification tables**: fields, data types, bands, modes and other
//!   enumerations of ADIF 3.1.4, bundled and parsed once
//! - **Validation**: per-type checks with scoped enumerations
//! - **Inference**: band from frequency, grid square from location and more
//! - **Transformations**: edit, filter, sort, count, flatten and fix
//! - **Format detection**: by file name or by the first bytes of a stream
//!
//! ## Example
//!
//! ```rust
//! use adifmtlib::codec::{read_bytes, write_string, CodecOptions, Format};
//!
//! let options = CodecOptions::default();
//! let input = "<CALL:4>W1AW <QSO_DATE:8>19870605 <BAND:3>40M <EOR>";
//! let log = read_bytes(Format::Adi, &options, input.as_bytes()).unwrap();
//! assert_eq!(log.records[0].value("CALL"), "W1AW");
//!
//! let csv = write_string(Format::Csv, &options, &log).unwrap();
//! assert_eq!(csv, "CALL,QSO_DATE,BAND\nW1AW,19870605,40M\n");
//! ```

pub mod codec;
pub mod error;
pub mod geo;
pub mod model;
pub mod spec;
pub mod transform;

pub use codec::{CodecOptions, Format, LogReader, LogWriter};
pub use error::{AdifError, Position};
pub use model::{DataType, Field, Logfile, Record, UserdefField};

/// Result type for adifmtlib operations
pub type Result<T> = std::result::Result<T, AdifError>;
