//! Encoding-neutral logbook model.
//!
//! A [`Logfile`] holds a header [`Record`], a list of QSO records and any
//! [`UserdefField`] declarations. Records keep fields in insertion order with
//! constant-time lookup by name.

mod field;
mod logfile;
mod record;
mod userdef;

pub use field::{is_app_defined, is_valid_name, normalize_name, DataType, Field};
pub use logfile::Logfile;
pub use record::Record;
pub use userdef::UserdefField;
