//! Operations that turn one logfile into another.
//!
//! Each transformation works on an owned or borrowed [`Logfile`] and
//! reports problems as [`AdifError`](crate::error::AdifError) values, so
//! a command can chain them and stop at the first failure.
//!
//! [`Logfile`]: crate::model::Logfile

pub mod concat;
pub mod condition;
pub mod count;
pub mod edit;
pub mod fix;
pub mod flatten;
pub mod infer;
pub mod sort;
pub mod validate;

pub use concat::{concat, select};
pub use condition::{Condition, Filter, Op, Operand};
pub use count::count;
pub use edit::{Assignment, EditOptions, Editor, TimeShift};
pub use fix::{fix, fix_record};
pub use flatten::{flatten, FlattenOptions};
pub use infer::{infer, infer_record, Inferrer, INFERRERS};
pub use sort::{sort, SortKey};
pub use validate::{validate, ValidateOptions, ValidationReport};
