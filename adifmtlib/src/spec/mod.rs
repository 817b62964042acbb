//! ADIF specification tables, value validation and field ordering.
//!
//! Tables cover the ADIF 3.1.4 data types, fields and the enumerations
//! this library bundles. All of them are read-only and shared process-wide.

mod compare;
mod enums;
mod tables;
mod validate;

pub use compare::{CaseInsensitiveCollator, Collator, FieldComparator};
pub use enums::{enumeration, EnumValue, Enumeration};
pub use tables::{
    band, band_for_freq, data_type, dxcc_by_code, dxcc_by_name, dxcc_for_iso, field,
    mode_for_submode, Band, DataTypeSpec, DxccEntity, FieldSpec, BANDS, DATA_TYPES,
    DXCC_ENTITIES, FIELDS,
};
pub use validate::{is_number, validate_field, validate_spec_field, ValidationContext, Validity, MIN_DATE};

/// Version of the specification the bundled tables describe.
pub const ADIF_VERSION: &str = "3.1.4";
