//! INFO status text: parsing, section merging and derived fields

pub mod derive;
pub mod parser;
pub mod section;

pub use derive::{
    apply_aliases, compute_replica_delays, derive_fields, DerivedFields, LEGACY_ALIASES,
};
pub use parser::{Record, StatusMap, StatusValue};
pub use section::{fetch_section, fetch_sections, Namespace, Section};
