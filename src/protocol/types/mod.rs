//! Column kinds, descriptors and host values.

mod column;
mod kind;
mod lob;
mod metadata;
mod record;
mod value;

pub use column::{ColumnDescriptor, ColumnInfo};
pub use kind::ColumnKind;
pub use lob::LobLocator;
pub use metadata::ColumnMetadata;
pub use record::Record;
pub use value::{HostValue, Numeric};
