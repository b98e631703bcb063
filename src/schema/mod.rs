//! Dialect-neutral schema model shared by the target and live sides.

mod column;
mod foreign_key;
mod index;
mod table;
mod types;

pub use column::Column;
pub use foreign_key::{ForeignKey, ReferenceOption};
pub use index::Index;
pub use table::{CheckConstraint, Table};
pub use types::{ColumnType, DefaultValue};
