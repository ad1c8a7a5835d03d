//! Publication records and the views that shape them.
//!
//! - [`Field`] / [`Catalog`]: the fixed set of exportable columns
//! - [`View`]: a validated, ordered subset of the catalog
//! - [`Record`]: one parsed publication, scoped to its view

pub mod catalog;
pub mod record;
pub mod view;

pub use catalog::{Catalog, Field, FieldKind};
pub use record::{Record, Value};
pub use view::View;
