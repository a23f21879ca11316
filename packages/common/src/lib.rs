//! Domain layer shared by the directorate content services: locale
//! projection, per-kind schema descriptors, attachment bookkeeping and the
//! uploads store.

pub mod attachment;
pub mod locale;
pub mod record;
pub mod schema;
pub mod storage;

pub use locale::{Locale, ProjectedView, project};
pub use record::{ContentRecord, RecordFilter};
pub use schema::{FieldError, KindSchema};
