//! Selection management and chart datasets for an enrollment comparison dashboard.
//!
//! Data flows one way: raw table text is parsed once ([`table`]), the user
//! edits a small [`selection::SelectionSet`], and every query re-derives the
//! chart inputs ([`dataset`], [`aggregate`], [`charts`]) from the two.
//! [`session::DashboardSession`] ties these together with the load state and
//! the [`locale::LocaleContext`].

pub mod aggregate;
pub mod charts;
pub mod combine;
pub mod dataset;
pub mod error;
pub mod locale;
pub mod models;
pub mod resolver;
pub mod selection;
pub mod session;
pub mod source;
pub mod table;

pub use error::{ParseError, RejectionReason, RowParseWarning, SourceError};
pub use models::{Config, EnrollmentRecord, Selection, SelectionId, TimePoint};
pub use session::DashboardSession;
