//! Content selection for Minaret.
//!
//! Decides what to send for a group's content window: which categories the
//! time of day admits, which are cooling down or over quota, and which cached
//! item spreads usage best. Categories are tagged with their window at
//! catalog sync time; selection only reads stored tags.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use selection::{SelectionConfig, SelectionEngine, WindowName};
//! use upstream::{HadeethClient, HadeethConfig};
//!
//! # async fn example(db: database::Database, group: database::Group) -> Result<(), selection::SelectionError> {
//! let source = Arc::new(HadeethClient::new(HadeethConfig::default()));
//! let engine = SelectionEngine::new(db.pool().clone(), source, SelectionConfig::default());
//!
//! if let Some(item) = engine
//!     .select_for_window(&group, WindowName::Morning, chrono::Utc::now())
//!     .await?
//! {
//!     println!("{}", item.body);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod engine;
pub mod error;
pub mod tagging;
pub mod windows;

pub use catalog::sync_categories;
pub use engine::{SelectionConfig, SelectionEngine};
pub use error::{Result, SelectionError};
pub use tagging::tag_for_title;
pub use windows::{default_windows, ContentWindow, WindowName};
