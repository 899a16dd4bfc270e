//! Navigation over a lazily loaded section tree.
//!
//! [`Navigator`] owns the single session state: the root forest of the
//! current database, which sections are expanded, the selected work or
//! resource and the back/forward history. Consumers only ever see
//! [`NavigationSnapshot`]s.

mod error;
pub mod history;
mod navigator;
mod state;
mod subscription;
mod tree;

pub use error::{NavigatorError, Result};
pub use history::{DetailType, HistoryDirection, HistoryEntry, HistorySnapshot, HistoryStack};
pub use navigator::Navigator;
pub use state::{ExpandOptions, NavigationSnapshot, SelectOptions};
pub use subscription::Subscription;
pub use tree::SectionTree;
