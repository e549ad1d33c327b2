//! Pure admission predicates applied to incoming job events.
mod labels;
pub use labels::{LabelMatcher, is_self_hosted};

mod repository;
pub use repository::{RepositoryFilter, WILDCARD};
