//! Public project gallery feed.
//!
//! [`ProjectFeed`] keeps the list of gallery-ready projects: it serves a
//! cached copy when one is fresh, otherwise loads active projects from a
//! [`ProjectSource`] with timeout and retry, orders their images, derives
//! the client name and drops projects without photos.

pub mod feed;
pub mod source;
pub mod transform;

pub use feed::{FeedError, FeedOptions, FeedSnapshot, ProjectFeed, PROJECTS_CACHE_KEY};
pub use source::{PgProjectSource, ProjectSource};
pub use transform::{transform_projects, ProjectWithImages, RawProject};
