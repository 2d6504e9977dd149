//! Keeps a user's YouTube subscriptions and their favorite flags in sync between
//! the YouTube Data API, a Firestore mirror and an in-memory store for views.

mod channel;
pub use channel::{dedup_videos, merge_channels, Channel, FavoriteUpdate, Video};

mod changes;
pub use changes::{Changes, Observers, Revision};

mod config;
pub use config::Config;

pub mod document;

mod error;
pub use error::{Error, Result};

pub mod firestore;

mod identity;
pub use identity::{Identity, Session, StaticIdentity};

mod mirror;
pub use mirror::{MemoryMirror, Mirror};

mod source;
pub use source::{CachedVideos, SubscriptionSource, VideoSource};

mod store;
pub use store::{LoadOrigin, SubscriptionStore};

pub mod youtube;
