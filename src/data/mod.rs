//! Data layer module
//!
//! Local models and cache slices:
//! - domain models shared by every component
//! - media reference normalization
//! - per-slice caches (feed, reactions, graph, stories, transcripts,
//!   user directory, profile metadata)

mod cache;
mod media;
mod models;

pub use cache::{
    FeedCache, GraphCache, ProfileCache, ReactionEntry, ReactionLedger, StoryCache, Transcripts,
    UserDirectory,
};
pub use media::{MediaField, normalize};
pub use models::*;
