//! Media storage module
//!
//! Boundary to the binary media-upload service: a raw file and a
//! declared kind go in, a stable URL comes out. The engine stores only
//! the URL and never validates file content.

mod media;

pub use media::{InMemoryMediaStore, MediaStore, media_file_extension};
