//! Contract text preparation — extraction, keyword expansion, scoring, budgeted excerpts.
//!
//! Everything in this crate is synchronous and free of I/O apart from
//! [`extract_file`], so it can run on any request without locking.

pub mod excerpt;
pub mod extract;
pub mod keywords;
pub mod scoring;
pub mod slicing;

pub use excerpt::{shrink, ExcerptBuilder};
pub use extract::{extract_declared, extract_file, extract_text};
pub use keywords::expand;
