//! Structural extraction of bibliographic records from rendered pages.

pub mod biblio;
pub mod fields;

pub use biblio::{extract, extract_html};
