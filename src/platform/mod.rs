//! Video platform scraping: HTTP client, page mining and signature deciphering

pub mod cipher;
pub mod client;
pub mod initial_data;
pub mod locator;
pub mod metadata;

pub use cipher::*;
pub use client::*;
pub use initial_data::*;
pub use locator::*;
pub use metadata::*;
