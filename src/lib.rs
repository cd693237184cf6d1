//! # playersig - stream metadata scraping and signature deciphering
//!
//! Fetches public video metadata from watch pages and recovers playable
//! stream URLs whose playback-authorization signature is obscured by an
//! obfuscated transformation procedure embedded in the platform's player
//! script.
//!
//! The procedure is never executed as JavaScript. Instead the script text is
//! mined for a small helper object and the transformation function that calls
//! into it, compiled into a four-instruction sequence, and interpreted
//! against the raw signature.
//!
//! ## Example
//!
//! ```rust,no_run
//! use playersig::Scraper;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scraper = Scraper::new()?;
//!     let video = scraper.video("jNQXAC9IVRw").await?;
//!
//!     println!("{}", video.title);
//!     for stream in &video.streams {
//!         println!("{}", stream.url);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod platform;
pub mod utils;

// Re-export main types
pub use error::PlayersigError;
pub use platform::cipher::{CompiledProcedure, Decipherer, OperationKind, ResolvedOperation};
pub use platform::initial_data::{
    PlaylistEntry, PlaylistMetadata, RelatedVideo, SearchResult, Thumbnail,
};
pub use platform::metadata::{Scraper, StreamInfo, StreamKind, VideoMetadata};

/// Result type alias for playersig operations
pub type Result<T> = std::result::Result<T, PlayersigError>;
