//! HTTP client for the watchlist service.
//!
//! # Example
//!
//! ```rust,ignore
//! use marketstream_sdk::client::{ClientConfig, WatchlistClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WatchlistClient::new(
//!         ClientConfig::new("http://127.0.0.1:8081").with_bearer_token("token"),
//!     )?;
//!
//!     let entities = client.relevant_entities().await?;
//!     println!("{} topics needed", entities.desired_topics().len());
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod http;

pub use config::ClientConfig;
pub use error::ClientError;
pub use http::{entities_from, WatchlistClient};
