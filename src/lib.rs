// Re-export modules
pub mod classifier;
pub mod config;
pub mod crawlers;
pub mod error;
pub mod filter;
pub mod io;
pub mod links;
pub mod parsers;
pub mod render;
pub mod results;
pub mod urls;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::CrawlConfig;
pub use crawlers::{CrawlContext, run_sites};
pub use error::CrawlError;
pub use results::{MenuItem, RestaurantResult, Site, SiteStatus};
