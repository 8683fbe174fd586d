//! Command implementations for the keepsake CLI

mod config;
mod convert;
mod crawl;
mod date;

pub use config::execute as show_config;
pub use convert::execute as convert_pages;
pub use crawl::execute as crawl_listing;
pub use date::execute as resolve_dates;
