//! Auxiliary per-iteration data for weighted ensemble simulations: collect the
//! coordinates of the parent and child frames of every segment into a crawl file,
//! then merge that file into a copy of the main data file.
pub mod augment;
pub mod crawl;
pub mod defaults;
pub mod h5io;
pub mod io;
pub mod utils;

pub use augment::{AugmentReport, Augmenter};
pub use crawl::{run_crawl, CrawlReport, Crawler, IterationProcessor};
pub use io::{read_config, Configuration};
