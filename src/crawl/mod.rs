mod crawler;
mod driver;
mod processor;

pub use crawler::Crawler;
pub use driver::{iteration_range, run_crawl, CrawlReport};
pub use processor::IterationProcessor;
