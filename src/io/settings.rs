use crate::defaults::*;
use crate::io::template::PathTemplate;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_verbose() -> i8 {
    VERBOSE
}
fn default_sim_root() -> String {
    String::from(SIM_ROOT)
}
fn default_source_h5() -> String {
    String::from(SOURCE_H5)
}
fn default_topology() -> String {
    String::from(TOPOLOGY)
}
fn default_parent_traj() -> String {
    String::from(PARENT_TRAJ_TEMPLATE)
}
fn default_child_traj() -> String {
    String::from(CHILD_TRAJ_TEMPLATE)
}
fn default_crawl_h5() -> String {
    String::from(CRAWL_H5)
}
fn default_dest_h5() -> String {
    String::from(DEST_H5)
}
fn default_iter_start() -> u64 {
    ITER_START
}
fn default_batch_size() -> usize {
    BATCH_SIZE
}
fn default_n_workers() -> usize {
    N_WORKERS
}
fn default_iter_prec() -> usize {
    ITER_PREC
}
fn default_dataset() -> String {
    String::from(DATASET_NAME)
}
fn default_compression() -> u8 {
    COMPRESSION
}
fn default_scale_offset() -> u8 {
    SCALE_OFFSET
}
fn default_max_chunksize() -> usize {
    MAX_CHUNKSIZE
}
fn default_paths_config() -> PathsConfig {
    PathsConfig {
        sim_root: default_sim_root(),
        source_h5: default_source_h5(),
        topology: default_topology(),
        parent_traj: default_parent_traj(),
        child_traj: default_child_traj(),
        crawl_h5: default_crawl_h5(),
        dest_h5: default_dest_h5(),
    }
}
fn default_crawl_config() -> CrawlConfig {
    CrawlConfig {
        iter_start: default_iter_start(),
        iter_stop: None,
        batch_size: default_batch_size(),
        n_workers: default_n_workers(),
    }
}
fn default_h5_config() -> H5Config {
    H5Config {
        iter_prec: default_iter_prec(),
        dataset: default_dataset(),
        compression: default_compression(),
        scale_offset: default_scale_offset(),
        max_chunksize: default_max_chunksize(),
    }
}
fn default_augment_config() -> AugmentConfig {
    AugmentConfig {
        upper_bound: UpperBound::default(),
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Configuration {
    #[serde(default = "default_verbose")]
    pub verbose: i8,
    #[serde(default = "default_paths_config")]
    pub paths: PathsConfig,
    #[serde(default = "default_crawl_config")]
    pub crawl: CrawlConfig,
    #[serde(default = "default_h5_config")]
    pub h5: H5Config,
    #[serde(default = "default_augment_config")]
    pub augment: AugmentConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            verbose: default_verbose(),
            paths: default_paths_config(),
            crawl: default_crawl_config(),
            h5: default_h5_config(),
            augment: default_augment_config(),
        }
    }
}

impl Configuration {
    /// Check the settings that cannot be expressed in the types.
    pub fn validate(&self) -> Result<()> {
        self.parent_template()?;
        self.child_template()?;
        ensure!(self.h5.iter_prec >= 1, "h5.iter_prec must be at least 1");
        ensure!(self.h5.compression <= 9, "h5.compression must be in 0..=9");
        ensure!(!self.h5.dataset.is_empty(), "h5.dataset must not be empty");
        ensure!(self.crawl.batch_size >= 1, "crawl.batch_size must be at least 1");
        ensure!(self.crawl.iter_start >= 1, "crawl.iter_start must be at least 1");
        if let Some(stop) = self.crawl.iter_stop {
            ensure!(
                stop >= self.crawl.iter_start,
                "crawl.iter_stop ({}) lies before crawl.iter_start ({})",
                stop,
                self.crawl.iter_start
            );
        }
        Ok(())
    }

    pub fn sim_root(&self) -> &Path {
        Path::new(&self.paths.sim_root)
    }

    pub fn source_h5(&self) -> PathBuf {
        self.sim_root().join(&self.paths.source_h5)
    }

    pub fn topology(&self) -> PathBuf {
        self.sim_root().join(&self.paths.topology)
    }

    pub fn crawl_h5(&self) -> PathBuf {
        PathBuf::from(&self.paths.crawl_h5)
    }

    pub fn dest_h5(&self) -> PathBuf {
        PathBuf::from(&self.paths.dest_h5)
    }

    /// Template of the frame a segment started from, resolved against the simulation root.
    pub fn parent_template(&self) -> Result<PathTemplate> {
        self.resolve_template(&self.paths.parent_traj)
            .context("invalid paths.parent_traj")
    }

    /// Template of the frame a segment ended at, resolved against the simulation root.
    pub fn child_template(&self) -> Result<PathTemplate> {
        self.resolve_template(&self.paths.child_traj)
            .context("invalid paths.child_traj")
    }

    fn resolve_template(&self, template: &str) -> Result<PathTemplate> {
        Ok(PathTemplate::parse(template)?.with_root(self.sim_root()))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PathsConfig {
    #[serde(default = "default_sim_root")]
    pub sim_root: String,
    #[serde(default = "default_source_h5")]
    pub source_h5: String,
    #[serde(default = "default_topology")]
    pub topology: String,
    #[serde(default = "default_parent_traj")]
    pub parent_traj: String,
    #[serde(default = "default_child_traj")]
    pub child_traj: String,
    #[serde(default = "default_crawl_h5")]
    pub crawl_h5: String,
    #[serde(default = "default_dest_h5")]
    pub dest_h5: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct CrawlConfig {
    #[serde(default = "default_iter_start")]
    pub iter_start: u64,
    /// Exclusive; taken from the main data file if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iter_stop: Option<u64>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_n_workers")]
    pub n_workers: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct H5Config {
    #[serde(default = "default_iter_prec")]
    pub iter_prec: usize,
    #[serde(default = "default_dataset")]
    pub dataset: String,
    #[serde(default = "default_compression")]
    pub compression: u8,
    #[serde(default = "default_scale_offset")]
    pub scale_offset: u8,
    #[serde(default = "default_max_chunksize")]
    pub max_chunksize: usize,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct AugmentConfig {
    #[serde(default)]
    pub upper_bound: UpperBound,
}

/// How the augmenter treats the `iter_stop` attribute of the crawl file.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpperBound {
    /// Iterations `1..iter_stop`, the last stamped iteration is skipped.
    Exclusive,
    /// Iterations `1..=iter_stop`.
    Inclusive,
}

impl Default for UpperBound {
    fn default() -> Self {
        UpperBound::Exclusive
    }
}

impl UpperBound {
    /// Exclusive end of the iteration range for a stamped `iter_stop`.
    pub fn end(&self, iter_stop: u64) -> u64 {
        match self {
            UpperBound::Exclusive => iter_stop,
            UpperBound::Inclusive => iter_stop + 1,
        }
    }
}
