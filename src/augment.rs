use crate::defaults::{AUXDATA_GROUP, DATASET_NAME, ITER_PREC, ITER_STOP_ATTR};
use crate::h5io::{copy_dataset, ensure_group, iter_group_name, read_u64_attr};
use crate::io::{Configuration, UpperBound};
use crate::utils::Timer;
use anyhow::{Context, Result};
use hdf5::{Dataset, File, Group};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// First iteration of a weighted ensemble run.
const FIRST_ITERATION: u64 = 1;

/// Summary of a finished augmentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AugmentReport {
    pub destination: PathBuf,
    pub iter_stop: u64,
    pub iterations: Vec<u64>,
}

/// Merges the auxiliary datasets of a crawl file into a copy of the main data file.
/// The main data file itself is never opened for writing.
#[derive(Debug, Clone)]
pub struct Augmenter {
    source: PathBuf,
    crawl: PathBuf,
    destination: PathBuf,
    dataset: String,
    upper_bound: UpperBound,
    iter_prec: usize,
}

impl Augmenter {
    pub fn new(source: &Path, crawl: &Path, destination: &Path) -> Self {
        Augmenter {
            source: source.to_path_buf(),
            crawl: crawl.to_path_buf(),
            destination: destination.to_path_buf(),
            dataset: String::from(DATASET_NAME),
            upper_bound: UpperBound::default(),
            iter_prec: ITER_PREC,
        }
    }

    pub fn from_config(config: &Configuration) -> Self {
        Self::new(&config.source_h5(), &config.crawl_h5(), &config.dest_h5())
            .dataset(&config.h5.dataset)
            .upper_bound(config.augment.upper_bound)
            .iter_prec(config.h5.iter_prec)
    }

    pub fn dataset(mut self, dataset: &str) -> Self {
        self.dataset = dataset.to_owned();
        self
    }

    pub fn upper_bound(mut self, upper_bound: UpperBound) -> Self {
        self.upper_bound = upper_bound;
        self
    }

    pub fn iter_prec(mut self, iter_prec: usize) -> Self {
        self.iter_prec = iter_prec;
        self
    }

    /// Copies the main data file to the destination and adds
    /// `iterations/iter_XXXXXXXX/auxdata/<dataset>` from the crawl file for every
    /// iteration from 1 up to the stamped `iter_stop` (see [UpperBound]).
    /// A missing dataset in the crawl file aborts the run; the destination is left as is.
    pub fn augment(&self) -> Result<AugmentReport> {
        let timer: Timer = Timer::start();
        info!("{:^80}", "");
        info!("{: ^80}", "Augment");
        info!("{:-^80}", "");
        info!("{: <25} {}", "main data file:", self.source.display());
        info!("{: <25} {}", "crawl file:", self.crawl.display());
        info!("{: <25} {}", "destination:", self.destination.display());

        // all changes go to a copy, the main data file is only read
        fs::copy(&self.source, &self.destination).with_context(|| {
            format!(
                "unable to copy {} to {}",
                self.source.display(),
                self.destination.display()
            )
        })?;

        let destination: File = File::open_rw(&self.destination)
            .with_context(|| format!("unable to open {}", self.destination.display()))?;
        let crawl: File = File::open(&self.crawl)
            .with_context(|| format!("unable to open {}", self.crawl.display()))?;

        let iter_stop: u64 = read_u64_attr(&crawl, ITER_STOP_ATTR)
            .with_context(|| format!("{} is not a crawl file", self.crawl.display()))?;
        let iter_end: u64 = self.upper_bound.end(iter_stop);
        info!("{: <25} {}..{}", "iterations:", FIRST_ITERATION, iter_end);

        let mut iterations: Vec<u64> = Vec::new();
        for n_iter in FIRST_ITERATION..iter_end {
            let auxdata_path: String =
                format!("{}/{}", iter_group_name(n_iter, self.iter_prec), AUXDATA_GROUP);
            let auxdata: Group = ensure_group(&destination, &auxdata_path)?;
            let source_path: String = format!("{}/{}", auxdata_path, self.dataset);
            let source: Dataset = crawl.dataset(&source_path).with_context(|| {
                format!(
                    "iteration {}: {} is missing in {}",
                    n_iter,
                    source_path,
                    self.crawl.display()
                )
            })?;
            copy_dataset(&source, &auxdata, &self.dataset)
                .with_context(|| format!("iteration {}: unable to copy {}", n_iter, source_path))?;
            debug!("copied {}", source_path);
            iterations.push(n_iter);
        }
        destination.flush()?;

        info!("{: <25} {}", "copied iterations:", iterations.len());
        info!("{:-^80} ", "");
        info!("{}", timer);
        Ok(AugmentReport {
            destination: self.destination.clone(),
            iter_stop,
            iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let augmenter = Augmenter::new(Path::new("west.h5"), Path::new("crawl.h5"), Path::new("dest.h5"))
            .dataset("com")
            .upper_bound(UpperBound::Inclusive)
            .iter_prec(6);
        assert_eq!(augmenter.dataset, "com");
        assert_eq!(augmenter.upper_bound, UpperBound::Inclusive);
        assert_eq!(augmenter.iter_prec, 6);
    }

    #[test]
    fn missing_source_aborts_before_touching_the_destination() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("west_augmented.h5");
        let augmenter = Augmenter::new(
            &dir.path().join("west.h5"),
            &dir.path().join("augment_data.h5"),
            &destination,
        );
        assert!(augmenter.augment().is_err());
        assert!(!destination.exists());
    }

    #[test]
    fn config_paths_are_used() {
        let mut config = Configuration::default();
        config.paths.sim_root = String::from("/data/nacl");
        let augmenter = Augmenter::from_config(&config);
        assert_eq!(augmenter.source, PathBuf::from("/data/nacl/west.h5"));
        assert_eq!(augmenter.destination, PathBuf::from("west_augmented.h5"));
    }
}
