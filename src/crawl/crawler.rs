use crate::defaults::AUXDATA_GROUP;
use crate::h5io::{ensure_group, require_iter_group, stamp_iter_range, write_array, WriteSettings};
use anyhow::{bail, Context, Result};
use hdf5::{File, Group};
use log::debug;
use ndarray::Array4;
use std::collections::BTreeSet;
use std::mem;
use std::path::{Path, PathBuf};

enum State {
    Uninitialized,
    Open {
        file: File,
        written: BTreeSet<u64>,
    },
    Closed,
}

/// Owns the output file of a crawl. The life cycle is strictly
/// `initialize` -> `process_iter_result`* -> `finalize`.
pub struct Crawler {
    path: PathBuf,
    dataset: String,
    iter_prec: usize,
    settings: WriteSettings,
    state: State,
}

impl Crawler {
    pub fn new(path: &Path, dataset: &str, iter_prec: usize, settings: WriteSettings) -> Self {
        Crawler {
            path: path.to_path_buf(),
            dataset: dataset.to_owned(),
            iter_prec,
            settings,
            state: State::Uninitialized,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Iterations written so far, in increasing order.
    pub fn written(&self) -> Vec<u64> {
        match &self.state {
            State::Open { written, .. } => written.iter().copied().collect(),
            _ => Vec::new(),
        }
    }

    /// Creates (truncates) the output file and stamps the iteration range of the crawl.
    pub fn initialize(&mut self, iter_start: u64, iter_stop: u64) -> Result<()> {
        if !matches!(self.state, State::Uninitialized) {
            bail!("crawler for {} was already initialized", self.path.display());
        }
        let file: File = File::create(&self.path)
            .with_context(|| format!("unable to create {}", self.path.display()))?;
        stamp_iter_range(&file, iter_start, iter_stop)?;
        debug!(
            "opened {} for iterations {}..{}",
            self.path.display(),
            iter_start,
            iter_stop
        );
        self.state = State::Open {
            file,
            written: BTreeSet::new(),
        };
        Ok(())
    }

    /// Stores the result of iteration `n_iter` as `iterations/iter_XXXXXXXX/auxdata/<dataset>`.
    /// Every iteration can only be written once.
    pub fn process_iter_result(&mut self, n_iter: u64, result: &Array4<f64>) -> Result<()> {
        let (file, written) = match &mut self.state {
            State::Open { file, written } => (file, written),
            State::Uninitialized => bail!("crawler was not initialized"),
            State::Closed => bail!("crawler was already finalized"),
        };
        if written.contains(&n_iter) {
            bail!("iteration {} was already written", n_iter);
        }
        let iter_group: Group = require_iter_group(file, n_iter, self.iter_prec)?;
        let auxdata: Group = ensure_group(&iter_group, AUXDATA_GROUP)?;
        write_array(&auxdata, &self.dataset, result.view(), &self.settings, None)
            .with_context(|| format!("unable to store iteration {}", n_iter))?;
        written.insert(n_iter);
        Ok(())
    }

    /// Flushes and closes the output file.
    pub fn finalize(&mut self) -> Result<()> {
        match mem::replace(&mut self.state, State::Closed) {
            State::Open { file, .. } => {
                file.flush()?;
                drop(file);
                debug!("closed {}", self.path.display());
                Ok(())
            }
            State::Uninitialized => {
                self.state = State::Uninitialized;
                bail!("crawler was not initialized")
            }
            State::Closed => bail!("crawler was already finalized"),
        }
    }
}
