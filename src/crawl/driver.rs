use crate::crawl::{Crawler, IterationProcessor};
use crate::h5io::{current_iteration, iter_group_name, segment_count, WriteSettings};
use crate::io::Configuration;
use crate::utils::Timer;
use anyhow::{ensure, Context, Result};
use hdf5::{File, Group};
use log::info;
use ndarray::Array4;
use rayon::prelude::*;
use std::path::PathBuf;

/// Summary of a finished crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub iter_start: u64,
    pub iter_stop: u64,
    pub output: PathBuf,
    pub n_segments: Vec<usize>,
}

impl CrawlReport {
    pub fn n_iterations(&self) -> usize {
        self.n_segments.len()
    }
}

/// Resolves the exclusive iteration range of a crawl. Without an explicit
/// stop the crawl ends before the iteration the simulation is working on.
/// A start beyond that iteration is an error.
pub fn iteration_range(config: &Configuration, source: &File) -> Result<(u64, u64)> {
    let iter_start: u64 = config.crawl.iter_start;
    let iter_stop: u64 = match config.crawl.iter_stop {
        Some(stop) => stop,
        None => {
            let current: u64 = current_iteration(source).context(
                "crawl.iter_stop is not set and the main data file has no current iteration",
            )?;
            ensure!(
                current >= iter_start,
                "crawl.iter_start ({}) lies beyond west_current_iteration ({}) of the main data file",
                iter_start,
                current
            );
            current
        }
    };
    ensure!(
        iter_stop >= iter_start,
        "crawl.iter_stop ({}) lies before crawl.iter_start ({})",
        iter_stop,
        iter_start
    );
    Ok((iter_start, iter_stop))
}

/// Runs the whole crawl: every iteration in the range is processed and written to
/// the crawl file. Iterations of one batch are computed in parallel, the results are
/// written in increasing iteration order.
pub fn run_crawl(config: &Configuration) -> Result<CrawlReport> {
    let timer: Timer = Timer::start();
    let source_path: PathBuf = config.source_h5();
    let source: File = File::open(&source_path)
        .with_context(|| format!("unable to open {}", source_path.display()))?;
    let (iter_start, iter_stop) = iteration_range(config, &source)?;

    info!("{:^80}", "");
    info!("{: ^80}", "Crawl");
    info!("{:-^80}", "");
    info!("{: <25} {}", "main data file:", source_path.display());
    info!("{: <25} {}", "output file:", config.crawl_h5().display());
    info!("{: <25} {}..{}", "iterations:", iter_start, iter_stop);

    let processor: IterationProcessor = IterationProcessor::new(config)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.crawl.n_workers)
        .build()?;

    let mut crawler: Crawler = Crawler::new(
        &config.crawl_h5(),
        &config.h5.dataset,
        config.h5.iter_prec,
        WriteSettings::from(&config.h5),
    );
    crawler.initialize(iter_start, iter_stop)?;

    // the segment counts are read up front so that the workers never touch the HDF5 library
    let mut n_segments: Vec<usize> = Vec::new();
    for n_iter in iter_start..iter_stop {
        let group_name: String = iter_group_name(n_iter, config.h5.iter_prec);
        let iter_group: Group = source
            .group(&group_name)
            .with_context(|| format!("{} is missing in {}", group_name, source_path.display()))?;
        n_segments.push(segment_count(&iter_group)?);
    }

    info!("{: >10} {: >12}", "Iter.", "#Segments");
    info!("{:-^23} ", "");
    let iterations: Vec<(u64, usize)> = (iter_start..iter_stop).zip(n_segments.iter().copied()).collect();
    for batch in iterations.chunks(config.crawl.batch_size) {
        let results: Vec<Array4<f64>> = pool.install(|| {
            batch
                .par_iter()
                .map(|(n_iter, n_segs)| processor.process_segments(*n_iter, *n_segs))
                .collect::<Result<Vec<Array4<f64>>>>()
        })?;
        for ((n_iter, n_segs), result) in batch.iter().zip(results.iter()) {
            crawler.process_iter_result(*n_iter, result)?;
            info!("{: >10} {: >12}", n_iter, n_segs);
        }
    }
    crawler.finalize()?;

    info!("{:-^80} ", "");
    info!("{}", timer);
    Ok(CrawlReport {
        iter_start,
        iter_stop,
        output: config.crawl_h5(),
        n_segments,
    })
}
