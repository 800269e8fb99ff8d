use anyhow::{bail, Result};
use clap::{crate_version, Arg, ArgMatches, Command};
use env_logger::Env;
use log::{info, LevelFilter};
use std::io::Write;
use std::path::Path;
use westaux::defaults::CONFIG_FILE_NAME;
use westaux::io::{write_header, UpperBound};
use westaux::{read_config, run_crawl, Augmenter, Configuration};

fn cli() -> Command<'static> {
    Command::new("westaux")
        .version(crate_version!())
        .about("adds per-segment coordinates as auxiliary data to weighted ensemble data files")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .takes_value(true)
                .value_name("FILE")
                .default_value(CONFIG_FILE_NAME)
                .global(true)
                .help("configuration file, written with default settings if it does not exist"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .multiple_occurrences(true)
                .global(true)
                .help("more output, can be repeated"),
        )
        .subcommand(
            Command::new("crawl")
                .about("collects the parent and child coordinates of every segment into the crawl file")
                .arg(
                    Arg::new("start")
                        .long("start")
                        .takes_value(true)
                        .value_name("N_ITER")
                        .help("first iteration"),
                )
                .arg(
                    Arg::new("stop")
                        .long("stop")
                        .takes_value(true)
                        .value_name("N_ITER")
                        .help("iteration after the last one"),
                )
                .arg(
                    Arg::new("workers")
                        .long("workers")
                        .takes_value(true)
                        .value_name("N")
                        .help("number of worker threads"),
                ),
        )
        .subcommand(
            Command::new("augment")
                .about("copies the main data file and merges the crawl file into the copy")
                .arg(
                    Arg::new("inclusive")
                        .long("inclusive")
                        .help("also copy the iteration stamped as iter_stop"),
                ),
        )
}

fn init_logger(verbose: i8) {
    let level: LevelFilter = match verbose {
        i8::MIN..=-1 => LevelFilter::Warn,
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // RUST_LOG takes precedence over the verbosity
    env_logger::Builder::from_env(Env::default().default_filter_or(level.as_str()))
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn apply_crawl_args(config: &mut Configuration, matches: &ArgMatches) -> Result<()> {
    if let Some(start) = matches.value_of("start") {
        config.crawl.iter_start = start.parse()?;
    }
    if let Some(stop) = matches.value_of("stop") {
        config.crawl.iter_stop = Some(stop.parse()?);
    }
    if let Some(workers) = matches.value_of("workers") {
        config.crawl.n_workers = workers.parse()?;
    }
    config.validate()
}

fn main() -> Result<()> {
    let matches: ArgMatches = cli().get_matches();
    let config_path: &str = matches.value_of("config").unwrap_or(CONFIG_FILE_NAME);
    let (mut config, written): (Configuration, bool) = read_config(Path::new(config_path))?;
    let verbose: i8 = config
        .verbose
        .saturating_add(matches.occurrences_of("verbose").min(i8::MAX as u64) as i8);
    init_logger(verbose);
    write_header();
    if written {
        info!("{: <25} {}", "default config written:", config_path);
    }

    match matches.subcommand() {
        Some(("crawl", sub_matches)) => {
            apply_crawl_args(&mut config, sub_matches)?;
            run_crawl(&config)?;
        }
        Some(("augment", sub_matches)) => {
            if sub_matches.is_present("inclusive") {
                config.augment.upper_bound = UpperBound::Inclusive;
            }
            Augmenter::from_config(&config).augment()?;
        }
        _ => bail!("a subcommand is required"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn crawl_arguments_override_the_config() {
        let matches = cli().get_matches_from(vec!["westaux", "-v", "crawl", "--start", "2", "--stop", "9", "--workers", "3"]);
        assert_eq!(matches.occurrences_of("verbose"), 1);
        let (name, sub_matches) = matches.subcommand().unwrap();
        assert_eq!(name, "crawl");
        let mut config = Configuration::default();
        apply_crawl_args(&mut config, sub_matches).unwrap();
        assert_eq!(config.crawl.iter_start, 2);
        assert_eq!(config.crawl.iter_stop, Some(9));
        assert_eq!(config.crawl.n_workers, 3);
    }

    #[test]
    fn stop_before_start_is_rejected() {
        let matches = cli().get_matches_from(vec!["westaux", "crawl", "--start", "5", "--stop", "2"]);
        let (_, sub_matches) = matches.subcommand().unwrap();
        let mut config = Configuration::default();
        assert!(apply_crawl_args(&mut config, sub_matches).is_err());
    }
}
