use chrono::prelude::*;
use log::LevelFilter;
use std::io::Write;
pub mod cli;
pub mod error;
pub mod linspace;
pub mod render;
pub mod scenario;
pub mod stats;
pub mod table;

pub const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

pub const DT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// columns written by the simulator
pub const START: &str = "job.start";
pub const END: &str = "job.end";
pub const COMPUTETIME: &str = "job.computetime";
pub const INFILES_TRANSFERTIME: &str = "infiles.transfertime";
pub const OUTFILES_TRANSFERTIME: &str = "outfiles.transfertime";
pub const MACHINE: &str = "machine.name";
pub const HITRATE: &str = "hitrate";

// derived columns
pub const WALLTIME: &str = "Walltime";
pub const IOTIME: &str = "IOtime";
pub const EFFICIENCY: &str = "Efficiency";

/// Info level by default and debug when verbose; the SVG and PDF converters only report errors.
/// RUST_LOG, if set, takes precedence.
pub fn logger_builder(verbose: bool) -> env_logger::Builder {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .filter_module("usvg", LevelFilter::Error)
        .filter_module("svg2pdf", LevelFilter::Error)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}",
                Local::now().format(DT_FORMAT),
                record.level(),
                record.args()
            )
        });
    builder
}

pub fn init_logger(verbose: bool) {
    let _ = logger_builder(verbose).try_init();
}

/// min and max of the finite values, `None` if there are none
pub fn min_and_max(s: &[f64]) -> Option<(f64, f64)> {
    let mut self_iter = s.iter().filter(|v| v.is_finite());
    let (mut min, mut max) = match self_iter.next() {
        Some(v) => (*v, *v),
        None => return None,
    };
    for es in self_iter {
        if *es > max {
            max = *es
        }
        if *es < min {
            min = *es
        }
    }
    Some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Log, Metadata};

    fn enabled(logger: &env_logger::Logger, target: &str, level: Level) -> bool {
        logger.enabled(&Metadata::builder().target(target).level(level).build())
    }

    #[test]
    fn converter_warnings_are_filtered_out() {
        let logger = logger_builder(false).build();
        assert!(!enabled(&logger, "usvg::text", Level::Warn));
        assert!(enabled(&logger, "usvg::text", Level::Error));
        assert!(!enabled(&logger, "svg2pdf", Level::Warn));
        assert!(enabled(&logger, "hitrate_scan::render", Level::Info));
        assert!(!enabled(&logger, "hitrate_scan::render", Level::Debug));
        let logger = logger_builder(true).build();
        assert!(enabled(&logger, "hitrate_scan::render", Level::Debug));
        assert!(!enabled(&logger, "usvg", Level::Debug));
    }

    #[test]
    fn min_and_max_skips_non_finite() {
        assert_eq!(
            min_and_max(&[f64::NAN, 3., -1., f64::INFINITY, 2.]),
            Some((-1., 3.))
        );
        assert_eq!(min_and_max(&[f64::NAN]), None);
        assert_eq!(min_and_max(&[]), None);
    }
}
