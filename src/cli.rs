use super::VERSION;
use crate::scenario::{scenario_keys, PlotStyle};
use clap::{App, Arg};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// The parsed command line of the hitrate plotter.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotArgs {
    pub scenario: String,
    pub style: String,
    pub suffix: Option<String>,
    pub simoutputs: Vec<PathBuf>,
    pub verbose: bool,
}

/// Each input must be an existing file with a csv extension.
pub fn valid_file(param: String) -> Result<(), String> {
    let path = Path::new(&param);
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(String::from("File must have a csv extension"));
    }
    if !path.exists() {
        return Err(format!("{}: No such file", param));
    }
    Ok(())
}

fn app<'a, 'b>() -> App<'a, 'b> {
    let arg_scenario = Arg::with_name("scenario")
        .help("scenario used in the plot title and in the file name of the plots")
        .long("scenario")
        .takes_value(true)
        .required(true)
        .possible_values(&scenario_keys());
    let arg_style = Arg::with_name("style")
        .help("plot style for the visualization")
        .long("style")
        .takes_value(true)
        .possible_values(&PlotStyle::keys())
        .default_value("scatterplot");
    let arg_suffix = Arg::with_name("suffix")
        .help("optional suffix to add to the file name of the plots")
        .long("suffix")
        .takes_value(true);
    let arg_verbose = Arg::with_name("verbose")
        .help("print debug information")
        .short("v")
        .long("verbose")
        .takes_value(false)
        .required(false);
    let arg_simoutputs = Arg::with_name("simoutputs")
        .help("csv files with the simulated jobs, one per hitrate value of the scan")
        .required(true)
        .multiple(true)
        .validator(valid_file);
    App::new("hitrate_plot")
        .version(VERSION.unwrap_or("unknown"))
        .author("Luca Peruzzo")
        .about(
            "cli app to plot the hitrate dependency of the simulated system; \
            wall time, transfer time and CPU efficiency of the jobs are plotted \
            against the cache hitrate, each file is one point of the scan",
        )
        .arg(arg_scenario)
        .arg(arg_style)
        .arg(arg_suffix)
        .arg(arg_verbose)
        .arg(arg_simoutputs)
}

/// Parses the given arguments, the first one is the program name.
pub fn parse_cli_from<I, T>(args: I) -> Result<PlotArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli_args = app().get_matches_from_safe(args)?;
    let scenario = String::from(cli_args.value_of("scenario").unwrap_or_default());
    let style = String::from(cli_args.value_of("style").unwrap_or_default());
    let suffix = cli_args.value_of("suffix").map(String::from);
    let simoutputs = cli_args
        .values_of("simoutputs")
        .map(|v| v.map(PathBuf::from).collect())
        .unwrap_or_default();
    let verbose = cli_args.is_present("verbose");
    Ok(PlotArgs {
        scenario,
        style,
        suffix,
        simoutputs,
        verbose,
    })
}

/// Takes the CLI arguments that control the hitrate plots, exits on invalid arguments.
pub fn parse_cli() -> PlotArgs {
    parse_cli_from(std::env::args_os()).unwrap_or_else(|e| e.exit())
}

impl PlotArgs {
    /// the suffix as it appears in the file names
    pub fn file_suffix(&self) -> String {
        match &self.suffix {
            Some(s) => format!("_{}", s),
            None => String::new(),
        }
    }
}
