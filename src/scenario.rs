use crate::error::PlotError;
use crate::{EFFICIENCY, IOTIME, WALLTIME};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Scenario keys and the titles used on the plots.
pub const SCENARIOS: [(&str, &str); 5] = [
    ("copy", "Input-files copied"),
    ("fullstream", "Block-streaming"),
    ("SGBatch_fullstream_10G", "SG-Batch 10Gb/s gateway"),
    ("SGBatch_fullstream_1G", "SG-Batch 1Gb/s gateway"),
    (
        "SGBatch_fullstream_10G_70Mcache",
        "SG-Batch 10Gb/s gateway 70MB/s cache",
    ),
];

pub fn scenario_keys() -> Vec<&'static str> {
    SCENARIOS.iter().map(|(k, _)| *k).collect()
}

pub fn scenario_label(key: &str) -> Option<&'static str> {
    SCENARIOS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, label)| *label)
}

/// Chart styles, one rendering branch each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotStyle {
    Scatter,
    Point,
    Box,
    Boxen,
    Violin,
    Joint,
}

impl PlotStyle {
    pub const ALL: [PlotStyle; 6] = [
        PlotStyle::Scatter,
        PlotStyle::Point,
        PlotStyle::Box,
        PlotStyle::Boxen,
        PlotStyle::Violin,
        PlotStyle::Joint,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PlotStyle::Scatter => "scatterplot",
            PlotStyle::Point => "pointplot",
            PlotStyle::Box => "boxplot",
            PlotStyle::Boxen => "boxenplot",
            PlotStyle::Violin => "violinplot",
            PlotStyle::Joint => "jointplot",
        }
    }

    pub fn keys() -> Vec<&'static str> {
        PlotStyle::ALL.iter().map(|s| s.key()).collect()
    }
}

impl FromStr for PlotStyle {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlotStyle::ALL
            .iter()
            .copied()
            .find(|style| style.key() == s)
            .ok_or_else(|| PlotError::NotImplemented(s.to_string()))
    }
}

impl fmt::Display for PlotStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// The derived quantities plotted against the hitrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Walltime,
    IOtime,
    Efficiency,
}

impl Quantity {
    pub const ALL: [Quantity; 3] = [Quantity::Walltime, Quantity::IOtime, Quantity::Efficiency];

    /// name of the derived column, also used in the file names
    pub fn column(self) -> &'static str {
        match self {
            Quantity::Walltime => WALLTIME,
            Quantity::IOtime => IOTIME,
            Quantity::Efficiency => EFFICIENCY,
        }
    }

    pub fn ylabel(self) -> &'static str {
        match self {
            Quantity::Walltime => "jobtime / min",
            Quantity::IOtime => "transfer time / min",
            Quantity::Efficiency => "CPU eff.",
        }
    }

    /// fixed y range, `None` fits the axis to the data
    pub fn ylim(self) -> Option<(f64, f64)> {
        match self {
            Quantity::Efficiency => Some((0., 1.05)),
            _ => None,
        }
    }

    /// `hitrate{Quantity}_{scenario}jobs{suffix}.{ext}` inside `dir`
    pub fn output_path(self, dir: &Path, scenario: &str, suffix: &str, ext: &str) -> PathBuf {
        dir.join(format!(
            "hitrate{}_{}jobs{}.{}",
            self.column(),
            scenario,
            suffix,
            ext
        ))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}
