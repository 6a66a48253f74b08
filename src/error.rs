use std::path::PathBuf;
use thiserror::Error;

/// Everything that can abort a plotting run.
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("couldn't find input files: {}", display_paths(.0))]
    MissingInput(Vec<PathBuf>),

    #[error("column '{0}' not found in the simulation output")]
    MissingColumn(String),

    #[error("column '{0}' is not numeric")]
    NonNumericColumn(String),

    #[error("column '{name}' has {len} values for {rows} rows")]
    ColumnLength { name: String, len: usize, rows: usize },

    #[error("plot style {0} not implemented")]
    NotImplemented(String),

    #[error("drawing error: {0}")]
    Drawing(String),

    #[error("PDF conversion error: {0}")]
    Pdf(String),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

/// maps any plotters drawing error (generic over the backend) into a `PlotError`
pub fn drawing_err<E: std::fmt::Debug>(e: E) -> PlotError {
    PlotError::Drawing(format!("{:?}", e))
}
