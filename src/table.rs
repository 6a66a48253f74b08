use crate::error::PlotError;
use crate::{
    COMPUTETIME, EFFICIENCY, END, INFILES_TRANSFERTIME, IOTIME, OUTFILES_TRANSFERTIME, START,
    WALLTIME,
};
use csv::{ReaderBuilder, Trim};
use log::{debug, info};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Number of leading and trailing rows shown when a table is printed.
const PREVIEW_ROWS: usize = 5;

/// A column of the job table.
/// Columns where every non-empty cell parses as a float are numeric, missing cells become NAN.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Float(Vec<f64>),
    Text(Vec<Option<String>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn into_text(self) -> Vec<Option<String>> {
        match self {
            Column::Text(v) => v,
            Column::Float(v) => v
                .into_iter()
                .map(|x| if x.is_nan() { None } else { Some(x.to_string()) })
                .collect(),
        }
    }

    fn cell(&self, row: usize) -> String {
        match self {
            Column::Float(v) => format!("{}", v[row]),
            Column::Text(v) => v[row].clone().unwrap_or_else(|| String::from("NaN")),
        }
    }

    fn infer(cells: Vec<String>) -> Column {
        let numeric = cells
            .iter()
            .all(|c| c.is_empty() || c.parse::<f64>().is_ok());
        if numeric {
            Column::Float(
                cells
                    .iter()
                    .map(|c| c.parse::<f64>().unwrap_or(f64::NAN))
                    .collect(),
            )
        } else {
            Column::Text(
                cells
                    .into_iter()
                    .map(|c| if c.is_empty() { None } else { Some(c) })
                    .collect(),
            )
        }
    }
}

/// The jobs of one or more simulation runs, stored column-wise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobTable {
    names: Vec<String>,
    columns: Vec<Column>,
    nrows: usize,
}

impl JobTable {
    pub fn new() -> JobTable {
        JobTable::default()
    }

    /// Reads a csv with header, the delimiter is a comma with optional surrounding whitespace.
    pub fn from_reader<R: Read>(reader: R) -> Result<JobTable, csv::Error> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);
        let names: Vec<String> = rdr.headers()?.iter().map(String::from).collect();
        let mut cells: Vec<Vec<String>> = vec![Vec::new(); names.len()];
        let mut nrows = 0;
        for record in rdr.records() {
            let record = record?;
            for (col, field) in cells.iter_mut().zip(record.iter()) {
                col.push(field.to_string());
            }
            nrows += 1;
        }
        let columns = cells.into_iter().map(Column::infer).collect();
        Ok(JobTable {
            names,
            columns,
            nrows,
        })
    }

    pub fn from_csv(path: &Path) -> Result<JobTable, PlotError> {
        let file = File::open(path)?;
        let table = JobTable::from_reader(file).map_err(|source| PlotError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            "read {} jobs with {} columns from {}",
            table.len(),
            table.names.len(),
            path.display()
        );
        Ok(table)
    }

    /// Reads all the simulation outputs and concatenates them into one table.
    /// Fails with `MissingInput` if any of the files is gone before anything is read.
    pub fn from_csv_files(paths: &[PathBuf]) -> Result<JobTable, PlotError> {
        let missing: Vec<PathBuf> = paths.iter().filter(|p| !p.exists()).cloned().collect();
        if !missing.is_empty() {
            return Err(PlotError::MissingInput(missing));
        }
        info!(
            "found {0} output-files, produce a hitrate scan for {0} hitrate values",
            paths.len()
        );
        let tables = paths
            .iter()
            .map(|p| JobTable::from_csv(p))
            .collect::<Result<Vec<JobTable>, PlotError>>()?;
        Ok(JobTable::concat(tables))
    }

    /// Stacks the tables row-wise.
    /// The columns are the union of all columns in first-seen order, filled with missing values
    /// where a table lacks them; a column that is text in any table becomes text.
    pub fn concat(tables: Vec<JobTable>) -> JobTable {
        let mut names: Vec<String> = Vec::new();
        for t in tables.iter() {
            for n in t.names.iter() {
                if !names.contains(n) {
                    names.push(n.clone());
                }
            }
        }
        let nrows = tables.iter().map(|t| t.nrows).sum();
        let columns = names
            .iter()
            .map(|name| {
                let parts: Vec<Option<&Column>> = tables.iter().map(|t| t.column(name)).collect();
                let as_text = parts
                    .iter()
                    .any(|c| matches!(c, Some(Column::Text(_))));
                if as_text {
                    let mut out: Vec<Option<String>> = Vec::with_capacity(nrows);
                    for (t, c) in tables.iter().zip(parts) {
                        match c {
                            Some(c) => out.extend(c.clone().into_text()),
                            None => out.extend(vec![None; t.nrows]),
                        }
                    }
                    Column::Text(out)
                } else {
                    let mut out: Vec<f64> = Vec::with_capacity(nrows);
                    for (t, c) in tables.iter().zip(parts) {
                        match c {
                            Some(Column::Float(v)) => out.extend_from_slice(v),
                            _ => out.extend(vec![f64::NAN; t.nrows]),
                        }
                    }
                    Column::Float(out)
                }
            })
            .collect();
        JobTable {
            names,
            columns,
            nrows,
        }
    }

    pub fn len(&self) -> usize {
        self.nrows
    }

    pub fn is_empty(&self) -> bool {
        self.nrows == 0
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    pub fn numeric(&self, name: &str) -> Result<&[f64], PlotError> {
        match self.column(name) {
            Some(Column::Float(v)) => Ok(&v[..]),
            Some(Column::Text(_)) => Err(PlotError::NonNumericColumn(name.to_string())),
            None => Err(PlotError::MissingColumn(name.to_string())),
        }
    }

    /// the column as strings, for categorical use (e.g. the machine names)
    pub fn labels(&self, name: &str) -> Result<Vec<String>, PlotError> {
        let col = self
            .column(name)
            .ok_or_else(|| PlotError::MissingColumn(name.to_string()))?;
        Ok((0..col.len()).map(|r| col.cell(r)).collect())
    }

    /// adds a numeric column, replacing one with the same name
    pub fn set_column(&mut self, name: &str, values: Vec<f64>) -> Result<(), PlotError> {
        if values.len() != self.nrows {
            return Err(PlotError::ColumnLength {
                name: name.to_string(),
                len: values.len(),
                rows: self.nrows,
            });
        }
        match self.names.iter().position(|n| n == name) {
            Some(i) => self.columns[i] = Column::Float(values),
            None => {
                self.names.push(name.to_string());
                self.columns.push(Column::Float(values));
            }
        }
        Ok(())
    }

    /// Adds the Walltime and IOtime (minutes) and the Efficiency columns.
    /// Nothing is clamped: jobs with `job.end == job.start` get a non-finite efficiency.
    pub fn derive_metrics(&mut self) -> Result<(), PlotError> {
        let start = self.numeric(START)?;
        let end = self.numeric(END)?;
        let compute = self.numeric(COMPUTETIME)?;
        let tin = self.numeric(INFILES_TRANSFERTIME)?;
        let tout = self.numeric(OUTFILES_TRANSFERTIME)?;

        let walltime: Vec<f64> = end.iter().zip(start).map(|(e, s)| (e - s) / 60.).collect();
        let iotime: Vec<f64> = tin.iter().zip(tout).map(|(i, o)| (i + o) / 60.).collect();
        let efficiency: Vec<f64> = compute
            .iter()
            .zip(end.iter().zip(start))
            .map(|(c, (e, s))| c / (e - s))
            .collect();

        let nonfinite = efficiency.iter().filter(|x| !x.is_finite()).count();
        if nonfinite > 0 {
            debug!("{} jobs with non-finite efficiency", nonfinite);
        }
        self.set_column(WALLTIME, walltime)?;
        self.set_column(IOTIME, iotime)?;
        self.set_column(EFFICIENCY, efficiency)
    }
}

impl fmt::Display for JobTable {
    /// pandas-like preview: head and tail rows with the row index, then the shape
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<Option<usize>> = if self.nrows <= 2 * PREVIEW_ROWS {
            (0..self.nrows).map(Some).collect()
        } else {
            (0..PREVIEW_ROWS)
                .map(Some)
                .chain(std::iter::once(None))
                .chain((self.nrows - PREVIEW_ROWS..self.nrows).map(Some))
                .collect()
        };
        let index: Vec<String> = rows
            .iter()
            .map(|r| r.map_or_else(|| String::from(".."), |r| r.to_string()))
            .collect();
        let index_width = index.iter().map(|s| s.len()).max().unwrap_or(0);
        let cells: Vec<Vec<String>> = self
            .columns
            .iter()
            .map(|c| {
                rows.iter()
                    .map(|r| r.map_or_else(|| String::from("..."), |r| c.cell(r)))
                    .collect()
            })
            .collect();
        let widths: Vec<usize> = self
            .names
            .iter()
            .zip(cells.iter())
            .map(|(n, col)| col.iter().map(|s| s.len()).chain(Some(n.len())).max().unwrap_or(0))
            .collect();

        write!(f, "{:w$}", "", w = index_width)?;
        for (n, w) in self.names.iter().zip(widths.iter()) {
            write!(f, "  {:>w$}", n, w = w)?;
        }
        writeln!(f)?;
        for (i, idx) in index.iter().enumerate() {
            write!(f, "{:<w$}", idx, w = index_width)?;
            for (col, w) in cells.iter().zip(widths.iter()) {
                write!(f, "  {:>w$}", col[i], w = w)?;
            }
            writeln!(f)?;
        }
        write!(f, "\n[{} rows x {} columns]", self.nrows, self.names.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HITRATE, MACHINE};
    use approx::assert_abs_diff_eq;

    const HEADER: &str = "job.start, job.end, job.computetime, infiles.transfertime, outfiles.transfertime, machine.name, hitrate\n";

    fn table(body: &str) -> JobTable {
        JobTable::from_reader(format!("{}{}", HEADER, body).as_bytes()).unwrap()
    }

    #[test]
    fn reads_comma_space_separated_columns() {
        let t = table("0, 120, 60, 30, 30, M1, 0.5\n10, 70, 30, 0, 6, M2, 0.5\n");
        assert_eq!(t.len(), 2);
        assert_eq!(t.names().len(), 7);
        assert_eq!(t.numeric(END).unwrap(), &[120., 70.]);
        assert_eq!(t.labels(MACHINE).unwrap(), vec!["M1", "M2"]);
        assert!(matches!(
            t.numeric(MACHINE),
            Err(PlotError::NonNumericColumn(_))
        ));
        assert!(matches!(t.numeric("job.id"), Err(PlotError::MissingColumn(_))));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let r = JobTable::from_reader(format!("{}1, 2, 3\n", HEADER).as_bytes());
        assert!(r.is_err());
    }

    #[test]
    fn concat_adds_rows_and_fills_missing_columns() {
        let a = table("0, 120, 60, 30, 30, M1, 0.0\n0, 60, 60, 0, 0, M1, 0.0\n");
        let b = JobTable::from_reader(&b"hitrate, machine.name, job.id\n1.0, M2, 7\n"[..]).unwrap();
        let t = JobTable::concat(vec![a.clone(), b.clone()]);
        assert_eq!(t.len(), a.len() + b.len());
        assert_eq!(t.names().len(), 8);
        assert_eq!(t.names()[7], "job.id");
        assert_eq!(t.numeric(HITRATE).unwrap(), &[0., 0., 1.]);
        assert!(t.numeric(START).unwrap()[2].is_nan());
        let ids = t.numeric("job.id").unwrap();
        assert!(ids[0].is_nan() && ids[1].is_nan());
        assert_eq!(ids[2], 7.);
    }

    #[test]
    fn concat_promotes_mixed_columns_to_text() {
        let a = JobTable::from_reader(&b"machine.name\n1\n"[..]).unwrap();
        let b = JobTable::from_reader(&b"machine.name\nM2\n"[..]).unwrap();
        let t = JobTable::concat(vec![a, b]);
        assert_eq!(t.labels(MACHINE).unwrap(), vec!["1", "M2"]);
    }

    #[test]
    fn derived_metrics_follow_formulas() {
        let mut t = table("0, 120, 60, 30, 90, M1, 0.5\n100, 100, 5, 0, 0, M1, 0.5\n");
        t.derive_metrics().unwrap();
        let wall = t.numeric(WALLTIME).unwrap();
        let io = t.numeric(IOTIME).unwrap();
        let eff = t.numeric(EFFICIENCY).unwrap();
        assert_abs_diff_eq!(wall[0], 2.);
        assert_abs_diff_eq!(io[0], 2.);
        assert_abs_diff_eq!(eff[0], 0.5);
        assert_eq!(wall[1], 0.);
        assert!(eff[1].is_infinite());
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn set_column_rejects_wrong_length() {
        let mut t = table("0, 120, 60, 30, 90, M1, 0.5\n");
        let r = t.set_column("score", vec![1., 2.]);
        assert!(matches!(
            r,
            Err(PlotError::ColumnLength { len: 2, rows: 1, .. })
        ));
        assert!(t.column("score").is_none());
        t.set_column(HITRATE, vec![0.9]).unwrap();
        assert_eq!(t.numeric(HITRATE).unwrap(), &[0.9]);
        assert_eq!(t.names().len(), 7);
    }

    #[test]
    fn concat_leaves_absent_text_cells_empty() {
        let a = JobTable::from_reader(&b"hitrate\n0.1\n"[..]).unwrap();
        let b = JobTable::from_reader(&b"hitrate, machine.name\n0.2, M2\n"[..]).unwrap();
        let t = JobTable::concat(vec![a, b]);
        match t.column(MACHINE) {
            Some(Column::Text(v)) => assert_eq!(v, &vec![None, Some(String::from("M2"))]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn derived_metrics_need_the_job_columns() {
        let mut t = JobTable::from_reader(&b"hitrate, machine.name\n0.1, M1\n"[..]).unwrap();
        assert!(matches!(t.derive_metrics(), Err(PlotError::MissingColumn(_))));
    }

    #[test]
    fn display_shows_shape_and_elides_middle_rows() {
        let body: String = (0..12)
            .map(|i| format!("{}, {}, 1, 1, 1, M1, 0.1\n", i, i + 10))
            .collect();
        let s = table(&body).to_string();
        assert!(s.contains("[12 rows x 7 columns]"));
        assert!(s.contains("..."));
        assert!(s.lines().next().unwrap().contains("machine.name"));
    }

    #[test]
    fn missing_file_is_reported_before_reading() {
        let r = JobTable::from_csv_files(&[PathBuf::from("/nonexistent/run.csv")]);
        assert!(matches!(r, Err(PlotError::MissingInput(p)) if p.len() == 1));
    }
}
