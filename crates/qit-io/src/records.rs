use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ndarray::{s, Array2};
use qit_core::error::{QitError, QitResult};

/// Column holding the time in every simulation record.
pub const TIME_COLUMN: usize = 0;
/// First signal column of an FFT record.
pub const FFT_SIGNAL_COLUMN: usize = 3;

/// Parses whitespace separated numeric columns.
///
/// Blank lines and `#` comments are skipped; every row must have the same width.
pub fn parse_table<R: BufRead>(reader: R) -> QitResult<Array2<f64>> {
    let mut values = Vec::new();
    let mut n_cols: Option<usize> = None;
    let mut n_rows = 0usize;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let content = line.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let before = values.len();
        for field in content.split_whitespace() {
            let v: f64 = field.parse().map_err(|_| {
                QitError::Parse(format!("line {}: '{field}' is not a number", line_no + 1))
            })?;
            values.push(v);
        }
        let width = values.len() - before;
        match n_cols {
            None => n_cols = Some(width),
            Some(w) if w != width => {
                return Err(QitError::Parse(format!(
                    "line {}: {width} columns, expected {w}",
                    line_no + 1
                )))
            }
            Some(_) => {}
        }
        n_rows += 1;
    }
    Ok(Array2::from_shape_vec((n_rows, n_cols.unwrap_or(0)), values)?)
}

pub fn read_table(path: &Path) -> QitResult<Array2<f64>> {
    let table = parse_table(BufReader::new(File::open(path)?))?;
    log::debug!(
        "{}: {} rows x {} columns",
        path.display(),
        table.nrows(),
        table.ncols()
    );
    Ok(table)
}

fn require_columns(table: &Array2<f64>, min: usize, what: &str) -> QitResult<()> {
    if table.ncols() < min {
        return Err(QitError::Parse(format!(
            "{what} needs at least {min} columns, found {}",
            table.ncols()
        )));
    }
    Ok(())
}

/// Recorded detection transient: time and one signal column per recorded mass.
#[derive(Debug, Clone, PartialEq)]
pub struct TransientRecord {
    pub time: Vec<f64>,
    pub signals: Array2<f64>,
}

pub fn fft_record_from_table(table: &Array2<f64>) -> QitResult<TransientRecord> {
    require_columns(table, FFT_SIGNAL_COLUMN + 1, "fft record")?;
    Ok(TransientRecord {
        time: table.column(TIME_COLUMN).to_vec(),
        signals: table.slice(s![.., FFT_SIGNAL_COLUMN..]).to_owned(),
    })
}

pub fn read_fft_record(path: &Path) -> QitResult<TransientRecord> {
    fft_record_from_table(&read_table(path)?)
}

/// Recorded mean position of the whole particle cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct CenterOfChargeRecord {
    pub time: Vec<f64>,
    pub positions: Array2<f64>,
}

pub fn read_center_of_charge_record(path: &Path) -> QitResult<CenterOfChargeRecord> {
    let table = read_table(path)?;
    require_columns(&table, 4, "center of charge record")?;
    Ok(CenterOfChargeRecord {
        time: table.column(TIME_COLUMN).to_vec(),
        positions: table.slice(s![.., 1..4]).to_owned(),
    })
}

/// Recorded concentration of every reacting substance over time.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcentrationsRecord {
    pub time: Vec<f64>,
    /// `[sample, substance]`.
    pub concentrations: Array2<f64>,
}

pub fn concentrations_from_table(table: &Array2<f64>) -> QitResult<ConcentrationsRecord> {
    require_columns(table, 2, "concentrations record")?;
    Ok(ConcentrationsRecord {
        time: table.column(TIME_COLUMN).to_vec(),
        concentrations: table.slice(s![.., 1..]).to_owned(),
    })
}

pub fn read_concentrations_record(path: &Path) -> QitResult<ConcentrationsRecord> {
    concentrations_from_table(&read_table(path)?)
}

/// Recorded count of particles that left the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct IonsInactiveRecord {
    pub time: Vec<f64>,
    pub inactive: Vec<u64>,
}

pub fn read_ions_inactive_record(path: &Path) -> QitResult<IonsInactiveRecord> {
    ions_inactive_from_table(&read_table(path)?)
}

fn ions_inactive_from_table(table: &Array2<f64>) -> QitResult<IonsInactiveRecord> {
    require_columns(table, 2, "inactive ions record")?;
    let inactive = table
        .column(1)
        .iter()
        .map(|&v| {
            if v >= 0.0 && v.fract() == 0.0 {
                Ok(v as u64)
            } else {
                Err(QitError::Parse(format!("inactive ion count {v} is not a count")))
            }
        })
        .collect::<QitResult<Vec<_>>>()?;
    Ok(IonsInactiveRecord {
        time: table.column(TIME_COLUMN).to_vec(),
        inactive,
    })
}
