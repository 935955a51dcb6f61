use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::ValueEnum;
use parquet::arrow::ArrowWriter;

use crate::data::model::{SpectrumRow, SPECTRUM_COLUMNS};
use crate::pipeline::SpectrumReport;

/// How a spectrum report is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Fixed-width text table.
    Table,
    Csv,
    /// Report with directory, parameters and rows.
    Json,
    /// Columnar file for pandas / polars.
    Parquet,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Table => "out",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Parquet => "parquet",
        }
    }
}

/// Parquet is binary and only goes to files.
pub fn check_destination(format: OutputFormat, output_dir: Option<&Path>) -> Result<()> {
    if format == OutputFormat::Parquet && output_dir.is_none() {
        bail!("parquet output is binary; pass --output-dir");
    }
    Ok(())
}

/// `<out_dir>/<last component of dir>.<ext>` for every input directory.
///
/// Fails before anything is written when two directories end in the same
/// component, e.g. `a/L16` and `b/L16`.
pub fn output_paths(
    out_dir: &Path,
    dirs: &[PathBuf],
    format: OutputFormat,
) -> Result<Vec<PathBuf>> {
    let mut seen: HashMap<PathBuf, &Path> = HashMap::new();
    let mut paths = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let path = out_dir.join(format!("{}.{}", output_stem(dir), format.extension()));
        if let Some(previous) = seen.insert(path.clone(), dir) {
            bail!(
                "{} and {} would both be written to {}",
                previous.display(),
                dir.display(),
                path.display()
            );
        }
        paths.push(path);
    }
    Ok(paths)
}

/// Last component of `dir`; `.` and `..` are resolved first.
fn output_stem(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .or_else(|| {
            let resolved = dir.canonicalize().ok()?;
            resolved.file_name().map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "spectrum".to_string())
}

/// Write `report` in the requested format.
pub fn write_report<W: Write>(
    out: &mut W,
    report: &SpectrumReport,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => write_table(out, &report.rows).context("writing spectrum table"),
        OutputFormat::Csv => write_csv(out, &report.rows),
        OutputFormat::Json => write_json(out, report),
        OutputFormat::Parquet => {
            // ArrowWriter needs a `Send` sink; stdout locks are not.
            let mut buffer = Vec::new();
            write_parquet(&mut buffer, &report.rows)?;
            out.write_all(&buffer).context("writing parquet bytes")
        }
    }
}

// ---------------------------------------------------------------------------
// Fixed-width table
// ---------------------------------------------------------------------------

/// `k` in a 10-wide field, each component in a 20-wide field with 9 decimals.
pub fn write_table<W: Write>(out: &mut W, rows: &[SpectrumRow]) -> std::io::Result<()> {
    write!(out, "{:>10}", SPECTRUM_COLUMNS[0])?;
    for name in &SPECTRUM_COLUMNS[1..] {
        write!(out, "{name:>20}")?;
    }
    writeln!(out)?;

    for row in rows {
        write!(out, "{:>10}", row.k)?;
        for value in row.components() {
            write!(out, "{value:>20.9}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV / JSON
// ---------------------------------------------------------------------------

pub fn write_csv<W: Write>(out: &mut W, rows: &[SpectrumRow]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for row in rows {
        writer.serialize(row).context("serializing CSV row")?;
    }
    writer.flush().context("flushing CSV output")?;
    Ok(())
}

pub fn write_json<W: Write>(out: &mut W, report: &SpectrumReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report).context("serializing JSON report")?;
    writeln!(out).context("writing JSON report")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// One Int64 `k` column and six Float64 component columns.
pub fn spectrum_batch(rows: &[SpectrumRow]) -> Result<RecordBatch> {
    let mut fields = vec![Field::new(SPECTRUM_COLUMNS[0], DataType::Int64, false)];
    fields.extend(
        SPECTRUM_COLUMNS[1..]
            .iter()
            .map(|name| Field::new(*name, DataType::Float64, false)),
    );
    let schema = Arc::new(Schema::new(fields));

    let k = Int64Array::from(rows.iter().map(|r| r.k as i64).collect::<Vec<_>>());
    let mut columns: Vec<arrow::array::ArrayRef> = vec![Arc::new(k)];
    for c in 0..6 {
        let values: Vec<f64> = rows.iter().map(|r| r.components()[c]).collect();
        columns.push(Arc::new(Float64Array::from(values)));
    }

    RecordBatch::try_new(schema, columns).context("building spectrum record batch")
}

pub fn write_parquet<W: Write + Send>(out: W, rows: &[SpectrumRow]) -> Result<()> {
    let batch = spectrum_batch(rows)?;
    let mut writer =
        ArrowWriter::try_new(out, batch.schema(), None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}
