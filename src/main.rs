mod args;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use args::Args;
use spin_spectrum::output::{check_destination, output_paths, write_report, OutputFormat};
use spin_spectrum::pipeline::{analyse_directory, SpectrumReport};

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("configuring worker threads")?;
    }

    check_destination(args.format, args.output_dir.as_deref())?;
    let paths = match &args.output_dir {
        Some(out_dir) => Some(output_paths(out_dir, &args.directories, args.format)?),
        None => None,
    };

    for (position, dir) in args.directories.iter().enumerate() {
        let report =
            analyse_directory(dir).with_context(|| format!("processing {}", dir.display()))?;

        match &paths {
            Some(paths) => {
                let path = &paths[position];
                write_to_file(path, &report, args.format)?;
                info!("spectrum written to {}", path.display());
            }
            None => {
                let stdout = std::io::stdout();
                let mut out = stdout.lock();
                if args.directories.len() > 1 {
                    writeln!(out, "# {}", dir.display())?;
                }
                write_report(&mut out, &report, args.format)?;
            }
        }
    }

    Ok(())
}

fn write_to_file(path: &Path, report: &SpectrumReport, format: OutputFormat) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write_report(&mut out, report, format)?;
    out.flush()
        .with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}
