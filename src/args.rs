use std::path::PathBuf;

use clap::Parser;

use spin_spectrum::output::OutputFormat;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "spin-spectrum",
    author,
    version,
    about = "Derived spin-correlation spectrum from simulation output directories",
    long_about = None,
    arg_required_else_help = true,
    after_help = concat!(
        "Examples:\n",
        "  spin-spectrum run/L16\n",
        "  spin-spectrum run/L16 run/L32 --format csv --output-dir spectra\n",
        "  RUST_LOG=debug spin-spectrum run/L16 --threads 4\n",
    )
)]
pub struct Args {
    /// Data directories, each with one mag* file and corr*-r<n>.out files
    #[arg(required = true)]
    pub directories: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Write <directory-name>.<ext> here instead of printing to stdout
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Worker threads for the spectrum reduction (default: all cores)
    #[arg(long)]
    pub threads: Option<usize>,
}
