use std::f64::consts::PI;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use num_complex::Complex64;

use spin_spectrum::data::loader::write_table;
use spin_spectrum::data::model::{Axis, ColumnTable, AXIS_PAIRS};

/// Write a synthetic spin-chain data directory for spin-spectrum.
#[derive(Parser, Debug)]
#[command(name = "generate_sample", version)]
struct Args {
    /// Target directory (created if missing)
    #[arg(short, long, default_value = "sample_data")]
    output: PathBuf,

    /// Number of lattice sites
    #[arg(short = 'n', long, default_value_t = 32)]
    sites: usize,

    /// Decay length of the connected correlations, in sites
    #[arg(long, default_value_t = 3.0)]
    correlation_length: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
        mean + std_dev * z
    }

    fn complex_noise(&mut self, std_dev: f64) -> Complex64 {
        Complex64::new(self.gauss(0.0, std_dev), self.gauss(0.0, std_dev * 0.1))
    }
}

/// Shortest distance between two sites on a ring.
fn ring_distance(a: usize, b: usize, sites: usize) -> f64 {
    let d = a.abs_diff(b);
    d.min(sites - d) as f64
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    anyhow::ensure!(args.sites > 0, "--sites must be positive");

    let n = args.sites;
    let mut rng = SimpleRng::new(args.seed);
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    // Spiral magnetization with a weak z tilt.
    let magnetization: Vec<Vec<Complex64>> = Axis::ALL
        .iter()
        .map(|axis| {
            (0..n)
                .map(|i| {
                    let phase = 2.0 * PI * i as f64 / n as f64;
                    let m = match axis {
                        Axis::X => 0.4 * phase.cos(),
                        Axis::Y => 0.4 * phase.sin(),
                        Axis::Z => 0.1,
                    };
                    Complex64::new(m, 0.0) + rng.complex_noise(0.005)
                })
                .collect()
        })
        .collect();

    let mag_table = ColumnTable::from_columns(
        Axis::ALL
            .iter()
            .zip(magnetization.iter().cloned())
            .map(|(axis, values)| (format!("Mag{axis}"), values))
            .collect(),
    )?;
    let mag_path = args.output.join("mag-sample.out");
    write_table(&mag_path, &mag_table)?;

    // Correlator = disconnected part + exponentially decaying connected part.
    for r in 0..n {
        let columns: Vec<(String, Vec<Complex64>)> = AXIS_PAIRS
            .iter()
            .map(|pair| {
                let m_a = magnetization[pair.a.index()][r];
                let values: Vec<Complex64> = (0..n)
                    .map(|i| {
                        let decay =
                            (-ring_distance(r, i, n) / args.correlation_length).exp();
                        let amplitude = if pair.a == pair.b { 0.25 } else { 0.02 };
                        let connected = amplitude * decay;
                        m_a * magnetization[pair.b.index()][i]
                            + Complex64::new(connected, 0.0)
                            + rng.complex_noise(0.002)
                    })
                    .collect();
                (format!("{pair}Corr"), values)
            })
            .collect();
        let table = ColumnTable::from_columns(columns)?;
        let path = args.output.join(format!("corr-sample-r{}.out", r + 1));
        write_table(&path, &table)?;
    }

    let params = format!(
        "sweepfile=sample.sweep\nbc=periodic\nL={n}\nxi={}\nseed={}\n",
        args.correlation_length, args.seed
    );
    let params_path = args.output.join("sample.in");
    std::fs::write(&params_path, params)
        .with_context(|| format!("writing {}", params_path.display()))?;

    info!(
        "wrote magnetization and {n} correlation files to {}",
        args.output.display()
    );
    Ok(())
}
