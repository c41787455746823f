use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use mzxlink_core::prelude::*;

/// Run the cross-link identification core over a digested-peptide list and an
/// observed-spectrum list, both JSON stand-ins for the FASTA/mzML collaborators
/// a full deployment would read instead.
#[derive(Parser)]
struct Cli {
    /// Path to the digested peptide list (JSON array of `Peptide`).
    #[arg(short, long)]
    peptides: PathBuf,
    /// Path to the observed spectrum list (JSON array of `ObservedSpectrum`).
    #[arg(short, long)]
    spectra: PathBuf,
    /// Path to the run configuration (JSON `Config`).
    #[arg(short, long)]
    config: PathBuf,
    /// Where to write the ranked result table (JSON array of `SpectrumResult`).
    #[arg(short, long)]
    out: PathBuf,
    /// Override the number of rayon worker threads (defaults to available parallelism).
    #[arg(long)]
    threads: Option<usize>,
}

fn load_json<T: serde::de::DeserializeOwned>(path: &PathBuf, what: &str) -> T {
    let file = File::open(path).unwrap_or_else(|err| panic!("could not open {what} at {}: {err}", path.display()));
    serde_json::from_reader(BufReader::new(file))
        .unwrap_or_else(|err| panic!("could not parse {what} at {}: {err}", path.display()))
}

fn main() {
    let args = Cli::parse();

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .expect("failed to configure rayon thread pool");
    }

    let mut peptides: Vec<Peptide> = load_json(&args.peptides, "peptide list");
    let spectra: Vec<ObservedSpectrum> = load_json(&args.spectra, "observed spectrum list");
    let config_json = std::fs::read_to_string(&args.config)
        .unwrap_or_else(|err| panic!("could not read configuration at {}: {err}", args.config.display()));
    let config = Config::from_json(&config_json).unwrap_or_else(|err| {
        eprintln!("invalid configuration: {err}");
        std::process::exit(1);
    });

    // The enumerator's inter-peptide inner loop relies on this sort to exit early.
    peptides.sort_by(|a, b| a.mass.partial_cmp(&b.mass).unwrap_or(std::cmp::Ordering::Equal));

    println!(
        "Loaded {} peptides, {} spectra. Running identification...",
        peptides.len(),
        spectra.len()
    );

    let cancel = Arc::new(AtomicBool::new(false));
    let (results, diagnostics) = run_pipeline(&peptides, &spectra, &config, &cancel);

    println!(
        "Done. filtered={} enumerated={} ranked={} errored={} numeric_limit_events={}",
        diagnostics.filtered, diagnostics.enumerated, diagnostics.ranked, diagnostics.errored, diagnostics.numeric_limit_events
    );

    let out_file = File::create(&args.out).unwrap_or_else(|err| panic!("could not create {}: {err}", args.out.display()));
    serde_json::to_writer_pretty(BufWriter::new(out_file), &results).expect("failed to write result table");
}
