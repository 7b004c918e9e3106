use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gvcf_merge::io::{open_gvcf, read_contigs, OutputLayout, VcfWriter};
use gvcf_merge::merge::DEFAULT_BUFFER_SIZE;
use gvcf_merge::{MergeConfig, StreamMerger};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "gvcf-merge", about = "Merge single-sample gVCFs into a multi-sample VCF")]
struct Cli {
    /// Log filter (overridden by RUST_LOG).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge sorted single-sample gVCF/BCF files.
    Merge {
        /// Input files, one sample each. Contig order is taken from the first.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output VCF (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Restrict to `contig[:start[-end]]`; inputs must be indexed.
        #[arg(short, long)]
        region: Option<String>,
        /// Rename duplicate sample names instead of failing.
        #[arg(long)]
        force_samples: bool,
        /// Per-sample read-ahead, in records.
        #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
        buffer_size: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Merge {
            inputs,
            output,
            region,
            force_samples,
            buffer_size,
        } => {
            let mut config = MergeConfig::new()
                .with_force_samples(force_samples)
                .with_buffer_size(buffer_size);
            if let Some(region) = region {
                config = config.with_region(region);
            }
            run_merge(&inputs, output, &config)?
        }
    }

    Ok(())
}

fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .init();
}

fn run_merge(inputs: &[PathBuf], output: Option<PathBuf>, config: &MergeConfig) -> Result<()> {
    config.validate().context("invalid merge options")?;
    let region = config.parsed_region()?;

    let first = &inputs[0];
    let contigs = read_contigs(first)
        .with_context(|| format!("failed to read contigs from {}", first.display()))?;

    let mut cursors = Vec::with_capacity(inputs.len());
    for path in inputs {
        let cursor = open_gvcf(path, &contigs, region.as_ref(), config.buffer_size)
            .with_context(|| format!("failed to open {}", path.display()))?;
        cursors.push(cursor);
    }

    let mut merger = StreamMerger::new(cursors, config).context("failed to set up merge")?;
    let layout = OutputLayout {
        contigs,
        samples: merger.sample_names().to_vec(),
        has_pl: merger.has_pl(),
        has_strand_depth: merger.has_strand_depth(),
    };

    let sink: Box<dyn Write> = match &output {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = VcfWriter::new(BufWriter::new(sink), layout);
    writer.write_header()?;
    while let Some(site) = merger.next_site().context("merge failed")? {
        writer.write_site(site)?;
    }
    writer.finish()?;

    info!(
        sites = merger.sites_emitted(),
        samples = inputs.len(),
        "merge complete"
    );
    Ok(())
}
