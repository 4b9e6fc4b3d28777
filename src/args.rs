use std::path::PathBuf;
use clap::{Args, Parser, Subcommand};
use crate::pattern::Pattern;
use crate::util::{pattern_parser, positive_parser};

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Recognizes clap patterns in recorded audio.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every configured profile over an audio file
    Detect(DetectArgs),
    /// Render a synthetic clap track as WAV.
    ///
    /// Claps inside a burst are 0.05s apart by default. The default detector
    /// debounce of 0.15s merges them, so detect such tracks with a config
    /// such as `detector debounce=0.03`.
    Synth(SynthArgs),
    /// List the configured detection profiles
    Profiles {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct DetectArgs {
    pub input: PathBuf,
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Only run the named profile
    #[arg(long)]
    pub profile: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    pub bias: Option<f64>,
    #[arg(long, value_parser = positive_parser)]
    pub lowcut: Option<f64>,
    #[arg(long, value_parser = positive_parser)]
    pub highcut: Option<f64>,
    #[arg(long)]
    pub buffer_length: Option<usize>,
    /// Keep recent audio as WAV whenever a profile's trigger pattern fires
    #[arg(long)]
    pub save_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct SynthArgs {
    pub output: PathBuf,
    /// Claps per burst, e.g. `2,1`
    #[arg(long, value_parser = parse_pattern)]
    pub pattern: Pattern,
    #[arg(long, default_value_t = 44100)]
    pub sample_rate: u32,
    /// Seconds between claps of a burst; keep it above the detector's
    /// debounce and below its clap interval
    #[arg(long, value_parser = positive_parser)]
    pub clap_spacing: Option<f64>,
    #[arg(long, value_parser = positive_parser)]
    pub burst_gap: Option<f64>,
    #[arg(long, default_value_t = 7)]
    pub seed: u64,
}

fn parse_pattern(s: &str) -> Result<Pattern, String> {
    pattern_parser(s).map(Pattern::from)
}
