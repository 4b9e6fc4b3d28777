use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use std::process;
use log::{debug, info};
use handclap::args::{Cli, Commands, DetectArgs, SynthArgs};
use handclap::audio;
use handclap::config::{ConfigFile, Profile};
use handclap::detector::{ClapDetector, DetectorState, LogSink};
use handclap::source::{FileFrameSource, FrameSource};
use handclap::synth::{synthesize, SynthOptions};

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        log::error!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Detect(args) => detect(args),
        Commands::Synth(args) => synth(args),
        Commands::Profiles { config } => {
            let file = load_config(config.as_deref())?;
            for profile in file.profiles() {
                let p = profile.params;
                let trigger = profile.trigger.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string());
                println!("{}: bias={} band={}-{}Hz trigger={}", profile.name, p.threshold_bias, p.lowcut_hz, p.highcut_hz, trigger);
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = path {
        return ConfigFile::load(path);
    }
    match ConfigFile::default_path() {
        Some(path) if path.exists() => {
            info!("Using config file {}", path.display());
            ConfigFile::load(&path)
        }
        _ => {
            debug!("No config file found, using defaults");
            Ok(ConfigFile::default())
        }
    }
}

struct ProfileRunner {
    profile: Profile,
    detector: ClapDetector,
    state: DetectorState,
}

fn detect(args: DetectArgs) -> Result<()> {
    let file = load_config(args.config.as_deref())?;
    let mut config = file.detector_config()?;
    if let Some(len) = args.buffer_length {
        config.buffer_length = len;
    }

    let mut source = FileFrameSource::open(&args.input, config.buffer_length)
        .with_context(|| format!("Failed to load audio from {}", args.input.display()))?;
    if source.sample_rate() != config.sample_rate {
        info!("Using the file's sample rate of {}Hz instead of {}Hz", source.sample_rate(), config.sample_rate);
        config.sample_rate = source.sample_rate();
    }

    let mut profiles = file.profiles();
    if let Some(name) = &args.profile {
        profiles.retain(|p| &p.name == name);
        if profiles.is_empty() {
            bail!("No profile named '{}'", name);
        }
    }
    for profile in profiles.iter_mut() {
        if let Some(bias) = args.bias { profile.params.threshold_bias = bias; }
        if let Some(low) = args.lowcut { profile.params.lowcut_hz = low; }
        if let Some(high) = args.highcut { profile.params.highcut_hz = high; }
    }

    if let Some(dir) = &args.save_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let mut runners = profiles
        .into_iter()
        .map(|profile| {
            let detector = ClapDetector::new(config.clone())
                .context("Invalid detector configuration")?
                .with_sink(LogSink::new(profile.name.clone()));
            let state = detector.initial_state();
            Ok(ProfileRunner { profile, detector, state })
        })
        .collect::<Result<Vec<_>>>()?;

    info!("Running {} profile(s) over {} frames", runners.len(), source.remaining_frames());
    if let (Some(dir), Some(runner)) = (&args.save_dir, runners.first()) {
        info!(
            "Triggered patterns keep the last {} frames of audio in {}",
            runner.state.history().capacity(),
            dir.display()
        );
    }

    let frame_seconds = config.buffer_length as f64 / f64::from(config.sample_rate);
    let mut frames = 0usize;
    let mut found = 0usize;
    while let Some(frame) = source.next_frame()? {
        frames += 1;
        let at = frames as f64 * frame_seconds;
        for runner in runners.iter_mut() {
            let pattern = runner.detector.process(&mut runner.state, &frame, &runner.profile.params)
                .with_context(|| format!("Profile '{}' failed on frame {}", runner.profile.name, frames))?;
            if pattern.is_empty() {
                continue;
            }
            found += 1;
            println!("{:>9.3}s  {:<12} {}", at, runner.profile.name, pattern);

            if let (Some(dir), Some(trigger)) = (&args.save_dir, runner.profile.trigger) {
                if pattern.len() == trigger as usize {
                    let path = dir.join(format!("{}-{:.3}s.wav", runner.profile.name, at));
                    audio::save_wav(&path, &runner.state.history().samples(), config.sample_rate)?;
                }
            }
        }
    }

    info!("Processed {} frames, {} pattern(s) found", frames, found);
    Ok(())
}

fn synth(args: SynthArgs) -> Result<()> {
    let defaults = SynthOptions::default();
    let opts = SynthOptions {
        sample_rate: args.sample_rate,
        clap_spacing: args.clap_spacing.unwrap_or(defaults.clap_spacing),
        burst_gap: args.burst_gap.unwrap_or(defaults.burst_gap),
        seed: args.seed,
        ..defaults
    };
    let track = synthesize(args.pattern.counts(), &opts).context("Invalid synth options")?;
    audio::save_wav(&args.output, &track, opts.sample_rate)
        .with_context(|| format!("Failed to save audio to {}", args.output.display()))?;
    println!(
        "Wrote {} ({:.2}s, pattern {})",
        args.output.display(),
        track.len() as f64 / f64::from(opts.sample_rate),
        args.pattern
    );
    Ok(())
}
