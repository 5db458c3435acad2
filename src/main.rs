mod cli;

use cinefilm::{config, summary::FilmSummary};
use cinefilm_media::film::{Film, SampleLayout};
use cinefilm_media::{
    repair_film, validate_interleave, Diagnostics, FilmEvent, NullSink, SeekSource, TracingSink,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "cinefilm=trace,cinefilm_media=trace".to_string()
        } else {
            "cinefilm=info,cinefilm_media=info".to_string()
        }
    });

    // Logs go to stderr so `info --json` output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info { file, json } => info_file(&file, json),
        Commands::Check { file, strict } => check_file(&file, cli.config.as_deref(), strict),
        Commands::Repair {
            input,
            output,
            no_verify,
        } => repair_file(
            &input,
            output.as_deref(),
            cli.config.as_deref(),
            no_verify,
        ),
        Commands::ValidateConfig {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("cinefilm {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn open_film(path: &Path) -> Result<SeekSource<BufReader<File>>> {
    if !path.exists() {
        anyhow::bail!("File does not exist: {:?}", path);
    }
    SeekSource::open(path).with_context(|| format!("Failed to open {:?}", path))
}

fn info_file(file: &Path, json: bool) -> Result<()> {
    let source = open_film(file)?;
    let diagnostics = Diagnostics::new();

    let film = Film::decode(&source, &diagnostics)
        .with_context(|| format!("Failed to decode film header: {:?}", file))?;
    let report = validate_interleave(&film, &source, &diagnostics)
        .with_context(|| format!("Failed to read samples: {:?}", file))?;

    let summary = FilmSummary::new(&film, &report, &diagnostics.events());

    if json {
        let json_str = serde_json::to_string_pretty(&summary)?;
        println!("{}", json_str);
    } else {
        println!("File: {}", file.display());
        summary.print();
    }

    Ok(())
}

fn check_file(file: &Path, config_path: Option<&Path>, strict: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let strict = strict || config.validation.strict;

    let source = open_film(file)?;
    let diagnostics = Diagnostics::new();

    let film = Film::decode(&source, &diagnostics)
        .with_context(|| format!("Failed to decode film header: {:?}", file))?;
    let report = validate_interleave(&film, &source, &diagnostics)
        .with_context(|| format!("Failed to read samples: {:?}", file))?;

    for event in diagnostics.events() {
        match event {
            FilmEvent::Desync(_) => {}
            other => println!("warning: {}", other),
        }
    }

    for desync in &report.desyncs {
        println!("desync: {}", FilmEvent::Desync(desync.clone()));
    }

    println!(
        "Checked {} samples ({} audio, {} video)",
        report.samples, report.audio_samples, report.video_samples
    );

    if report.is_synchronized() {
        println!("✓ Interleave is correct");
        return Ok(());
    }

    println!("✗ {} interleave desyncs found", report.desyncs.len());
    if film.is_chunky() {
        println!("Run `cinefilm repair {}` to fix the chunk layout.", file.display());
    }

    if strict {
        anyhow::bail!("{} interleave desyncs found", report.desyncs.len());
    }

    Ok(())
}

fn repair_file(
    input: &Path,
    output: Option<&Path>,
    config_path: Option<&Path>,
    no_verify: bool,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config::repair_output_path(input, &config.repair));

    if output == input {
        anyhow::bail!("Refusing to overwrite the input file: {:?}", input);
    }

    let source = open_film(input)?;
    let film = Film::decode(&source, &TracingSink)
        .with_context(|| format!("Failed to decode film header: {:?}", input))?;
    let before = validate_interleave(&film, &source, &NullSink)
        .with_context(|| format!("Failed to read samples: {:?}", input))?;

    tracing::info!(
        "Repairing {:?}: {} chunks, {} desyncs",
        input,
        film.chunk_count(),
        before.desyncs.len()
    );

    let outcome = repair_film(&film, &source, &TracingSink)
        .with_context(|| format!("Failed to repair {:?}", input))?;
    let encoded = outcome
        .image
        .encode()
        .context("Failed to encode repaired film")?;

    if config.repair.verify && !no_verify {
        let repaired = Film::decode(&encoded, &NullSink).context("Repaired film does not decode")?;

        if repaired.layout != SampleLayout::Chunky(outcome.plan.table.clone()) {
            anyhow::bail!("Repaired chunk table does not match the repair plan");
        }

        let after = validate_interleave(&repaired, &encoded, &NullSink)?;
        if after.samples != before.samples || after.video_time != before.video_time {
            anyhow::bail!(
                "Repaired film holds {} samples over {} ticks, expected {} over {}",
                after.samples,
                after.video_time,
                before.samples,
                before.video_time
            );
        }
        if !after.is_synchronized() {
            tracing::warn!(
                "{} desyncs remain where audio runs out before video",
                after.desyncs.len()
            );
        }
    }

    std::fs::write(&output, &encoded)
        .with_context(|| format!("Failed to write repaired film: {:?}", output))?;

    println!(
        "Repaired {} chunks into {} (target duration {})",
        film.chunk_count(),
        outcome.plan.chunk_count(),
        outcome.plan.target_duration
    );
    if outcome.plan.trailing_audio > 0 {
        println!(
            "{} trailing audio samples appended after the last frame",
            outcome.plan.trailing_audio
        );
    }
    println!("Output: {}", output.display());

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("  Strict validation: {}", config.validation.strict);
    println!("  Repair output suffix: {}", config.repair.output_suffix);
    println!("  Verify repairs: {}", config.repair.verify);

    Ok(())
}
