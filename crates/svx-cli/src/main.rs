//! spectravox - single-channel speech enhancement over WAV files

mod opts;

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use hound::WavSpec;
use svx_engine::{format_duration, ConfigFile, EnhancePipeline, WavSink, WavSource};

use crate::opts::{Cli, Options};

fn main() {
    if std::env::args().len() == 1 {
        use clap::CommandFactory;
        Cli::command().print_help().ok();
        process::exit(1);
    }

    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "info" } else { "warn" }),
    )
    .format_timestamp(None)
    .init();

    if let Err(err) = run(&cli) {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let file = match &cli.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let options = opts::resolve(cli, &file)?;
    options.engine.validate()?;

    let mut source = WavSource::open(&options.input)?;
    let mut pipeline = EnhancePipeline::new(
        &options.engine,
        source.sample_rate(),
        source.channels(),
    )
    .context("failed to set up the enhancement pipeline")?;

    if options.verbose {
        print_info(&options, &source, &pipeline);
    }

    let out_spec = WavSpec {
        channels: pipeline.params().channels as u16,
        ..source.spec()
    };
    let mut sink = WavSink::create(&options.output, out_spec)?;

    let stats = pipeline.run(&mut source, &mut sink)?;
    sink.finalize()?;

    if options.verbose {
        println!(
            "Finished: {} frames in, {} frames out ({}).",
            stats.frames_read,
            stats.frames_written,
            format_duration(out_spec.sample_rate, stats.frames_written)
        );
    }

    Ok(())
}

fn print_info(options: &Options, source: &WavSource, pipeline: &EnhancePipeline) {
    let params = pipeline.params();
    let on_off = |v: bool| if v { "enabled" } else { "disabled" };

    println!("-----------------------------------------");
    println!("Input file:        {}", options.input.display());
    println!("Output file:       {}", options.output.display());
    println!(
        "Duration:          {}",
        format_duration(source.sample_rate(), source.frames())
    );
    println!("Sample rate:       {} Hz", source.sample_rate());
    println!("Channels:          {}", source.channels());
    println!("-----------------------------------------");
    println!("Downmix to mono:   {}", on_off(params.downmix));
    println!("Frame duration:    {} ms", params.frame_duration_ms);
    println!("Overlap:           {} %", options.engine.overlap_pct);
    println!("Window size:       {} samples", params.window_size);
    println!("FFT size:          {} samples", params.fft_size);
    println!("Window function:   {}", options.engine.window.label());
    println!(
        "Noise estimation:  {}",
        options.engine.noise_estimator.label()
    );
    println!("Sound enhancement: {}", options.engine.enhancer.label());
    println!("-----------------------------------------");
}
