mod cli;

use tsencode::{
    config, encode,
    runner::{self, RunReport},
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use std::process::ExitCode;
use tsencode_av::{resolve_tool, FfmpegCapabilityProbe, FfprobeInspector, StreamInspector};

fn main() -> ExitCode {
    let cli = Cli::parse();
    tsencode::logging::init(cli.verbose);

    match run(&cli) {
        Ok(code) => exit_code(code),
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    match u8::try_from(code) {
        Ok(code) => ExitCode::from(code),
        Err(_) => ExitCode::FAILURE,
    }
}

fn run(cli: &Cli) -> Result<i32> {
    let config = config::load_config_or_default(cli.config.as_deref())?;
    let encode_config = &config.encode;

    let ffmpeg = resolve_tool("ffmpeg", config.tools.ffmpeg_path.as_deref());
    let ffprobe = resolve_tool("ffprobe", config.tools.ffprobe_path.as_deref());
    tracing::debug!("Using ffmpeg {:?}, ffprobe {:?}", ffmpeg, ffprobe);

    let inspector = FfprobeInspector::new(&ffprobe).with_analyze_window(
        encode_config.analyze_duration.as_str(),
        encode_config.probe_size.as_str(),
    );
    let probe = FfmpegCapabilityProbe::new(&ffmpeg);

    let request = cli.request();
    let job = encode::prepare(&request, encode_config, &probe, &inspector)?;

    if tracing::enabled!(tracing::Level::DEBUG) {
        inspector.debug_dump(&request.input);
    }

    let args = job.args();
    tracing::info!("Input file: {:?}", job.plan.input);
    tracing::info!("Output file: {:?}", job.plan.output);
    tracing::info!("FFmpeg command: {} {}", ffmpeg.display(), args.join(" "));

    if cli.dry_run {
        println!("{} {}", ffmpeg.display(), args.join(" "));
        return Ok(0);
    }

    let duration = inspector.probe_duration(&request.input);

    let rt = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    let outcome = rt.block_on(runner::run(&ffmpeg, &args))?;

    let show_output =
        !outcome.success() || cli.verbose || !encode_config.log_tool_output_only_on_error;
    if show_output && !outcome.log.is_empty() {
        eprintln!("FFmpeg messages:\n{}", outcome.log.join("\n"));
    }

    let report = RunReport::new(&job, &args, duration, &outcome);
    println!("{}", serde_json::to_string_pretty(&report)?);

    if outcome.success() {
        tracing::info!("Successfully encoded {:?}", job.plan.output);
    } else {
        tracing::error!("ffmpeg failed with exit code {}", outcome.exit_code);
    }

    Ok(outcome.exit_code)
}
