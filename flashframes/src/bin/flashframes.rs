use std::{fs, path::PathBuf, process::ExitCode};

use clap::Parser;
use color_eyre::eyre::{self, Context};
use flashframes::{
    args::{LogArgs, PlanningArgs, ToolArgs},
    debug_info,
    pipeline::{ErrorBody, ExtractRequest, Pipeline, PipelineError, RequestError},
    tools::Ffmpeg,
};
use flashframes_common::{
    bin_common::{
        args::args_or_rc_file,
        init::{init_eyre, init_logger, verbosity_level},
        termination::Cookie,
    },
    utils::fsutils::read_file_or_stdin,
};

#[derive(Parser, Debug)]
#[command()]
/// Picks representative frames out of a video, together with the captions shown around
/// them, and prints them as JSON.
///
/// Started without any arguments, the flags are read from `.flashframesrc` instead.
struct Cli {
    #[command(flatten)]
    tool_args: ToolArgs,

    #[command(flatten)]
    planning_args: PlanningArgs,

    #[command(flatten)]
    log_args: LogArgs,

    /// Read a JSON request from this file, or stdin if `-`, instead of from the flags
    #[arg(long, short = 'r', conflicts_with = "video")]
    request: Option<PathBuf>,

    /// The video to extract frames from
    #[arg(required_unless_present = "request")]
    video: Option<PathBuf>,

    /// A WebVTT file with captions for the video
    #[arg(long, short = 's')]
    subtitles: Option<PathBuf>,

    /// Where to place the temporary working directories
    #[arg(long, default_value_os_t = std::env::temp_dir())]
    temp_dir: PathBuf,

    /// Also write the debug info to this file, as RON
    #[arg(long)]
    debug_file: Option<PathBuf>,

    /// Pretty print the response
    #[arg(long, short = 'p')]
    pretty: bool,
}

fn cli_arguments() -> eyre::Result<Cli> {
    const ARGS_FILE: &str = ".flashframesrc";
    Ok(Cli::parse_from(args_or_rc_file(ARGS_FILE)?))
}

fn main() -> eyre::Result<ExitCode> {
    init_eyre()?;
    let cli = cli_arguments()?;
    init_logger(
        verbosity_level(cli.log_args.verbose, cli.log_args.quiet),
        cli.log_args.logfile.as_deref(),
    )?;
    log::debug!("CLI arguments: {cli:#?}");

    let cookie = Cookie::new().wrap_err("failed to install the signal handlers")?;
    let ffmpeg = Ffmpeg::new(cli.tool_args.to_settings(), cookie);
    let pipeline = Pipeline::with_ffmpeg(&ffmpeg, &cli.temp_dir);

    let result = read_request(&cli)?
        .map_err(PipelineError::from)
        .and_then(|request| pipeline.run(&request));

    match result {
        Ok(response) => {
            if let Some(debug_file) = &cli.debug_file {
                let file = fs::File::create(debug_file).wrap_err_with(|| {
                    format!("failed to create the debug file at: {debug_file:?}")
                })?;
                debug_info::save_to(file, &response.debug)
                    .wrap_err("failed to write the debug info")?;
            }
            print_json(&response, cli.pretty)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            let body = ErrorBody::from(&e);
            log::error!("Request failed ({}): {}", body.status, body.message);
            print_json(&body, cli.pretty)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// The outer error is for failures to read anything at all, the inner for requests that
/// do not make sense.
fn read_request(cli: &Cli) -> eyre::Result<Result<ExtractRequest, RequestError>> {
    if let Some(path) = &cli.request {
        let json = read_file_or_stdin(path)
            .wrap_err_with(|| format!("failed to read the request from: {path:?}"))?;
        return Ok(ExtractRequest::from_json(&json));
    }

    let subtitles = cli
        .subtitles
        .as_ref()
        .map(|path| {
            fs::read_to_string(path)
                .wrap_err_with(|| format!("failed to read the subtitles at: {path:?}"))
        })
        .transpose()?;

    Ok(Ok(ExtractRequest {
        file_path: cli.video.clone(),
        sensitivity: cli.planning_args.sensitivity,
        min_interval: cli.planning_args.min_interval,
        target_frames: cli.planning_args.target_frames,
        subtitles,
    }))
}

fn print_json(value: &impl serde::Serialize, pretty: bool) -> eyre::Result<()> {
    let stdout = std::io::stdout().lock();
    let written = if pretty {
        serde_json::to_writer_pretty(stdout, value)
    } else {
        serde_json::to_writer(stdout, value)
    };
    written.wrap_err("failed to write the response")?;
    println!();
    Ok(())
}
