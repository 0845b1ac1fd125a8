use std::{fs, path::PathBuf};

use clap::Parser;
use color_eyre::eyre::{self, Context};
use flashframes::{
    args::{LogArgs, PlanningArgs, ToolArgs},
    debug_info,
    planner::ExtractionConfig,
    tools::Ffmpeg,
    Pipeline,
};
use flashframes_common::bin_common::{
    init::{init_eyre, init_logger, verbosity_level},
    termination::Cookie,
};

#[derive(Parser, Debug)]
#[command()]
/// Prints the timestamps frames would be extracted at, without extracting anything.
struct Cli {
    #[command(flatten)]
    tool_args: ToolArgs,

    #[command(flatten)]
    planning_args: PlanningArgs,

    #[command(flatten)]
    log_args: LogArgs,

    /// Write the whole plan, with every stage that ran, to this file as RON
    #[arg(long)]
    debug_file: Option<PathBuf>,

    /// The video to plan for
    video: PathBuf,
}

fn main() -> eyre::Result<()> {
    init_eyre()?;
    let cli = Cli::parse();
    init_logger(
        verbosity_level(cli.log_args.verbose, cli.log_args.quiet),
        cli.log_args.logfile.as_deref(),
    )?;

    let config = ExtractionConfig::new(
        cli.planning_args.sensitivity,
        cli.planning_args.min_interval,
        cli.planning_args.target_frames,
    )
    .wrap_err("invalid planning flags")?;

    let cookie = Cookie::new().wrap_err("failed to install the signal handlers")?;
    let ffmpeg = Ffmpeg::new(cli.tool_args.to_settings(), cookie);
    let plan = Pipeline::with_ffmpeg(&ffmpeg, std::env::temp_dir())
        .plan_video(&cli.video, &config)
        .wrap_err_with(|| format!("failed to plan frames for {}", cli.video.display()))?;

    if let Some(debug_file) = &cli.debug_file {
        let file = fs::File::create(debug_file).wrap_err_with(|| {
            format!("failed to create the debug file at: {debug_file:?}")
        })?;
        debug_info::save_to(file, &plan).wrap_err("failed to write the plan")?;
    }

    for ts in &plan.timestamps {
        println!("{ts}");
    }

    Ok(())
}
