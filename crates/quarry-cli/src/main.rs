use quarry_cli::{convert_world, default_output, verify_output, Args, Command, ConvertConfig, USAGE};
use quarry_common::Result;
use quarry_logger::log::{log, set_min_severity};
use quarry_logger::severity::LogSeverity::{Fatal, Info};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Command::parse(std::env::args().skip(1)) {
        Ok(Command::Help) => {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Ok(Command::Convert(args)) => args,
        Err(message) => {
            eprintln!("{}\n{}", message, USAGE);
            return ExitCode::FAILURE;
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log(format!("Conversion failed: {}", e), Fatal);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = ConvertConfig::load(args.config.as_deref())?;
    set_min_severity(config.severity()?);
    log(format!("Quarry converting {}", args.world.display()), Info);

    let output = match args.output {
        Some(output) => output,
        None => default_output(&args.world)?,
    };
    let report = convert_world(&args.world, &output, &config).await?;

    if args.verify {
        verify_output(&report.output, report.summary.chunks)?;
    }
    log(
        format!(
            "Done: {} regions merged, {} failed, {} chunks skipped",
            report.regions_loaded, report.regions_failed, report.chunks_skipped
        ),
        Info,
    );
    Ok(())
}
