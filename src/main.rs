use clap::Parser;
use sharescope_assessment::AssessmentConfig;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "sharescope", version, about = "Assess file sharing exposure in a tenant")]
struct Cli {
    /// JSON configuration file.  Credentials may also come from
    /// SHARESCOPE_TENANT_ID, SHARESCOPE_CLIENT_ID, SHARESCOPE_CLIENT_SECRET.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Report output path (overrides the configured one).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of daily audit windows to scan.
    #[arg(long)]
    days: Option<u32>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match AssessmentConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("sharescope: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(output) = cli.output {
        config.report_path = output;
    }
    if let Some(days) = cli.days.filter(|d| *d > 0) {
        config.lookback_days = days;
    }

    if let Err(e) = sharescope_lib::init_logging(&config.log_level, config.log_format) {
        eprintln!("sharescope: {}", e);
        return ExitCode::FAILURE;
    }

    match sharescope_lib::assess(config).await {
        Ok((_, path)) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Assessment failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
