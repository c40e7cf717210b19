use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use qa_pilot::agent::{AgentRunner, TestPlanner};
use qa_pilot::browser::DryRunBackend;
use qa_pilot::config::load_config;
use qa_pilot::errors::QaResult;
use qa_pilot::testcase::TestParser;

/// QA Pilot - autonomous execution of natural-language UI test cases
#[derive(Parser, Debug)]
#[command(
    name = "qa-pilot",
    version,
    after_help = "ENVIRONMENT VARIABLES:\n\
        QA_PILOT_CONFIG             Path to config.toml or config.json\n\
        QA_PILOT_<ID>_API_KEY       API key for reasoning provider <ID>\n\
        RUST_LOG                    Log filter (default: info)"
)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every test file in a directory and write reports
    Run {
        /// Config file (default: config.toml next to the executable or in the working directory)
        #[arg(short, long, env = "QA_PILOT_CONFIG")]
        config: Option<PathBuf>,

        /// Directory of *.txt test definitions (overrides tests_dir)
        #[arg(short, long)]
        tests: Option<PathBuf>,

        /// Report and journal directory (overrides output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the execution plan for one test file as JSON
    Plan {
        file: PathBuf,
    },

    /// Load and validate the configuration, then exit
    CheckConfig {
        #[arg(short, long, env = "QA_PILOT_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    qa_pilot::init_tracing();

    let args = Args::parse();
    let result = match args.command {
        Commands::Run { config, tests, output } => run(config, tests, output).await,
        Commands::Plan { file } => plan(file).await,
        Commands::CheckConfig { config } => check_config(config),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "qa-pilot failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Option<PathBuf>, tests: Option<PathBuf>, output: Option<PathBuf>) -> QaResult<bool> {
    let mut cfg = load_config(config.as_deref())?;
    if let Some(dir) = output {
        cfg.output_dir = dir;
    }
    let tests_dir = tests.unwrap_or_else(|| cfg.tests_dir.clone());

    let backend = Arc::new(DryRunBackend::new());
    let mut runner = AgentRunner::from_config(cfg, backend)?;
    let outcome = runner.run_from_directory(&tests_dir).await?;

    for summary in &outcome.summaries {
        println!("{:<8} {} ({})", summary.status.to_string(), summary.title, summary.test_id);
    }
    for (path, error) in &outcome.skipped {
        println!("SKIPPED  {} ({error})", path.display());
    }
    for report in &outcome.reports {
        println!("report   {}", report.display());
    }
    Ok(outcome.all_passed())
}

async fn plan(file: PathBuf) -> QaResult<bool> {
    let test = TestParser::new().parse_file(&file).await?;
    let plan = TestPlanner::new().build_plan(&test);
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(true)
}

fn check_config(config: Option<PathBuf>) -> QaResult<bool> {
    let cfg = load_config(config.as_deref())?;
    println!(
        "config ok: base_url={} environment={} providers={}",
        cfg.base_url,
        cfg.environment,
        cfg.reasoning.providers.len()
    );
    Ok(true)
}
