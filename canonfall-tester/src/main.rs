mod http;
mod playthrough;
mod reports;
mod scenarios;
mod storage;
mod tester;
mod util;

use anyhow::{Context, Result};
use canonfall_game::{GameConfig, SceneController, SystemClock};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use http::HttpStoryService;
use playthrough::{ChoicePolicy, PlaythroughReport, run_playthrough};
use scenarios::{Scenario, list_scenarios};
use storage::FileStore;
use tester::{ScenarioResult, ScenarioTester};
use util::{parse_seeds, run_storage_dir, split_csv};

#[derive(Debug, Parser)]
#[command(name = "canonfall-tester", version)]
#[command(
    about = "Automated QA for the Canonfall runtime - offline scenarios and live story-service playthroughs"
)]
struct Args {
    /// Scenarios to run (comma-separated, `all` for every scenario)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run each scenario with (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    // Live playthrough options
    /// Story service URL; enables a live playthrough against it
    #[arg(long)]
    endpoint: Option<String>,

    /// Turn cap for the live playthrough
    #[arg(long, default_value_t = 40)]
    max_turns: u32,

    /// How the live playthrough picks choices
    #[arg(long, value_enum, default_value_t = ChoicePolicy::First)]
    policy: ChoicePolicy,

    /// Seed for the random choice policy
    #[arg(long, default_value_t = 1337)]
    seed: u64,

    /// Parent directory for live-run save slots
    #[arg(long, default_value = "target/canonfall-tester")]
    storage_dir: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let scenarios = expand_scenarios(&args.scenarios);
    let seeds = parse_seeds(&args.seeds)?;

    let results = run_scenarios(&args, &scenarios, &seeds).await;
    let playthrough = run_live_playthrough(&args).await?;

    write_reports(&args, &results, playthrough.as_ref(), start_time)?;

    let live_failed = playthrough.as_ref().is_some_and(|p| !p.passed());
    if live_failed || results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:25} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "📜 Canonfall Automated Tester".bright_cyan().bold());
    println!("{}", "=============================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for scenario in Scenario::ALL {
            let key = scenario.key().to_string();
            if !scenarios.contains(&key) {
                scenarios.push(key);
            }
        }
    }
    scenarios
}

async fn run_scenarios(args: &Args, scenarios: &[String], seeds: &[u64]) -> Vec<ScenarioResult> {
    let mut results = Vec::new();
    if scenarios.is_empty() {
        return results;
    }

    println!("{}", "🧠 Running Scenarios".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let tester = ScenarioTester::new(args.verbose);
    for name in scenarios {
        match Scenario::from_key(name) {
            Some(scenario) => {
                results.extend(tester.run_scenario(scenario, seeds, args.iterations).await);
            }
            None => eprintln!("⚠️  Unknown scenario: {}", name.yellow()),
        }
    }
    results
}

async fn run_live_playthrough(args: &Args) -> Result<Option<PlaythroughReport>> {
    let Some(endpoint) = args.endpoint.as_deref() else {
        return Ok(None);
    };

    println!("{}", "🌐 Running Live Playthrough".bright_blue().bold());
    println!("{}", "-".repeat(30).blue());

    let dir = run_storage_dir(&args.storage_dir, "live");
    let store = FileStore::open(&dir)
        .with_context(|| format!("failed to open save directory {}", dir.display()))?;
    let config = GameConfig::default().with_endpoint(endpoint);
    let service = HttpStoryService::new(config.endpoint.clone());
    let controller = SceneController::new(service, store, SystemClock, config);

    let report = run_playthrough(&controller, args.policy, args.seed, args.max_turns).await;
    if report.passed() {
        println!(
            "✅ {} - {} turns ({:?}), saves in {}",
            controller.service().endpoint().green(),
            report.turns,
            report.stop,
            controller.persistence().store().dir().display()
        );
    } else {
        eprintln!(
            "❌ {} - turn {}: {}",
            controller.service().endpoint().red(),
            report.turns,
            report.error.as_deref().unwrap_or_default()
        );
    }
    Ok(Some(report))
}

fn write_reports(
    args: &Args,
    results: &[ScenarioResult],
    playthrough: Option<&PlaythroughReport>,
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => reports::generate_json_report(&mut output_target, results, playthrough)?,
        "markdown" => reports::generate_markdown_report(&mut output_target, results, playthrough)?,
        _ => {
            if results.is_empty() && playthrough.is_none() {
                writeln!(&mut output_target, "No scenarios executed.")?;
            } else {
                reports::generate_console_report(
                    &mut output_target,
                    results,
                    playthrough,
                    start_time.elapsed(),
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(
                &mut output_target,
                "🏁 Total time: {:?}",
                start_time.elapsed()
            )?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
