use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use fangstdata::api::HttpApiClient;
use fangstdata::app::{
    App, ChartKind, ChartLevel, ChartOptions, ExportOptions, ExportTarget, ListOptions,
};
use fangstdata::config::ConfigLoader;
use fangstdata::error::FangstError;
use fangstdata::output::JsonOutput;

#[derive(Parser)]
#[command(name = "fangstdata")]
#[command(about = "Fisheries survey data: fetch, filter, aggregate and export")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch rivers and stations into the store")]
    Sync,
    #[command(about = "List rivers, optionally filtered")]
    List(ListArgs),
    #[command(about = "Show a river with its stations")]
    Info(InfoArgs),
    #[command(about = "Build chart-ready series from the loaded records")]
    Chart(ChartArgs),
    #[command(about = "Write the full dataset as CSV")]
    Export(ExportArgs),
    #[command(about = "Sign in against the auth endpoint")]
    Login(LoginArgs),
    #[command(about = "Drop all loaded records")]
    Clear,
}

#[derive(Args)]
struct ListArgs {
    #[arg(long, default_value = "")]
    search: String,

    #[arg(long)]
    species: Vec<String>,

    #[arg(long)]
    from: Option<NaiveDate>,

    #[arg(long)]
    to: Option<NaiveDate>,
}

#[derive(Args)]
struct InfoArgs {
    river: i64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ChartKindArg {
    Counts,
    Histogram,
    Samples,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LevelArg {
    Rivers,
    Stations,
}

#[derive(Args)]
struct ChartArgs {
    #[arg(value_enum)]
    kind: ChartKindArg,

    #[arg(long, value_enum, default_value_t = LevelArg::Stations)]
    level: LevelArg,

    #[arg(long)]
    species: Vec<String>,

    #[arg(long)]
    interval: Option<u32>,

    #[arg(long)]
    others: bool,

    #[arg(long)]
    per_minute: bool,

    #[arg(long)]
    combine: bool,
}

#[derive(Args)]
struct ExportArgs {
    #[arg(long, value_enum, default_value_t = LevelArg::Rivers)]
    target: LevelArg,

    #[arg(long)]
    river: Vec<i64>,
}

#[derive(Args)]
struct LoginArgs {
    #[arg(long)]
    username: String,

    #[arg(long)]
    password: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(fangst) = report.downcast_ref::<FangstError>() {
            return ExitCode::from(map_exit_code(fangst));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &FangstError) -> u8 {
    match error {
        FangstError::RiverNotFound(_)
        | FangstError::StationNotFound(_)
        | FangstError::MissingConfig => 2,
        FangstError::ApiHttp(_) | FangstError::ApiStatus { .. } | FangstError::Auth(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let api = HttpApiClient::new(&config.base_url, &config.auth_url)?;

    if let Commands::Login(args) = &cli.command {
        api.login(&args.username, &args.password)?;
        return Ok(());
    }

    let mut app = App::new(api, config);

    let result = run_command(&cli.command, &mut app);
    JsonOutput::print_feedback(&app.drain_feedback()).into_diagnostic()?;
    result
}

fn run_command(command: &Commands, app: &mut App<HttpApiClient>) -> miette::Result<()> {
    match command {
        Commands::Sync => {
            let result = app.sync()?;
            JsonOutput::print_sync(&result).into_diagnostic()
        }
        Commands::List(args) => {
            app.sync()?;
            let result = app.list(&ListOptions {
                search: args.search.clone(),
                species: args.species.clone(),
                from: args.from,
                to: args.to,
            });
            JsonOutput::print_list(&result).into_diagnostic()
        }
        Commands::Info(args) => {
            app.sync()?;
            app.enrich_river(args.river)?;
            let result = app.info(args.river)?;
            JsonOutput::print_info(&result).into_diagnostic()
        }
        Commands::Chart(args) => {
            app.sync()?;
            let result = app.chart(&ChartOptions {
                kind: match args.kind {
                    ChartKindArg::Counts => ChartKind::Counts,
                    ChartKindArg::Histogram => ChartKind::Histogram,
                    ChartKindArg::Samples => ChartKind::Samples,
                },
                level: level(args.level),
                species: args.species.clone(),
                include_others: args.others,
                absolute: !args.per_minute,
                interval: args.interval,
                combine: args.combine,
            })?;
            JsonOutput::print_chart(&result).into_diagnostic()
        }
        Commands::Export(args) => {
            app.sync()?;
            let target = match args.target {
                LevelArg::Rivers => ExportTarget::Rivers,
                LevelArg::Stations => ExportTarget::Stations,
            };
            let result = app.export(
                target,
                &ExportOptions {
                    river_ids: args.river.clone(),
                },
            )?;
            JsonOutput::print_export(&result).into_diagnostic()
        }
        Commands::Login(_) => Ok(()),
        Commands::Clear => {
            let result = app.clear();
            JsonOutput::print_clear(&result).into_diagnostic()
        }
    }
}

fn level(level: LevelArg) -> ChartLevel {
    match level {
        LevelArg::Rivers => ChartLevel::Rivers,
        LevelArg::Stations => ChartLevel::Stations,
    }
}
