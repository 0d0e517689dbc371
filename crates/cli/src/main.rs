use crate::{
    commands::{Commands, OutputArgs, PageArgs, TargetArgs},
    error::CliError,
    progress::BarObserver,
    signal::{ExitCode, RetrievalInterrupt},
};
use clap::Parser;
use connectors::adapter::{Adapter, BackendKind};
use engine_config::{
    env::EnvManager,
    settings::{ConnectionSettings, RetrievalSettings, validator::SettingsValidator},
};
use engine_core::{
    options::RetrievalOptions,
    report::{RetrievalOutcome, RetrievalReport},
    retriever::Retriever,
};
use model::{
    core::identifiers::{FieldProjection, IndexSelector},
    pagination::sort::SortSpec,
};
use serde_json::{Value, json};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;
mod progress;
mod signal;

#[derive(Parser)]
#[command(
    name = "docsift",
    version = "0.1.0",
    about = "Pull documents out of Elasticsearch and OpenSearch as tables"
)]
struct Cli {
    #[arg(long, global = true, help = "elasticsearch, opensearch or memory")]
    backend: Option<BackendKind>,

    #[arg(
        long = "host",
        global = true,
        help = "Backend URL, repeatable (a .jsonl file for the memory backend)"
    )]
    hosts: Vec<String>,

    #[arg(long, global = true, help = "Load DOCSIFT_* settings from a .env file")]
    env_file: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err}");
            ExitCode::Failed
        }
    };
    std::process::exit(code.as_i32());
}

fn load_settings(cli: &Cli) -> Result<(RetrievalSettings, ConnectionSettings), CliError> {
    let mut env = EnvManager::new();
    for path in &cli.env_file {
        env.load_from_file(path)?;
    }

    let retrieval = env.retrieval_settings()?;
    let mut connection = env.connection_settings()?;
    if let Some(kind) = cli.backend {
        connection.backend = kind;
    }
    if !cli.hosts.is_empty() {
        connection.hosts = cli.hosts.clone();
    }
    // The HTTP default host means nothing to the memory backend.
    if connection.backend == BackendKind::Memory
        && connection.hosts == ConnectionSettings::default().hosts
    {
        connection.hosts.clear();
    }

    SettingsValidator::new(&retrieval, &connection).validate()?;
    Ok((retrieval, connection))
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let (retrieval, connection) = load_settings(&cli)?;
    let adapter = Adapter::connect(connection.backend, &connection.connect_options())?;
    info!("Using {} backend", connection.backend);
    let retriever = Retriever::new(adapter.into_shared(), retrieval);

    let interrupt = RetrievalInterrupt::new(CancellationToken::new());
    interrupt.watch();

    match cli.command {
        Commands::Ping => {
            let target = connection.hosts.join(", ");
            if retriever.backend().ping().await? {
                println!("{} at {target} is reachable", connection.backend);
                Ok(ExitCode::Success)
            } else {
                Err(CliError::Unreachable(target))
            }
        }
        Commands::Aliases { output } => {
            let table = retriever.list_aliases().await?;
            write(&table, &output)?;
            Ok(ExitCode::Success)
        }
        Commands::Fields { indices, output } => {
            let table = retriever.index_fields(&IndexSelector::from(indices)).await?;
            write(&table, &output)?;
            Ok(ExitCode::Success)
        }
        Commands::Count { target } => {
            let (indices, query) = parse_target(&target)?;
            let count = retriever.count_matches(&indices, &query).await?;
            println!("Number of documents: {}", output::thousands(count));
            Ok(ExitCode::Success)
        }
        Commands::Scan {
            target,
            page,
            output,
        } => {
            let (indices, query) = parse_target(&target)?;
            let options = build_options(&retriever, &page, &interrupt);
            let report = retriever
                .retrieve_by_scan(&indices, &query, &options)
                .await?;
            finish(report, &output, &interrupt)
        }
        Commands::Scroll {
            target,
            page,
            resume,
            output,
        } => {
            let (indices, query) = parse_target(&target)?;
            let options = build_options(&retriever, &page, &interrupt);
            let report = retriever
                .retrieve_by_scroll(&indices, &query, resume, &options)
                .await?;
            finish(report, &output, &interrupt)
        }
        Commands::Sorted {
            target,
            page,
            sort,
            after,
            output,
        } => {
            let (indices, query) = parse_target(&target)?;
            let sort = sort
                .as_deref()
                .map(|raw| {
                    let value = parse_json("sort", raw)?;
                    SortSpec::from_json(&value).map_err(|e| CliError::InvalidArgument {
                        arg: "sort",
                        reason: e.to_string(),
                    })
                })
                .transpose()?;
            let after = after.as_deref().map(parse_after).transpose()?;

            let options = build_options(&retriever, &page, &interrupt);
            let report = retriever
                .retrieve_by_sorted_pagination(&indices, &query, sort, after, &options)
                .await?;
            finish(report, &output, &interrupt)
        }
    }
}

fn parse_json(arg: &'static str, raw: &str) -> Result<Value, CliError> {
    serde_json::from_str(raw).map_err(|e| CliError::InvalidArgument {
        arg,
        reason: e.to_string(),
    })
}

fn parse_after(raw: &str) -> Result<Vec<Value>, CliError> {
    match parse_json("after", raw)? {
        Value::Array(values) => Ok(values),
        other => Err(CliError::InvalidArgument {
            arg: "after",
            reason: format!("expected a JSON array, got {other}"),
        }),
    }
}

fn parse_target(target: &TargetArgs) -> Result<(IndexSelector, Value), CliError> {
    let query = match &target.query {
        Some(raw) => parse_json("query", raw)?,
        None => json!({"match_all": {}}),
    };
    Ok((IndexSelector::from(target.indices.clone()), query))
}

fn build_options(
    retriever: &Retriever,
    page: &PageArgs,
    interrupt: &RetrievalInterrupt,
) -> RetrievalOptions {
    let mut options = retriever.options().with_cancel(interrupt.token());
    if !page.fields.is_empty() {
        options = options.with_fields(FieldProjection::new(page.fields.clone()));
    }
    if let Some(size) = page.size {
        options = options.with_size(size);
    }
    if let Some(secs) = page.timeout {
        options = options.with_timeout(Duration::from_secs(secs));
    }
    if page.no_progress {
        options = options.with_progress(false);
    }
    if options.show_progress {
        options = options.with_observer(Arc::new(BarObserver::new()));
    }
    options
}

fn write(table: &model::records::table::Table, output: &OutputArgs) -> Result<(), CliError> {
    output::write_table(table, output.format, output.output.as_deref())
}

/// Writes whatever was retrieved and turns the outcome into an exit code.
fn finish(
    report: RetrievalReport,
    output: &OutputArgs,
    interrupt: &RetrievalInterrupt,
) -> Result<ExitCode, CliError> {
    write(&report.table, output)?;
    info!(
        "Wrote {} rows in {} pages ({})",
        report.rows(),
        report.pages,
        report.outcome
    );

    if let Some(id) = report.outcome.dangling_scroll() {
        warn!("Scroll context could not be released: {id}");
    }
    match &report.outcome {
        RetrievalOutcome::Complete => {}
        RetrievalOutcome::Cancelled { resume, .. } => warn!("Stopped early, resume from {resume}"),
        RetrievalOutcome::Interrupted { resume, .. } => {
            warn!("Retrieval interrupted, resume from {resume}")
        }
    }
    Ok(ExitCode::for_outcome(&report.outcome, interrupt.signalled()))
}
