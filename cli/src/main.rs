//! LinkGraph CLI: ingest a connection export and query it
//!
//! `ingest` writes a snapshot into the data directory; `find`, `details`,
//! `stats` and `shell` read it back. `analyze` runs the whole pipeline in
//! memory without touching the data directory.

use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use linkgraph::{
    build_embedder, AnalyzerConfig, AnalyzerError, ConnectionAnalyzer, ConnectionDetails, Criteria, Ingestor,
    RankedConnection, Snapshot,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(name = "linkgraph", version, about = "Hybrid graph + vector analyzer for connection exports")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Snapshot directory (overrides the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a CSV export, build both indexes and save a snapshot
    Ingest {
        /// Path to the connections CSV
        csv: PathBuf,
    },
    /// Rank connections matching the given criteria
    Find {
        #[command(flatten)]
        filters: FindArgs,

        /// Maximum rows to print
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show a person, their relationships and similar profiles
    Details {
        /// Full name as it appears in the export
        name: String,
    },
    /// Show snapshot counts
    Stats,
    /// Ingest in memory and run a fixed set of example analyses
    Analyze {
        /// Path to the connections CSV
        csv: PathBuf,

        /// Company for the recent-connections lookup
        #[arg(long, default_value = "Google")]
        company: String,

        /// Lower bound for the recent-connections lookup
        #[arg(long, default_value = "2023-01-01")]
        after: String,

        /// Company for the all-connections lookup
        #[arg(long, default_value = "Microsoft")]
        second_company: String,
    },
    /// Start an interactive shell over the saved snapshot
    Shell,
}

#[derive(clap::Args)]
struct FindArgs {
    /// Substring of the company name (case-sensitive)
    #[arg(long)]
    company: Option<String>,

    /// Connected on or after this date (YYYY-MM-DD)
    #[arg(long)]
    after: Option<String>,

    /// Connected on or before this date (YYYY-MM-DD)
    #[arg(long)]
    before: Option<String>,

    #[arg(long)]
    industry: Option<String>,

    #[arg(long)]
    role_level: Option<String>,

    #[arg(long)]
    skills: Option<String>,
}

impl FindArgs {
    fn into_criteria(self) -> Criteria {
        Criteria {
            company: self.company,
            connected_after: self.after,
            connected_before: self.before,
            industry: self.industry,
            role_level: self.role_level,
            skills: self.skills,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = AnalyzerConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let format = cli.format;

    match cli.command {
        Commands::Ingest { csv } => run_ingest(&config, &csv, format).await,
        Commands::Find { filters, limit } => {
            let analyzer = ConnectionAnalyzer::open(&config)?;
            run_find(&analyzer, &filters.into_criteria(), limit, format).await
        }
        Commands::Details { name } => {
            let analyzer = ConnectionAnalyzer::open(&config)?;
            run_details(&analyzer, &name, format).await
        }
        Commands::Stats => run_stats(&config.data_dir, format),
        Commands::Analyze {
            csv,
            company,
            after,
            second_company,
        } => run_analyze(&config, &csv, &company, &after, &second_company, format).await,
        Commands::Shell => {
            let analyzer = ConnectionAnalyzer::open(&config)?;
            run_shell(&analyzer, format).await
        }
    }
}

async fn ingest_in_memory(config: &AnalyzerConfig, csv: &Path) -> anyhow::Result<linkgraph::ingest::IngestOutput> {
    let embedder = build_embedder(&config.embedding)?;
    let output = Ingestor::new(config.clone(), embedder)
        .ingest_file(csv)
        .await
        .with_context(|| format!("ingesting {}", csv.display()))?;
    Ok(output)
}

async fn run_ingest(config: &AnalyzerConfig, csv: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let output = ingest_in_memory(config, csv).await?;
    Snapshot::capture(&output.graph, &output.index)
        .await
        .save(&config.data_dir)?;

    let report = output.report;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => {
            println!("Documents:      {}", report.documents);
            println!("Nodes created:  {}", report.projection.nodes_created);
            println!("Edges created:  {}", report.projection.edges_created);
            println!("Chunks indexed: {}", report.chunks);
            println!("Snapshot:       {}", config.data_dir.display());
        }
    }
    Ok(())
}

async fn run_find(
    analyzer: &ConnectionAnalyzer,
    criteria: &Criteria,
    limit: usize,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let ranked = analyzer.find_interesting_connections(criteria).await?;
    print_ranked(&ranked[..ranked.len().min(limit)], format)
}

async fn run_details(analyzer: &ConnectionAnalyzer, name: &str, format: OutputFormat) -> anyhow::Result<()> {
    match analyzer.get_connection_details(name).await? {
        Some(details) => print_details(&details, format),
        None => {
            println!("No connection named '{}' found", name);
            Ok(())
        }
    }
}

fn run_stats(data_dir: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let manifest = Snapshot::read_manifest(data_dir).map_err(AnalyzerError::from)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&manifest)?),
        OutputFormat::Table => {
            println!("Nodes:      {}", manifest.node_count);
            println!("Edges:      {}", manifest.edge_count);
            println!("Chunks:     {}", manifest.chunk_count);
            println!("Embeddings: {} ({} dims)", manifest.embedding_model, manifest.dimensions);
            println!("Created:    {}", manifest.created_at);
        }
    }
    Ok(())
}

async fn run_analyze(
    config: &AnalyzerConfig,
    csv: &Path,
    company: &str,
    after: &str,
    second_company: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let output = ingest_in_memory(config, csv).await?;
    let analyzer = ConnectionAnalyzer::new(
        Arc::new(output.graph),
        Arc::new(output.index),
        config.retrieval.clone(),
    );

    println!("\nRecent connections at {} (since {}):", company, after);
    let recent = Criteria::new().with_company(company).with_connected_after(after);
    let top = match analyzer.find_interesting_connections(&recent).await {
        Ok(ranked) => {
            print_or_report(print_ranked(&ranked[..ranked.len().min(5)], format));
            ranked.into_iter().next()
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            None
        }
    };

    println!("\nConnections at {}:", second_company);
    match analyzer
        .find_interesting_connections(&Criteria::new().with_company(second_company))
        .await
    {
        Ok(ranked) => print_or_report(print_ranked(&ranked[..ranked.len().min(5)], format)),
        Err(e) => eprintln!("Error: {}", e),
    }

    if let Some(top) = top {
        println!("\nDetailed profile for {}:", top.name);
        print_or_report(run_details(&analyzer, &top.name, format).await);
    }
    Ok(())
}

async fn run_shell(analyzer: &ConnectionAnalyzer, format: OutputFormat) -> anyhow::Result<()> {
    println!("LinkGraph Interactive Shell");
    println!("Type :help for commands. :quit to exit.\n");

    let stdin = std::io::stdin();
    let mut line = String::new();

    loop {
        eprint!("linkgraph> ");

        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break; // EOF
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (command, rest) = trimmed.split_once(char::is_whitespace).unwrap_or((trimmed, ""));
        let rest = rest.trim();

        match command {
            ":quit" | ":exit" | ":q" => break,
            ":help" | ":h" => {
                println!("Commands:");
                println!("  company <name>          Connections at a company");
                println!("  timeline <start> <end>  Connections made between two dates");
                println!("  profile <name>          Details and similar profiles");
                println!("  :quit                   Exit shell");
            }
            "company" if !rest.is_empty() => {
                let criteria = Criteria::new().with_company(rest);
                print_or_report(run_find(analyzer, &criteria, 20, format).await);
            }
            "timeline" => match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
                [start, end] => {
                    let criteria = Criteria::new().with_connected_after(*start).with_connected_before(*end);
                    print_or_report(run_find(analyzer, &criteria, 20, format).await);
                }
                _ => eprintln!("Usage: timeline <start> <end>"),
            },
            "profile" if !rest.is_empty() => print_or_report(run_details(analyzer, rest, format).await),
            other => eprintln!("Unknown command '{}'. Type :help for commands.", other),
        }
    }

    println!("Bye!");
    Ok(())
}

fn print_or_report(result: anyhow::Result<()>) {
    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
    }
}

fn print_ranked(ranked: &[RankedConnection], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(ranked)?),
        OutputFormat::Table => {
            if ranked.is_empty() {
                println!("(no results)");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["#", "Name", "Score"]);
            for (i, connection) in ranked.iter().enumerate() {
                table.add_row(vec![
                    (i + 1).to_string(),
                    connection.name.clone(),
                    format!("{:.3}", connection.score),
                ]);
            }
            println!("{}", table);
            println!("{} row(s)", ranked.len());
        }
    }
    Ok(())
}

fn print_details(details: &ConnectionDetails, format: OutputFormat) -> anyhow::Result<()> {
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&details.to_json())?);
        return Ok(());
    }

    let mut person = Table::new();
    person.set_content_arrangement(ContentArrangement::Dynamic);
    person.set_header(vec!["Property", "Value"]);
    let mut keys: Vec<&String> = details.person.properties.keys().collect();
    keys.sort();
    for key in keys {
        if let Some(value) = details.person.get_property(key) {
            person.add_row(vec![key.clone(), value.to_string()]);
        }
    }
    println!("{}", person);

    if !details.relationships.is_empty() {
        let mut relationships = Table::new();
        relationships.set_content_arrangement(ContentArrangement::Dynamic);
        relationships.set_header(vec!["Relationship", "Target"]);
        for rel in &details.relationships {
            relationships.add_row(vec![
                rel.edge.edge_type.to_string(),
                rel.target.get_str("name").unwrap_or_default().to_string(),
            ]);
        }
        println!("{}", relationships);
    }

    if details.similar_profiles.is_empty() {
        println!("No similar profiles");
        return Ok(());
    }

    let mut similar = Table::new();
    similar.set_content_arrangement(ContentArrangement::Dynamic);
    similar.set_header(vec!["Similar profile", "Company", "Similarity"]);
    for profile in &details.similar_profiles {
        similar.add_row(vec![
            profile.name.clone(),
            profile.company.clone(),
            profile
                .similarity
                .map(|s| format!("{:.3}", s))
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    println!("{}", similar);
    Ok(())
}
