use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{Attribute, Cell, Table};
use lca_scout::config::{default_config_path, find_config_file, load_config, Config};
use lca_scout::services::build_registry;
use lca_scout::sources::{Source, SourceCapabilities};
use lca_scout::workflows::{
    current_year, get_deep_research_profile, list_profiles, run_citation_workflow,
    run_deep_research_workflow, run_paper_search, run_trending_metrics_workflow, year_window,
    CitationWorkflowOptions, DeepResearchOptions, PaperSearchOptions, TrendingMetricsOptions,
    DEFAULT_MAX_RECORDS_PER_METRIC, DEFAULT_METRICS_START_YEAR, DEFAULT_SEARCH_LIMIT,
};
use lca_scout::ResearchServices;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// lca-scout - Citation trends and research gaps in life cycle assessment literature
#[derive(Parser, Debug)]
#[command(name = "lca-scout")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Citation trends and research gaps in LCA literature", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the planned artefacts without calling any service
    #[arg(long, short = 'n', global = true)]
    dry_run: bool,

    /// Show all environment variables
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan recent literature and write the citation report, dataset and chart
    #[command(alias = "scan")]
    Citations {
        /// Research profile
        #[arg(long, short, default_value = "lca")]
        profile: String,

        /// Rolling window in years (default from config)
        #[arg(long, short)]
        years: Option<u32>,

        /// Maximum number of papers to retain (default from config)
        #[arg(long, short = 'm')]
        max_records: Option<usize>,

        /// Extra keyword to match (repeatable)
        #[arg(long = "keyword", short = 'k')]
        keywords: Vec<String>,

        /// Directory for all artefacts (default from config)
        #[arg(long, short = 'd')]
        output_dir: Option<PathBuf>,

        /// Markdown report path (default: <output-dir>/<profile>_citations.md)
        #[arg(long)]
        report: Option<PathBuf>,

        /// Chart image path (default: <output-dir>/<profile>_trends.png)
        #[arg(long)]
        chart: Option<PathBuf>,

        /// JSON dataset path (default: <output-dir>/<profile>_citations.json)
        #[arg(long)]
        raw_data: Option<PathBuf>,

        /// Skip chart rendering
        #[arg(long)]
        no_chart: bool,

        /// Skip Semantic Scholar enrichment
        #[arg(long)]
        no_enrich: bool,
    },

    /// Run the citation scan and wrap it in a Deep Research report
    #[command(alias = "deep")]
    DeepReport {
        /// Directory for all artefacts (default from config)
        #[arg(long, short = 'd')]
        output_dir: Option<PathBuf>,

        /// Research profile
        #[arg(long, short, default_value = "lca")]
        profile: String,

        /// Rolling window in years (default from config)
        #[arg(long, short)]
        years: Option<u32>,

        /// Maximum number of papers to retain (default from config)
        #[arg(long, short = 'm')]
        max_records: Option<usize>,

        /// Extra keyword to match (repeatable)
        #[arg(long = "keyword", short = 'k')]
        keywords: Vec<String>,

        /// Produce only the deterministic outputs
        #[arg(long)]
        no_deep_research: bool,

        /// Replace the profile's research question
        #[arg(long)]
        prompt: Option<String>,

        /// Replace the profile's synthesis instructions
        #[arg(long)]
        instructions: Option<String>,
    },

    /// Citation trends for the tracked LCA metrics
    Metrics {
        /// First publication year
        #[arg(long, short, default_value_t = DEFAULT_METRICS_START_YEAR)]
        start_year: i32,

        /// Last publication year (default: current year)
        #[arg(long, short)]
        end_year: Option<i32>,

        /// Works kept per metric
        #[arg(long, short = 'm', default_value_t = DEFAULT_MAX_RECORDS_PER_METRIC)]
        max_records_per_metric: usize,

        /// Write the summary as JSON to this path
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Search papers on Semantic Scholar, optionally alongside OpenAlex
    #[command(alias = "find-papers")]
    Papers {
        /// Free-text query
        query: String,

        /// Papers returned per source
        #[arg(long, short, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,

        /// Also list matching OpenAlex works
        #[arg(long)]
        openalex: bool,

        /// Build citation edges from the OpenAlex records (implies --openalex)
        #[arg(long)]
        citations: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List or verify the configured services
    Sources {
        #[command(subcommand)]
        command: SourcesCommands,
    },

    /// List built-in research profiles
    Profiles,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum SourcesCommands {
    /// List configured services
    List {
        /// Filter services by capability
        #[arg(long, value_enum)]
        with_capability: Option<CapabilityFilter>,
    },

    /// Check each service (or a single one) for reachability
    Verify {
        /// Service id, e.g. openalex
        id: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Destination (default: user config directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },

    /// Print the effective configuration with secrets masked
    Show,
}

/// Capability filter for listing services
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum CapabilityFilter {
    WorkSearch,
    PaperLookup,
    PaperSearch,
    Chart,
    Synthesis,
}

impl From<CapabilityFilter> for SourceCapabilities {
    fn from(filter: CapabilityFilter) -> Self {
        match filter {
            CapabilityFilter::WorkSearch => SourceCapabilities::WORK_SEARCH,
            CapabilityFilter::PaperLookup => SourceCapabilities::PAPER_LOOKUP,
            CapabilityFilter::PaperSearch => SourceCapabilities::PAPER_SEARCH,
            CapabilityFilter::Chart => SourceCapabilities::CHART,
            CapabilityFilter::Synthesis => SourceCapabilities::SYNTHESIS,
        }
    }
}

/// Print all available environment variables
fn print_env_vars() {
    println!("lca-scout - Environment Variables");
    println!();
    println!("API Keys:");
    println!("  SEMANTIC_SCHOLAR_API_KEY    API key for Semantic Scholar (higher rate limits)");
    println!("  OPENAI_API_KEY              API key for the Deep Research synthesis");
    println!("  OPENALEX_EMAIL              Email for OpenAlex 'polite pool' access");
    println!();
    println!("Configuration overrides (section and key joined by a double underscore):");
    println!("  LCA_SCOUT_WORKFLOW__YEARS                      Rolling window in years (default: 5)");
    println!("  LCA_SCOUT_WORKFLOW__MAX_RECORDS                Papers retained per scan (default: 300)");
    println!("  LCA_SCOUT_SEMANTIC_SCHOLAR__REQUESTS_PER_SECOND  Enrichment rate limit (default: 1)");
    println!("  LCA_SCOUT_CHART__ENDPOINT                      Chart server URL");
    println!("  LCA_SCOUT_HTTP__TIMEOUT_SECS                   Request timeout (default: 20)");
    println!("  LCA_SCOUT_LOGGING__FORMAT                      plain or json");
    println!();
    println!("Logging:");
    println!("  RUST_LOG                    Log filter, overrides -v/--quiet");
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.logging.level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    let json = config.logging.is_json();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("lca_scout={}", level)),
        ))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

/// Load `--config`, else the first config file found, layered with the environment
fn resolve_config(cli: &Cli) -> Result<(Config, Option<PathBuf>)> {
    let path = cli.config.clone().or_else(find_config_file);
    let config = load_config(path.as_deref()).with_context(|| match &path {
        Some(path) => format!("Failed to load config file {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })?;
    config.validate()?;
    Ok((config, path))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.env {
        print_env_vars();
        return Ok(());
    }

    let (config, config_path) = resolve_config(&cli)?;
    init_tracing(&cli, &config);
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    match cli.command {
        Some(Commands::Citations {
            profile,
            years,
            max_records,
            keywords,
            output_dir,
            report,
            chart,
            raw_data,
            no_chart,
            no_enrich,
        }) => {
            let profile = get_deep_research_profile(&profile)?;
            let output_dir = output_dir.unwrap_or_else(|| config.workflow.output_dir.clone());
            let report = report.unwrap_or_else(|| output_dir.join(profile.citation_report_filename()));
            let chart = chart.unwrap_or_else(|| output_dir.join(profile.chart_filename()));
            let raw_data = raw_data.unwrap_or_else(|| output_dir.join(profile.dataset_filename()));
            let keywords = if keywords.is_empty() {
                config.workflow.keywords.clone()
            } else {
                keywords
            };

            let mut options = CitationWorkflowOptions::new(&report, &chart)
                .with_raw_data_path(&raw_data)
                .with_years(years.unwrap_or(config.workflow.years))
                .with_max_records(max_records.unwrap_or(config.workflow.max_records))
                .with_keywords(keywords);
            options.max_pages = config.workflow.max_pages;
            options.enrich_limit = config.workflow.enrich_limit;

            if cli.dry_run {
                let (start, end) = year_window(options.years, current_year());
                println!("Dry run for profile '{}' ({}-{})", profile.slug(), start, end);
                println!("  Report:  {}", report.display());
                println!("  Chart:   {}", chart.display());
                println!("  Dataset: {}", raw_data.display());
                return Ok(());
            }

            let mut services = ResearchServices::from_config(&config)?;
            if no_chart {
                services.chart = None;
            }
            if no_enrich {
                services.enrichment = None;
            }

            let artifacts = run_citation_workflow(&services, &profile.citation, &options).await?;
            if !cli.quiet {
                println!(
                    "Analysed {} papers ({}-{})",
                    artifacts.papers.len(),
                    artifacts.start_year,
                    artifacts.end_year
                );
                println!("  Report:  {}", artifacts.report_path.display());
                if let Some(path) = &artifacts.chart_path {
                    println!("  Chart:   {}", path.display());
                }
                if let Some(path) = &artifacts.raw_data_path {
                    println!("  Dataset: {}", path.display());
                }
            }
        }

        Some(Commands::DeepReport {
            output_dir,
            profile,
            years,
            max_records,
            keywords,
            no_deep_research,
            prompt,
            instructions,
        }) => {
            let profile = get_deep_research_profile(&profile)?;
            let mut options = DeepResearchOptions::new(
                output_dir.unwrap_or_else(|| config.workflow.output_dir.clone()),
            );
            options.years = years.unwrap_or(config.workflow.years);
            options.max_records = max_records.unwrap_or(config.workflow.max_records);
            options.max_pages = config.workflow.max_pages;
            options.enrich_limit = config.workflow.enrich_limit;
            options.keywords = if keywords.is_empty() {
                config.workflow.keywords.clone()
            } else {
                keywords
            };
            options.deep_research = !no_deep_research;
            options.prompt_override = prompt;
            options.instructions_override = instructions;
            options.dry_run = cli.dry_run;

            let services = ResearchServices::from_config(&config)?;
            let artifacts = run_deep_research_workflow(&services, profile, &options).await?;

            if artifacts.dry_run {
                println!("Dry run for profile '{}'", profile.slug());
                println!("  Citation report: {}", artifacts.citation_report_path.display());
                println!("  Final report:    {}", artifacts.final_report_path.display());
            } else if !cli.quiet {
                println!("Final report: {}", artifacts.final_report_path.display());
                println!("  Citation report: {}", artifacts.citation_report_path.display());
                if let Some(path) = &artifacts.chart_path {
                    println!("  Chart:           {}", path.display());
                }
                if let Some(path) = &artifacts.raw_data_path {
                    println!("  Dataset:         {}", path.display());
                }
                if let Some(path) = &artifacts.response_path {
                    println!("  Response:        {}", path.display());
                }
                if let Some(summary) = artifacts.summary.as_deref() {
                    if summary.starts_with("Deep Research unavailable") {
                        println!("  {}", summary);
                    }
                }
            }
        }

        Some(Commands::Metrics {
            start_year,
            end_year,
            max_records_per_metric,
            output,
        }) => {
            let options = TrendingMetricsOptions {
                start_year,
                end_year,
                max_records_per_metric,
                output_path: output,
                dry_run: cli.dry_run,
            };
            let services = ResearchServices::from_config(&config)?;
            let artifacts = run_trending_metrics_workflow(&services, &options).await?;

            if let Some(plan) = &artifacts.plan {
                println!("Dry run for metrics {}-{}", artifacts.start_year, artifacts.end_year);
                for step in plan {
                    println!("  {}", step);
                }
            } else if !cli.quiet {
                let mut table = Table::new();
                table.load_preset(comfy_table::presets::UTF8_FULL);
                table.set_header(vec!["Metric", "Works", "Citations", "Top concepts"]);
                for metric in &artifacts.metrics {
                    let concepts: Vec<&str> = metric.top_concepts.iter().map(|c| c.name.as_str()).collect();
                    table.add_row(vec![
                        Cell::new(&metric.label).add_attribute(Attribute::Bold),
                        Cell::new(metric.total_works),
                        Cell::new(metric.total_citations),
                        Cell::new(concepts.join(", ")),
                    ]);
                }
                println!("{table}");
                if let Some(path) = &artifacts.output_path {
                    println!("Metrics written to {}", path.display());
                }
            }
        }

        Some(Commands::Papers {
            query,
            limit,
            openalex,
            citations,
            json,
        }) => {
            let mut options = PaperSearchOptions::new(query);
            options.limit = limit;
            options.include_openalex = openalex || citations;
            options.include_citations = citations;
            options.dry_run = cli.dry_run;

            let services = ResearchServices::from_config(&config)?;
            let artifacts = run_paper_search(&services, &options).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&artifacts)?);
            } else if let Some(plan) = &artifacts.plan {
                println!("Dry run for '{}'", artifacts.query);
                for step in plan {
                    println!("  {}", step);
                }
            } else {
                let mut table = Table::new();
                table.load_preset(comfy_table::presets::UTF8_FULL);
                table.set_header(vec!["Title", "Year", "Authors"]);
                for hit in &artifacts.semantic_scholar {
                    table.add_row(vec![
                        Cell::new(&hit.title).add_attribute(Attribute::Bold),
                        Cell::new(hit.year.map(|y| y.to_string()).unwrap_or_default()),
                        Cell::new(hit.authors.join(", ")),
                    ]);
                }
                println!("{table}");

                if options.include_openalex {
                    let mut table = Table::new();
                    table.load_preset(comfy_table::presets::UTF8_FULL);
                    table.set_header(vec!["OpenAlex id", "Title", "Year", "Citations"]);
                    for record in &artifacts.openalex {
                        table.add_row(vec![
                            Cell::new(record.id.as_deref().unwrap_or_default()),
                            Cell::new(record.title.as_deref().unwrap_or_default()),
                            Cell::new(record.year.map(|y| y.to_string()).unwrap_or_default()),
                            Cell::new(record.cited_by_count.unwrap_or(0)),
                        ]);
                    }
                    println!("{table}");
                }
                if let Some(edges) = &artifacts.citation_edges {
                    println!("Citation edges: {}", edges.len());
                }
                for note in &artifacts.notes {
                    println!("Note: {}", note);
                }
            }
        }

        Some(Commands::Sources { command }) => {
            let registry = build_registry(&config)?;
            match command {
                SourcesCommands::List { with_capability } => {
                    let sources = match with_capability {
                        Some(filter) => registry.with_capability(filter.into()),
                        None => registry.all().collect(),
                    };

                    let mut table = Table::new();
                    table.load_preset(comfy_table::presets::UTF8_FULL);
                    table.set_header(vec!["Id", "Name", "Capabilities"]);
                    for src in sources {
                        table.add_row(vec![
                            Cell::new(src.id()).add_attribute(Attribute::Bold),
                            Cell::new(src.name()),
                            Cell::new(src.capabilities().labels().join(", ")),
                        ]);
                    }
                    println!("{table}");
                }
                SourcesCommands::Verify { id } => {
                    let sources = match id.as_deref() {
                        Some(id) => vec![registry.get_required(id)?],
                        None => registry.all().collect(),
                    };

                    let mut table = Table::new();
                    table.load_preset(comfy_table::presets::UTF8_FULL);
                    table.set_header(vec!["Id", "Status", "Message"]);
                    let mut failures = 0;
                    for src in sources {
                        let verification = src.verify().await;
                        if !verification.success {
                            failures += 1;
                        }
                        table.add_row(vec![
                            Cell::new(src.id()).add_attribute(Attribute::Bold),
                            Cell::new(if verification.success { "OK" } else { "FAILED" }),
                            Cell::new(verification.message),
                        ]);
                    }
                    println!("{table}");
                    if failures > 0 {
                        bail!("{} service(s) failed verification", failures);
                    }
                }
            }
        }

        Some(Commands::Profiles) => {
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Slug", "Name", "Anchor", "Default keywords"]);
            for profile in list_profiles() {
                table.add_row(vec![
                    Cell::new(profile.slug()).add_attribute(Attribute::Bold),
                    Cell::new(profile.display_name()),
                    Cell::new(profile.citation.anchor_keyword),
                    Cell::new(profile.citation.default_keywords.join(", ")),
                ]);
            }
            println!("{table}");
        }

        Some(Commands::Config { command }) => match command {
            ConfigCommands::Init { path, force } => {
                let path = path
                    .or_else(default_config_path)
                    .context("No configuration directory available, pass --path")?;
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                if cli.dry_run {
                    println!("Would write {}", path.display());
                    return Ok(());
                }
                Config::template().save(&path)?;
                println!("Wrote {}", path.display());
            }
            ConfigCommands::Show => {
                let mut shown = config.clone();
                if shown.api_keys.semantic_scholar.is_some() {
                    shown.api_keys.semantic_scholar = Some("********".to_string());
                }
                if shown.api_keys.openai.is_some() {
                    shown.api_keys.openai = Some("********".to_string());
                }
                print!("{}", shown.to_toml()?);
            }
        },

        None => {
            println!("lca-scout {}", env!("CARGO_PKG_VERSION"));
            println!("Run with --help for available commands.");
        }
    }

    Ok(())
}
