use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use flow_engine::constants::catalog::CATEGORIES;
use flow_engine::{
    palette, CatalogProvider, EngineConfig, JsonFileCatalog, LogEventSink, OutcomeSource,
    RandomOutcomes, RunState, ScriptedOutcomes, TemplateCatalog, ToolCatalog, ToolQuery,
    WorkflowDocument, WorkflowSession,
};

/// flowctl - build and run simulated node workflows
#[derive(Parser)]
#[command(name = "flowctl")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the engine configuration (JSON)
    #[arg(long, global = true, default_value = "flow.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in templates
    Templates {
        /// Only show templates in this category
        #[arg(long)]
        category: Option<String>,
    },

    /// List the node kinds offered by the palette
    Palette,

    /// Browse a tool catalog file
    Tools {
        /// JSON array of tool records
        catalog: PathBuf,

        /// Case-insensitive name search
        #[arg(long, default_value = "")]
        search: String,

        /// Category filter ("All" matches every category)
        #[arg(long)]
        category: Option<String>,
    },

    /// Run a template or an exported workflow
    Run {
        /// Template id to materialize
        #[arg(long, conflicts_with = "input")]
        template: Option<String>,

        /// Exported workflow document to import
        #[arg(long)]
        input: Option<PathBuf>,

        /// Seed for reproducible outcomes
        #[arg(long)]
        seed: Option<u64>,

        /// Make every node succeed without delay
        #[arg(long, conflicts_with = "seed")]
        always_succeed: bool,

        /// Write the resulting workflow document here
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Write the default configuration to the config path
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Templates { category } => list_templates(category.as_deref()),
        Commands::Palette => list_palette(),
        Commands::Tools {
            catalog,
            search,
            category,
        } => {
            let config = load_config(&cli.config).await;
            list_tools(&config, catalog, search, category).await
        }
        Commands::Run {
            template,
            input,
            seed,
            always_succeed,
            export,
        } => {
            let config = load_config(&cli.config).await;
            let outcomes: Arc<dyn OutcomeSource> = if always_succeed {
                Arc::new(ScriptedOutcomes::always_succeed())
            } else if let Some(seed) = seed {
                Arc::new(RandomOutcomes::seeded(&config.execution, seed))
            } else {
                Arc::new(RandomOutcomes::new(&config.execution))
            };
            let session = WorkflowSession::with_outcomes(&config, outcomes, Arc::new(LogEventSink));
            run_workflow(session, template, input, export).await
        }
        Commands::InitConfig => {
            EngineConfig::default()
                .save(&cli.config)
                .await
                .with_context(|| format!("failed to write config: {}", cli.config.display()))?;
            println!("Wrote default configuration to {}", cli.config.display());
            Ok(())
        }
    }
}

async fn load_config(path: &Path) -> EngineConfig {
    match EngineConfig::load(path).await {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Failed to load config, using defaults: {}", e);
            EngineConfig::default()
        }
    }
}

fn list_templates(category: Option<&str>) -> Result<()> {
    let catalog = TemplateCatalog::builtin();
    let templates = match category {
        Some(category) => catalog.by_category(category),
        None => catalog.list().iter().collect(),
    };

    for t in templates {
        println!(
            "{:>3}  {:<30} {:<17} {:<12} {:>9}  {:>5} uses  {:.1}",
            t.id,
            t.name,
            t.category,
            t.complexity.to_string(),
            t.estimated_time,
            t.usage_count,
            t.rating
        );
        println!("     {}", t.description);
    }
    Ok(())
}

fn list_palette() -> Result<()> {
    for kind in palette() {
        println!(
            "{:<10} {:<15} in: {:<8} out: {:<8} [{}]",
            kind.kind.as_str(),
            kind.default_name,
            kind.inputs.join(","),
            kind.outputs.join(","),
            kind.icon
        );
    }
    Ok(())
}

async fn list_tools(
    config: &EngineConfig,
    path: PathBuf,
    search: String,
    category: Option<String>,
) -> Result<()> {
    if let Some(category) = category.as_deref() {
        if !CATEGORIES.contains(&category) {
            log::warn!("Unknown category '{}', expected one of {:?}", category, CATEGORIES);
        }
    }

    let tools = JsonFileCatalog::new(&path)
        .fetch_tools()
        .await
        .with_context(|| format!("failed to read catalog: {}", path.display()))?;
    let catalog = ToolCatalog::new(tools).with_max_results(config.catalog.max_results);

    let mut query = ToolQuery::new().with_search(search);
    if let Some(category) = category {
        query = query.with_category(category);
    }

    let matches = catalog.filter(&query);
    for tool in &matches {
        println!("{:<12} {:<30} {:<17} {:.1}", tool.id, tool.name, tool.category, tool.rating);
    }
    println!("{} of {} tools", matches.len(), catalog.len());
    Ok(())
}

async fn run_workflow(
    mut session: WorkflowSession,
    template: Option<String>,
    input: Option<PathBuf>,
    export: Option<PathBuf>,
) -> Result<()> {
    match (template, input) {
        (Some(id), _) => {
            session
                .load_template(&id)
                .await
                .with_context(|| format!("failed to load template '{}'", id))?;
        }
        (None, Some(path)) => {
            session
                .open(&path)
                .await
                .with_context(|| format!("failed to import workflow: {}", path.display()))?;
        }
        (None, None) => bail!("either --template or --input is required"),
    }

    let stats = session.stats().await;
    println!(
        "{} nodes, {} connections, estimated {}, efficiency {}%",
        stats.total_nodes,
        stats.total_connections,
        stats.estimated_time_label(),
        stats.efficiency
    );

    let summary = session.run().await.context("workflow run failed")?;

    for entry in &summary.log {
        println!(
            "{:<8} {:<28} {:>6}ms  {}",
            format!("{:?}", entry.status).to_lowercase(),
            entry.node_name,
            entry.duration_ms,
            entry.message
        );
    }
    println!(
        "{:?}: {} executed, {:.0}% success, {:.2} nodes/s",
        summary.state,
        summary.metrics.nodes_executed,
        summary.metrics.success_rate,
        summary.metrics.throughput
    );

    if let Some(path) = export {
        let document: WorkflowDocument = session
            .save(&path)
            .await
            .with_context(|| format!("failed to export workflow: {}", path.display()))?;
        println!("Exported {} nodes to {}", document.nodes.len(), path.display());
    }

    if summary.state == RunState::Failed {
        std::process::exit(1);
    }
    Ok(())
}
