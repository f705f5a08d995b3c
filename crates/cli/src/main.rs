use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use lineage_graph_core::pedigree::{compute_coefficients, PedigreeSession, QueryOptions};
use lineage_graph_core::{IndividualId, Population, TraversalMode};

#[derive(Parser)]
#[command(name = "lineage")]
#[command(version)]
#[command(about = "Ancestor/descendant graphs and inbreeding counts for two-parent pedigrees")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the pedigree graph around one individual
    Query {
        /// Population file (.csv with id,owner,left,right or the service .json payload)
        input: String,

        /// Id of the individual at the centre of the graph
        #[arg(short, long)]
        root: IndividualId,

        /// Traversal mode: "ancestors", "descendants" or "both"
        #[arg(short, long, default_value = "both")]
        mode: String,

        /// Maximum number of generations above the root
        #[arg(long)]
        max_ancestor_depth: Option<usize>,

        /// Maximum number of generations below the root
        #[arg(long)]
        max_descendant_depth: Option<usize>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Input format; inferred from the file extension when omitted
        #[arg(long, value_enum)]
        input_format: Option<InputFormat>,
    },

    /// List ancestor-collision inbreeding counts, highest first
    Inbreeding {
        /// Population file
        input: String,

        /// Number of rows to print (all when omitted)
        #[arg(long)]
        top: Option<usize>,

        #[arg(long, value_enum)]
        input_format: Option<InputFormat>,
    },

    /// Check a population for self-parentage, cycles and dangling parents
    Validate {
        /// Population file
        input: String,

        #[arg(long, value_enum)]
        input_format: Option<InputFormat>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Dot,
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    Csv,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Query {
            input,
            root,
            mode,
            max_ancestor_depth,
            max_descendant_depth,
            format,
            input_format,
        } => {
            let mode: TraversalMode = mode.parse()?;
            let options = QueryOptions::new()
                .mode(mode)
                .max_ancestor_depth(max_ancestor_depth)
                .max_descendant_depth(max_descendant_depth);
            cmd_query(&input, input_format, root, &options, format)
        }
        Commands::Inbreeding {
            input,
            top,
            input_format,
        } => cmd_inbreeding(&input, input_format, top),
        Commands::Validate {
            input,
            input_format,
        } => cmd_validate(&input, input_format),
    }
}

fn load_population(path: &str, format: Option<InputFormat>) -> Result<Population> {
    let pop = match format {
        Some(InputFormat::Csv) => Population::from_csv(path),
        Some(InputFormat::Json) => Population::from_api_json_path(path),
        None => Population::from_path(Path::new(path)),
    }
    .with_context(|| format!("Failed to load population from '{}'", path))?;

    eprintln!("Loaded {} individuals from '{}'", pop.len(), path);
    Ok(pop)
}

fn cmd_query(
    path: &str,
    input_format: Option<InputFormat>,
    root: IndividualId,
    options: &QueryOptions,
    output_format: OutputFormat,
) -> Result<()> {
    let pop = load_population(path, input_format)?;

    let session = PedigreeSession::new(&pop).context("Failed to prepare pedigree session")?;
    let dag = session
        .query(root, options)
        .with_context(|| format!("Pedigree query for #{} failed", root))?;

    match output_format {
        OutputFormat::Text => print!("{}", dag.summary()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&dag)?),
        OutputFormat::Dot => print!("{}", dag.to_dot(session.coefficients())),
    }

    Ok(())
}

fn cmd_inbreeding(
    path: &str,
    input_format: Option<InputFormat>,
    top: Option<usize>,
) -> Result<()> {
    let pop = load_population(path, input_format)?;
    let table = compute_coefficients(&pop).context("Failed to compute inbreeding counts")?;

    let ranked = table.ranked();
    let show = top.unwrap_or(ranked.len()).min(ranked.len());

    println!("{:>10}  {:>10}  {:>8}", "id", "count", "scaled");
    for (id, count) in ranked.iter().take(show) {
        println!("{:>10}  {:>10}  {:>8.4}", id, count, table.normalized(*id));
    }
    if ranked.len() > show {
        println!("... and {} more", ranked.len() - show);
    }

    Ok(())
}

fn cmd_validate(path: &str, input_format: Option<InputFormat>) -> Result<()> {
    let pop = load_population(path, input_format)?;

    let dangling = pop.dangling_parents();
    for (child, parent) in &dangling {
        println!("warning: #{} references missing parent #{}", child, parent);
    }

    let founders = pop.iter().filter(|ind| ind.is_founder()).count();
    println!(
        "{} individuals, {} founders, {} dangling parent links",
        pop.len(),
        founders,
        dangling.len()
    );

    pop.validate().context("Pedigree is inconsistent")?;
    println!("Pedigree OK");
    Ok(())
}
