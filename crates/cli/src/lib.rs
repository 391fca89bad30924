pub mod commands;
pub mod ingest;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use basketgraph_core::config::parse_delimiter;
use basketgraph_core::{AnalysisConfig, ConfigOverrides, DuplicateItems, LoadOptions, LogFormat};
use clap::{Parser, Subcommand};

use commands::{CommandResult, Workspace, EXIT_CONFIG};

#[derive(Debug, Parser)]
#[command(
    name = "basketgraph",
    about = "Market basket analysis over a co-occurrence graph",
    long_about = "Build an item co-occurrence graph from a transaction file, then traverse it, \
                  mine frequent itemsets and association rules, or recommend items.",
    after_help = "Examples:\n  basketgraph --input baskets.csv info\n  \
                  basketgraph --input baskets.csv rules --min-support 0.05\n  \
                  basketgraph --input baskets.csv basket Bread Milk"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Transaction file, one basket per line")]
    input: Option<PathBuf>,
    #[arg(long, global = true, help = "Config file (defaults to basketgraph.toml when present)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_parser = delimiter_arg, help = "Item delimiter, or `tab`")]
    delimiter: Option<char>,
    #[arg(long, global = true, help = "Repeated items in a basket: count|collapse")]
    duplicates: Option<DuplicateItems>,
    #[arg(long, global = true, help = "Log level written to stderr")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Log format: compact|pretty|json")]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Node, edge and degree summary of the co-occurrence graph")]
    Info,
    #[command(about = "Transaction counts, sizes and most common items")]
    Stats,
    #[command(about = "Breadth-first visit order from an item")]
    Bfs {
        item: String,
        #[arg(long)]
        max_depth: Option<usize>,
    },
    #[command(about = "Depth-first visit order from an item")]
    Dfs {
        item: String,
        #[arg(long)]
        max_depth: Option<usize>,
    },
    #[command(about = "Shortest co-purchase path between two items")]
    Path { from: String, to: String },
    #[command(about = "Connected groups of items")]
    Components,
    #[command(about = "Items within a number of hops of an item")]
    Neighborhood {
        item: String,
        #[arg(long, default_value_t = 1)]
        distance: usize,
    },
    #[command(about = "Local clustering coefficient of an item")]
    Clustering { item: String },
    #[command(about = "Frequent itemsets of every size up to --max-k")]
    Itemsets {
        #[arg(long)]
        min_support: Option<f64>,
        #[arg(long)]
        max_k: Option<usize>,
    },
    #[command(about = "Frequent item pairs by co-occurrence count")]
    Pairs {
        #[arg(long)]
        min_support: Option<f64>,
        #[arg(long, help = "Only the N most frequent pairs")]
        top: Option<usize>,
    },
    #[command(about = "Association rules from frequent pairs")]
    Rules {
        #[arg(long)]
        min_support: Option<f64>,
        #[arg(long)]
        min_confidence: Option<f64>,
    },
    #[command(about = "Items most often bought with an item")]
    Recommend {
        item: String,
        #[arg(long, value_delimiter = ',', help = "Items to leave out of the results")]
        exclude: Vec<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    #[command(about = "Items to add to a basket")]
    Basket {
        #[arg(required = true, num_args = 1..)]
        items: Vec<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    #[command(about = "Candidate product bundles")]
    Bundles {
        #[arg(long)]
        min_size: Option<usize>,
        #[arg(long)]
        max_size: Option<usize>,
        #[arg(long)]
        top: Option<usize>,
    },
    #[command(about = "Items with the most similar co-purchase neighbors")]
    Similar {
        item: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Stats => "stats",
            Self::Bfs { .. } => "bfs",
            Self::Dfs { .. } => "dfs",
            Self::Path { .. } => "path",
            Self::Components => "components",
            Self::Neighborhood { .. } => "neighborhood",
            Self::Clustering { .. } => "clustering",
            Self::Itemsets { .. } => "itemsets",
            Self::Pairs { .. } => "pairs",
            Self::Rules { .. } => "rules",
            Self::Recommend { .. } => "recommend",
            Self::Basket { .. } => "basket",
            Self::Bundles { .. } => "bundles",
            Self::Similar { .. } => "similar",
            Self::Config => "config",
        }
    }
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                delimiter: self.delimiter,
                duplicate_items: self.duplicates,
                log_level: self.log_level.clone(),
                log_format: self.log_format,
                ..ConfigOverrides::default()
            },
        }
    }
}

fn delimiter_arg(value: &str) -> Result<char, String> {
    parse_delimiter("--delimiter", value).map_err(|error| error.to_string())
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let result = execute(cli);

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Loads configuration and input, then runs the selected command.
pub fn execute(cli: Cli) -> CommandResult {
    let name = cli.command.name();
    let options = cli.load_options();
    let overrides = options.overrides.clone();
    let config = match AnalysisConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(name, error.error_class(), error.to_string(), EXIT_CONFIG)
        }
    };
    logging::init_logging(&config.logging);

    if let Command::Config = cli.command {
        return commands::config::run(&config, &overrides, cli.config.as_deref());
    }

    match Workspace::load(cli.input.as_deref(), config) {
        Ok(workspace) => dispatch(&workspace, cli.command),
        Err(error) => CommandResult::from_ingest_error(name, &error),
    }
}

fn dispatch(workspace: &Workspace, command: Command) -> CommandResult {
    let defaults = &workspace.config;
    match command {
        Command::Info => commands::graph::info(workspace),
        Command::Stats => commands::graph::stats(workspace),
        Command::Bfs { item, max_depth } => commands::graph::bfs(workspace, &item, max_depth),
        Command::Dfs { item, max_depth } => commands::graph::dfs(workspace, &item, max_depth),
        Command::Path { from, to } => commands::graph::path(workspace, &from, &to),
        Command::Components => commands::graph::components(workspace),
        Command::Neighborhood { item, distance } => {
            commands::graph::neighborhood(workspace, &item, distance)
        }
        Command::Clustering { item } => commands::graph::clustering(workspace, &item),
        Command::Itemsets { min_support, max_k } => commands::mine::itemsets(
            workspace,
            min_support.unwrap_or(defaults.mining.min_support),
            max_k.unwrap_or(defaults.mining.max_k),
        ),
        Command::Pairs { min_support, top } => commands::mine::pairs(
            workspace,
            min_support.unwrap_or(defaults.mining.min_support),
            top,
        ),
        Command::Rules { min_support, min_confidence } => commands::mine::rules(
            workspace,
            min_support.unwrap_or(defaults.mining.min_support),
            min_confidence.unwrap_or(defaults.mining.min_confidence),
        ),
        Command::Recommend { item, exclude, limit } => commands::recommend::item(
            workspace,
            &item,
            &exclude,
            limit.unwrap_or(defaults.recommend.limit),
        ),
        Command::Basket { items, limit } => commands::recommend::basket(
            workspace,
            &items,
            limit.unwrap_or(defaults.recommend.limit),
        ),
        Command::Bundles { min_size, max_size, top } => commands::recommend::bundles(
            workspace,
            min_size.unwrap_or(defaults.recommend.bundle_min_size),
            max_size.unwrap_or(defaults.recommend.bundle_max_size),
            top.unwrap_or(defaults.recommend.bundle_top_n),
        ),
        Command::Similar { item, limit } => {
            let limit = limit.unwrap_or(defaults.recommend.limit);
            commands::recommend::similar(workspace, &item, limit)
        }
        Command::Config => CommandResult::failure(
            "config",
            "unsupported_dispatch",
            "config is handled before input is loaded",
            1,
        ),
    }
}
