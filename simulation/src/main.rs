//! ChargeMesh simulator
//!
//! Runs an in-process charging mesh, or evaluates a single election.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use chargemesh_arbitration::{ChargerToken, MatchRule, OccupancyList, charge_queue_payload, elect};
use chargemesh_logging::{ChargeMeshSubscriberBuilder, FileConfig, LogConfig};
use chargemesh_node::NodeConfig;
use chargemesh_simulation::{MeshTree, SimConfig, scenarios};

#[derive(Parser)]
#[command(
    name = "chargemesh-sim",
    about = "Charging slot arbitration over a simulated mesh",
    version
)]
struct Cli {
    /// Enable verbose, human-readable logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write JSONL logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum RuleArg {
    LeadingChar,
    Substring,
    Exact,
}

impl From<RuleArg> for MatchRule {
    fn from(rule: RuleArg) -> Self {
        match rule {
            RuleArg::LeadingChar => MatchRule::LeadingChar,
            RuleArg::Substring => MatchRule::Substring,
            RuleArg::Exact => MatchRule::Exact,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a mesh for a while and print each node's final state
    Run {
        /// Number of nodes
        #[arg(short, long, default_value = "5")]
        nodes: usize,

        /// Children per node, `mesh.ap_connections` when omitted
        #[arg(short, long)]
        fanout: Option<usize>,

        /// Run time in seconds
        #[arg(short, long, default_value = "10")]
        seconds: u64,

        /// Fixed occupancy list; random when omitted
        #[arg(short, long)]
        occupancy: Option<String>,

        /// Chance of a button press per node per round
        #[arg(short, long, default_value = "0.1")]
        button_probability: f64,

        /// Seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Node configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Token match rule, overrides the configuration file
        #[arg(short, long, value_enum)]
        rule: Option<RuleArg>,
    },

    /// Evaluate one election without running a mesh
    Elect {
        /// Comma-delimited occupancy list
        list: String,

        /// Own token, or a dotted address to take it from
        token: String,

        #[arg(short, long, value_enum, default_value = "leading-char")]
        rule: RuleArg,
    },

    /// Print the tree layout the simulator would build
    Topology {
        #[arg(short, long, default_value = "5")]
        nodes: usize,

        #[arg(short, long, default_value = "3")]
        fanout: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut log_config = if cli.verbose {
        LogConfig::development()
    } else {
        LogConfig {
            console: chargemesh_logging::ConsoleConfig {
                enabled: true,
                pretty: true,
                ansi: true,
            },
            ..LogConfig::default()
        }
    };
    if let Some(dir) = cli.log_dir {
        log_config.file = Some(FileConfig {
            directory: dir,
            ..FileConfig::default()
        });
    }
    let _log_guard = ChargeMeshSubscriberBuilder::new()
        .with_config(log_config)
        .init()?;

    match cli.command {
        Commands::Run {
            nodes,
            fanout,
            seconds,
            occupancy,
            button_probability,
            seed,
            config,
            rule,
        } => {
            let mut node = match config {
                Some(path) => NodeConfig::from_file(path)?,
                None => NodeConfig::default(),
            };
            if let Some(rule) = rule {
                node = node.with_match_rule(rule.into());
            }

            let report = scenarios::run(SimConfig {
                nodes,
                fanout,
                duration: Duration::from_secs(seconds),
                occupancy,
                button_probability,
                seed,
                node,
                ..SimConfig::default()
            })
            .await?;

            println!("{}", report);
            if !report.routes_converged() {
                println!("warning: some nodes never received a route table");
            }
        }
        Commands::Elect { list, token, rule } => {
            let list = OccupancyList::parse(&list);
            let token = ChargerToken::from_address_str(&token);
            let state = elect(&list, &token, rule.into());

            println!("state:   {}", state);
            println!("chargeQ: {}", charge_queue_payload(&token, state));
        }
        Commands::Topology { nodes, fanout } => {
            print!("{}", MeshTree::new(nodes, fanout).visualize());
        }
    }

    Ok(())
}
