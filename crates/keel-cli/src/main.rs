//! `keel` — inspect and plan weighted bounded-load partition placement.
//!
//! # Usage
//!
//! ```text
//! keel -c keel.toml show                        # members, weights, loads
//! keel -m a=2 -m b -m c show                   # ad-hoc members, no config file
//! keel -c keel.toml locate user:1 user:2       # partition and owner per key
//! keel -c keel.toml closest user:1 -n 3        # owner plus two replicas
//! keel -c keel.toml rebalance --add d=2 --remove b   # migration plan
//! ```

mod config;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keel_placement::{Blake3Hasher, Member, Migration, Node, PartitionMap, WeightedRing};
use tracing::{debug, info};

use config::{CliConfig, parse_member};

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "keel",
    version,
    about = "Weighted consistent hashing with bounded loads"
)]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Extra member as `id` or `id=weight`. Can be specified multiple times.
    #[arg(short, long, global = true)]
    member: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show members, weights, vnodes and partition loads.
    Show,

    /// Print the partition and owner of each key.
    Locate {
        /// Keys to locate.
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Print the owner of a key followed by its closest replicas.
    Closest {
        /// Key to locate.
        key: String,

        /// Number of members to return, owner included.
        #[arg(short = 'n', long, default_value = "3")]
        count: usize,
    },

    /// Apply membership changes and print which partitions move.
    Rebalance {
        /// Member to add as `id` or `id=weight`.
        #[arg(long)]
        add: Vec<String>,

        /// Identity of a member to remove.
        #[arg(long)]
        remove: Vec<String>,
    },
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    setup_tracing(&config.log.level);

    for arg in &cli.member {
        config.members.push(parse_member(arg)?);
    }

    let ring = build_ring(&config)?;

    match cli.command {
        Commands::Show => cmd_show(&ring),
        Commands::Locate { keys } => cmd_locate(&ring, &keys),
        Commands::Closest { key, count } => cmd_closest(&ring, &key, count),
        Commands::Rebalance { add, remove } => cmd_rebalance(&ring, &add, &remove),
    }
}

/// Initialize the `tracing` subscriber with the given level filter.
///
/// Respects `RUST_LOG` env var if set, otherwise uses the config value.
fn setup_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_ring(config: &CliConfig) -> Result<WeightedRing<Node>> {
    debug!(members = config.members.len(), "building ring");
    WeightedRing::new(config.members.iter().cloned(), config.placement, Blake3Hasher)
        .context("failed to build ring")
}

// -----------------------------------------------------------------------
// keel show
// -----------------------------------------------------------------------

fn cmd_show(ring: &WeightedRing<Node>) -> Result<()> {
    let cfg = ring.config();
    println!(
        "partitions={} replication_factor={} load={}",
        cfg.partition_count, cfg.replication_factor, cfg.load
    );
    println!(
        "members={} total_weight={} vnodes={} average_load={}",
        ring.member_count(),
        ring.total_weight(),
        ring.vnode_count(),
        ring.average_load()
    );
    print_loads(ring);
    Ok(())
}

fn print_loads(ring: &WeightedRing<Node>) {
    if ring.member_count() == 0 {
        println!("(no members)");
        return;
    }

    let weights: BTreeMap<String, u64> = ring.weight_distribution().into_iter().collect();
    let loads = ring.load_distribution();
    let avg = ring.average_load();
    let partitions = ring.partition_count() as f64;

    println!();
    println!(
        "{:<24} {:>6} {:>7} {:>6} {:>6} {:>7}",
        "member", "weight", "vnodes", "load", "cap", "share"
    );
    for (id, weight) in &weights {
        let load = loads.get(id).copied().unwrap_or(0.0);
        let cap = (avg * *weight as f64).ceil();
        println!(
            "{:<24} {:>6} {:>7} {:>6} {:>6} {:>6.1}%",
            id,
            weight,
            ring.vnodes_of(id),
            load,
            cap,
            load / partitions * 100.0
        );
    }
}

// -----------------------------------------------------------------------
// keel locate / closest
// -----------------------------------------------------------------------

fn cmd_locate(ring: &WeightedRing<Node>, keys: &[String]) -> Result<()> {
    for key in keys {
        let partition = ring.find_partition_id(key.as_bytes());
        match ring.partition_owner(partition) {
            Some(owner) => println!("{key}\tpartition={partition}\towner={}", owner.identity()),
            None => println!("{key}\tpartition={partition}\towner=-"),
        }
    }
    Ok(())
}

fn cmd_closest(ring: &WeightedRing<Node>, key: &str, count: usize) -> Result<()> {
    let members = ring
        .closest_n(key.as_bytes(), count)
        .with_context(|| format!("cannot pick {count} members for {key:?}"))?;
    for (rank, member) in members.iter().enumerate() {
        let role = if rank == 0 { "owner" } else { "replica" };
        println!("{rank}\t{role}\t{member}");
    }
    Ok(())
}

// -----------------------------------------------------------------------
// keel rebalance
// -----------------------------------------------------------------------

/// Outcome of applying membership changes to a ring.
struct RebalancePlan {
    /// Identities asked for removal that were not members.
    skipped: Vec<String>,
    /// Partitions whose owner changed.
    migrations: Vec<Migration>,
    /// Migration count per `(from, to)` pair; `-` stands for "no owner".
    flows: BTreeMap<(String, String), usize>,
    /// Share of partitions that moved.
    moved_fraction: f64,
    /// Partition count of the ring.
    partition_count: u64,
}

/// Apply removals, then additions, and diff the partition tables.
fn plan_rebalance(
    ring: &WeightedRing<Node>,
    add: &[String],
    remove: &[String],
) -> Result<RebalancePlan> {
    let before = ring.snapshot();

    let mut skipped = Vec::new();
    for id in remove {
        if !ring.contains(id) {
            skipped.push(id.clone());
            continue;
        }
        ring.remove(id).with_context(|| format!("failed to remove {id}"))?;
    }
    for arg in add {
        let member = parse_member(arg)?;
        let id = member.id.clone();
        ring.add(member).with_context(|| format!("failed to add {id}"))?;
    }

    let after = ring.snapshot();
    let migrations = PartitionMap::diff(&before, &after);
    info!(moved = migrations.len(), "computed migration plan");

    let mut flows: BTreeMap<(String, String), usize> = BTreeMap::new();
    for m in &migrations {
        let from = m.from.clone().unwrap_or_else(|| "-".to_string());
        let to = m.to.clone().unwrap_or_else(|| "-".to_string());
        *flows.entry((from, to)).or_insert(0) += 1;
    }

    Ok(RebalancePlan {
        skipped,
        migrations,
        flows,
        moved_fraction: PartitionMap::moved_fraction(&before, &after),
        partition_count: after.partition_count(),
    })
}

fn cmd_rebalance(ring: &WeightedRing<Node>, add: &[String], remove: &[String]) -> Result<()> {
    let plan = plan_rebalance(ring, add, remove)?;

    for id in &plan.skipped {
        println!("note: {id} is not a member, skipping");
    }
    println!(
        "{} of {} partitions move ({:.1}%)",
        plan.migrations.len(),
        plan.partition_count,
        plan.moved_fraction * 100.0
    );
    for ((from, to), count) in &plan.flows {
        println!("  {from} -> {to}: {count}");
    }
    print_loads(ring);
    Ok(())
}
