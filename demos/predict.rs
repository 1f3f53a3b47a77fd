//! Race prediction for a small parallel region.
//!
//! Builds the task graph of
//!
//! ```c
//! #pragma omp parallel
//! {
//!     #pragma omp for      // every thread: [lock] counter++ [unlock]
//!     #pragma omp for      // every thread: reads counter, writes its own slot
//!     #pragma omp barrier
//! }
//! ```
//!
//! and walks it with a lockset detector.
//!
//! **Usage**:
//! ```bash
//! cargo run --example predict -- --threads 3
//! cargo run --example predict -- --threads 2 --locked --show
//! cargo run --example predict -- --threads 8 --max-states 1000
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use log::info;

use racegraph::config::SchedulerConfig;
use racegraph::detector::Identity;
use racegraph::operation::{BehaviorModel, Operation, OperationKind};
use racegraph::pragma::{Region, SourceSpan};
use racegraph::predict::{composition_tree, Predictor};
use racegraph::result::{DataRace, NodeResult, State};
use racegraph::scheduling::SchedulingGraph;
use racegraph::task_graph::{EdgeKind, TaskGraph};
use racegraph::types::{ScopeId, TaskNodeId, ThreadId};

#[derive(Debug, Parser)]
#[command(name = "Race predictor")]
#[command(about = "Predict data races in a parallel region by exploring its interleavings", long_about = None)]
struct Cli {
    /// Number of threads in the region
    #[arg(short, long, default_value = "2")]
    threads: u32,

    /// Protect the counter update with a lock
    #[arg(long)]
    locked: bool,

    /// Upper bound on the states of one scheduling graph
    #[arg(long, default_value = "1048576")]
    max_states: usize,

    /// Print every interleaving of the region
    #[arg(short, long)]
    show: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    simplelog::TermLogger::init(
        if args.verbose {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let config = SchedulerConfig::default().with_max_states(args.max_states);
    let (mut graph, region) = build_task_graph(args.threads, args.locked)?;
    println!("=== Parallel region with {} threads ===\n", args.threads);

    if let Some(tree) = composition_tree(&graph, region)? {
        println!("Composition: {}", tree);
        let unpacked = tree.unpack(ScopeId::fresh(), &Identity, &config)?;
        println!("States:       {}", unpacked.len());
        println!("Edges:        {}", unpacked.edge_count());
        println!("Dimensions:   {:?}", unpacked.dimensions());
        println!("Interleavings: {}", unpacked.count_interleavings());
        if args.show {
            println!("\n─── Interleavings ───\n");
            for (i, path) in unpacked.interleavings().enumerate() {
                let ops: Vec<String> = path.iter().map(|op| op.to_string()).collect();
                println!("{:>4}: {}", i + 1, ops.join(" "));
            }
        }
        println!();
    }

    let time = Instant::now();
    let predictor = Predictor::new(lockset).with_config(config);
    let summary = predictor.compute_all(&mut graph);
    info!("walk took {:.2}ms", time.elapsed().as_secs_f64() * 1000.0);

    println!("Results:");
    for id in &summary.computed {
        let node = graph.node(*id)?;
        println!("  {} ({}):", id, node.region());
        if node.result.data_races.is_empty() {
            println!("    no data races");
        }
        for race in &node.result.data_races {
            println!("    {}", race);
        }
        println!("    {} final states", node.result.states.len());
    }
    for (id, reason) in &summary.unsupported {
        println!("  {}: {}", id, reason);
    }
    for (id, err) in &summary.failed {
        println!("  {}: failed: {}", id, err);
    }
    println!();
    println!("Complete: {}", summary.is_complete());

    Ok(())
}

fn build_task_graph(threads: u32, locked: bool) -> racegraph::error::Result<(TaskGraph, TaskNodeId)> {
    let mut graph = TaskGraph::new();
    let region = graph.add_node(Region::parse("parallel", SourceSpan::new(1, 1, 12)));
    let update = graph.add_node(Region::parse("for", SourceSpan::new(1, 3, 5)));
    let publish = graph.add_node(Region::parse("for", SourceSpan::new(1, 7, 9)));
    let barrier = graph.add_node(Region::parse("barrier", SourceSpan::new(1, 10, 10)));

    graph.add_edge(graph.root(), region, EdgeKind::Contains)?;
    for child in [update, publish, barrier] {
        graph.add_edge(region, child, EdgeKind::Contains)?;
    }
    graph.add_edge(update, publish, EdgeKind::Sequential)?;
    graph.add_edge(publish, barrier, EdgeKind::Sequential)?;

    for t in 0..threads {
        let thread = ThreadId::new(t);
        let counter = if locked {
            BehaviorModel::new(thread)
                .acquire("m")
                .read("counter")
                .write("counter")
                .release("m")
        } else {
            BehaviorModel::new(thread).read("counter").write("counter")
        };
        graph.add_behavior_model(update, counter)?;
        graph.add_behavior_model(
            publish,
            BehaviorModel::new(thread).read("counter").write(format!("slot[{}]", t)),
        )?;
    }

    Ok((graph, region))
}

/// Conflicting accesses of different threads without a common lock.
fn lockset(graph: &SchedulingGraph, _: &[u32], _: &NodeResult) -> (Vec<DataRace>, Vec<State>) {
    let mut races: Vec<DataRace> = Vec::new();

    for path in graph.interleavings() {
        let mut held: HashMap<ThreadId, BTreeSet<Arc<str>>> = HashMap::new();
        let mut seen: Vec<(&Operation, BTreeSet<Arc<str>>)> = Vec::new();
        for op in path {
            let locks = held.entry(op.thread()).or_default();
            match op.kind() {
                OperationKind::LockAcquire => {
                    locks.insert(op.target().into());
                }
                OperationKind::LockRelease => {
                    locks.remove(op.target());
                }
                OperationKind::Read | OperationKind::Write => {
                    let locks = locks.clone();
                    for (prev, prev_locks) in &seen {
                        let conflict = prev.thread() != op.thread()
                            && prev.target() == op.target()
                            && (prev.kind() == OperationKind::Write || op.kind() == OperationKind::Write)
                            && prev_locks.is_disjoint(&locks);
                        let known = races
                            .iter()
                            .any(|r| (&r.first == *prev && &r.second == op) || (&r.first == op && &r.second == *prev));
                        if conflict && !known {
                            races.push(DataRace {
                                var: op.target().into(),
                                first: (*prev).clone(),
                                second: op.clone(),
                                state: None,
                            });
                        }
                    }
                    seen.push((op, locks));
                }
            }
        }
    }

    let states = graph
        .leaves()
        .into_iter()
        .map(|leaf| State {
            key: graph.key(leaf).clone(),
            held_locks: BTreeSet::new(),
        })
        .collect();
    (races, states)
}
