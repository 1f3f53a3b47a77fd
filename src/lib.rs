//! # racegraph: Interleaving state spaces for data race prediction
//!
//! **`racegraph`** builds the state spaces a data race detector explores for
//! OpenMP-style parallel programs.
//! Every thread is summarized by a [`BehaviorModel`][crate::operation::BehaviorModel]:
//! the ordered list of its reads, writes, lock acquisitions and lock releases.
//!
//! ## What is a scheduling graph?
//!
//! Given models with `n₁, …, nₖ` operations, a [`SchedulingGraph`][crate::scheduling::SchedulingGraph]
//! holds one state per progress vector `(p₁, …, pₖ)` with `0 ≤ pᵢ ≤ nᵢ`, and one edge per
//! single-thread step between them. Each root-to-leaf path is one interleaving that keeps the
//! program order of every thread. States are **hash-consed**: the diamonds formed by independent
//! steps meet in a single shared state.
//!
//! ## Key Features
//!
//! - **Composition**: graphs of consecutive regions are chained with
//!   [`sequential_compose`][crate::scheduling::SchedulingGraph::sequential_compose],
//!   graphs of concurrent regions are interleaved with
//!   [`parallel_compose`][crate::scheduling::SchedulingGraph::parallel_compose].
//! - **Scoped identities**: every build gets a fresh [`ScopeId`][crate::types::ScopeId], so graphs built
//!   from the same models never collide when composed.
//! - **Size guard**: the state count is checked *before* any allocation, see
//!   [`SchedulerConfig`][crate::config::SchedulerConfig].
//! - **Task graphs**: regions, their typed edges, and the per-node results live in a
//!   [`TaskGraph`][crate::task_graph::TaskGraph]; a [`Predictor`][crate::predict::Predictor] walks it.
//!
//! ## Basic Usage
//!
//! ```rust
//! use racegraph::config::SchedulerConfig;
//! use racegraph::operation::BehaviorModel;
//! use racegraph::scheduling::create_scheduling_graph;
//! use racegraph::types::ThreadId;
//!
//! // Thread 0 writes `v` twice, thread 1 reads it once.
//! let t0 = BehaviorModel::new(ThreadId::new(0)).write("v").write("v");
//! let t1 = BehaviorModel::new(ThreadId::new(1)).read("v");
//!
//! let (graph, dims) = create_scheduling_graph(&[t0, t1], &SchedulerConfig::default()).unwrap();
//! assert_eq!(dims, vec![2, 1]);
//!
//! // (2+1) * (1+1) states, one leaf, three interleavings.
//! assert_eq!(graph.len(), 6);
//! assert_eq!(graph.leaves().len(), 1);
//! assert_eq!(graph.interleavings().count(), 3);
//! ```
//!
//! ## Core Components
//!
//! - **[`scheduling`]**: the lattice builder and both compositions.
//! - **[`composition`]**: composition trees and their unpacking into one graph.
//! - **[`task_graph`]**: regions, typed edges and behavior-model gathering.
//! - **[`predict`]**: the per-node dispatcher.
//! - **[`detector`]**: the seams to the normalizer and the race detector.

pub mod composition;
pub mod config;
pub mod count;
pub mod detector;
pub mod error;
pub mod operation;
pub mod paths;
pub mod pragma;
pub mod predict;
pub mod progress;
pub mod reference;
pub mod result;
pub mod scheduling;
pub mod table;
pub mod task_graph;
pub mod types;
pub mod utils;
