//! Host-facing entry points: a static layout run to convergence, and an animated layout advanced
//! one step per host tick.

use crate::error::{Error, Result};
use crate::forces::EdgeSpan;
use crate::geometry::{Point, Vector};
use crate::graph::{Graph, Identifier, Viewport};
use crate::placement::RandomFillerPlacement;
use crate::random::{RandomSource, XorShift64Star};
use crate::simulation::{SimulationIteration, SimulationParameters};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxBuildHasher, FxHashSet};
use serde::{Deserialize, Serialize};

/// Node coordinates in `Graph::node_ids()` order.
pub type CoordinateMap<Id> = IndexMap<Id, Point, FxBuildHasher>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutOptions {
    pub simulation: SimulationParameters,
    pub max_iterations: usize,
    /// The run stops once no node moves farther than this in a single step.
    pub convergence_delta: f64,
    /// `dt` of every static step.
    pub time_step: f64,
    pub sparsity: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            simulation: SimulationParameters::default(),
            max_iterations: 1000,
            convergence_delta: 0.1,
            time_step: 1.0,
            sparsity: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnimatedLayoutOptions {
    pub simulation: SimulationParameters,
    /// Frames with a larger `dt` are skipped.
    pub max_time_delta_sec: f64,
    /// The layout is settled once no node is faster than this.
    pub convergence_velocity: f64,
    /// Nodes that travel less than this in a frame are left out of the frame's result.
    pub movement_threshold: f64,
    pub sparsity: f64,
}

impl Default for AnimatedLayoutOptions {
    fn default() -> Self {
        Self {
            simulation: SimulationParameters::default(),
            max_time_delta_sec: 0.5,
            convergence_velocity: 0.05,
            movement_threshold: 1e-3,
            sparsity: 100.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayoutResult<Id: Identifier> {
    pub positions: CoordinateMap<Id>,
    pub iterations: usize,
    /// `false` when the iteration budget ran out first.
    pub converged: bool,
}

/// Per-call snapshot of the graph: node order, known coordinates and resolved edges.
struct Frame<Id> {
    ids: IndexSet<Id, FxBuildHasher>,
    seeds: Vec<Option<Point>>,
    edges: Vec<EdgeSpan>,
}

impl<Id: Identifier> Frame<Id> {
    fn capture<G>(graph: &G) -> Result<Self>
    where
        G: Graph<NodeId = Id>,
    {
        let node_ids = graph.node_ids();
        let mut ids: IndexSet<Id, FxBuildHasher> =
            IndexSet::with_capacity_and_hasher(node_ids.len(), FxBuildHasher);
        let mut seeds: Vec<Option<Point>> = Vec::with_capacity(node_ids.len());
        for id in node_ids {
            let seed = graph
                .node(&id)
                .and_then(|p| p.point())
                .filter(|p| p.is_finite());
            if ids.insert(id) {
                seeds.push(seed);
            }
        }

        let edge_ids = graph.edge_ids();
        let mut edges: Vec<EdgeSpan> = Vec::with_capacity(edge_ids.len());
        for edge_id in edge_ids {
            let Some(ends) = graph.edge(&edge_id) else {
                return Err(Error::MissingEdge {
                    edge_id: format!("{edge_id:?}"),
                });
            };
            let source = Self::resolve_port(graph, &ids, &edge_id, &ends.from)?;
            let target = Self::resolve_port(graph, &ids, &edge_id, &ends.to)?;
            edges.push(EdgeSpan { source, target });
        }

        Ok(Self { ids, seeds, edges })
    }

    fn resolve_port<G>(
        graph: &G,
        ids: &IndexSet<Id, FxBuildHasher>,
        edge_id: &G::EdgeId,
        port_id: &G::PortId,
    ) -> Result<usize>
    where
        G: Graph<NodeId = Id>,
    {
        let Some(node_id) = graph.port(port_id) else {
            return Err(Error::MissingPort {
                edge_id: format!("{edge_id:?}"),
                port_id: format!("{port_id:?}"),
            });
        };
        ids.get_index_of(&node_id).ok_or_else(|| Error::MissingNode {
            port_id: format!("{port_id:?}"),
            node_id: format!("{node_id:?}"),
        })
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn all_positioned(&self) -> bool {
        self.seeds.iter().all(Option::is_some)
    }
}

/// Runs the simulation until it converges or the iteration budget is spent.
#[derive(Debug, Clone)]
pub struct LayoutAlgorithm<R = XorShift64Star> {
    options: LayoutOptions,
    rng: R,
}

impl LayoutAlgorithm<XorShift64Star> {
    pub fn with_seed(options: LayoutOptions, seed: u64) -> Self {
        Self::new(options, XorShift64Star::new(seed))
    }
}

impl<R: RandomSource> LayoutAlgorithm<R> {
    pub fn new(options: LayoutOptions, rng: R) -> Self {
        Self { options, rng }
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// The random source, advanced by every call.
    pub fn rng(&self) -> &R {
        &self.rng
    }

    pub fn into_rng(self) -> R {
        self.rng
    }

    /// Computes final coordinates for every node of `graph`.
    pub fn calculate_coordinates<G: Graph>(
        &mut self,
        graph: &G,
        viewport: &dyn Viewport,
    ) -> Result<LayoutResult<G::NodeId>> {
        let start = std::time::Instant::now();
        let frame = Frame::capture(graph)?;
        let _span = tracing::debug_span!(
            "narwhal.layout",
            nodes = frame.len(),
            edges = frame.edges.len()
        )
        .entered();

        let opts = &self.options;
        let mut positions = RandomFillerPlacement::new(opts.sparsity).place(
            &frame.seeds,
            viewport,
            &mut self.rng,
        );
        let mut forces = vec![Vector::zeros(); positions.len()];
        let iteration = SimulationIteration::new(&opts.simulation);

        let mut iterations = 0usize;
        let mut converged = false;
        while iterations < opts.max_iterations {
            let report = iteration.step(
                &mut positions,
                &mut forces,
                &frame.edges,
                &[],
                opts.time_step,
                &mut self.rng,
            );
            iterations += 1;
            tracing::trace!(
                iteration = iterations,
                max_displacement = report.max_displacement,
                max_velocity = report.max_velocity
            );
            if report.max_displacement < opts.convergence_delta {
                converged = true;
                break;
            }
        }

        if converged {
            tracing::debug!(
                iterations,
                strategy = iteration.strategy().name(),
                elapsed = ?start.elapsed(),
                "layout converged"
            );
        } else {
            tracing::debug!(
                iterations,
                strategy = iteration.strategy().name(),
                elapsed = ?start.elapsed(),
                "layout stopped at the iteration limit"
            );
        }

        let positions = frame.ids.into_iter().zip(positions).collect();
        Ok(LayoutResult {
            positions,
            iterations,
            converged,
        })
    }
}

/// Advances the simulation by one step per host tick.
///
/// Pinned nodes (for example a node being dragged) keep their coordinates but still repel and
/// pull the others.
#[derive(Debug, Clone)]
pub struct AnimatedLayoutAlgorithm<Id: Identifier, R = XorShift64Star> {
    options: AnimatedLayoutOptions,
    rng: R,
    pinned: FxHashSet<Id>,
    settled: bool,
}

impl<Id: Identifier> AnimatedLayoutAlgorithm<Id, XorShift64Star> {
    pub fn with_seed(options: AnimatedLayoutOptions, seed: u64) -> Self {
        Self::new(options, XorShift64Star::new(seed))
    }
}

impl<Id: Identifier, R: RandomSource> AnimatedLayoutAlgorithm<Id, R> {
    pub fn new(options: AnimatedLayoutOptions, rng: R) -> Self {
        Self {
            options,
            rng,
            pinned: FxHashSet::default(),
            settled: false,
        }
    }

    pub fn options(&self) -> &AnimatedLayoutOptions {
        &self.options
    }

    pub fn pin(&mut self, id: Id) -> bool {
        self.settled = false;
        self.pinned.insert(id)
    }

    pub fn unpin(&mut self, id: &Id) -> bool {
        self.settled = false;
        self.pinned.remove(id)
    }

    pub fn clear_pinned(&mut self) {
        self.settled = false;
        self.pinned.clear();
    }

    pub fn is_pinned(&self, id: &Id) -> bool {
        self.pinned.contains(id)
    }

    /// Whether the last processed frame found the layout at rest.
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Runs one step of length `dt` seconds and returns the nodes that moved.
    ///
    /// An empty map means either that `dt` exceeded `max_time_delta_sec` (the frame was skipped)
    /// or that the layout has settled; [`Self::is_settled`] tells the two apart. Nodes that had no
    /// coordinates are always part of the result.
    pub fn calculate_next_coordinates<G>(
        &mut self,
        graph: &G,
        dt: f64,
        viewport: &dyn Viewport,
    ) -> Result<CoordinateMap<Id>>
    where
        G: Graph<NodeId = Id>,
    {
        let opts = &self.options;
        if dt.is_nan() || dt > opts.max_time_delta_sec {
            tracing::debug!(dt, max = opts.max_time_delta_sec, "skipping frame");
            self.settled = false;
            return Ok(CoordinateMap::default());
        }
        let dt = dt.max(0.0);

        let frame = Frame::capture(graph)?;
        let _span = tracing::debug_span!(
            "narwhal.animate",
            nodes = frame.len(),
            edges = frame.edges.len(),
            dt
        )
        .entered();

        let all_positioned = frame.all_positioned();
        let mut positions = RandomFillerPlacement::new(opts.sparsity).place(
            &frame.seeds,
            viewport,
            &mut self.rng,
        );
        let pinned: Vec<bool> = frame
            .ids
            .iter()
            .map(|id| self.pinned.contains(id))
            .collect();
        let mut forces = vec![Vector::zeros(); positions.len()];
        let report = SimulationIteration::new(&opts.simulation).step(
            &mut positions,
            &mut forces,
            &frame.edges,
            &pinned,
            dt,
            &mut self.rng,
        );
        tracing::trace!(
            max_displacement = report.max_displacement,
            max_velocity = report.max_velocity
        );

        if all_positioned && report.max_velocity < opts.convergence_velocity {
            tracing::debug!(max_velocity = report.max_velocity, "layout settled");
            self.settled = true;
            return Ok(CoordinateMap::default());
        }
        self.settled = false;

        let mut moved = CoordinateMap::default();
        for (idx, id) in frame.ids.into_iter().enumerate() {
            let seeded = frame.seeds[idx].is_none();
            if seeded || report.displacements[idx] > opts.movement_threshold {
                moved.insert(id, positions[idx]);
            }
        }
        Ok(moved)
    }
}
