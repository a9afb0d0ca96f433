#![forbid(unsafe_code)]

//! Headless force-directed graph layout.
//!
//! Node positions are computed by simulating Coulomb-like repulsion between nodes and Hooke's-law
//! springs along edges. Repulsion is summed either exactly ([`DirectSum`]) or through a
//! Barnes-Hut quad-tree ([`BarnesHutApproximation`]); nodes without coordinates are seeded by
//! [`RandomFillerPlacement`].
//!
//! The engine reads a host-owned [`Graph`] and [`Viewport`] and never mutates them. All
//! randomness comes from an injected [`RandomSource`], so a fixed seed reproduces a layout.

pub mod error;
pub mod forces;
pub mod geometry;
pub mod graph;
pub mod layout;
pub mod placement;
pub mod quadtree;
pub mod random;
pub mod simulation;

pub use error::{Error, Result};
pub use forces::{
    BarnesHutApproximation, DirectSum, EdgeForceAccumulator, EdgeSpan, NodeForceStrategy,
    RepulsionStrategy,
};
pub use geometry::{BoundingBox, DistanceVector, Point, Size, Vector};
pub use graph::{
    EdgePorts, FixedViewport, Graph, Identifier, MemoryGraph, NodePosition, Viewport,
};
pub use layout::{
    AnimatedLayoutAlgorithm, AnimatedLayoutOptions, CoordinateMap, LayoutAlgorithm,
    LayoutOptions, LayoutResult,
};
pub use placement::RandomFillerPlacement;
pub use quadtree::QuadTree;
pub use random::{RandomSource, XorShift64Star};
pub use simulation::{SimulationIteration, SimulationParameters, StepReport};

/// Headless layout entry point: a static layout with a seeded generator.
///
/// ```
/// use narwhal::{FixedViewport, LayoutOptions, MemoryGraph, NodePosition, layout};
///
/// let mut g = MemoryGraph::new();
/// g.add_node("a", NodePosition::unset())
///     .add_node("b", NodePosition::at(40.0, 0.0))
///     .connect("ab", "a", "b");
///
/// let viewport = FixedViewport::new(800.0, 600.0);
/// let result = layout(&g, &viewport, &LayoutOptions::default(), 1)?;
/// assert_eq!(result.positions.len(), 2);
/// assert!(result.positions["a"].is_finite());
/// # Ok::<(), narwhal::Error>(())
/// ```
pub fn layout<G: Graph>(
    graph: &G,
    viewport: &dyn Viewport,
    options: &LayoutOptions,
    random_seed: u64,
) -> Result<LayoutResult<G::NodeId>> {
    LayoutAlgorithm::with_seed(options.clone(), random_seed).calculate_coordinates(graph, viewport)
}
