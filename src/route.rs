//! Pollution-aware routing over a grid graph with A* search.
//!
//! A regular lattice is laid over the padded bounding box of the two endpoints and each
//! 8-connected edge is weighted by
//!
//! ```text
//! cost = haversine(u, v) × (1 + α × pm25(midpoint) / 50)
//! ```
//!
//! with the PM2.5 concentration sampled from the interpolated pollution surface. The haversine
//! heuristic is admissible because pollution and α are non-negative, so A* returns minimum-cost
//! paths. Ties on the f-score are broken towards the smaller heuristic (closer to the goal) and
//! then the smaller node index, which keeps the selected path deterministic.
//!
//! The same graph searched with α = 0 yields the distance-shortest path; comparing the two
//! quantifies the exposure saved by the green route.
use crate::geo::{Coordinate, haversine};
use crate::interpolate::PollutionGrid;
use crate::units::{ExposureDose, Kilometres, MicrogramsPerCubicMetre};
use anyhow::{Result, ensure};
use itertools::Itertools;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// PM2.5 concentration that scales the pollution penalty to ~1 (µg/m³)
const PM25_NORMALISATION: f64 = 50.0;

/// Extra lattice cells kept around the endpoint bounding box so routes can detour
const PADDING_CELLS: i64 = 8;

fn default_step_degrees() -> f64 {
    0.002
}

fn default_pollution_weight() -> f64 {
    2.0
}

/// Routing parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Lattice spacing in degrees (~200 m at mid latitudes at the default 0.002)
    #[serde(default = "default_step_degrees")]
    pub step_degrees: f64,
    /// Pollution weight α: 0 routes purely by distance; larger values trade distance for
    /// cleaner air. The default of 2.0 is a tuning choice, not a physical constant.
    #[serde(default = "default_pollution_weight")]
    pub pollution_weight: f64,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            step_degrees: default_step_degrees(),
            pollution_weight: default_pollution_weight(),
        }
    }
}

impl RouteConfig {
    /// Check the parameters are usable
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.step_degrees > 0.0 && self.step_degrees < 1.0,
            "Route grid step must be in (0, 1) degrees, got {}",
            self.step_degrees
        );
        ensure!(
            self.pollution_weight >= 0.0,
            "Pollution weight must be non-negative, got {}",
            self.pollution_weight
        );
        Ok(())
    }
}

/// A computed path with its aggregate distance and exposure
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePath {
    /// Lattice points from origin to destination
    pub points: Vec<Coordinate>,
    /// Total path length
    pub distance: Kilometres,
    /// Cumulative PM2.5 exposure: Σ concentration(midpoint) × segment length
    pub exposure: ExposureDose,
}

/// The green route and its distance-shortest comparison
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    /// Minimum-exposure-blend path
    pub green: RoutePath,
    /// Pure distance-shortest path on the same graph
    pub shortest: RoutePath,
    /// Exposure saved by the green route relative to the shortest, in percent
    pub exposure_reduction_percent: f64,
}

/// Outcome of a routing request
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// A route was found
    Found(RouteResult),
    /// The destination cannot be reached on the lattice
    NoRoute,
}

/// Per-edge data: geometric length and pollution sampled at the midpoint
#[derive(Debug, Clone, Copy)]
struct EdgeWeight {
    distance: Kilometres,
    pollution: MicrogramsPerCubicMetre,
}

impl EdgeWeight {
    /// The pollution-blended cost used by the search
    fn cost(&self, pollution_weight: f64) -> f64 {
        self.distance.value()
            * (1.0 + pollution_weight * self.pollution.value() / PM25_NORMALISATION)
    }
}

type RouteGraph = UnGraph<Coordinate, EdgeWeight>;

/// Snap a coordinate value to the lattice
fn snap(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}

/// Build the lattice graph covering both endpoints plus padding.
///
/// Returns the graph and the node indices of the snapped endpoints.
fn build_lattice(
    from: &Coordinate,
    to: &Coordinate,
    grid: &PollutionGrid,
    step: f64,
) -> (RouteGraph, NodeIndex, NodeIndex) {
    let cell = |value: f64| (value / step).round() as i64;

    let (row_min, row_max) = (cell(from.lat).min(cell(to.lat)), cell(from.lat).max(cell(to.lat)));
    let (col_min, col_max) = (cell(from.lon).min(cell(to.lon)), cell(from.lon).max(cell(to.lon)));
    let (row_min, row_max) = (row_min - PADDING_CELLS, row_max + PADDING_CELLS);
    let (col_min, col_max) = (col_min - PADDING_CELLS, col_max + PADDING_CELLS);

    let mut graph = RouteGraph::default();
    let mut nodes = HashMap::new();
    for (row, col) in (row_min..=row_max).cartesian_product(col_min..=col_max) {
        let point = Coordinate::new(row as f64 * step, col as f64 * step);
        nodes.insert((row, col), graph.add_node(point));
    }

    // 8-connected lattice; each undirected edge added once, in lattice order
    for (row, col) in (row_min..=row_max).cartesian_product(col_min..=col_max) {
        let node = nodes[&(row, col)];
        for (drow, dcol) in [(0, 1), (1, -1), (1, 0), (1, 1)] {
            let Some(&neighbour) = nodes.get(&(row + drow, col + dcol)) else {
                continue;
            };
            let a = graph[node];
            let b = graph[neighbour];
            let weight = EdgeWeight {
                distance: haversine(&a, &b),
                pollution: grid.sample(&a.midpoint(&b)),
            };
            graph.add_edge(node, neighbour, weight);
        }
    }

    let start = nodes[&(cell(from.lat), cell(from.lon))];
    let goal = nodes[&(cell(to.lat), cell(to.lon))];
    (graph, start, goal)
}

/// An open-set entry ordered so the binary heap pops the lowest f-score first, breaking ties
/// towards the lower heuristic and then the lower node index
struct SearchEntry {
    f: f64,
    g: f64,
    h: f64,
    node: NodeIndex,
}

impl PartialEq for SearchEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchEntry {}

impl PartialOrd for SearchEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so that the max-heap surfaces the minimum
        other
            .f
            .total_cmp(&self.f)
            .then(other.h.total_cmp(&self.h))
            .then(other.node.index().cmp(&self.node.index()))
    }
}

/// A* over the lattice. Returns the node path, or `None` if the goal is unreachable.
fn a_star(
    graph: &RouteGraph,
    start: NodeIndex,
    goal: NodeIndex,
    pollution_weight: f64,
) -> Option<Vec<NodeIndex>> {
    let goal_point = graph[goal];
    let heuristic = |node: NodeIndex| haversine(&graph[node], &goal_point).value();

    let mut open = BinaryHeap::new();
    let mut g_score: HashMap<NodeIndex, f64> = HashMap::new();
    let mut came_from: HashMap<NodeIndex, NodeIndex> = HashMap::new();

    g_score.insert(start, 0.0);
    open.push(SearchEntry {
        f: heuristic(start),
        g: 0.0,
        h: heuristic(start),
        node: start,
    });

    while let Some(entry) = open.pop() {
        if entry.g > g_score[&entry.node] {
            continue; // superseded by a cheaper path
        }
        if entry.node == goal {
            let mut path = vec![goal];
            let mut current = goal;
            while let Some(&previous) = came_from.get(&current) {
                path.push(previous);
                current = previous;
            }
            path.reverse();
            return Some(path);
        }

        for edge in graph.edges(entry.node) {
            let neighbour = if edge.source() == entry.node {
                edge.target()
            } else {
                edge.source()
            };
            let tentative_g = entry.g + edge.weight().cost(pollution_weight);
            if g_score
                .get(&neighbour)
                .is_none_or(|&best| tentative_g < best)
            {
                g_score.insert(neighbour, tentative_g);
                came_from.insert(neighbour, entry.node);
                let h = heuristic(neighbour);
                open.push(SearchEntry {
                    f: tentative_g + h,
                    g: tentative_g,
                    h,
                    node: neighbour,
                });
            }
        }
    }

    None
}

/// Total distance and cumulative exposure along a path
fn path_metrics(points: &[Coordinate], grid: &PollutionGrid) -> (Kilometres, ExposureDose) {
    let mut distance = Kilometres(0.0);
    let mut exposure = ExposureDose(0.0);
    for (a, b) in points.iter().tuple_windows() {
        let segment = haversine(a, b);
        distance = distance + segment;
        exposure = exposure + grid.sample(&a.midpoint(b)) * segment;
    }
    (distance, exposure)
}

fn route_path(graph: &RouteGraph, nodes: &[NodeIndex], grid: &PollutionGrid) -> RoutePath {
    let points: Vec<Coordinate> = nodes.iter().map(|&n| graph[n]).collect();
    let (distance, exposure) = path_metrics(&points, grid);
    RoutePath {
        points,
        distance,
        exposure,
    }
}

/// Find the minimum-exposure route between two points and compare it with the shortest path.
///
/// Endpoints that snap to the same lattice node yield a zero-length, zero-cost route. An
/// unreachable destination yields [`RouteOutcome::NoRoute`] explicitly.
pub fn find_green_route(
    from: &Coordinate,
    to: &Coordinate,
    grid: &PollutionGrid,
    config: &RouteConfig,
) -> Result<RouteOutcome> {
    config.validate()?;

    let step = config.step_degrees;
    let snapped_from = Coordinate::new(snap(from.lat, step), snap(from.lon, step));
    let snapped_to = Coordinate::new(snap(to.lat, step), snap(to.lon, step));

    let (graph, start, goal) = build_lattice(&snapped_from, &snapped_to, grid, step);

    let Some(green_nodes) = a_star(&graph, start, goal, config.pollution_weight) else {
        return Ok(RouteOutcome::NoRoute);
    };
    let Some(shortest_nodes) = a_star(&graph, start, goal, 0.0) else {
        return Ok(RouteOutcome::NoRoute);
    };

    let green = route_path(&graph, &green_nodes, grid);
    let shortest = route_path(&graph, &shortest_nodes, grid);

    let exposure_reduction_percent = if shortest.exposure.value() > 0.0 {
        ((1.0 - green.exposure.value() / shortest.exposure.value()) * 100.0).max(0.0)
    } else {
        0.0
    };

    Ok(RouteOutcome::Found(RouteResult {
        green,
        shortest,
        exposure_reduction_percent,
    }))
}
