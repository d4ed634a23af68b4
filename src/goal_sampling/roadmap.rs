//! Connectivity roadmap over previously sampled goal configurations

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::common::traits::ForwardKinematics;
use crate::common::types::{JointConfig, JointPath};
use crate::goal_sampling::region::WorkspaceRegion;

/// Tolerance for matching a path's terminal state to a roadmap vertex
const ANCHOR_MATCH_TOLERANCE: f64 = 1e-9;

/// Priority queue item for the Dijkstra sub-path search
#[derive(Clone)]
struct QueueItem {
    cost: f64,
    index: usize,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}

impl Eq for QueueItem {}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap
        other.cost.partial_cmp(&self.cost).unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Union-find over vertex indices for near O(1) same-component queries
#[derive(Debug, Default)]
struct DisjointSets {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSets {
    fn push(&mut self) -> usize {
        let id = self.parent.len();
        self.parent.push(id);
        self.rank.push(0);
        id
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            // Path halving
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        if self.rank[ra] < self.rank[rb] {
            self.parent[ra] = rb;
        } else if self.rank[ra] > self.rank[rb] {
            self.parent[rb] = ra;
        } else {
            self.parent[rb] = ra;
            self.rank[ra] += 1;
        }
    }

    fn same_set(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }

    fn clear(&mut self) {
        self.parent.clear();
        self.rank.clear();
    }
}

#[derive(Debug, Default)]
struct RoadmapInner {
    vertices: Vec<JointConfig>,
    /// Adjacency list with edge costs; undirected, both directions stored
    adjacency: Vec<Vec<(usize, f64)>>,
    components: DisjointSets,
}

/// Lazily grown connectivity graph of validated goal configurations
///
/// Vertices and edges are appended by an external incremental growth
/// process; an edge is assumed feasible when added, so sub-paths extracted
/// here need no revalidation. Connectivity is tracked incrementally to
/// answer same-component queries in near O(1).
#[derive(Debug, Default)]
pub struct GoalRoadmap {
    inner: Mutex<RoadmapInner>,
}

impl GoalRoadmap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validated configuration as a new vertex; returns its index
    pub fn add_vertex(&self, config: JointConfig) -> usize {
        let mut inner = self.inner.lock();
        inner.vertices.push(config);
        inner.adjacency.push(Vec::new());
        inner.components.push()
    }

    /// Connect two vertices with a feasible local motion of cost `cost`
    pub fn add_edge(&self, u: usize, v: usize, cost: f64) {
        let mut inner = self.inner.lock();
        inner.adjacency[u].push((v, cost));
        inner.adjacency[v].push((u, cost));
        inner.components.union(u, v);
    }

    pub fn vertex_count(&self) -> usize {
        self.inner.lock().vertices.len()
    }

    pub fn same_component(&self, u: usize, v: usize) -> bool {
        self.inner.lock().components.same_set(u, v)
    }

    /// Shortest path between two vertices over the built edges
    pub fn construct_solution(&self, from: usize, to: usize) -> Option<JointPath> {
        let inner = self.inner.lock();
        Self::shortest_path(&inner, from, to)
    }

    /// Discard the whole graph
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.vertices.clear();
        inner.adjacency.clear();
        inner.components.clear();
    }

    /// Search the roadmap for a cheaper terminal state for `path`
    ///
    /// The path's terminal configuration is matched to a roadmap vertex
    /// (the anchor). All vertices are ranked by task-space distance from
    /// their end-effector position to the nearest region center; the scan
    /// stops at the first vertex connected to the anchor, whether or not a
    /// sub-path can be built from it — it does not fall back to the
    /// next-closest connected vertex. If that vertex is a different state
    /// and a sub-path exists, the sub-path is appended (anchor state
    /// excluded) and the extended path returned.
    pub fn improve_solution(
        &self,
        path: &JointPath,
        kinematics: &dyn ForwardKinematics,
        regions: &[WorkspaceRegion],
    ) -> Option<JointPath> {
        let terminal = path.terminal()?;
        let mut inner = self.inner.lock();

        info!(
            vertices = inner.vertices.len(),
            "searching goal-region roadmap for a cheaper terminal state"
        );

        // Rank every vertex by distance to the nearest region center and
        // locate the anchor along the way.
        let mut ranked: Vec<(OrderedFloat<f64>, usize)> = Vec::with_capacity(inner.vertices.len());
        let mut anchor = None;
        for (v, config) in inner.vertices.iter().enumerate() {
            let pose = kinematics.end_effector_pose(config);
            let distance = regions
                .iter()
                .map(|region| (region.center() - pose.position).norm())
                .fold(f64::INFINITY, f64::min);
            ranked.push((OrderedFloat(distance), v));
            if anchor.is_none() && config.approx_eq(terminal, ANCHOR_MATCH_TOLERANCE) {
                anchor = Some(v);
            }
        }
        let anchor = anchor?;

        // Stable sort keeps discovery order on distance ties
        ranked.sort_by_key(|&(distance, _)| distance);

        let mut sub_path = None;
        for &(distance, v) in &ranked {
            if !inner.components.same_set(anchor, v) {
                continue;
            }
            debug!(
                vertex = v,
                distance = distance.into_inner(),
                "closest connected roadmap vertex"
            );
            if !inner.vertices[v].approx_eq(&inner.vertices[anchor], ANCHOR_MATCH_TOLERANCE) {
                sub_path = Self::shortest_path(&inner, anchor, v);
            }
            // First component match wins; no backtracking when the
            // sub-path cannot be built.
            break;
        }

        let sub_path = sub_path?;
        let mut improved = path.clone();
        for state in sub_path.states.into_iter().skip(1) {
            improved.push(state);
        }
        Some(improved)
    }

    fn shortest_path(inner: &RoadmapInner, from: usize, to: usize) -> Option<JointPath> {
        let n = inner.vertices.len();
        if from >= n || to >= n {
            return None;
        }

        let mut cost = vec![f64::INFINITY; n];
        let mut parent: Vec<Option<usize>> = vec![None; n];
        let mut closed = vec![false; n];
        let mut open_set = BinaryHeap::new();

        cost[from] = 0.0;
        open_set.push(QueueItem { cost: 0.0, index: from });

        while let Some(current) = open_set.pop() {
            if current.index == to {
                break;
            }
            if closed[current.index] {
                continue;
            }
            closed[current.index] = true;

            for &(neighbor, edge_cost) in &inner.adjacency[current.index] {
                if closed[neighbor] {
                    continue;
                }
                let new_cost = cost[current.index] + edge_cost;
                if new_cost < cost[neighbor] {
                    cost[neighbor] = new_cost;
                    parent[neighbor] = Some(current.index);
                    open_set.push(QueueItem { cost: new_cost, index: neighbor });
                }
            }
        }

        if cost[to].is_infinite() {
            return None;
        }

        let mut order = vec![to];
        let mut current = to;
        while let Some(p) = parent[current] {
            order.push(p);
            current = p;
        }
        order.reverse();

        Some(JointPath::from_states(
            order.into_iter().map(|i| inner.vertices[i].clone()).collect(),
        ))
    }
}
