//! kd-tree spatial index over the shape arena.
//!
//! Nodes live in a flat vector and refer to their children and to shapes by
//! index. Split planes are chosen per level from the shapes' upper bounds on
//! a cycling axis, minimising a surface-area cost. Shapes that straddle the
//! plane are stored on both sides, so a leaf always holds every shape that
//! could be hit inside its box.

use std::time::Instant;

use lentil_math::{Aabb, Interval, Ray, Vec3};

use crate::shape::{Shape, ShapeId};

/// Nodes with fewer shapes than this are never split.
const MIN_SPLIT_SHAPES: usize = 4;

/// Half-extent of the fixed world region the root always covers.
const ROOT_HALF_EXTENT: f32 = 20.0;

/// Default maximum depth.
pub const DEFAULT_MAX_DEPTH: usize = 12;

/// One node of the tree.
#[derive(Debug, Clone)]
pub struct KdNode {
    pub bbox: Aabb,
    /// Shapes overlapping this node's box
    pub shapes: Vec<ShapeId>,
    /// Split axis (0=X, 1=Y, 2=Z); meaningful only for interior nodes
    pub axis: usize,
    /// (lower, upper) child node indices
    pub children: Option<(usize, usize)>,
}

impl KdNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Tree statistics, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KdStats {
    pub nodes: usize,
    pub leaves: usize,
    pub depth: usize,
}

/// A kd-tree built once per render.
#[derive(Debug, Clone)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    stats: KdStats,
}

impl KdTree {
    /// Build a tree over `shapes` with at most `max_depth` levels of splits.
    pub fn build(shapes: &[Shape], max_depth: usize) -> Self {
        let start = Instant::now();

        let fixed = Aabb::from_points(
            Vec3::splat(-ROOT_HALF_EXTENT),
            Vec3::splat(ROOT_HALF_EXTENT),
        );
        let root_box = shapes
            .iter()
            .fold(fixed, |acc, s| Aabb::surrounding(&acc, &s.bounding_box()));

        let mut tree = Self {
            nodes: Vec::new(),
            stats: KdStats::default(),
        };
        let ids: Vec<ShapeId> = (0..shapes.len()).collect();
        tree.build_node(shapes, ids, root_box, 0, max_depth);

        tree.stats.nodes = tree.nodes.len();
        tree.stats.leaves = tree.nodes.iter().filter(|n| n.is_leaf()).count();

        log::debug!(
            "Built kd-tree: {} shapes, {} nodes, {} leaves, depth {} in {:.2?}",
            shapes.len(),
            tree.stats.nodes,
            tree.stats.leaves,
            tree.stats.depth,
            start.elapsed()
        );

        tree
    }

    /// Recursively build the subtree for `ids` inside `bbox`; returns its node index.
    fn build_node(
        &mut self,
        shapes: &[Shape],
        ids: Vec<ShapeId>,
        bbox: Aabb,
        depth: usize,
        max_depth: usize,
    ) -> usize {
        let index = self.nodes.len();
        let axis = depth % 3;
        self.stats.depth = self.stats.depth.max(depth);

        self.nodes.push(KdNode {
            bbox,
            shapes: Vec::new(),
            axis,
            children: None,
        });

        if ids.len() < MIN_SPLIT_SHAPES || depth >= max_depth {
            self.nodes[index].shapes = ids;
            return index;
        }

        let Some(split) = best_split(shapes, &ids, &bbox, axis) else {
            self.nodes[index].shapes = ids;
            return index;
        };

        let (lower_box, upper_box) = bbox.split(axis, split);
        let side = |half: &Aabb| -> Vec<ShapeId> {
            ids.iter()
                .copied()
                .filter(|&id| {
                    let b = shapes[id].bounding_box();
                    b.overlaps(half) || half.contains(&b)
                })
                .collect()
        };
        let lower = side(&lower_box);
        let upper = side(&upper_box);

        // Nothing was separated; splitting further only duplicates work
        if lower.len() == ids.len() && upper.len() == ids.len() {
            self.nodes[index].shapes = ids;
            return index;
        }

        let left = self.build_node(shapes, lower, lower_box, depth + 1, max_depth);
        let right = self.build_node(shapes, upper, upper_box, depth + 1, max_depth);

        let node = &mut self.nodes[index];
        node.shapes = ids;
        node.children = Some((left, right));
        index
    }

    /// Candidate shapes for `ray`, written to `out` sorted and without duplicates.
    ///
    /// Descends every child whose box the ray reaches and collects the shapes
    /// of the leaves visited. Every shape the ray actually hits is included.
    pub fn query_into(&self, ray: &Ray, out: &mut Vec<ShapeId>) {
        out.clear();
        if self.nodes.is_empty() {
            return;
        }

        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !node.bbox.intersects_ray(ray) {
                continue;
            }
            match node.children {
                Some((left, right)) => {
                    stack.push(left);
                    stack.push(right);
                }
                None => out.extend_from_slice(&node.shapes),
            }
        }

        out.sort_unstable();
        out.dedup();
    }

    /// Candidate shapes for `ray`.
    pub fn query(&self, ray: &Ray) -> Vec<ShapeId> {
        let mut out = Vec::new();
        self.query_into(ray, &mut out);
        out
    }

    /// The root node, whose shape list is every shape in the scene.
    pub fn root(&self) -> Option<&KdNode> {
        self.nodes.first()
    }

    pub fn nodes(&self) -> &[KdNode] {
        &self.nodes
    }

    pub fn stats(&self) -> KdStats {
        self.stats
    }
}

/// Cheapest split plane on `axis` among the shapes' upper bounds.
///
/// Cost is `A_l / A * A_l + A_r / A * A_r` over the surface areas of the two
/// halves. Planes on or outside the box are skipped.
fn best_split(shapes: &[Shape], ids: &[ShapeId], bbox: &Aabb, axis: usize) -> Option<f32> {
    let extent: Interval = bbox.axis_interval(axis);
    let total_area = bbox.surface_area();
    if total_area <= 0.0 {
        return None;
    }

    let mut best: Option<(f32, f32)> = None;
    for &id in ids {
        let value = shapes[id].bounding_box().axis_interval(axis).max;
        if value <= extent.min || value >= extent.max {
            continue;
        }

        let (lower, upper) = bbox.split(axis, value);
        let (al, ar) = (lower.surface_area(), upper.surface_area());
        let cost = al / total_area * al + ar / total_area * ar;

        if best.map_or(true, |(best_cost, _)| cost < best_cost) {
            best = Some((cost, value));
        }
    }

    best.map(|(_, value)| value)
}
