//! Hierarchical greedy point clustering.
//!
//! `ClusterIndex` precomputes one clustering level per integer zoom between
//! `min_zoom` and `max_zoom`. Level `max_zoom + 1` holds the raw points. Each
//! level is built from the one below it: walking the previous level in order,
//! a node that has not been claimed yet absorbs every unclaimed neighbor
//! within `radius / (extent * 2^zoom)` projected units into a weighted
//! centroid. A query then only has to pick a level and range-search its k-d
//! tree.
//!
//! Ordering contract:
//! - `query` returns nodes in ascending level order, which for the raw point
//!   level is the order features were passed to `load`.

use foundation::bounds::{Aabb2, LngLat, LngLatBounds, wrap_lng};
use foundation::math::{Vec2, lat_to_y, lng_to_x, project, unproject};
use serde::{Deserialize, Serialize};

use crate::kdtree::KdTree;

/// Cluster ids pack the origin zoom into the low 5 bits.
const ZOOM_BITS: u32 = 5;
const MAX_ENCODABLE_ZOOM: u8 = (1 << ZOOM_BITS) - 2;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Minimum number of points needed to form a cluster.
    pub min_points: usize,
    /// Cluster radius in pixels.
    pub radius: f64,
    /// Tile extent the radius is measured against.
    pub extent: f64,
    /// Leaf size of the per-level k-d trees.
    pub node_size: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            min_zoom: 0,
            max_zoom: 16,
            min_points: 2,
            radius: 60.0,
            extent: 512.0,
            node_size: 64,
        }
    }
}

impl IndexOptions {
    fn normalized(mut self) -> Self {
        self.max_zoom = self.max_zoom.min(MAX_ENCODABLE_ZOOM);
        self.min_zoom = self.min_zoom.min(self.max_zoom);
        self.node_size = self.node_size.max(1);
        self
    }

    /// Cluster radius at `zoom`, in unit-square projected units.
    pub fn radius_at(&self, zoom: u8) -> f64 {
        self.radius / (self.extent * 2f64.powi(i32::from(zoom)))
    }

    /// Zoom whose level holds the raw, unclustered points.
    pub fn leaf_zoom(&self) -> u8 {
        self.max_zoom + 1
    }
}

/// Anything with a geographic position can be clustered.
pub trait IndexedPoint {
    fn position(&self) -> LngLat;
}

impl IndexedPoint for LngLat {
    fn position(&self) -> LngLat {
        *self
    }
}

/// Synthetic cluster identifier, never equal in type to a feature identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(pub u64);

impl ClusterId {
    fn encode(origin_index: usize, zoom: u8, point_count: usize) -> Self {
        ClusterId(((origin_index as u64) << ZOOM_BITS) + u64::from(zoom) + 1 + point_count as u64)
    }

    /// `(origin index, origin zoom)`; the origin zoom is one above the cluster's own.
    fn decode(self, point_count: usize) -> Option<(usize, usize)> {
        let v = self.0.checked_sub(point_count as u64)?;
        Some(((v >> ZOOM_BITS) as usize, (v % (1 << ZOOM_BITS)) as usize))
    }
}

impl std::fmt::Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cluster#{}", self.0)
    }
}

/// An aggregate of nearby points at one zoom level. Only valid for the
/// index load that produced it.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct ClusterNode {
    pub id: ClusterId,
    /// Weighted centroid of the members.
    pub position: LngLat,
    pub count: usize,
}

/// One query result: either a cluster or an individual feature.
#[derive(Debug, Clone, PartialEq)]
pub enum Clustered<'a, F> {
    Cluster(ClusterNode),
    Point(&'a F),
}

impl<F> Clustered<'_, F> {
    /// Number of original points this node stands for.
    pub fn count(&self) -> usize {
        match self {
            Clustered::Cluster(c) => c.count,
            Clustered::Point(_) => 1,
        }
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self, Clustered::Cluster(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    ClusterNotFound(ClusterId),
}

impl std::fmt::Display for IndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexError::ClusterNotFound(id) => write!(f, "no cluster with id {}", id.0),
        }
    }
}

impl std::error::Error for IndexError {}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Source {
    Feature(usize),
    Cluster(ClusterId),
}

#[derive(Debug, Copy, Clone)]
struct Node {
    point: Vec2,
    num_points: usize,
    source: Source,
    /// Cluster this node was absorbed into one level up.
    parent: Option<ClusterId>,
}

#[derive(Debug, Clone, Default)]
struct Level {
    nodes: Vec<Node>,
    tree: KdTree,
}

impl Level {
    fn new(nodes: Vec<Node>, node_size: usize) -> Self {
        let points: Vec<[f64; 2]> = nodes.iter().map(|n| [n.point.x, n.point.y]).collect();
        let tree = KdTree::build(&points, node_size);
        Self { nodes, tree }
    }
}

#[derive(Debug, Clone)]
pub struct ClusterIndex<F> {
    options: IndexOptions,
    features: Vec<F>,
    /// Indexed by zoom; entries below `min_zoom` stay empty.
    levels: Vec<Level>,
}

impl<F: IndexedPoint> Default for ClusterIndex<F> {
    fn default() -> Self {
        Self::new(IndexOptions::default())
    }
}

impl<F: IndexedPoint> ClusterIndex<F> {
    pub fn new(options: IndexOptions) -> Self {
        Self {
            options: options.normalized(),
            features: Vec::new(),
            levels: Vec::new(),
        }
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    pub fn features(&self) -> &[F] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Replace all indexed content and rebuild every zoom level.
    ///
    /// Empty input leaves an index that answers every query with nothing.
    /// Out-of-range longitudes are wrapped and latitudes clamped; features with
    /// non-finite coordinates are placed at (0, 0). Either way they are still
    /// counted.
    pub fn load(&mut self, features: Vec<F>) {
        self.features = features;
        self.levels.clear();
        if self.features.is_empty() {
            return;
        }

        let opts = self.options;
        let point_count = self.features.len();
        let leaves: Vec<Node> = self
            .features
            .iter()
            .enumerate()
            .map(|(i, f)| Node {
                point: project(normalize_position(f.position())),
                num_points: 1,
                source: Source::Feature(i),
                parent: None,
            })
            .collect();

        let top = usize::from(opts.leaf_zoom());
        self.levels = vec![Level::default(); top + 1];
        self.levels[top] = Level::new(leaves, opts.node_size);

        for zoom in (opts.min_zoom..=opts.max_zoom).rev() {
            let next = {
                let Level { nodes, tree } = &mut self.levels[usize::from(zoom) + 1];
                cluster_level(nodes, tree, zoom, &opts, point_count)
            };
            self.levels[usize::from(zoom)] = Level::new(next, opts.node_size);
        }
    }

    /// Clusters and points inside `bounds` at `zoom`.
    ///
    /// Zooms above `max_zoom` return raw points; zooms below `min_zoom` clamp.
    /// Before the first non-empty `load` this returns nothing.
    pub fn query(&self, bounds: &LngLatBounds, zoom: u8) -> Vec<Clustered<'_, F>> {
        let Some(level) = self.levels.get(self.limit_zoom(zoom)) else {
            return Vec::new();
        };

        let mut ids: Vec<usize> = Vec::new();
        for part in bounds.split_antimeridian() {
            let query = Aabb2::new(
                [lng_to_x(part.west), lat_to_y(part.north)],
                [lng_to_x(part.east), lat_to_y(part.south)],
            );
            ids.extend(level.tree.range(&query));
        }
        ids.sort_unstable();
        ids.dedup();

        ids.into_iter()
            .map(|i| self.to_clustered(&level.nodes[i]))
            .collect()
    }

    /// The nodes one zoom level deeper that `cluster` was built from.
    pub fn children(&self, cluster: ClusterId) -> Result<Vec<Clustered<'_, F>>, IndexError> {
        let not_found = IndexError::ClusterNotFound(cluster);
        let (origin_index, origin_zoom) =
            cluster.decode(self.features.len()).ok_or(not_found.clone())?;
        if origin_zoom <= usize::from(self.options.min_zoom) || origin_zoom >= self.levels.len() {
            return Err(not_found);
        }
        let level = &self.levels[origin_zoom];
        let origin = level.nodes.get(origin_index).ok_or(not_found.clone())?;

        let r = self.options.radius_at((origin_zoom - 1) as u8);
        let children: Vec<Clustered<'_, F>> = level
            .tree
            .within([origin.point.x, origin.point.y], r)
            .into_iter()
            .map(|k| &level.nodes[k])
            .filter(|node| node.parent == Some(cluster))
            .map(|node| self.to_clustered(node))
            .collect();

        if children.is_empty() {
            return Err(not_found);
        }
        Ok(children)
    }

    /// Original features inside `cluster`, paginated by `limit`/`offset`.
    pub fn leaves(
        &self,
        cluster: ClusterId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<&F>, IndexError> {
        let mut out = Vec::new();
        let mut skipped = 0;
        self.append_leaves(&mut out, cluster, limit, offset, &mut skipped)?;
        Ok(out)
    }

    /// Smallest zoom at which `cluster` splits into more than one node.
    pub fn expansion_zoom(&self, cluster: ClusterId) -> Result<u8, IndexError> {
        let (_, origin_zoom) = cluster
            .decode(self.features.len())
            .ok_or(IndexError::ClusterNotFound(cluster))?;
        let mut zoom = origin_zoom.saturating_sub(1);
        let mut current = cluster;
        while zoom <= usize::from(self.options.max_zoom) {
            let children = self.children(current)?;
            zoom += 1;
            match children.as_slice() {
                [Clustered::Cluster(only)] => current = only.id,
                _ => break,
            }
        }
        Ok(zoom as u8)
    }

    fn append_leaves<'a>(
        &'a self,
        out: &mut Vec<&'a F>,
        cluster: ClusterId,
        limit: usize,
        offset: usize,
        skipped: &mut usize,
    ) -> Result<(), IndexError> {
        for child in self.children(cluster)? {
            if out.len() >= limit {
                break;
            }
            match child {
                Clustered::Cluster(c) => {
                    if *skipped + c.count <= offset {
                        *skipped += c.count;
                    } else {
                        self.append_leaves(out, c.id, limit, offset, skipped)?;
                    }
                }
                Clustered::Point(f) => {
                    if *skipped < offset {
                        *skipped += 1;
                    } else {
                        out.push(f);
                    }
                }
            }
        }
        Ok(())
    }

    fn limit_zoom(&self, zoom: u8) -> usize {
        usize::from(zoom.clamp(self.options.min_zoom, self.options.leaf_zoom()))
    }

    fn to_clustered(&self, node: &Node) -> Clustered<'_, F> {
        match node.source {
            Source::Feature(i) => Clustered::Point(&self.features[i]),
            Source::Cluster(id) => Clustered::Cluster(ClusterNode {
                id,
                position: unproject(node.point),
                count: node.num_points,
            }),
        }
    }
}

/// Build the level for `zoom` from the level one above it.
///
/// Marks absorbed nodes of `nodes` with their new parent cluster.
fn cluster_level(
    nodes: &mut [Node],
    tree: &KdTree,
    zoom: u8,
    opts: &IndexOptions,
    point_count: usize,
) -> Vec<Node> {
    let r = opts.radius_at(zoom);
    let mut claimed = vec![false; nodes.len()];
    let mut next: Vec<Node> = Vec::with_capacity(nodes.len());

    for i in 0..nodes.len() {
        if claimed[i] {
            continue;
        }
        claimed[i] = true;

        let p = nodes[i].point;
        let neighbors = tree.within([p.x, p.y], r);

        let origin_points = nodes[i].num_points;
        let num_points = origin_points
            + neighbors
                .iter()
                .filter(|&&k| !claimed[k])
                .map(|&k| nodes[k].num_points)
                .sum::<usize>();

        if num_points > origin_points && num_points >= opts.min_points {
            let id = ClusterId::encode(i, zoom, point_count);
            let mut weighted = p * origin_points as f64;
            for &k in &neighbors {
                if claimed[k] {
                    continue;
                }
                claimed[k] = true;
                weighted = weighted + nodes[k].point * nodes[k].num_points as f64;
                nodes[k].parent = Some(id);
            }
            nodes[i].parent = Some(id);

            next.push(Node {
                point: weighted * (1.0 / num_points as f64),
                num_points,
                source: Source::Cluster(id),
                parent: None,
            });
        } else {
            next.push(Node {
                parent: None,
                ..nodes[i]
            });
            if num_points > 1 {
                for &k in &neighbors {
                    if claimed[k] {
                        continue;
                    }
                    claimed[k] = true;
                    next.push(Node {
                        parent: None,
                        ..nodes[k]
                    });
                }
            }
        }
    }

    next
}

fn normalize_position(p: LngLat) -> LngLat {
    if p.is_valid() {
        p
    } else if p.lng.is_finite() && p.lat.is_finite() {
        LngLat::new(wrap_lng(p.lng), p.lat.clamp(-90.0, 90.0))
    } else {
        LngLat::default()
    }
}
