use foundation::bounds::Aabb2;
use foundation::math::precision::stable_total_cmp_f64;

/// A deterministic, static k-d tree over 2D points.
///
/// Items are identified by their position in the slice passed to `build`.
///
/// Ordering contract:
/// - `range` and `within` return item indices in ascending order.
#[derive(Debug, Clone, Default)]
pub struct KdTree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        bounds: Aabb2,
        items: Vec<Item>,
    },
    Internal {
        bounds: Aabb2,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct Item {
    index: usize,
    point: [f64; 2],
}

impl KdTree {
    pub fn build(points: &[[f64; 2]], node_size: usize) -> Self {
        let mut nodes = Vec::new();
        let mut items: Vec<Item> = points
            .iter()
            .enumerate()
            .map(|(index, &point)| Item { index, point })
            .collect();
        if !items.is_empty() {
            build_node(&mut nodes, &mut items, node_size.max(1));
        }
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Indices of all points inside `query` (edges inclusive).
    pub fn range(&self, query: &Aabb2) -> Vec<usize> {
        self.collect(query, |_| true)
    }

    /// Indices of all points within Euclidean distance `r` of `center`.
    pub fn within(&self, center: [f64; 2], r: f64) -> Vec<usize> {
        let r2 = r * r;
        self.collect(&Aabb2::around(center, r), |p| {
            let dx = p[0] - center[0];
            let dy = p[1] - center[1];
            dx * dx + dy * dy <= r2
        })
    }

    fn collect(&self, query: &Aabb2, accept: impl Fn([f64; 2]) -> bool) -> Vec<usize> {
        if self.nodes.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<usize> = Vec::new();
        let mut stack: Vec<usize> = vec![0];

        while let Some(idx) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { bounds, items } => {
                    if !bounds.intersects(query) {
                        continue;
                    }
                    for item in items {
                        if query.contains(item.point) && accept(item.point) {
                            hits.push(item.index);
                        }
                    }
                }
                Node::Internal {
                    bounds,
                    left,
                    right,
                } => {
                    if !bounds.intersects(query) {
                        continue;
                    }
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }

        hits.sort_unstable();
        hits.dedup();
        hits
    }
}

fn build_node(nodes: &mut Vec<Node>, items: &mut [Item], node_size: usize) -> usize {
    let bounds = bounds_for_items(items);

    if items.len() <= node_size {
        let idx = nodes.len();
        nodes.push(Node::Leaf {
            bounds,
            items: items.to_vec(),
        });
        return idx;
    }

    let axis = split_axis(&bounds);

    items.sort_by(|a, b| {
        stable_total_cmp_f64(a.point[axis], b.point[axis]).then_with(|| a.index.cmp(&b.index))
    });

    let mid = items.len() / 2;
    let (left_items, right_items) = items.split_at_mut(mid);

    let idx = nodes.len();
    // Placeholder; patched after children are built.
    nodes.push(Node::Leaf {
        bounds,
        items: Vec::new(),
    });

    let left = build_node(nodes, left_items, node_size);
    let right = build_node(nodes, right_items, node_size);

    nodes[idx] = Node::Internal {
        bounds,
        left,
        right,
    };
    idx
}

fn split_axis(bounds: &Aabb2) -> usize {
    let ex = bounds.max[0] - bounds.min[0];
    let ey = bounds.max[1] - bounds.min[1];

    // Deterministic tie-break: prefer X.
    if ex >= ey { 0 } else { 1 }
}

fn bounds_for_items(items: &[Item]) -> Aabb2 {
    let mut b = Aabb2::from_point(items[0].point);
    for item in &items[1..] {
        b = b.union(&Aabb2::from_point(item.point));
    }
    b
}

#[cfg(test)]
mod tests {
    use super::KdTree;
    use foundation::bounds::Aabb2;

    fn grid(n: usize) -> Vec<[f64; 2]> {
        let mut points = Vec::new();
        for i in 0..n {
            for j in 0..n {
                points.push([i as f64, j as f64]);
            }
        }
        points
    }

    #[test]
    fn range_returns_indices_in_ascending_order() {
        let points = vec![[10.0, 0.0], [0.5, 0.5], [1.0, 1.0], [0.25, 0.25]];
        let tree = KdTree::build(&points, 1);

        let hits = tree.range(&Aabb2::new([0.25, 0.25], [1.5, 1.5]));
        assert_eq!(hits, vec![1, 2, 3]);
    }

    #[test]
    fn within_filters_by_radius_not_box() {
        let points = vec![[0.0, 0.0], [1.0, 1.0], [1.0, 0.0], [0.0, 2.0]];
        let tree = KdTree::build(&points, 2);

        // (1, 1) is inside the bounding square but sqrt(2) away.
        assert_eq!(tree.within([0.0, 0.0], 1.0), vec![0, 2]);
        assert_eq!(tree.within([0.0, 0.0], 2.0), vec![0, 1, 2, 3]);
    }

    #[test]
    fn deep_tree_matches_brute_force() {
        let points = grid(20);
        let tree = KdTree::build(&points, 4);
        let query = Aabb2::new([3.5, 7.0], [9.0, 12.5]);

        let expected: Vec<usize> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| query.contains(**p))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(tree.range(&query), expected);

        let near: Vec<usize> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| (p[0] - 10.0).powi(2) + (p[1] - 10.0).powi(2) <= 9.0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(tree.within([10.0, 10.0], 3.0), near);
    }

    #[test]
    fn duplicate_points_are_all_reported() {
        let points = vec![[0.5, 0.5]; 10];
        let tree = KdTree::build(&points, 3);
        assert_eq!(tree.within([0.5, 0.5], 0.0), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn empty_tree_answers_nothing() {
        let tree = KdTree::build(&[], 8);
        assert!(tree.is_empty());
        assert!(tree.range(&Aabb2::new([-1.0, -1.0], [1.0, 1.0])).is_empty());
    }
}
