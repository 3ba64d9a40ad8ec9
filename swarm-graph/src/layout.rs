//! Hierarchical layout engine
//!
//! Pure position assignment for a node/edge set: rank nodes by
//! longest-path depth from the roots, order each rank with a barycenter
//! pass, then refine with local swaps that strictly reduce edge
//! crossings. Deterministic for identical input, so results can be
//! diffed against persisted layouts and asserted in tests.
//!
//! Malformed input (no rankable roots, no usable edges) degrades to a
//! square grid instead of an empty canvas.

use std::collections::{BTreeMap, HashMap, VecDeque};

use swarm_types::{FlowEdge, FlowNode, Position};

/// Which axis carries depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutDirection {
    /// Depth grows downward (y), siblings spread horizontally.
    #[default]
    TopToBottom,
    /// Depth grows rightward (x), siblings spread vertically.
    LeftToRight,
}

#[derive(Debug, Clone)]
pub struct LayoutOptions {
    pub direction: LayoutDirection,
    /// Distance between consecutive depth levels.
    pub rank_spacing: f64,
    /// Distance between siblings within one level.
    pub node_spacing: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::TopToBottom,
            rank_spacing: 150.0,
            node_spacing: 230.0,
        }
    }
}

const LAYOUT_MARGIN: f64 = 60.0;
const CROSSING_PASSES: usize = 4;

/// Compute positions for the given graph. Returns a new node list with
/// `position` assigned; the input is never mutated.
pub fn compute_layout(
    nodes: &[FlowNode],
    edges: &[FlowEdge],
    options: &LayoutOptions,
) -> Vec<FlowNode> {
    if nodes.is_empty() {
        return Vec::new();
    }

    let index_of: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    // Edges with a missing endpoint carry no layout information.
    let usable: Vec<(usize, usize)> = edges
        .iter()
        .filter_map(|e| {
            let s = *index_of.get(e.source.as_str())?;
            let t = *index_of.get(e.target.as_str())?;
            if s == t {
                None
            } else {
                Some((s, t))
            }
        })
        .collect();

    if usable.is_empty() && nodes.len() >= 2 {
        return grid_layout(nodes, options);
    }

    let Some(depths) = assign_depths(nodes.len(), &usable) else {
        // Every node sits on a cycle; nothing can be ranked.
        tracing::warn!("layout: no rankable roots, falling back to grid");
        return grid_layout(nodes, options);
    };

    // Bucket into ordered levels.
    let mut levels: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, d) in depths.iter().enumerate() {
        levels.entry(*d).or_default().push(i);
    }

    let mut ordered: Vec<Vec<usize>> = Vec::with_capacity(levels.len());
    let mut order_in_level: HashMap<usize, (usize, usize)> = HashMap::new();
    let mut parents: HashMap<usize, Vec<usize>> = HashMap::new();
    for (s, t) in &usable {
        parents.entry(*t).or_default().push(*s);
    }

    for (level_index, (_, mut members)) in levels.into_iter().enumerate() {
        if level_index == 0 {
            members.sort_by(|a, b| {
                nodes[*a]
                    .label
                    .cmp(&nodes[*b].label)
                    .then_with(|| nodes[*a].id.cmp(&nodes[*b].id))
            });
        } else {
            // Barycenter of the already-placed parents, measured as their
            // centered index within their own level.
            let mut keyed: Vec<(f64, usize)> = members
                .iter()
                .map(|&m| {
                    let placed: Vec<f64> = parents
                        .get(&m)
                        .into_iter()
                        .flatten()
                        .filter_map(|p| order_in_level.get(p))
                        .map(|&(index, count)| centered_offset(index, count))
                        .collect();
                    let key = if placed.is_empty() {
                        0.0
                    } else {
                        placed.iter().sum::<f64>() / placed.len() as f64
                    };
                    (key, m)
                })
                .collect();
            keyed.sort_by(|a, b| {
                a.0.partial_cmp(&b.0)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| nodes[a.1].label.cmp(&nodes[b.1].label))
                    .then_with(|| nodes[a.1].id.cmp(&nodes[b.1].id))
            });
            members = keyed.into_iter().map(|(_, m)| m).collect();
        }

        let count = members.len();
        for (index, &m) in members.iter().enumerate() {
            order_in_level.insert(m, (index, count));
        }
        ordered.push(members);
    }

    reduce_crossings(&mut ordered, &usable);

    // Coordinates: primary axis from depth, cross axis centered per level.
    let mut out = nodes.to_vec();
    for (depth, members) in ordered.iter().enumerate() {
        let count = members.len();
        for (index, &m) in members.iter().enumerate() {
            let primary = depth as f64 * options.rank_spacing;
            let cross = centered_offset(index, count) * options.node_spacing;
            out[m].position = match options.direction {
                LayoutDirection::TopToBottom => Position::new(cross, primary),
                LayoutDirection::LeftToRight => Position::new(primary, cross),
            };
        }
    }

    shift_to_margin(&mut out);
    out
}

/// Offset of slot `index` out of `count`, centered around zero.
fn centered_offset(index: usize, count: usize) -> f64 {
    index as f64 - (count.saturating_sub(1)) as f64 / 2.0
}

/// Longest-path depth from the roots via breadth-first relaxation. A node
/// with parents at depths 1 and 3 lands at depth 4, so it always renders
/// after both. Nodes unreachable from any root stay at depth 0. Returns
/// None when no root exists (pure cycle).
fn assign_depths(node_count: usize, edges: &[(usize, usize)]) -> Option<Vec<usize>> {
    let mut incoming = vec![0usize; node_count];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for (s, t) in edges {
        incoming[*t] += 1;
        children[*s].push(*t);
    }

    let roots: Vec<usize> = (0..node_count).filter(|i| incoming[*i] == 0).collect();
    if roots.is_empty() {
        return None;
    }

    let mut depth = vec![0usize; node_count];
    let mut queue: VecDeque<usize> = roots.into_iter().collect();
    while let Some(u) = queue.pop_front() {
        for &v in &children[u] {
            let candidate = depth[u] + 1;
            // Depth is bounded by the node count in any acyclic path; a
            // larger value means we are walking a cycle.
            if candidate > node_count {
                tracing::warn!("layout: cycle detected during depth assignment");
                continue;
            }
            if candidate > depth[v] {
                depth[v] = candidate;
                queue.push_back(v);
            }
        }
    }
    Some(depth)
}

/// Adjacent-pair swaps within each level, kept only when they strictly
/// reduce crossings against both neighboring levels. Bounded passes.
fn reduce_crossings(levels: &mut [Vec<usize>], edges: &[(usize, usize)]) {
    for _ in 0..CROSSING_PASSES {
        let mut improved = false;
        for level in 0..levels.len() {
            let mut index = 0;
            while index + 1 < levels[level].len() {
                let before = crossings_around(levels, edges, level);
                levels[level].swap(index, index + 1);
                let after = crossings_around(levels, edges, level);
                if after < before {
                    improved = true;
                } else {
                    levels[level].swap(index, index + 1);
                }
                index += 1;
            }
        }
        if !improved {
            break;
        }
    }
}

/// Crossing count between `level` and both of its neighbors.
fn crossings_around(levels: &[Vec<usize>], edges: &[(usize, usize)], level: usize) -> usize {
    let mut total = 0;
    if level > 0 {
        total += count_crossings(&levels[level - 1], &levels[level], edges);
    }
    if level + 1 < levels.len() {
        total += count_crossings(&levels[level], &levels[level + 1], edges);
    }
    total
}

/// Pairwise edge-segment crossings between two ordered levels. Two edges
/// (a1, b1) and (a2, b2) cross when their endpoint orders invert.
fn count_crossings(upper: &[usize], lower: &[usize], edges: &[(usize, usize)]) -> usize {
    let upper_pos: HashMap<usize, usize> =
        upper.iter().enumerate().map(|(i, &n)| (n, i)).collect();
    let lower_pos: HashMap<usize, usize> =
        lower.iter().enumerate().map(|(i, &n)| (n, i)).collect();

    let segments: Vec<(usize, usize)> = edges
        .iter()
        .filter_map(|(s, t)| {
            match (
                upper_pos.get(s),
                lower_pos.get(t),
                upper_pos.get(t),
                lower_pos.get(s),
            ) {
                (Some(&a), Some(&b), _, _) => Some((a, b)),
                (_, _, Some(&a), Some(&b)) => Some((a, b)),
                _ => None,
            }
        })
        .collect();

    let mut crossings = 0;
    for i in 0..segments.len() {
        for j in (i + 1)..segments.len() {
            let (a1, b1) = segments[i];
            let (a2, b2) = segments[j];
            if (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2) {
                crossings += 1;
            }
        }
    }
    crossings
}

/// Square grid placement: the safety net for graphs the ranker cannot
/// handle. Row length is the ceiling of the square root of the node count.
fn grid_layout(nodes: &[FlowNode], options: &LayoutOptions) -> Vec<FlowNode> {
    let columns = (nodes.len() as f64).sqrt().ceil().max(1.0) as usize;
    let mut out = nodes.to_vec();
    for (i, node) in out.iter_mut().enumerate() {
        let column = i % columns;
        let row = i / columns;
        node.position = Position::new(
            LAYOUT_MARGIN + column as f64 * options.node_spacing,
            LAYOUT_MARGIN + row as f64 * options.rank_spacing,
        );
    }
    out
}

/// Translate all positions so the minimum lands at the layout margin.
fn shift_to_margin(nodes: &mut [FlowNode]) {
    let min_x = nodes
        .iter()
        .map(|n| n.position.x)
        .fold(f64::INFINITY, f64::min);
    let min_y = nodes
        .iter()
        .map(|n| n.position.y)
        .fold(f64::INFINITY, f64::min);
    for node in nodes {
        node.position.x += LAYOUT_MARGIN - min_x;
        node.position.y += LAYOUT_MARGIN - min_y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_types::NodeKind;

    fn node(id: &str) -> FlowNode {
        FlowNode::with_id(id, NodeKind::Agent, id)
    }

    fn edge(source: &str, target: &str) -> FlowEdge {
        FlowEdge::new(source, target, None)
    }

    #[test]
    fn layout_is_deterministic() {
        let nodes = vec![node("a"), node("b"), node("c"), node("d")];
        let edges = vec![edge("a", "b"), edge("a", "c"), edge("b", "d")];
        let options = LayoutOptions::default();

        let first = compute_layout(&nodes, &edges, &options);
        let second = compute_layout(&nodes, &edges, &options);
        for (x, y) in first.iter().zip(second.iter()) {
            assert_eq!(x.position, y.position);
        }
    }

    #[test]
    fn input_is_not_mutated() {
        let nodes = vec![node("a"), node("b")];
        let edges = vec![edge("a", "b")];
        let _ = compute_layout(&nodes, &edges, &LayoutOptions::default());
        assert_eq!(nodes[0].position, Position::default());
    }

    #[test]
    fn linear_graph_top_to_bottom() {
        let nodes = vec![node("start"), node("agent1"), node("end")];
        let edges = vec![edge("start", "agent1"), edge("agent1", "end")];
        let out = compute_layout(&nodes, &edges, &LayoutOptions::default());

        let by_id = |id: &str| out.iter().find(|n| n.id == id).unwrap();
        assert!(by_id("start").position.y < by_id("agent1").position.y);
        assert!(by_id("agent1").position.y < by_id("end").position.y);
    }

    #[test]
    fn diamond_depth_uses_longest_path() {
        let nodes = vec![node("a"), node("b"), node("c"), node("d")];
        let edges = vec![edge("a", "b"), edge("a", "c"), edge("b", "d"), edge("c", "d")];
        let options = LayoutOptions::default();
        let out = compute_layout(&nodes, &edges, &options);

        let by_id = |id: &str| out.iter().find(|n| n.id == id).unwrap();
        let rank = |id: &str| {
            ((by_id(id).position.y - by_id("a").position.y) / options.rank_spacing).round() as i64
        };
        assert_eq!(rank("b"), 1);
        assert_eq!(rank("c"), 1);
        assert_eq!(rank("d"), 2);
    }

    #[test]
    fn node_with_parents_at_uneven_depths_renders_after_both() {
        // a -> b -> c -> d and a -> d: d must land below c, not beside b.
        let nodes = vec![node("a"), node("b"), node("c"), node("d")];
        let edges = vec![edge("a", "b"), edge("b", "c"), edge("c", "d"), edge("a", "d")];
        let out = compute_layout(&nodes, &edges, &LayoutOptions::default());

        let by_id = |id: &str| out.iter().find(|n| n.id == id).unwrap();
        assert!(by_id("d").position.y > by_id("c").position.y);
    }

    #[test]
    fn left_to_right_swaps_axes() {
        let nodes = vec![node("a"), node("b")];
        let edges = vec![edge("a", "b")];
        let out = compute_layout(
            &nodes,
            &edges,
            &LayoutOptions {
                direction: LayoutDirection::LeftToRight,
                ..Default::default()
            },
        );
        let by_id = |id: &str| out.iter().find(|n| n.id == id).unwrap();
        assert!(by_id("a").position.x < by_id("b").position.x);
        assert_eq!(by_id("a").position.y, by_id("b").position.y);
    }

    #[test]
    fn zero_edges_uses_grid_with_distinct_positions() {
        let nodes: Vec<FlowNode> = ["a", "b", "c", "d", "e"].iter().map(|id| node(id)).collect();
        let out = compute_layout(&nodes, &[], &LayoutOptions::default());

        assert_eq!(out.len(), 5);
        for i in 0..out.len() {
            for j in (i + 1)..out.len() {
                assert_ne!(
                    out[i].position, out[j].position,
                    "nodes {} and {} overlap",
                    out[i].id, out[j].id
                );
            }
        }
    }

    #[test]
    fn pure_cycle_falls_back_to_grid_without_panic() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![edge("a", "b"), edge("b", "c"), edge("c", "a")];
        let out = compute_layout(&nodes, &edges, &LayoutOptions::default());

        assert_eq!(out.len(), 3);
        assert_ne!(out[0].position, out[1].position);
    }

    #[test]
    fn cycle_reachable_from_root_still_ranks() {
        // root -> a -> b -> a: the cycle is tolerated, positions come back.
        let nodes = vec![node("root"), node("a"), node("b")];
        let edges = vec![edge("root", "a"), edge("a", "b"), edge("b", "a")];
        let out = compute_layout(&nodes, &edges, &LayoutOptions::default());
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn unreachable_node_defaults_to_root_level() {
        let nodes = vec![node("a"), node("b"), node("island")];
        let edges = vec![edge("a", "b")];
        let out = compute_layout(&nodes, &edges, &LayoutOptions::default());

        let by_id = |id: &str| out.iter().find(|n| n.id == id).unwrap();
        assert_eq!(by_id("island").position.y, by_id("a").position.y);
    }

    #[test]
    fn crossing_count_detects_inversion() {
        // upper [0, 1], lower [2, 3]; edges 0->3 and 1->2 must cross.
        let upper = vec![0, 1];
        let lower = vec![2, 3];
        assert_eq!(count_crossings(&upper, &lower, &[(0, 3), (1, 2)]), 1);
        assert_eq!(count_crossings(&upper, &lower, &[(0, 2), (1, 3)]), 0);
    }

    #[test]
    fn barycenter_places_children_under_parents() {
        // Parents p1, p2; c2 hangs off p1 and c1 off p2. Alphabetical order
        // would cross the edges; the barycenter pass must not.
        let nodes = vec![node("p1"), node("p2"), node("c1"), node("c2")];
        let edges = vec![edge("p1", "c2"), edge("p2", "c1")];
        let out = compute_layout(&nodes, &edges, &LayoutOptions::default());

        let by_id = |id: &str| out.iter().find(|n| n.id == id).unwrap();
        let p1_before_p2 = by_id("p1").position.x < by_id("p2").position.x;
        let c2_before_c1 = by_id("c2").position.x < by_id("c1").position.x;
        assert_eq!(p1_before_p2, c2_before_c1);
    }
}
