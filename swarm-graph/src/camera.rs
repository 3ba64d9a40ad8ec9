//! Camera/follow controller
//!
//! Pure viewport math plus the follow-mode policy: while following a
//! live execution the camera centers each newly running node, but any
//! manual pan or zoom wins immediately and stays won until the user
//! re-enables follow.

use swarm_types::{FlowNode, Position, Size, Viewport};

pub const MIN_ZOOM: f64 = 0.25;
pub const MAX_ZOOM: f64 = 2.5;
/// Follow mode never zooms in past this, so a single node cannot fill
/// the screen.
pub const MAX_FOLLOW_ZOOM: f64 = 1.25;

const FIT_PADDING: f64 = 40.0;

#[derive(Debug, Clone)]
pub struct FollowCamera {
    pub viewport: Viewport,
    follow: bool,
    centered_node: Option<String>,
}

impl Default for FollowCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl FollowCamera {
    pub fn new() -> Self {
        Self {
            viewport: Viewport::default(),
            follow: true,
            centered_node: None,
        }
    }

    pub fn is_following(&self) -> bool {
        self.follow
    }

    /// Center the viewport on a node that just transitioned to running.
    /// Returns the new viewport, or None when follow is off or the node
    /// is already centered.
    pub fn follow_node(&mut self, node: &FlowNode, container: (f64, f64)) -> Option<Viewport> {
        if !self.follow {
            return None;
        }
        if self.centered_node.as_deref() == Some(node.id.as_str()) {
            return None;
        }
        let zoom = self.viewport.zoom.clamp(MIN_ZOOM, MAX_FOLLOW_ZOOM);
        let target = center_on(node.position, node.size, container, zoom);
        self.centered_node = Some(node.id.clone());
        self.viewport = target;
        Some(target)
    }

    /// A user-initiated pan/zoom. Disables follow until explicitly
    /// re-enabled; the controller never fights the user's camera.
    pub fn user_moved(&mut self, viewport: Viewport) {
        self.viewport = clamp_viewport(viewport);
        self.follow = false;
        self.centered_node = None;
    }

    pub fn set_follow(&mut self, on: bool) {
        self.follow = on;
        if !on {
            self.centered_node = None;
        }
    }

    /// Programmatic viewport change (fit-view, restored layout). Leaves
    /// follow mode as it is.
    pub fn restore(&mut self, viewport: Viewport) {
        self.viewport = clamp_viewport(viewport);
        self.centered_node = None;
    }
}

pub fn clamp_viewport(viewport: Viewport) -> Viewport {
    Viewport {
        zoom: viewport.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        ..viewport
    }
}

/// Pan so the given box sits in the middle of the container at `zoom`.
pub fn center_on(position: Position, size: Size, container: (f64, f64), zoom: f64) -> Viewport {
    let (cw, ch) = container;
    Viewport {
        x: cw / 2.0 - (position.x + size.width / 2.0) * zoom,
        y: ch / 2.0 - (position.y + size.height / 2.0) * zoom,
        zoom,
    }
}

/// Viewport that shows every node with padding, clamped to the zoom
/// bounds. None for an empty graph or a degenerate container.
pub fn fit_to_content(nodes: &[FlowNode], container: (f64, f64)) -> Option<Viewport> {
    let (cw, ch) = container;
    if nodes.is_empty() || cw <= 0.0 || ch <= 0.0 {
        return None;
    }

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for node in nodes {
        min_x = min_x.min(node.position.x);
        min_y = min_y.min(node.position.y);
        max_x = max_x.max(node.position.x + node.size.width);
        max_y = max_y.max(node.position.y + node.size.height);
    }

    let content_width = (max_x - min_x).max(1.0);
    let content_height = (max_y - min_y).max(1.0);

    let available_width = (cw - FIT_PADDING * 2.0).max(1.0);
    let available_height = (ch - FIT_PADDING * 2.0).max(1.0);
    let zoom = (available_width / content_width)
        .min(available_height / content_height)
        .clamp(MIN_ZOOM, MAX_ZOOM);

    let center_x = (min_x + max_x) / 2.0;
    let center_y = (min_y + max_y) / 2.0;
    Some(Viewport {
        x: cw / 2.0 - center_x * zoom,
        y: ch / 2.0 - center_y * zoom,
        zoom,
    })
}

/// Zoom by `factor` keeping the world point under `focus` (container
/// coordinates) stationary on screen.
pub fn zoom_at(viewport: Viewport, factor: f64, focus: (f64, f64)) -> Viewport {
    let zoom = (viewport.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
    let (fx, fy) = focus;
    let world_x = (fx - viewport.x) / viewport.zoom;
    let world_y = (fy - viewport.y) / viewport.zoom;
    Viewport {
        x: fx - world_x * zoom,
        y: fy - world_y * zoom,
        zoom,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_types::NodeKind;

    fn node_at(id: &str, x: f64, y: f64) -> FlowNode {
        let mut node = FlowNode::with_id(id, NodeKind::Agent, id);
        node.position = Position::new(x, y);
        node
    }

    #[test]
    fn center_on_puts_node_mid_container() {
        let viewport = center_on(
            Position::new(100.0, 100.0),
            Size {
                width: 180.0,
                height: 72.0,
            },
            (800.0, 600.0),
            1.0,
        );
        // Screen position of the node center must be the container center.
        assert_eq!(viewport.x + 190.0, 400.0);
        assert_eq!(viewport.y + 136.0, 300.0);
    }

    #[test]
    fn follow_recenter_skips_already_centered_node() {
        let mut camera = FollowCamera::new();
        let node = node_at("a", 50.0, 50.0);
        assert!(camera.follow_node(&node, (800.0, 600.0)).is_some());
        assert!(camera.follow_node(&node, (800.0, 600.0)).is_none());

        let other = node_at("b", 500.0, 500.0);
        assert!(camera.follow_node(&other, (800.0, 600.0)).is_some());
    }

    #[test]
    fn manual_move_disables_follow_until_reenabled() {
        let mut camera = FollowCamera::new();
        camera.user_moved(Viewport {
            x: -40.0,
            y: 10.0,
            zoom: 1.0,
        });
        assert!(!camera.is_following());
        assert!(camera
            .follow_node(&node_at("a", 0.0, 0.0), (800.0, 600.0))
            .is_none());

        camera.set_follow(true);
        assert!(camera
            .follow_node(&node_at("a", 0.0, 0.0), (800.0, 600.0))
            .is_some());
    }

    #[test]
    fn follow_zoom_is_bounded() {
        let mut camera = FollowCamera::new();
        camera.viewport.zoom = MAX_ZOOM;
        camera.set_follow(true);
        let viewport = camera
            .follow_node(&node_at("a", 0.0, 0.0), (800.0, 600.0))
            .unwrap();
        assert!(viewport.zoom <= MAX_FOLLOW_ZOOM);
    }

    #[test]
    fn fit_to_content_contains_all_nodes() {
        let nodes = vec![node_at("a", 0.0, 0.0), node_at("b", 2000.0, 1500.0)];
        let viewport = fit_to_content(&nodes, (800.0, 600.0)).unwrap();
        assert!(viewport.zoom >= MIN_ZOOM);
        assert!(viewport.zoom < 1.0);

        assert!(fit_to_content(&[], (800.0, 600.0)).is_none());
    }

    #[test]
    fn zoom_at_keeps_focus_point_stable() {
        let viewport = Viewport {
            x: 20.0,
            y: -30.0,
            zoom: 1.0,
        };
        let focus = (400.0, 300.0);
        let world_before = ((focus.0 - viewport.x) / viewport.zoom, (focus.1 - viewport.y) / viewport.zoom);
        let zoomed = zoom_at(viewport, 1.5, focus);
        let world_after = ((focus.0 - zoomed.x) / zoomed.zoom, (focus.1 - zoomed.y) / zoomed.zoom);
        assert!((world_before.0 - world_after.0).abs() < 1e-9);
        assert!((world_before.1 - world_after.1).abs() < 1e-9);
    }
}
