use engine::Generation;
use model::{IntPoint, IntRect, NodeId};
use render_protocol::{NavNode, Picture};

/// Interactive nodes in document order.
#[derive(Debug, Clone, Default)]
pub struct NavTree {
    nodes: Vec<NavNode>,
}

impl NavTree {
    pub fn from_nodes(nodes: Vec<NavNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[NavNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find(&self, node: NodeId) -> Option<&NavNode> {
        self.nodes.iter().find(|entry| entry.node == node)
    }

    /// Topmost node containing `point`; later nodes paint over earlier ones.
    pub fn hit_test(&self, point: IntPoint) -> Option<&NavNode> {
        self.nodes
            .iter()
            .rev()
            .find(|entry| entry.bounds.contains_point(point))
    }

    /// Most specific node under the center of `rect`.
    pub fn find_at(&self, rect: IntRect) -> Option<&NavNode> {
        let center = rect.center();
        self.nodes
            .iter()
            .rev()
            .filter(|entry| entry.bounds.contains_point(center))
            .min_by_key(|entry| entry.bounds.area())
    }
}

/// Navigation and hit-test state captured from one document state. Never mutated once
/// published.
#[derive(Debug, Clone)]
pub struct FrameCacheSnapshot {
    pub(crate) nav: NavTree,
    pub(crate) cursor: Option<NodeId>,
    pub(crate) focus: Option<NodeId>,
    pub(crate) visible_rect: IntRect,
    pub(crate) text_generation: Generation,
    pub(crate) picture: Picture,
}

impl FrameCacheSnapshot {
    pub fn nav(&self) -> &NavTree {
        &self.nav
    }

    pub fn cursor(&self) -> Option<NodeId> {
        self.cursor
    }

    pub fn cursor_node(&self) -> Option<&NavNode> {
        self.cursor.and_then(|node| self.nav.find(node))
    }

    pub fn focus(&self) -> Option<NodeId> {
        self.focus
    }

    pub fn visible_rect(&self) -> IntRect {
        self.visible_rect
    }

    pub fn text_generation(&self) -> Generation {
        self.text_generation
    }

    pub fn picture(&self) -> &Picture {
        &self.picture
    }

    pub fn hit_test(&self, point: IntPoint) -> Option<&NavNode> {
        self.nav.hit_test(point)
    }

    pub fn find_at(&self, rect: IntRect) -> Option<&NavNode> {
        self.nav.find_at(rect)
    }
}
