use model::NodeId;
use parking_lot::Mutex;
use render_protocol::ButtonOverlay;

/// Form-control decorations collected while recording, bound to nodes by id only.
#[derive(Debug, Default)]
pub struct ButtonOverlayTracker {
    buttons: Mutex<Vec<ButtonOverlay>>,
}

impl ButtonOverlayTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy handed to a recording pass.
    pub fn snapshot(&self) -> Vec<ButtonOverlay> {
        self.buttons.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.buttons.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.lock().is_empty()
    }

    /// Folds `updated` into the tracked list, then drops entries whose node is gone.
    /// `is_live` runs with the list unlocked.
    pub fn merge(&self, updated: Vec<ButtonOverlay>, is_live: impl Fn(NodeId) -> bool) {
        let mut merged = self.snapshot();
        for overlay in updated {
            match merged.iter_mut().find(|entry| entry.node == overlay.node) {
                Some(entry) => {
                    entry.rect = overlay.rect;
                    entry.state = overlay.state;
                }
                None => merged.push(overlay),
            }
        }
        let mut index = 0;
        while index < merged.len() {
            if is_live(merged[index].node) {
                index += 1;
            } else {
                tracing::trace!(node = ?merged[index].node, "dropping overlay for dead node");
                merged.swap_remove(index);
            }
        }
        *self.buttons.lock() = merged;
    }

    pub fn clear(&self) {
        self.buttons.lock().clear();
    }
}
