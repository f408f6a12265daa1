use model::{IntPoint, IntRect};
use thiserror::Error;

/// Scroll position and window geometry as last reported by the UI side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    scroll_x: i32,
    scroll_y: i32,
    width: i32,
    height: i32,
    screen_width: i32,
    scale: f32,
    max_x_scroll: i32,
    max_y_scroll: i32,
    mouse_position: IntPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ViewStateError {
    #[error("view width must be positive, got {0}")]
    InvalidWidth(i32),
    #[error("view height must not be negative, got {0}")]
    InvalidHeight(i32),
    #[error("screen width must not be negative, got {0}")]
    InvalidScreenWidth(i32),
    #[error("scale must be finite and positive")]
    InvalidScale,
    #[error("max scroll does not fit in view coordinates")]
    ScrollOverflow,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            scroll_x: 0,
            scroll_y: 0,
            width: 0,
            height: 0,
            screen_width: 0,
            scale: 1.0,
            max_x_scroll: 0,
            max_y_scroll: 0,
            mouse_position: IntPoint::default(),
        }
    }
}

impl ViewState {
    pub fn scroll_offset(&self) -> IntPoint {
        IntPoint::new(self.scroll_x, self.scroll_y)
    }

    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    pub fn screen_width(&self) -> i32 {
        self.screen_width
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn max_scroll(&self) -> (i32, i32) {
        (self.max_x_scroll, self.max_y_scroll)
    }

    /// Returns true when the offset actually moved.
    pub fn set_scroll_offset(&mut self, x: i32, y: i32) -> bool {
        if self.scroll_x == x && self.scroll_y == y {
            return false;
        }
        self.scroll_x = x;
        self.scroll_y = y;
        true
    }

    /// Applies a new window size. Returns true when width, height or screen width changed,
    /// which means the document has to be laid out again.
    pub fn set_size(
        &mut self,
        width: i32,
        height: i32,
        screen_width: i32,
        scale: f32,
    ) -> Result<bool, ViewStateError> {
        if width <= 0 {
            return Err(ViewStateError::InvalidWidth(width));
        }
        if height < 0 {
            return Err(ViewStateError::InvalidHeight(height));
        }
        if screen_width < 0 {
            return Err(ViewStateError::InvalidScreenWidth(screen_width));
        }
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ViewStateError::InvalidScale);
        }

        let max_y_scroll = (screen_width as i64 * height as i64 / width as i64) >> 2;
        let max_y_scroll =
            i32::try_from(max_y_scroll).map_err(|_| ViewStateError::ScrollOverflow)?;

        let changed =
            self.width != width || self.height != height || self.screen_width != screen_width;
        self.width = width;
        self.height = height;
        self.screen_width = screen_width;
        self.scale = scale;
        self.max_x_scroll = screen_width >> 2;
        self.max_y_scroll = max_y_scroll;
        Ok(changed)
    }

    /// Content-space rectangle currently on screen.
    pub fn visible_rect(&self) -> IntRect {
        IntRect::from_xywh(self.scroll_x, self.scroll_y, self.width, self.height)
    }

    pub fn content_to_window(&self, point: IntPoint) -> IntPoint {
        point.offset_by(-self.scroll_x, -self.scroll_y)
    }

    /// Remembers `point` (content space) as the latest mouse position, window-relative.
    pub fn record_mouse(&mut self, point: IntPoint) -> IntPoint {
        self.mouse_position = self.content_to_window(point);
        self.mouse_position
    }

    pub fn mouse_position(&self) -> IntPoint {
        self.mouse_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_size_derives_max_scroll_from_screen_width() {
        let mut view = ViewState::default();
        let changed = view.set_size(800, 600, 480, 1.5).expect("set size");
        assert!(changed);
        assert_eq!(view.max_scroll(), (120, 90));
        assert_eq!(view.set_size(800, 600, 480, 2.0), Ok(false));
        assert_eq!(view.scale(), 2.0);
    }

    #[test]
    fn set_size_rejects_invalid_inputs() {
        let mut view = ViewState::default();
        assert_eq!(
            view.set_size(0, 600, 480, 1.0),
            Err(ViewStateError::InvalidWidth(0))
        );
        assert_eq!(
            view.set_size(800, -1, 480, 1.0),
            Err(ViewStateError::InvalidHeight(-1))
        );
        assert_eq!(
            view.set_size(800, 600, 480, f32::NAN),
            Err(ViewStateError::InvalidScale)
        );
        assert_eq!(view, ViewState::default());
    }

    #[test]
    fn mouse_position_is_window_relative() {
        let mut view = ViewState::default();
        view.set_size(320, 480, 320, 1.0).expect("set size");
        assert!(view.set_scroll_offset(100, 250));
        assert!(!view.set_scroll_offset(100, 250));
        assert_eq!(view.visible_rect(), IntRect::from_xywh(100, 250, 320, 480));
        assert_eq!(view.record_mouse(IntPoint::new(150, 300)), IntPoint::new(50, 50));
        assert_eq!(view.mouse_position(), IntPoint::new(50, 50));
    }
}
