/// Keeps the transcript view pinned to the newest line unless the reader has
/// scrolled further than `threshold` lines up.
#[derive(Debug)]
pub(crate) struct ScrollFollow {
    // lines between the bottom of the view and the end of the content
    offset: usize,
    threshold: usize,
    total: usize,
    viewport: usize,
}

impl ScrollFollow {
    pub(crate) fn new(threshold: usize) -> Self {
        Self {
            offset: 0,
            threshold,
            total: 0,
            viewport: 0,
        }
    }

    fn max_offset(&self) -> usize {
        self.total.saturating_sub(self.viewport)
    }

    #[cfg(test)]
    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn is_following(&self) -> bool {
        self.offset <= self.threshold
    }

    /// The "jump to bottom" affordance is shown while this is true.
    pub(crate) fn shows_jump(&self) -> bool {
        !self.is_following()
    }

    /// Called once per frame with the wrapped line count and view height.
    pub(crate) fn sync(&mut self, total: usize, viewport: usize) {
        let grown = total.saturating_sub(self.total);
        let following = self.is_following();
        self.total = total;
        self.viewport = viewport;
        if grown > 0 {
            if following {
                self.offset = 0;
            } else {
                // keep the lines the reader is looking at in place
                self.offset += grown;
            }
        }
        self.offset = self.offset.min(self.max_offset());
    }

    pub(crate) fn scroll_up(&mut self, lines: usize) {
        self.offset = (self.offset + lines).min(self.max_offset());
    }

    pub(crate) fn scroll_down(&mut self, lines: usize) {
        self.offset = self.offset.saturating_sub(lines);
    }

    pub(crate) fn jump_to_bottom(&mut self) {
        self.offset = 0;
    }

    /// Index of the first content line visible in the view.
    pub(crate) fn first_visible(&self) -> usize {
        self.max_offset().saturating_sub(self.offset)
    }
}
