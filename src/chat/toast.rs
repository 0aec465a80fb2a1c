use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Toast {
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) raised_at: Instant,
}

/// Transient notifications, newest last. Expired ones are pruned by the
/// frame loop.
#[derive(Debug)]
pub(crate) struct Toasts {
    items: VecDeque<Toast>,
    ttl: Duration,
}

impl Toasts {
    const MAX_VISIBLE: usize = 3;

    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            items: VecDeque::new(),
            ttl,
        }
    }

    pub(crate) fn raise(&mut self, title: &str, body: &str) {
        self.items.push_back(Toast {
            title: title.to_string(),
            body: body.to_string(),
            raised_at: Instant::now(),
        });
        while self.items.len() > Self::MAX_VISIBLE {
            self.items.pop_front();
        }
    }

    pub(crate) fn prune(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.items
            .retain(|t| now.saturating_duration_since(t.raised_at) < ttl);
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.items.iter()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}
