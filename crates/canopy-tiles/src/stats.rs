//! Per-frame statistics and deferred load-progress notifications.

use std::fmt;

use tracing::info;

use crate::frame::Pass;

/// Counters describing the last update.
///
/// `visited`, `selected` and `number_of_commands` are reset at the start of
/// every update; pending requests and processing tiles are running gauges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Tiles popped off the traversal stack.
    pub visited: usize,
    /// Tiles selected for rendering.
    pub selected: usize,
    /// Draw commands reported by the render sink.
    pub number_of_commands: usize,
    /// Content requests admitted and not yet fetched.
    pub number_of_pending_requests: usize,
    /// Tiles in the processing queue.
    pub number_processing: usize,
}

impl Statistics {
    pub(crate) fn clear_frame(&mut self) {
        self.visited = 0;
        self.selected = 0;
        self.number_of_commands = 0;
    }

    pub(crate) fn progress(&self) -> LoadProgress {
        LoadProgress {
            pending_requests: self.number_of_pending_requests,
            processing: self.number_processing,
        }
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Visited: {}, Selected: {}, Commands: {}, Requests: {}, Processing: {}",
            self.visited,
            self.selected,
            self.number_of_commands,
            self.number_of_pending_requests,
            self.number_processing
        )
    }
}

/// Logs the statistics line whenever it differs from the last one printed.
#[derive(Debug, Default)]
pub(crate) struct StatisticsPrinter {
    last: Option<Statistics>,
}

impl StatisticsPrinter {
    /// Returns `true` if a line was logged.
    pub(crate) fn report(&mut self, stats: &Statistics, pass: Pass) -> bool {
        if self.last.as_ref() == Some(stats) {
            return false;
        }
        self.last = Some(*stats);

        // The pick frustum is much narrower, so its numbers differ from the color pass.
        let prefix = match pass {
            Pass::Render => "[Color]: ",
            Pass::Pick => "[Pick ]: ",
        };
        info!("{prefix}{stats}");
        true
    }
}

/// Snapshot delivered to load-progress listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadProgress {
    pub pending_requests: usize,
    pub processing: usize,
}

/// Callback receiving load-progress snapshots.
pub type LoadProgressListener = Box<dyn FnMut(LoadProgress)>;

/// Listeners plus the snapshots waiting for the end of the frame.
#[derive(Default)]
pub(crate) struct ProgressEvents {
    listeners: Vec<LoadProgressListener>,
    queued: Vec<LoadProgress>,
}

impl ProgressEvents {
    pub(crate) fn subscribe(&mut self, listener: LoadProgressListener) {
        self.listeners.push(listener);
    }

    /// Queue a snapshot. Nothing is recorded while nobody listens.
    pub(crate) fn enqueue(&mut self, progress: LoadProgress) {
        if !self.listeners.is_empty() {
            self.queued.push(progress);
        }
    }

    #[cfg(test)]
    pub(crate) fn queued(&self) -> usize {
        self.queued.len()
    }

    /// Deliver queued snapshots in order to every listener.
    pub(crate) fn flush(&mut self) {
        for progress in self.queued.drain(..) {
            for listener in &mut self.listeners {
                listener(progress);
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.listeners.clear();
        self.queued.clear();
    }
}

impl fmt::Debug for ProgressEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressEvents")
            .field("listeners", &self.listeners.len())
            .field("queued", &self.queued)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_clear_frame_keeps_gauges() {
        let mut stats = Statistics {
            visited: 4,
            selected: 2,
            number_of_commands: 7,
            number_of_pending_requests: 3,
            number_processing: 1,
        };
        stats.clear_frame();
        assert_eq!(stats.visited, 0);
        assert_eq!(stats.selected, 0);
        assert_eq!(stats.number_of_commands, 0);
        assert_eq!(stats.number_of_pending_requests, 3);
        assert_eq!(stats.number_processing, 1);
    }

    #[test]
    fn test_display_line() {
        let stats = Statistics {
            visited: 5,
            selected: 2,
            number_of_commands: 3,
            number_of_pending_requests: 1,
            number_processing: 0,
        };
        assert_eq!(
            stats.to_string(),
            "Visited: 5, Selected: 2, Commands: 3, Requests: 1, Processing: 0"
        );
    }

    /// The line is only printed when a value changed.
    #[test]
    fn test_printer_reports_changes_only() {
        let mut printer = StatisticsPrinter::default();
        let mut stats = Statistics::default();
        assert!(printer.report(&stats, Pass::Render));
        assert!(!printer.report(&stats, Pass::Render));
        stats.visited = 1;
        assert!(printer.report(&stats, Pass::Pick));
    }

    /// Without listeners nothing is queued.
    #[test]
    fn test_enqueue_without_listeners_is_dropped() {
        let mut events = ProgressEvents::default();
        events.enqueue(LoadProgress {
            pending_requests: 1,
            processing: 0,
        });
        assert_eq!(events.queued(), 0);
    }

    /// Snapshots reach listeners only on flush, in order.
    #[test]
    fn test_flush_delivers_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut events = ProgressEvents::default();
        let sink = Rc::clone(&seen);
        events.subscribe(Box::new(move |p| sink.borrow_mut().push(p.pending_requests)));

        for pending in [1, 2, 1] {
            events.enqueue(LoadProgress {
                pending_requests: pending,
                processing: 0,
            });
        }
        assert!(seen.borrow().is_empty());

        events.flush();
        assert_eq!(*seen.borrow(), vec![1, 2, 1]);
        assert_eq!(events.queued(), 0);
    }
}
