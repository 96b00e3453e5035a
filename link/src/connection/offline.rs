use log::info;
use std::collections::VecDeque;
use std::fmt;

use crate::error::Result;
use crate::rest::{PendingRequest, Response};

/// Delivers the result of a buffered operation to its caller.
pub type Completion = Box<dyn FnOnce(Result<Response>) + Send>;

/// An item mutation issued while offline.
pub struct BufferedOperation {
    pub request: PendingRequest,
    pub complete: Completion,
}

impl fmt::Debug for BufferedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedOperation")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

/// FIFO of buffered operations, replayed one at a time on reconnect.
#[derive(Debug, Default)]
pub struct OfflineBuffer {
    queue: VecDeque<BufferedOperation>,
    draining: bool,
}

impl OfflineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, operation: BufferedOperation) {
        self.queue.push_back(operation);
        info!(
            "[OFFLINE] Buffered {} (queued={})",
            operation_name(self.queue.back()),
            self.queue.len()
        );
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Claim the drain. Returns `false` if a drain is already running or
    /// there is nothing to replay.
    pub fn start_drain(&mut self) -> bool {
        if self.draining || self.queue.is_empty() {
            return false;
        }
        self.draining = true;
        true
    }

    /// Next operation of a running drain; ends the drain when the queue is
    /// empty.
    pub fn next_for_drain(&mut self) -> Option<BufferedOperation> {
        let next = self.queue.pop_front();
        if next.is_none() {
            self.draining = false;
        }
        next
    }

    /// Stop a running drain, leaving the remaining operations queued.
    pub fn pause_drain(&mut self) {
        self.draining = false;
    }
}

fn operation_name(operation: Option<&BufferedOperation>) -> &'static str {
    operation.map_or("operation", |op| op.request.operation.name())
}
