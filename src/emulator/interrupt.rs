/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use std::collections::VecDeque;

/// Capacity of the pending-interrupt FIFO (§4.9). A 257th enqueue
/// while queueing is enabled catches fire rather than silently
/// dropping or growing unbounded.
pub const QUEUE_CAPACITY: usize = 256;

/// The interrupt queue and its queueing-enabled flag. `trigger`/`send`
/// only decide *whether* to enqueue or deliver immediately; the CPU
/// still performs the push-PC/push-A/set-PC/set-A side effects
/// itself, since those touch registers and memory this type doesn't
/// own.
#[derive(Debug, Default)]
pub struct InterruptQueue {
    pending: VecDeque<u16>,
    queueing: bool,
}

impl InterruptQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_queueing(&self) -> bool {
        self.queueing
    }

    pub fn set_queueing(&mut self, enabled: bool) {
        self.queueing = enabled;
    }

    /// Enqueues a message. Returns `false` if the queue was already at
    /// capacity, signaling the caller to set the machine on fire.
    pub fn enqueue(&mut self, message: u16) -> bool {
        if self.pending.len() >= QUEUE_CAPACITY {
            return false;
        }
        self.pending.push_back(message);
        true
    }

    pub fn dequeue(&mut self) -> Option<u16> {
        self.pending.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_respects_capacity() {
        let mut q = InterruptQueue::new();
        for i in 0..QUEUE_CAPACITY {
            assert!(q.enqueue(i as u16));
        }
        assert!(!q.enqueue(0xffff));
    }

    #[test]
    fn dequeue_is_fifo() {
        let mut q = InterruptQueue::new();
        q.enqueue(1);
        q.enqueue(2);
        assert_eq!(q.dequeue(), Some(1));
        assert_eq!(q.dequeue(), Some(2));
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn queueing_flag_defaults_disabled() {
        let q = InterruptQueue::new();
        assert!(!q.is_queueing());
    }
}
