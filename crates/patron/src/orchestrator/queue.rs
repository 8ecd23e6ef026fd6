//! Pending job queue

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::job::Job;

/// FIFO queue of jobs waiting for the next run
///
/// Internally synchronized; `push` may be called from any number of tasks.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job to the tail
    pub fn push(&self, job: Job) {
        self.jobs.lock().push_back(job);
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Take every queued job, in submission order
    pub fn drain(&self) -> Vec<Job> {
        Vec::from(std::mem::take(&mut *self.jobs.lock()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_push_and_drain_fifo() {
        let queue = JobQueue::new();
        queue.push(Job::new(3));
        queue.push(Job::new(1));
        queue.push(Job::new(2));

        assert_eq!(queue.len(), 3);

        let ids: Vec<u64> = queue.drain().into_iter().map(|j| j.id.0).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_concurrent_push() {
        let queue = Arc::new(JobQueue::new());

        let threads: Vec<_> = (0..4u64)
            .map(|t| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        queue.push(Job::new(t * 100 + i));
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(queue.len(), 100);
    }
}
