//! TaskQueue — ordered, capacity-bounded holding area for pending tasks

use poolclaw_core::{Error, Result, TaskId};
use std::collections::VecDeque;

#[derive(Debug)]
pub struct TaskQueue {
    entries: VecDeque<TaskId>,
    capacity: usize,
}

impl TaskQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    /// Append a new submission (FIFO).
    pub fn push_back(&mut self, id: TaskId) -> Result<()> {
        self.check_room()?;
        self.entries.push_back(id);
        Ok(())
    }

    /// Re-enter at the head; retried tasks run before newer submissions.
    pub fn push_front(&mut self, id: TaskId) -> Result<()> {
        self.check_room()?;
        self.entries.push_front(id);
        Ok(())
    }

    fn check_room(&self) -> Result<()> {
        if self.entries.len() >= self.capacity {
            return Err(Error::QueueFull {
                depth: self.entries.len(),
            });
        }
        Ok(())
    }

    pub fn remove(&mut self, id: &TaskId) -> bool {
        match self.entries.iter().position(|e| e == id) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.entries.contains(id)
    }

    pub fn snapshot(&self) -> Vec<TaskId> {
        self.entries.iter().cloned().collect()
    }

    pub fn drain(&mut self) -> Vec<TaskId> {
        self.entries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let mut q = TaskQueue::new(4);
        q.push_back("a".into()).unwrap();
        q.push_back("b".into()).unwrap();
        assert_eq!(q.snapshot(), vec![TaskId::new("a"), TaskId::new("b")]);
    }

    #[test]
    fn push_front_jumps_the_line() {
        let mut q = TaskQueue::new(4);
        q.push_back("new".into()).unwrap();
        q.push_front("retry".into()).unwrap();
        assert_eq!(q.snapshot()[0], TaskId::new("retry"));
    }

    #[test]
    fn capacity_is_enforced() {
        let mut q = TaskQueue::new(1);
        q.push_back("a".into()).unwrap();
        assert!(matches!(
            q.push_back("b".into()),
            Err(Error::QueueFull { depth: 1 })
        ));
        assert!(q.push_front("c".into()).is_err());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn remove_from_middle() {
        let mut q = TaskQueue::new(4);
        for id in ["a", "b", "c"] {
            q.push_back(id.into()).unwrap();
        }
        assert!(q.remove(&TaskId::new("b")));
        assert!(!q.remove(&TaskId::new("b")));
        assert!(!q.contains(&TaskId::new("b")));
        assert_eq!(q.snapshot(), vec![TaskId::new("a"), TaskId::new("c")]);
    }

    #[test]
    fn drain_empties() {
        let mut q = TaskQueue::new(4);
        q.push_back("a".into()).unwrap();
        assert_eq!(q.drain().len(), 1);
        assert!(q.is_empty());
    }
}
