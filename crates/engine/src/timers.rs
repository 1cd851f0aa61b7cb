use std::time::Duration;

use crate::app::EntityId;

const MIN_REPEAT_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Key used to cancel every task belonging to one owner in a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskOwner {
    Scene,
    Entity(EntityId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FiredTask<T> {
    pub id: TimerId,
    pub owner: TaskOwner,
    pub fired_at: Duration,
    pub payload: T,
}

#[derive(Debug, Clone)]
struct ScheduledTask<T> {
    id: TimerId,
    owner: TaskOwner,
    due: Duration,
    repeat: Option<Duration>,
    registration: u64,
    payload: T,
}

/// Cooperative task scheduler driven by frame deltas.
///
/// `advance` moves the horizon forward; `pop_due` then yields every task due at
/// or before it, earliest first and in registration order on ties. While a task
/// is being handled, `now()` reports its due time, so follow-up tasks scheduled
/// from a handler are timed from the moment the handler fired and may still
/// come due inside the same frame.
#[derive(Debug)]
pub struct TimerQueue<T> {
    now: Duration,
    horizon: Duration,
    next_id: u64,
    next_registration: u64,
    tasks: Vec<ScheduledTask<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            horizon: Duration::ZERO,
            next_id: 0,
            next_registration: 0,
            tasks: Vec::new(),
        }
    }
}

impl<T: Clone> TimerQueue<T> {
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn after(&mut self, owner: TaskOwner, delay: Duration, payload: T) -> TimerId {
        self.push(owner, self.now.saturating_add(delay), None, payload)
    }

    /// First fire happens one `interval` from now.
    pub fn every(&mut self, owner: TaskOwner, interval: Duration, payload: T) -> TimerId {
        let interval = interval.max(MIN_REPEAT_INTERVAL);
        self.push(owner, self.now.saturating_add(interval), Some(interval), payload)
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    pub fn cancel_owner(&mut self, owner: TaskOwner) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.owner != owner);
        before - self.tasks.len()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.tasks.iter().any(|task| task.id == id)
    }

    pub fn pending_for(&self, owner: TaskOwner) -> usize {
        self.tasks.iter().filter(|task| task.owner == owner).count()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn advance(&mut self, dt: Duration) {
        self.horizon = self.horizon.saturating_add(dt);
    }

    pub fn pop_due(&mut self) -> Option<FiredTask<T>> {
        let next_index = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.due <= self.horizon)
            .min_by_key(|(_, task)| (task.due, task.registration))
            .map(|(index, _)| index);

        let Some(index) = next_index else {
            self.now = self.horizon;
            return None;
        };

        let due = self.tasks[index].due;
        self.now = due;
        let fired = match self.tasks[index].repeat {
            Some(interval) => {
                let task = &mut self.tasks[index];
                task.due = due.saturating_add(interval);
                FiredTask {
                    id: task.id,
                    owner: task.owner,
                    fired_at: due,
                    payload: task.payload.clone(),
                }
            }
            None => {
                let task = self.tasks.swap_remove(index);
                FiredTask {
                    id: task.id,
                    owner: task.owner,
                    fired_at: due,
                    payload: task.payload,
                }
            }
        };
        Some(fired)
    }

    fn push(
        &mut self,
        owner: TaskOwner,
        due: Duration,
        repeat: Option<Duration>,
        payload: T,
    ) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        let registration = self.next_registration;
        self.next_registration = self.next_registration.saturating_add(1);
        self.tasks.push(ScheduledTask {
            id,
            owner,
            due,
            repeat,
            registration,
            payload,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn drain(queue: &mut TimerQueue<&'static str>) -> Vec<(u128, &'static str)> {
        let mut fired = Vec::new();
        while let Some(task) = queue.pop_due() {
            fired.push((task.fired_at.as_millis(), task.payload));
        }
        fired
    }

    #[test]
    fn one_shot_fires_once_at_due_time() {
        let mut queue = TimerQueue::default();
        queue.after(TaskOwner::Scene, ms(500), "once");
        queue.advance(ms(499));
        assert!(drain(&mut queue).is_empty());
        queue.advance(ms(1));
        assert_eq!(drain(&mut queue), vec![(500, "once")]);
        queue.advance(ms(1000));
        assert!(drain(&mut queue).is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn recurring_catches_up_across_long_frame() {
        let mut queue = TimerQueue::default();
        queue.every(TaskOwner::Scene, ms(100), "tick");
        queue.advance(ms(350));
        assert_eq!(
            drain(&mut queue),
            vec![(100, "tick"), (200, "tick"), (300, "tick")]
        );
        assert_eq!(queue.now(), ms(350));
    }

    #[test]
    fn same_due_time_fires_in_registration_order() {
        let mut queue = TimerQueue::default();
        queue.after(TaskOwner::Scene, ms(10), "first");
        queue.after(TaskOwner::Scene, ms(10), "second");
        queue.after(TaskOwner::Scene, ms(5), "earliest");
        queue.advance(ms(10));
        assert_eq!(
            drain(&mut queue),
            vec![(5, "earliest"), (10, "first"), (10, "second")]
        );
    }

    #[test]
    fn tasks_scheduled_while_draining_are_timed_from_fire_time() {
        let mut queue = TimerQueue::default();
        queue.after(TaskOwner::Scene, ms(100), "parent");
        queue.advance(ms(1000));
        let parent = queue.pop_due().expect("parent");
        assert_eq!(parent.fired_at, ms(100));
        queue.after(TaskOwner::Scene, ms(250), "child");
        assert_eq!(drain(&mut queue), vec![(350, "child")]);
    }

    #[test]
    fn cancel_owner_removes_only_that_owner() {
        let mut queue = TimerQueue::default();
        let a = TaskOwner::Entity(EntityId(1));
        let b = TaskOwner::Entity(EntityId(2));
        queue.every(a, ms(100), "a-repeat");
        queue.after(a, ms(50), "a-once");
        queue.after(b, ms(50), "b-once");
        assert_eq!(queue.cancel_owner(a), 2);
        assert_eq!(queue.pending_for(a), 0);
        queue.advance(ms(200));
        assert_eq!(drain(&mut queue), vec![(50, "b-once")]);
    }

    #[test]
    fn cancel_by_id() {
        let mut queue = TimerQueue::default();
        let id = queue.after(TaskOwner::Scene, ms(10), "gone");
        assert!(queue.is_pending(id));
        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));
        queue.advance(ms(20));
        assert!(drain(&mut queue).is_empty());
    }

    #[test]
    fn zero_interval_recurring_is_clamped() {
        let mut queue = TimerQueue::default();
        queue.every(TaskOwner::Scene, Duration::ZERO, "spin");
        queue.advance(ms(3));
        assert_eq!(drain(&mut queue).len(), 3);
    }
}
