//! Timed-action scheduler.
//!
//! Replaces "schedule a closure" timers with explicit `(fire_at, action)`
//! entries resolved by id lookup when they fire. An action whose target has
//! already been removed simply misses its lookup and becomes a no-op, so
//! stale timers can never touch released resources.

use crate::fruit::FruitId;

/// What to do when an entry comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledAction {
    /// Unconditional removal, scheduled by `merge_to` at merge-delay.
    RemoveFruit(FruitId),
    /// One step of the game-over explosion sequence.
    ExplosionStep,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    fire_at: f64,
    action: ScheduledAction,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    entries: Vec<Entry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, fire_at: f64, action: ScheduledAction) {
        self.entries.push(Entry { fire_at, action });
    }

    /// Remove and return every action due at `now`, in firing order.
    pub fn drain_due(&mut self, now: f64) -> Vec<ScheduledAction> {
        let mut due: Vec<Entry> = Vec::new();
        self.entries.retain(|entry| {
            if entry.fire_at <= now {
                due.push(*entry);
                false
            } else {
                true
            }
        });
        due.sort_by(|a, b| a.fire_at.total_cmp(&b.fire_at));
        due.into_iter().map(|e| e.action).collect()
    }

    /// Cancel the pending game-over explosion sequence.
    pub fn cancel_explosions(&mut self) {
        self.entries
            .retain(|e| e.action != ScheduledAction::ExplosionStep);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
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
    fn entries_fire_once_at_their_time() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(1.0, ScheduledAction::RemoveFruit(FruitId(7)));

        assert!(scheduler.drain_due(0.5).is_empty());
        assert_eq!(
            scheduler.drain_due(1.0),
            vec![ScheduledAction::RemoveFruit(FruitId(7))]
        );
        assert!(scheduler.drain_due(2.0).is_empty());
    }

    #[test]
    fn due_actions_come_out_in_firing_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(2.0, ScheduledAction::RemoveFruit(FruitId(2)));
        scheduler.schedule(1.0, ScheduledAction::RemoveFruit(FruitId(1)));
        scheduler.schedule(3.0, ScheduledAction::RemoveFruit(FruitId(3)));

        let due = scheduler.drain_due(10.0);
        assert_eq!(
            due,
            vec![
                ScheduledAction::RemoveFruit(FruitId(1)),
                ScheduledAction::RemoveFruit(FruitId(2)),
                ScheduledAction::RemoveFruit(FruitId(3)),
            ]
        );
    }

    #[test]
    fn cancel_explosions_keeps_removals() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(1.0, ScheduledAction::ExplosionStep);
        scheduler.schedule(1.0, ScheduledAction::RemoveFruit(FruitId(4)));
        scheduler.cancel_explosions();

        assert_eq!(
            scheduler.drain_due(1.0),
            vec![ScheduledAction::RemoveFruit(FruitId(4))]
        );
    }
}
