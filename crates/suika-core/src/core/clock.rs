//! Simulated game clock with a fixed-timestep accumulator.
//!
//! All timed gameplay behavior (merge completion, the game-over explosion
//! stagger, fade timers) is expressed as a comparison against `now()`, never
//! as a blocking wait. Tests drive the clock explicitly with `advance()`.

pub struct GameClock {
    /// The fixed delta time per tick.
    fixed_dt: f32,
    /// Simulated seconds since the clock was created.
    now: f64,
    /// Accumulated time from variable frame deltas.
    accumulator: f32,
}

impl GameClock {
    pub fn new(fixed_dt: f32) -> Self {
        Self {
            fixed_dt,
            now: 0.0,
            accumulator: 0.0,
        }
    }

    /// The fixed delta time.
    pub fn dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Current simulated time in seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Add frame time to the accumulator. Returns the number of fixed steps
    /// to run. Capped at 10 steps to prevent a spiral of death.
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt;
        self.accumulator = self.accumulator.min(self.fixed_dt * 10.0);
        let steps = (self.accumulator / self.fixed_dt) as u32;
        self.accumulator -= steps as f32 * self.fixed_dt;
        steps
    }

    /// Advance the simulated clock by one fixed step.
    pub fn tick(&mut self) {
        self.now += self.fixed_dt as f64;
    }

    /// Advance the simulated clock by an arbitrary amount.
    pub fn advance(&mut self, dt: f64) {
        self.now += dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_advances_by_fixed_dt() {
        let mut clock = GameClock::new(1.0 / 60.0);
        clock.tick();
        clock.tick();
        assert!((clock.now() - 2.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn accumulates_partial_frames() {
        let mut clock = GameClock::new(1.0 / 60.0);
        assert_eq!(clock.accumulate(0.008), 0); // half a frame
        assert_eq!(clock.accumulate(0.010), 1); // over one frame total
    }

    #[test]
    fn caps_at_ten_steps() {
        let mut clock = GameClock::new(1.0 / 60.0);
        assert_eq!(clock.accumulate(1.0), 10);
    }

    #[test]
    fn advance_is_monotonic() {
        let mut clock = GameClock::new(1.0 / 60.0);
        clock.advance(0.5);
        clock.advance(0.25);
        assert!((clock.now() - 0.75).abs() < 1e-9);
    }
}
