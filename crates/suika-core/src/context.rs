//! Shared simulation context: physics world, visual stage and the game
//! clock, bundled so gameplay code can borrow them together.

use glam::Vec2;

use crate::core::clock::GameClock;
use crate::core::physics::{CollisionPair, PhysicsWorld};
use crate::stage::Stage;

pub struct GameContext {
    pub physics: PhysicsWorld,
    pub stage: Stage,
    pub clock: GameClock,
    collision_events: Vec<CollisionPair>,
}

impl GameContext {
    /// Y-up world: gravity points along negative Y.
    pub fn new(gravity: Vec2, fixed_dt: f32) -> Self {
        let mut physics = PhysicsWorld::new(gravity);
        physics.set_dt(fixed_dt);
        Self {
            physics,
            stage: Stage::new(),
            clock: GameClock::new(fixed_dt),
            collision_events: Vec::new(),
        }
    }

    /// Advance the simulation by one fixed step. Collision events from the
    /// step replace the previous batch and stay readable via
    /// [`GameContext::collisions`] until the next step.
    pub fn step(&mut self) {
        self.collision_events.clear();
        self.physics.step_into(&mut self.collision_events);
        self.clock.tick();
    }

    /// Collision events produced by the most recent [`GameContext::step`].
    pub fn collisions(&self) -> &[CollisionPair] {
        &self.collision_events
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }
}
