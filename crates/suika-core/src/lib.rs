pub mod active;
pub mod catalog;
pub mod context;
pub mod core;
pub mod fruit;
pub mod modes;
pub mod scheduler;
pub mod stage;
pub mod tuning;

// Re-export key types at crate root for convenience
pub use active::ActiveFruits;
pub use catalog::{Catalog, KindDef};
pub use context::GameContext;
pub use core::clock::GameClock;
pub use core::physics::{CollisionPair, Kinematics, PhysicsBody, PhysicsWorld};
pub use core::rng::Rng;
pub use fruit::{Fruit, FruitId};
pub use modes::{categories, Mode, ModeAttributes, FIRST_DROP_TAG, MAX_LINE_TAG};
pub use scheduler::{ScheduledAction, Scheduler};
pub use stage::{AnimState, SpriteId, Stage, Visibility, VisualProxy};
