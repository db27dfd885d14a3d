//! Gameplay tuning constants shared across the fruit lifecycle.

/// Surface friction for fruit colliders.
pub const FRICTION: f32 = 0.5;
/// Restitution for fruit colliders (slightly bouncy).
pub const ELASTICITY_FRUIT: f32 = 0.2;

/// Downward speed given to a fruit when it is dropped.
pub const INITIAL_DROP_SPEED: f32 = 300.0;

/// Duration of the merge convergence animation. Removal of the merging
/// fruits is scheduled at exactly this delay, whether or not the destination
/// is reached.
pub const MERGE_DELAY: f64 = 0.2;

/// Starting size fraction at the beginning of a fade-in.
pub const FADE_SIZE: f32 = 0.25;
/// Time for a fade-in to reach full size.
pub const FADEIN_DELAY: f64 = 0.3;
/// Fade-in size briefly overshoots full scale before settling.
pub const FADEIN_OVERSHOOT: f32 = 1.1;
/// Time for a fade-out to reach zero opacity.
pub const FADEOUT_DELAY: f64 = 0.4;
/// Blink cycles per second.
pub const BLINK_FREQ: f64 = 3.0;
/// Duration of the explosion sprite sequence.
pub const EXPLOSION_DELAY: f64 = 0.5;

/// Delay before the first explosion of the game-over sequence.
pub const GAMEOVER_ANIMATION_START: f64 = 1.0;
/// Interval between successive explosions of the game-over sequence.
pub const GAMEOVER_ANIMATION_INTERVAL: f64 = 0.2;

/// Gap between the pending fruit and the top of the window.
pub const NEXT_FRUIT_MARGIN: f32 = 5.0;

/// Time-constant multiplier for the critically-damped drag approach:
/// the dragged fruit moves toward the cursor over `10 * dt` rather than
/// teleporting, which would destabilize the solver.
pub const DRAG_TIME_FACTOR: f32 = 10.0;
