//! One physics-backed fruit entity.
//!
//! A Fruit exclusively owns its physics body and its visual proxies, and is
//! the only code allowed to touch them. Mode transitions go through
//! [`Fruit::set_mode`], which applies the mode's collision filter, body
//! kinematics and sprite visibility in one place. `Removed` is terminal and
//! absorbing: once entered, every operation is a no-op and all owned
//! resources have been released — there is no half-released state.

use std::fmt;

use glam::Vec2;

use crate::catalog::Catalog;
use crate::core::physics::{PhysicsBody, PhysicsWorld};
use crate::modes::{categories, Mode, FIRST_DROP_TAG};
use crate::scheduler::{ScheduledAction, Scheduler};
use crate::stage::{SpriteId, Stage};
use crate::tuning::{
    DRAG_TIME_FACTOR, ELASTICITY_FRUIT, FADEIN_DELAY, FADE_SIZE, FRICTION, INITIAL_DROP_SPEED,
    MERGE_DELAY, NEXT_FRUIT_MARGIN,
};

/// Process-unique fruit identifier. Monotonically allocated by the owning
/// collection, never reused; later ids always mean later creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FruitId(pub u64);

/// In-progress hitbox growth, kept in lockstep with the sprite fade-in so
/// the collision radius never outruns the visible size.
#[derive(Debug, Clone, Copy)]
struct GrowAnim {
    start: f64,
    radius_ref: f32,
}

pub struct Fruit {
    id: FruitId,
    kind: u8,
    /// Display/asset name, copied from the catalog definition.
    name: String,
    base_radius: f32,
    mode: Mode,
    body: Option<PhysicsBody>,
    main_sprite: Option<SpriteId>,
    explosion_sprite: Option<SpriteId>,
    /// Set only while in `Drag` mode: cursor position minus fruit position
    /// at grab time.
    drag_offset: Option<Vec2>,
    grow: Option<GrowAnim>,
}

impl fmt::Display for Fruit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id.0)
    }
}

impl Fruit {
    /// Create a fruit of a valid kind at `pos`, in mode `Wait`.
    /// Panics on an out-of-range kind (programmer error).
    pub fn new(
        id: FruitId,
        kind: u8,
        catalog: &Catalog,
        pos: Vec2,
        phys: &mut PhysicsWorld,
        stage: &mut Stage,
    ) -> Self {
        assert!(catalog.is_valid(kind), "unknown fruit kind {}", kind);
        let def = catalog.def(kind);

        let body = phys.create_fruit_body(
            id,
            pos,
            def.radius,
            def.mass,
            FRICTION,
            ELASTICITY_FRUIT,
            kind as u32,
        );
        let main_sprite = stage.create_fruit_sprite(&def.name, def.radius);

        let mut fruit = Self {
            id,
            kind,
            name: def.name.clone(),
            base_radius: def.radius,
            mode: Mode::Wait,
            body: Some(body),
            main_sprite: Some(main_sprite),
            explosion_sprite: None,
            drag_offset: None,
            grow: None,
        };
        fruit.apply_mode(Mode::Wait, phys, stage);
        fruit
    }

    // -- accessors --

    pub fn id(&self) -> FruitId {
        self.id
    }

    pub fn kind(&self) -> u8 {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Score value credited when this fruit is removed.
    pub fn points(&self) -> u32 {
        self.kind as u32
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_removed(&self) -> bool {
        self.mode == Mode::Removed
    }

    /// Full-size collision radius from the catalog definition.
    pub fn base_radius(&self) -> f32 {
        self.base_radius
    }

    pub fn position(&self, phys: &PhysicsWorld) -> Vec2 {
        self.body
            .as_ref()
            .map(|b| phys.body_position(b).0)
            .unwrap_or(Vec2::ZERO)
    }

    /// Teleport the fruit. Panics if the body is dynamic.
    pub fn set_position(&self, pos: Vec2, phys: &mut PhysicsWorld) {
        if let Some(body) = &self.body {
            phys.set_position(body, pos);
        }
    }

    pub fn scalar_velocity(&self, phys: &PhysicsWorld) -> f32 {
        self.body
            .as_ref()
            .map(|b| phys.velocity(b).length())
            .unwrap_or(0.0)
    }

    /// Current collision-type tag (`kind`, or the first-drop tag).
    pub fn collision_tag(&self, phys: &PhysicsWorld) -> u32 {
        self.body
            .as_ref()
            .map(|b| phys.collision_tag(b))
            .unwrap_or(0)
    }

    // -- mode machine --

    /// Transition to `mode`, applying its kinematics, collision filter and
    /// sprite visibility. No-op once removed. The wall category is added to
    /// every mask so fruit always collide with the container.
    pub fn set_mode(&mut self, mode: Mode, phys: &mut PhysicsWorld, stage: &mut Stage) {
        if self.is_removed() {
            return;
        }
        if !self.mode.can_transition_to(mode) {
            log::warn!("{} invalid mode transition {:?} -> {:?}", self, self.mode, mode);
        }
        self.apply_mode(mode, phys, stage);
    }

    fn apply_mode(&mut self, mode: Mode, phys: &mut PhysicsWorld, stage: &mut Stage) {
        self.mode = mode;
        let attrs = mode.attributes();
        if let Some(body) = &self.body {
            phys.set_body_type(body, attrs.kinematics);
            phys.set_collision_filter(body, attrs.category, attrs.mask | categories::WALLS);
        }
        for sprite in [self.main_sprite, self.explosion_sprite].into_iter().flatten() {
            stage.set_visibility(sprite, attrs.visibility);
        }
    }

    // -- lifecycle operations --

    /// Release the fruit into the container. While falling it carries the
    /// first-drop tag so simultaneously dropped same-kind fruit never merge
    /// with each other.
    pub fn drop(&mut self, phys: &mut PhysicsWorld, stage: &mut Stage) {
        if let Some(body) = &self.body {
            phys.set_velocity(body, Vec2::new(0.0, -INITIAL_DROP_SPEED));
        }
        self.set_mode(Mode::FirstDrop, phys, stage);
        if let Some(body) = &self.body {
            phys.set_collision_tag(body, FIRST_DROP_TAG);
        }
    }

    /// Settle into normal play. The collision tag reverts to the kind, which
    /// is what makes external same-kind merge detection work.
    pub fn normal(&mut self, phys: &mut PhysicsWorld, stage: &mut Stage) {
        self.set_mode(Mode::Normal, phys, stage);
        if let Some(body) = &self.body {
            phys.set_collision_tag(body, self.kind as u32);
        }
    }

    /// Materialize with a growth animation: the sprite fades/scales in and
    /// the hitbox radius grows in lockstep. Forces `Normal`.
    pub fn fade_in(&mut self, now: f64, phys: &mut PhysicsWorld, stage: &mut Stage) {
        if self.is_removed() {
            return;
        }
        self.normal(phys, stage);
        if let Some(sprite) = self.main_sprite {
            stage.start_fade_in(sprite, now);
        }
        if self.grow.is_none() {
            self.grow = Some(GrowAnim {
                start: now,
                radius_ref: self.base_radius,
            });
            if let Some(body) = &self.body {
                phys.set_ball_radius(body, self.base_radius * FADE_SIZE);
            }
        }
    }

    /// Enter or leave drag mode. With a cursor position the offset is stored
    /// and the fruit becomes kinematic; with `None` the offset is cleared
    /// and the fruit returns to `Normal`.
    pub fn drag_mode(&mut self, cursor: Option<Vec2>, phys: &mut PhysicsWorld, stage: &mut Stage) {
        match cursor {
            Some(cursor) => {
                self.drag_offset = Some(cursor - self.position(phys));
                self.set_mode(Mode::Drag, phys, stage);
            }
            None => {
                self.drag_offset = None;
                self.set_mode(Mode::Normal, phys, stage);
            }
        }
    }

    /// Steer the dragged fruit toward the cursor over `10 * dt` — a damped
    /// approach, not a teleport. Silently does nothing unless dragging.
    /// Panics if drag mode was never initialized (programmer error).
    pub fn drag_to(&mut self, cursor: Vec2, dt: f32, phys: &mut PhysicsWorld) {
        if !matches!(self.mode, Mode::Normal | Mode::Drag) {
            return;
        }
        let offset = self.drag_offset.expect("drag_to called before drag_mode");
        debug_assert_eq!(self.mode, Mode::Drag, "drag mode not initialized");
        self.set_velocity_to(cursor - offset, dt * DRAG_TIME_FACTOR, phys);
    }

    /// Converge toward `dest` over the merge delay, then get removed by the
    /// scheduled action whether or not `dest` was reached. Idempotent while
    /// already merging.
    pub fn merge_to(
        &mut self,
        dest: Vec2,
        now: f64,
        phys: &mut PhysicsWorld,
        stage: &mut Stage,
        scheduler: &mut Scheduler,
    ) {
        if self.mode == Mode::Merge {
            return;
        }
        self.set_mode(Mode::Merge, phys, stage); // no more fruit-fruit collisions
        self.set_velocity_to(dest, MERGE_DELAY as f32, phys);
        scheduler.schedule(now + MERGE_DELAY, ScheduledAction::RemoveFruit(self.id));
    }

    /// Blow up in place: explosion proxy at the current position, fade-out
    /// on the main sprite. Removal follows when the explosion sequence
    /// finishes (reported by [`Fruit::update`]). No-op while merging or
    /// removed.
    pub fn explode(&mut self, now: f64, phys: &mut PhysicsWorld, stage: &mut Stage) {
        if matches!(self.mode, Mode::Merge | Mode::Removed) {
            return;
        }
        self.set_mode(Mode::Merge, phys, stage);
        let pos = self.position(phys);
        self.explosion_sprite = Some(stage.create_explosion_sprite(self.base_radius, pos, now));
        if let Some(sprite) = self.main_sprite {
            stage.start_fade_out(sprite, now);
        }
    }

    /// Toggle the attention blink on the main sprite.
    pub fn blink(&mut self, active: bool, now: f64, stage: &mut Stage) {
        if let Some(sprite) = self.main_sprite {
            stage.set_blink(sprite, active, now);
        }
    }

    /// Whether the body has fallen far below the visible window. Removed
    /// fruit report `false`.
    pub fn is_offscreen(&self, phys: &PhysicsWorld, window_height: f32) -> bool {
        match &self.body {
            Some(body) => phys.body_position(body).0.y < -window_height,
            None => false,
        }
    }

    /// Remove the fruit from the game and release every owned resource.
    /// Returns the fruit's point value on the first call (the scoring hook)
    /// and 0 on any repeat; `Removed` makes repeats no-ops.
    pub fn remove(&mut self, phys: &mut PhysicsWorld, stage: &mut Stage) -> u32 {
        if self.is_removed() {
            return 0;
        }
        let points = self.points();
        self.set_mode(Mode::Removed, phys, stage);
        self.release_resources(phys, stage);
        points
    }

    fn release_resources(&mut self, phys: &mut PhysicsWorld, stage: &mut Stage) {
        if self.mode != Mode::Removed {
            log::warn!("{} releasing resources in mode {:?}", self, self.mode);
        }
        if let Some(body) = self.body.take() {
            phys.remove_body(&body);
        }
        if let Some(sprite) = self.main_sprite.take() {
            stage.destroy(sprite);
        }
        if let Some(sprite) = self.explosion_sprite.take() {
            stage.destroy(sprite);
        }
    }

    /// Per-tick sync: push physics position/rotation into the visual
    /// proxies (the sign flips — physics and rendering rotate in opposite
    /// directions) and advance the hitbox growth. Returns `true` when an
    /// attached explosion has finished and the fruit should be removed.
    pub fn update(&mut self, now: f64, phys: &mut PhysicsWorld, stage: &mut Stage) -> bool {
        if self.is_removed() {
            return false;
        }
        let Some(body) = self.body else {
            return false;
        };
        let (pos, angle) = phys.body_position(&body);
        let degrees = -angle.to_degrees();
        for sprite in [self.main_sprite, self.explosion_sprite].into_iter().flatten() {
            stage.update(sprite, pos, degrees, now);
        }

        if let Some(grow) = self.grow {
            let t = (now - grow.start) as f32;
            let x = t * (1.0 - FADE_SIZE) / FADEIN_DELAY as f32 + FADE_SIZE;
            phys.set_ball_radius(&body, grow.radius_ref * x.min(1.0));
            if x > 1.0 {
                self.grow = None;
            }
        }

        self.explosion_sprite
            .map(|sprite| stage.explosion_finished(sprite, now))
            .unwrap_or(false)
    }

    /// Reposition the pending fruit's preview slot after a window resize.
    /// Only meaningful in `Wait` mode; otherwise logged and skipped.
    pub fn on_resize(&mut self, width: f32, height: f32, phys: &mut PhysicsWorld) {
        if self.mode != Mode::Wait {
            log::warn!("{} on_resize ignored in mode {:?}", self, self.mode);
            return;
        }
        let pos = Vec2::new(
            width / 2.0,
            height - self.base_radius - NEXT_FRUIT_MARGIN,
        );
        self.set_position(pos, phys);
    }

    // -- private helpers --

    /// Velocity such that the body reaches `dest` after `delay` seconds.
    fn set_velocity_to(&self, dest: Vec2, delay: f32, phys: &mut PhysicsWorld) {
        let Some(body) = &self.body else {
            return;
        };
        let (pos, _) = phys.body_position(body);
        let mut v = (dest - pos) / delay;
        if v.length() < 1e-5 {
            v = Vec2::ZERO;
        }
        phys.set_velocity(body, v);
    }
}
