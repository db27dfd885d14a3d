//! Rapier2D wrapper for the merge-drop container simulation.
//!
//! The rest of the crate never touches Rapier types: fruits own a
//! [`PhysicsBody`] handle pair and drive it through this interface. Fruit ids
//! are carried in body `user_data` and collision-type tags in collider
//! `user_data`, so collision events can be resolved back to gameplay ids and
//! tags without any side tables.
//!
//! Coordinates are Y-up: gravity is negative Y, dropped fruit get a negative
//! Y velocity, and "offscreen" means far below y = 0.

use glam::Vec2;
use rapier2d::prelude::*;
use std::sync::Mutex;

use crate::fruit::FruitId;
use crate::modes::categories;

// ---------------------------------------------------------------------------
// Conversion helpers (private) — glam ↔ nalgebra
// ---------------------------------------------------------------------------

fn vec2_to_na(v: Vec2) -> nalgebra::Vector2<f32> {
    nalgebra::Vector2::new(v.x, v.y)
}

fn na_to_vec2(v: &nalgebra::Vector2<f32>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// How a body moves: simulated by the solver, or driven by set velocities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kinematics {
    Dynamic,
    Kinematic,
}

impl Kinematics {
    fn to_rapier(self) -> RigidBodyType {
        match self {
            Kinematics::Dynamic => RigidBodyType::Dynamic,
            Kinematics::Kinematic => RigidBodyType::KinematicVelocityBased,
        }
    }
}

/// Handle pair stored on a Fruit, referencing Rapier internals.
/// Exclusively owned by one Fruit and released exactly once.
#[derive(Debug, Clone, Copy)]
pub struct PhysicsBody {
    pub body_handle: RigidBodyHandle,
    pub collider_handle: ColliderHandle,
}

/// A collision-begin/end event between two bodies, with the gameplay id and
/// collision-type tag of each side. Walls and other non-fruit bodies report
/// id 0 and tag 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionPair {
    pub id_a: FruitId,
    pub id_b: FruitId,
    pub tag_a: u32,
    pub tag_b: u32,
    /// `true` when the collision just started, `false` when it ended.
    pub started: bool,
}

// ---------------------------------------------------------------------------
// Event collector
// ---------------------------------------------------------------------------

struct DirectEventCollector {
    collisions: Mutex<Vec<CollisionEvent>>,
}

impl DirectEventCollector {
    fn new() -> Self {
        Self {
            collisions: Mutex::new(Vec::new()),
        }
    }

    fn drain_collisions(&self) -> Vec<CollisionEvent> {
        std::mem::take(&mut *self.collisions.lock().unwrap())
    }
}

impl EventHandler for DirectEventCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        self.collisions.lock().unwrap().push(event);
    }

    fn handle_contact_force_event(
        &self,
        _dt: f32,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: f32,
    ) {
        // Contact forces are unused but the trait requires this.
    }
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// Wraps all Rapier2D boilerplate into a single struct.
pub struct PhysicsWorld {
    gravity: nalgebra::Vector2<f32>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    event_collector: DirectEventCollector,
}

impl PhysicsWorld {
    /// Create a new physics world. Y-up convention: pass negative Y gravity,
    /// e.g. `Vec2::new(0.0, -981.0)`.
    pub fn new(gravity: Vec2) -> Self {
        Self {
            gravity: vec2_to_na(gravity),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            event_collector: DirectEventCollector::new(),
        }
    }

    /// Set the integration timestep.
    pub fn set_dt(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
    }

    /// Create the body + ball collider for a fruit. The body starts
    /// kinematic (mode `Wait`); the mode machine switches it later.
    /// `tag` is the initial collision-type tag (normally the kind).
    pub fn create_fruit_body(
        &mut self,
        id: FruitId,
        pos: Vec2,
        radius: f32,
        mass: f32,
        friction: f32,
        restitution: f32,
        tag: u32,
    ) -> PhysicsBody {
        let rb = RigidBodyBuilder::new(RigidBodyType::KinematicVelocityBased)
            .translation(vec2_to_na(pos))
            .user_data(id.0 as u128)
            .build();
        let body_handle = self.bodies.insert(rb);

        // Falling fruit are kinematic until their first contact, so wall
        // contacts must be reported even for non-dynamic pairs.
        let collider = ColliderBuilder::ball(radius)
            .mass(mass)
            .friction(friction)
            .restitution(restitution)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .active_collision_types(
                ActiveCollisionTypes::default() | ActiveCollisionTypes::KINEMATIC_FIXED,
            )
            .user_data(tag as u128)
            .build();
        let collider_handle =
            self.colliders
                .insert_with_parent(collider, body_handle, &mut self.bodies);

        PhysicsBody {
            body_handle,
            collider_handle,
        }
    }

    /// Create a fixed container wall. Walls collide with every category.
    pub fn create_wall(&mut self, center: Vec2, half_extents: Vec2) -> PhysicsBody {
        self.create_fixed_cuboid(center, half_extents, categories::WALLS, false, 0)
    }

    /// Create the "too full" boundary sensor near the top of the container.
    /// It reports contacts with settled fruit but exerts no forces. Its
    /// collision events carry [`MAX_LINE_TAG`](crate::modes::MAX_LINE_TAG).
    pub fn create_max_line(&mut self, center: Vec2, half_extents: Vec2) -> PhysicsBody {
        self.create_fixed_cuboid(
            center,
            half_extents,
            categories::MAXLINE,
            true,
            crate::modes::MAX_LINE_TAG,
        )
    }

    fn create_fixed_cuboid(
        &mut self,
        center: Vec2,
        half_extents: Vec2,
        category: u32,
        sensor: bool,
        tag: u32,
    ) -> PhysicsBody {
        let rb = RigidBodyBuilder::fixed()
            .translation(vec2_to_na(center))
            .build();
        let body_handle = self.bodies.insert(rb);

        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y)
            .collision_groups(InteractionGroups::new(
                Group::from_bits_truncate(category),
                Group::ALL,
            ))
            .sensor(sensor)
            .user_data(tag as u128)
            .build();
        let collider_handle =
            self.colliders
                .insert_with_parent(collider, body_handle, &mut self.bodies);

        PhysicsBody {
            body_handle,
            collider_handle,
        }
    }

    /// Remove a body and its collider from the simulation.
    pub fn remove_body(&mut self, body: &PhysicsBody) {
        self.bodies.remove(
            body.body_handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Switch a body between dynamic simulation and kinematic driving.
    pub fn set_body_type(&mut self, body: &PhysicsBody, kinematics: Kinematics) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            rb.set_body_type(kinematics.to_rapier(), true);
        }
    }

    /// Teleport a body, preserving its rotation. Panics if the body is
    /// currently dynamic: direct position writes fight the solver and are
    /// always a logic defect.
    pub fn set_position(&mut self, body: &PhysicsBody, pos: Vec2) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            assert!(
                rb.body_type() != RigidBodyType::Dynamic,
                "set_position on a dynamic body"
            );
            let angle = rb.rotation().angle();
            rb.set_position(nalgebra::Isometry2::new(vec2_to_na(pos), angle), true);
        }
    }

    /// Set the linear velocity of a body (works for kinematic bodies too).
    pub fn set_velocity(&mut self, body: &PhysicsBody, vel: Vec2) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            rb.set_linvel(vec2_to_na(vel), true);
        }
    }

    /// Get the current linear velocity of a body.
    pub fn velocity(&self, body: &PhysicsBody) -> Vec2 {
        self.bodies
            .get(body.body_handle)
            .map(|rb| na_to_vec2(rb.linvel()))
            .unwrap_or(Vec2::ZERO)
    }

    /// Get the current position and rotation angle of a body.
    pub fn body_position(&self, body: &PhysicsBody) -> (Vec2, f32) {
        self.bodies
            .get(body.body_handle)
            .map(|rb| {
                let iso = rb.position();
                (
                    Vec2::new(iso.translation.x, iso.translation.y),
                    iso.rotation.angle(),
                )
            })
            .unwrap_or((Vec2::ZERO, 0.0))
    }

    /// Set the collision filter of a body's collider. The category and mask
    /// are the bitmasks from [`crate::modes::categories`].
    pub fn set_collision_filter(&mut self, body: &PhysicsBody, category: u32, mask: u32) {
        if let Some(collider) = self.colliders.get_mut(body.collider_handle) {
            collider.set_collision_groups(InteractionGroups::new(
                Group::from_bits_truncate(category),
                Group::from_bits_truncate(mask),
            ));
        }
    }

    /// Set the collision-type tag reported in [`CollisionPair`] events.
    pub fn set_collision_tag(&mut self, body: &PhysicsBody, tag: u32) {
        if let Some(collider) = self.colliders.get_mut(body.collider_handle) {
            collider.user_data = tag as u128;
        }
    }

    /// Read a body's collision-type tag back.
    pub fn collision_tag(&self, body: &PhysicsBody) -> u32 {
        self.colliders
            .get(body.collider_handle)
            .map(|c| c.user_data as u32)
            .unwrap_or(0)
    }

    /// Resize a fruit's ball collider. Used by the fade-in animation to grow
    /// the hitbox in lockstep with the sprite scale.
    pub fn set_ball_radius(&mut self, body: &PhysicsBody, radius: f32) {
        if let Some(collider) = self.colliders.get_mut(body.collider_handle) {
            collider.set_shape(SharedShape::ball(radius));
        }
    }

    /// Current radius of a fruit's ball collider.
    pub fn ball_radius(&self, body: &PhysicsBody) -> f32 {
        self.colliders
            .get(body.collider_handle)
            .and_then(|c| c.shape().as_ball().map(|b| b.radius))
            .unwrap_or(0.0)
    }

    /// Number of rigid bodies in the simulation.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Step the simulation and collect collision events into the provided
    /// Vec, with fruit ids and collision tags resolved from `user_data`.
    pub fn step_into(&mut self, collision_events: &mut Vec<CollisionPair>) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.event_collector,
        );

        for event in self.event_collector.drain_collisions() {
            let (h1, h2, started) = match event {
                CollisionEvent::Started(h1, h2, _) => (h1, h2, true),
                CollisionEvent::Stopped(h1, h2, _) => (h1, h2, false),
            };

            if let (Some((id_a, tag_a)), Some((id_b, tag_b))) =
                (self.resolve_collider(h1), self.resolve_collider(h2))
            {
                collision_events.push(CollisionPair {
                    id_a,
                    id_b,
                    tag_a,
                    tag_b,
                    started,
                });
            }
        }
    }

    // -- private helpers --

    fn resolve_collider(&self, collider_handle: ColliderHandle) -> Option<(FruitId, u32)> {
        let collider = self.colliders.get(collider_handle)?;
        let tag = collider.user_data as u32;
        let body_handle = collider.parent()?;
        let body = self.bodies.get(body_handle)?;
        Some((FruitId(body.user_data as u64), tag))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
