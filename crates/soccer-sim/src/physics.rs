//! rapier2d physics integration for the soccer field.
//!
//! The [`PhysicsWorld`] owns a gravity-free rapier2d simulation holding the
//! boundary walls, the four players, and the ball. Every body carries a
//! [`BodyKind`] tag alongside its rapier handle. Each tick:
//!
//! 1. The episode controller writes player velocity commands.
//! 2. rapier steps the simulation with a fixed dt and fixed solver iteration
//!    counts.
//! 3. Contact-begin events are resolved to their tagged bodies and delivered,
//!    in a stable order, to the [`ContactListener`] passed into
//!    [`PhysicsWorld::step`].
//!
//! # Determinism
//!
//! rapier2d is compiled with `enhanced-determinism`. Combined with a fixed
//! timestep, a stable contact dispatch order, and fresh solver state on every
//! [`PhysicsWorld::destroy_all_bodies`], identical inputs reproduce identical
//! trajectories on the same platform.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::ops::{Add, Mul, Neg, Sub};

use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::*;

// ---------------------------------------------------------------------------
// Vec2
// ---------------------------------------------------------------------------

/// A 2D vector in field coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn dot(self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    #[inline]
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    #[inline]
    pub fn distance(self, other: Vec2) -> f64 {
        (self - other).length()
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

// ---------------------------------------------------------------------------
// Body descriptors
// ---------------------------------------------------------------------------

/// What a physics body represents on the field.
///
/// Walls are fixed; players and the ball are dynamic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyKind {
    Wall,
    Player {
        /// Team id, `agent / TEAM_SIZE`.
        team: usize,
        /// Agent id in `0..NUM_AGENTS`.
        agent: usize,
    },
    Ball,
}

impl BodyKind {
    /// Tag for the player controlled by `agent`.
    pub fn player(agent: usize) -> Self {
        BodyKind::Player {
            team: team_of(agent),
            agent,
        }
    }

    pub fn is_dynamic(self) -> bool {
        !matches!(self, BodyKind::Wall)
    }
}

/// Collider shape for physics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    /// Axis-aligned box with half-extents.
    Box {
        /// Half-width along the x-axis.
        half_width: f64,
        /// Half-height along the y-axis.
        half_height: f64,
    },
    /// Circle with radius.
    Circle {
        /// Radius of the circle.
        radius: f64,
    },
}

/// Surface and mass properties of a body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub density: f64,
    pub friction: f64,
    /// Coefficient of restitution (bounciness). 0.0 = no bounce, 1.0 = perfect bounce.
    pub restitution: f64,
    pub linear_damping: f64,
    pub angular_damping: f64,
    /// Keep the body axis-aligned.
    pub lock_rotations: bool,
}

impl Material {
    /// Immovable boundary wall.
    pub fn wall() -> Self {
        Self {
            density: 1.0,
            friction: 0.2,
            restitution: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            lock_rotations: true,
        }
    }

    /// Velocity-controlled player square.
    pub fn player() -> Self {
        Self {
            density: PLAYER_DENSITY,
            friction: PLAYER_FRICTION,
            restitution: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            lock_rotations: true,
        }
    }

    /// Light, bouncy ball that slowly loses speed.
    pub fn ball() -> Self {
        Self {
            density: BALL_DENSITY,
            friction: BALL_FRICTION,
            restitution: BALL_RESTITUTION,
            linear_damping: BALL_DAMPING,
            angular_damping: BALL_DAMPING,
            lock_rotations: false,
        }
    }
}

/// Position and linear velocity of a body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    pub position: Vec2,
    pub velocity: Vec2,
}

/// Fixed integration parameters for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepParams {
    /// Tick duration in seconds. Must be positive and finite.
    pub dt: f64,
    /// Velocity solver iterations per tick.
    pub velocity_iterations: usize,
    /// Internal position-correction iterations per solver iteration.
    pub position_iterations: usize,
}

impl Default for StepParams {
    /// `1 / FPS` seconds with 6 velocity and 2 position iterations.
    fn default() -> Self {
        Self {
            dt: 1.0 / FPS as f64,
            velocity_iterations: 6,
            position_iterations: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

/// A body involved in a contact, resolved from its collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaggedBody {
    pub kind: BodyKind,
    /// Body state right after the step that produced the contact.
    pub state: BodyState,
}

/// Two bodies that started touching during a step.
///
/// Either side is `None` when its collider carries no body tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactBegin {
    pub a: Option<TaggedBody>,
    pub b: Option<TaggedBody>,
}

/// Receives contact-begin events produced by [`PhysicsWorld::step`].
pub trait ContactListener {
    fn begin_contact(&mut self, contact: &ContactBegin);
}

impl ContactListener for Vec<ContactBegin> {
    fn begin_contact(&mut self, contact: &ContactBegin) {
        self.push(*contact);
    }
}

/// Tag stored next to every collider this world creates.
#[derive(Debug, Clone, Copy)]
struct ColliderTag {
    /// Creation order, used to dispatch contacts in a stable order.
    serial: u32,
    body: RigidBodyHandle,
    kind: BodyKind,
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// Gravity-free rapier2d world holding kind-tagged bodies.
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    collider_tags: HashMap<ColliderHandle, ColliderTag>,
    next_serial: u32,
}

impl PhysicsWorld {
    /// Create an empty world with zero gravity.
    pub fn new() -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, 0.0],
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            collider_tags: HashMap::new(),
            next_serial: 0,
        }
    }

    /// Add a body with one collider and return its handle.
    ///
    /// Walls become fixed bodies, players and the ball dynamic ones.
    pub fn create_body(
        &mut self,
        kind: BodyKind,
        position: Vec2,
        shape: &ColliderShape,
        material: &Material,
    ) -> RigidBodyHandle {
        let translation = vector![position.x as Real, position.y as Real];
        let mut builder = if kind.is_dynamic() {
            RigidBodyBuilder::dynamic()
                .translation(translation)
                .linear_damping(material.linear_damping as Real)
                .angular_damping(material.angular_damping as Real)
        } else {
            RigidBodyBuilder::fixed().translation(translation)
        };
        if material.lock_rotations {
            builder = builder.lock_rotations();
        }
        let body_handle = self.rigid_body_set.insert(builder.build());

        let shape: SharedShape = match shape {
            ColliderShape::Box {
                half_width,
                half_height,
            } => SharedShape::cuboid(*half_width as Real, *half_height as Real),
            ColliderShape::Circle { radius } => SharedShape::ball(*radius as Real),
        };
        let collider = ColliderBuilder::new(shape)
            .density(material.density as Real)
            .friction(material.friction as Real)
            .restitution(material.restitution as Real)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        let collider_handle =
            self.collider_set
                .insert_with_parent(collider, body_handle, &mut self.rigid_body_set);

        self.collider_tags.insert(
            collider_handle,
            ColliderTag {
                serial: self.next_serial,
                body: body_handle,
                kind,
            },
        );
        self.next_serial += 1;

        body_handle
    }

    /// Remove every body and reset all solver state.
    ///
    /// Broad phase, narrow phase, and islands are rebuilt from scratch so a
    /// freshly populated world steps exactly like a brand-new one.
    pub fn destroy_all_bodies(&mut self) {
        *self = Self::new();
    }

    /// Advance the simulation by one tick.
    ///
    /// Every contact that began during the step is delivered to `listener`,
    /// ordered by the creation order of the two colliders involved.
    pub fn step(&mut self, params: &StepParams, listener: &mut impl ContactListener) {
        self.integration_params.dt = params.dt as Real;
        self.integration_params.num_solver_iterations =
            NonZeroUsize::new(params.velocity_iterations).unwrap_or(NonZeroUsize::MIN);
        self.integration_params.num_internal_pgs_iterations = params.position_iterations.max(1);

        let (collision_send, collision_recv) =
            rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None, // query pipeline (unused)
            &(),  // physics hooks
            &event_handler,
        );

        let mut started = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            if let CollisionEvent::Started(h1, h2, _flags) = event {
                started.push((
                    self.collider_tags.get(&h1).copied(),
                    self.collider_tags.get(&h2).copied(),
                ));
            }
        }
        // Untagged colliders sort first; tagged pairs by (min, max) serial.
        started.sort_by_key(|(a, b)| {
            let sa = a.map(|t| t.serial);
            let sb = b.map(|t| t.serial);
            (sa.min(sb), sa.max(sb))
        });

        for (a, b) in started {
            let contact = ContactBegin {
                a: a.and_then(|t| self.tagged_body(t)),
                b: b.and_then(|t| self.tagged_body(t)),
            };
            listener.begin_contact(&contact);
        }
    }

    fn tagged_body(&self, tag: ColliderTag) -> Option<TaggedBody> {
        self.body_state(tag.body).map(|state| TaggedBody {
            kind: tag.kind,
            state,
        })
    }

    /// Current position and velocity of a body.
    pub fn body_state(&self, handle: RigidBodyHandle) -> Option<BodyState> {
        self.rigid_body_set.get(handle).map(|rb| {
            let trans = rb.translation();
            let vel = rb.linvel();
            BodyState {
                position: Vec2::new(trans.x as f64, trans.y as f64),
                velocity: Vec2::new(vel.x as f64, vel.y as f64),
            }
        })
    }

    /// Overwrite a body's linear velocity. No-op for unknown handles.
    pub fn set_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec2) {
        if let Some(rb) = self.rigid_body_set.get_mut(handle) {
            rb.set_linvel(vector![velocity.x as Real, velocity.y as Real], true);
        }
    }

    /// Teleport a body, replacing its velocity and stopping its spin.
    /// No-op for unknown handles.
    pub fn set_body_state(&mut self, handle: RigidBodyHandle, state: BodyState) {
        if let Some(rb) = self.rigid_body_set.get_mut(handle) {
            rb.set_translation(
                vector![state.position.x as Real, state.position.y as Real],
                true,
            );
            rb.set_linvel(
                vector![state.velocity.x as Real, state.velocity.y as Real],
                true,
            );
            rb.set_angvel(0.0, true);
        }
    }

    /// Tag of the body owning `handle`, if it was created by this world.
    pub fn body_kind(&self, handle: RigidBodyHandle) -> Option<BodyKind> {
        self.collider_tags
            .values()
            .find(|tag| tag.body == handle)
            .map(|tag| tag.kind)
    }

    /// Number of bodies currently in the world.
    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ball_shape() -> ColliderShape {
        ColliderShape::Circle { radius: 0.5 }
    }

    fn slab(half_width: f64, half_height: f64) -> ColliderShape {
        ColliderShape::Box {
            half_width,
            half_height,
        }
    }

    #[test]
    fn new_world_is_empty() {
        let pw = PhysicsWorld::new();
        assert_eq!(pw.body_count(), 0);
    }

    #[test]
    fn create_body_registers_kind() {
        let mut pw = PhysicsWorld::new();
        let ball = pw.create_body(BodyKind::Ball, Vec2::ZERO, &ball_shape(), &Material::ball());
        let p3 = pw.create_body(
            BodyKind::player(3),
            Vec2::new(5.0, 5.0),
            &slab(0.75, 0.75),
            &Material::player(),
        );
        assert_eq!(pw.body_count(), 2);
        assert_eq!(pw.body_kind(ball), Some(BodyKind::Ball));
        assert_eq!(pw.body_kind(p3), Some(BodyKind::Player { team: 1, agent: 3 }));
    }

    #[test]
    fn destroy_all_bodies_clears_world() {
        let mut pw = PhysicsWorld::new();
        let ball = pw.create_body(BodyKind::Ball, Vec2::ZERO, &ball_shape(), &Material::ball());
        pw.create_body(BodyKind::Wall, Vec2::new(3.0, 0.0), &slab(1.0, 1.0), &Material::wall());
        pw.destroy_all_bodies();
        assert_eq!(pw.body_count(), 0);
        assert!(pw.body_state(ball).is_none());
    }

    #[test]
    fn dynamic_body_moves_after_step() {
        let mut pw = PhysicsWorld::new();
        let h = pw.create_body(BodyKind::player(0), Vec2::ZERO, &slab(0.75, 0.75), &Material::player());
        pw.set_velocity(h, Vec2::new(10.0, 0.0));

        let mut contacts: Vec<ContactBegin> = Vec::new();
        pw.step(&StepParams::default(), &mut contacts);

        let state = pw.body_state(h).unwrap();
        assert!(state.position.x > 0.0, "player should move right, got x={}", state.position.x);
        assert!(contacts.is_empty());
    }

    #[test]
    fn wall_does_not_move() {
        let mut pw = PhysicsWorld::new();
        let wall = pw.create_body(BodyKind::Wall, Vec2::new(1.0, 2.0), &slab(1.0, 1.0), &Material::wall());
        for _ in 0..10 {
            pw.step(&StepParams::default(), &mut Vec::<ContactBegin>::new());
        }
        let state = pw.body_state(wall).unwrap();
        assert_eq!(state.position, Vec2::new(1.0, 2.0));
    }

    #[test]
    fn set_body_state_teleports() {
        let mut pw = PhysicsWorld::new();
        let h = pw.create_body(BodyKind::Ball, Vec2::ZERO, &ball_shape(), &Material::ball());
        pw.set_body_state(
            h,
            BodyState {
                position: Vec2::new(12.0, 20.0),
                velocity: Vec2::new(0.0, -3.0),
            },
        );
        let state = pw.body_state(h).unwrap();
        assert!((state.position.x - 12.0).abs() < 1e-6);
        assert!((state.velocity.y + 3.0).abs() < 1e-6);
    }

    #[test]
    fn ball_hitting_player_reports_tagged_contact() {
        let mut pw = PhysicsWorld::new();
        let ball = pw.create_body(BodyKind::Ball, Vec2::ZERO, &ball_shape(), &Material::ball());
        pw.set_velocity(ball, Vec2::new(20.0, 0.0));
        pw.create_body(
            BodyKind::player(2),
            Vec2::new(3.0, 0.0),
            &slab(0.75, 0.75),
            &Material::player(),
        );

        let mut contacts: Vec<ContactBegin> = Vec::new();
        for _ in 0..20 {
            pw.step(&StepParams::default(), &mut contacts);
        }

        assert!(!contacts.is_empty(), "ball moving into a player should touch it");
        let kinds = [contacts[0].a.map(|t| t.kind), contacts[0].b.map(|t| t.kind)];
        assert!(kinds.contains(&Some(BodyKind::Ball)));
        assert!(kinds.contains(&Some(BodyKind::Player { team: 1, agent: 2 })));
    }

    #[test]
    fn determinism_two_identical_runs() {
        fn run() -> Vec<(f64, f64, usize)> {
            let mut pw = PhysicsWorld::new();
            let ball = pw.create_body(BodyKind::Ball, Vec2::ZERO, &ball_shape(), &Material::ball());
            pw.set_velocity(ball, Vec2::new(25.0, 4.0));
            pw.create_body(BodyKind::Wall, Vec2::new(5.0, 0.0), &slab(0.5, 5.0), &Material::wall());

            let mut trace = Vec::new();
            for _ in 0..100 {
                let mut contacts: Vec<ContactBegin> = Vec::new();
                pw.step(&StepParams::default(), &mut contacts);
                let s = pw.body_state(ball).unwrap();
                trace.push((s.position.x, s.position.y, contacts.len()));
            }
            trace
        }

        assert_eq!(run(), run(), "two identical runs should produce identical trajectories");
    }

    #[test]
    fn rebuilt_world_matches_fresh_world() {
        fn populate(pw: &mut PhysicsWorld) -> RigidBodyHandle {
            let ball = pw.create_body(BodyKind::Ball, Vec2::ZERO, &ball_shape(), &Material::ball());
            pw.set_velocity(ball, Vec2::new(-7.0, 11.0));
            pw.create_body(BodyKind::Wall, Vec2::new(0.0, 4.0), &slab(5.0, 0.5), &Material::wall());
            ball
        }

        let mut fresh = PhysicsWorld::new();
        let fresh_ball = populate(&mut fresh);

        let mut reused = PhysicsWorld::new();
        populate(&mut reused);
        for _ in 0..30 {
            reused.step(&StepParams::default(), &mut Vec::<ContactBegin>::new());
        }
        reused.destroy_all_bodies();
        let reused_ball = populate(&mut reused);

        for _ in 0..60 {
            fresh.step(&StepParams::default(), &mut Vec::<ContactBegin>::new());
            reused.step(&StepParams::default(), &mut Vec::<ContactBegin>::new());
        }
        assert_eq!(fresh.body_state(fresh_ball), reused.body_state(reused_ball));
    }

    #[test]
    fn vec2_arithmetic() {
        let a = Vec2::new(3.0, 4.0);
        assert_eq!(a.length(), 5.0);
        assert_eq!(a.dot(Vec2::new(1.0, 0.0)), 3.0);
        assert_eq!(a - a, Vec2::ZERO);
        assert_eq!(-a, Vec2::new(-3.0, -4.0));
        assert_eq!(a * 2.0, Vec2::new(6.0, 8.0));
        assert_eq!(a.distance(Vec2::ZERO), 5.0);
    }
}
