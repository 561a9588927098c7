//! Physics World Adapter
//!
//! Thin wrapper around rapier2d. The game rules never touch rapier types
//! directly: bodies are spawned from a [`BodyDef`], classified once at
//! creation with a [`BodyTag`], and everything after that flows through
//! handles, per-step contact events, and simple position/velocity queries.
//!
//! Units are canvas pixels with y growing downward. The integration step is
//! one frame (`dt = 1.0`), so velocities are pixels-per-frame and the tuning
//! constants in [`crate::consts`] read directly in pixels.

use std::collections::HashMap;
use std::sync::Mutex;

use glam::Vec2;
use rapier2d::prelude::*;

use crate::consts::GRAVITY_Y;

/// Interaction groups. World geometry and combatants share a group;
/// projectiles get their own so their collision mask can be narrowed.
pub const GROUP_WORLD: Group = Group::GROUP_1;
pub const GROUP_PROJECTILE: Group = Group::GROUP_2;
pub const GROUP_SENSOR: Group = Group::GROUP_3;

/// Gameplay classification of a body, resolved once at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyTag {
    Terrain,
    Decoration,
    DestructibleCell,
    Combatant,
    Projectile,
    Water,
}

/// Collider shape for a [`BodyDef`].
#[derive(Debug, Clone, Copy)]
pub enum ShapeDef {
    Circle { radius: f32 },
    /// Full extents (not half), rotated by `angle` radians.
    Rect { width: f32, height: f32, angle: f32 },
}

/// Everything needed to spawn one tagged body.
#[derive(Debug, Clone, Copy)]
pub struct BodyDef {
    pub pos: Vec2,
    pub shape: ShapeDef,
    pub dynamic: bool,
    pub sensor: bool,
    pub friction: f32,
    pub restitution: f32,
    pub density: f32,
    /// 0.0 makes a body immune to gravity ("not lobbed" projectiles)
    pub gravity_scale: f32,
    pub groups: InteractionGroups,
    pub tag: BodyTag,
}

impl BodyDef {
    pub fn fixed(pos: Vec2, shape: ShapeDef, tag: BodyTag) -> Self {
        Self {
            pos,
            shape,
            dynamic: false,
            sensor: false,
            friction: 0.5,
            restitution: 0.0,
            density: 1.0,
            gravity_scale: 1.0,
            groups: InteractionGroups::new(GROUP_WORLD, Group::ALL, InteractionTestMode::And),
            tag,
        }
    }

    pub fn dynamic(pos: Vec2, shape: ShapeDef, tag: BodyTag) -> Self {
        Self {
            dynamic: true,
            ..Self::fixed(pos, shape, tag)
        }
    }

    pub fn with_material(mut self, friction: f32, restitution: f32, density: f32) -> Self {
        self.friction = friction;
        self.restitution = restitution;
        self.density = density;
        self
    }

    pub fn with_groups(mut self, groups: InteractionGroups) -> Self {
        self.groups = groups;
        self
    }

    pub fn sensor(mut self) -> Self {
        self.sensor = true;
        self
    }

    pub fn without_gravity(mut self) -> Self {
        self.gravity_scale = 0.0;
        self
    }
}

/// One side of a collision-begin pair, already classified.
#[derive(Debug, Clone, Copy)]
pub struct ContactBody {
    pub handle: RigidBodyHandle,
    pub tag: BodyTag,
}

/// A collision-begin event between two tagged bodies.
#[derive(Debug, Clone, Copy)]
pub struct ContactBegan {
    pub a: ContactBody,
    pub b: ContactBody,
}

impl ContactBegan {
    /// If exactly one side carries `tag`, return (that side, the other).
    pub fn split(&self, tag: BodyTag) -> Option<(ContactBody, ContactBody)> {
        match (self.a.tag == tag, self.b.tag == tag) {
            (true, false) => Some((self.a, self.b)),
            (false, true) => Some((self.b, self.a)),
            _ => None,
        }
    }
}

/// Collects rapier collision events during a step.
///
/// Rapier hands events to a `&dyn EventHandler` which must be `Sync`, hence
/// the mutex; the simulation itself is single-threaded.
#[derive(Default)]
struct EventQueue {
    collisions: Mutex<Vec<CollisionEvent>>,
}

impl EventHandler for EventQueue {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if let Ok(mut queue) = self.collisions.lock() {
            queue.push(event);
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// The rigid-body world the game rules collaborate with.
pub struct PhysicsWorld {
    gravity: Vector<f32>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    tags: HashMap<ColliderHandle, (RigidBodyHandle, BodyTag)>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        // One integration frame per tick; velocities are pixels-per-frame.
        integration_parameters.dt = 1.0;

        Self {
            gravity: vector![0.0, GRAVITY_Y],
            integration_parameters,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            tags: HashMap::new(),
        }
    }

    /// Spawn one tagged body and return its handle.
    pub fn spawn(&mut self, def: BodyDef) -> RigidBodyHandle {
        let builder = if def.dynamic {
            RigidBodyBuilder::dynamic()
        } else {
            RigidBodyBuilder::fixed()
        };
        let angle = match def.shape {
            ShapeDef::Rect { angle, .. } => angle,
            ShapeDef::Circle { .. } => 0.0,
        };
        let body = builder
            .pose(Isometry::new(vector![def.pos.x, def.pos.y], angle))
            .gravity_scale(def.gravity_scale)
            .build();
        let body_handle = self.bodies.insert(body);

        let shape = match def.shape {
            ShapeDef::Circle { radius } => ColliderBuilder::ball(radius),
            ShapeDef::Rect { width, height, .. } => ColliderBuilder::cuboid(width / 2.0, height / 2.0),
        };
        let collider = shape
            .friction(def.friction)
            .restitution(def.restitution)
            .density(def.density)
            .sensor(def.sensor)
            .collision_groups(def.groups)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        let collider_handle = self
            .colliders
            .insert_with_parent(collider, body_handle, &mut self.bodies);
        self.tags.insert(collider_handle, (body_handle, def.tag));
        body_handle
    }

    /// Remove a body (and its collider) from the simulation. Idempotent.
    pub fn remove(&mut self, handle: RigidBodyHandle) {
        if self.bodies.get(handle).is_none() {
            return;
        }
        self.tags.retain(|_, (body, _)| *body != handle);
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    pub fn contains(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.get(handle).is_some()
    }

    /// Advance one frame and drain collision-begin events as tagged pairs.
    pub fn step(&mut self) -> Vec<ContactBegan> {
        let events = EventQueue::default();
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &events,
        );

        let drained = events
            .collisions
            .lock()
            .map(|mut queue| std::mem::take(&mut *queue))
            .unwrap_or_default();
        drained
            .into_iter()
            .filter_map(|event| match event {
                CollisionEvent::Started(a, b, _) => {
                    let a = self.classify(a)?;
                    let b = self.classify(b)?;
                    Some(ContactBegan { a, b })
                }
                CollisionEvent::Stopped(..) => None,
            })
            .collect()
    }

    fn classify(&self, collider: ColliderHandle) -> Option<ContactBody> {
        let (handle, tag) = *self.tags.get(&collider)?;
        Some(ContactBody { handle, tag })
    }

    pub fn position(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        self.bodies.get(handle).map(|body| {
            let t = body.translation();
            Vec2::new(t.x, t.y)
        })
    }

    pub fn velocity(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        self.bodies.get(handle).map(|body| {
            let v = body.linvel();
            Vec2::new(v.x, v.y)
        })
    }

    /// Whether the simulation considers the body settled.
    pub fn is_sleeping(&self, handle: RigidBodyHandle) -> bool {
        self.bodies
            .get(handle)
            .map(|body| body.is_sleeping())
            .unwrap_or(false)
    }

    pub fn set_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_linvel(vector![velocity.x, velocity.y], true);
        }
    }

    /// Add to the current linear velocity (instantaneous kick).
    pub fn boost_velocity(&mut self, handle: RigidBodyHandle, delta: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            let v = *body.linvel();
            body.set_linvel(vector![v.x + delta.x, v.y + delta.y], true);
        }
    }

    /// Cast a ray against a filtered body subset; returns the closest hit
    /// body and its distance along the ray direction.
    pub fn cast_ray(
        &self,
        from: Vec2,
        dir: Vec2,
        max_distance: f32,
        groups: InteractionGroups,
    ) -> Option<(RigidBodyHandle, f32)> {
        let filter = QueryFilter::default().groups(groups);
        let pipeline = self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            filter,
        );
        let ray = Ray::new(point![from.x, from.y], vector![dir.x, dir.y]);
        pipeline
            .cast_ray(&ray, max_distance, true)
            .and_then(|(collider, distance)| {
                let parent = self.colliders.get(collider)?.parent()?;
                Some((parent, distance))
            })
    }

    /// Number of live bodies, for diagnostics and tests.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}
