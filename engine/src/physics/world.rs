//! Physics world: fixed-timestep orchestration
//!
//! [`PhysicsWorld`] owns every body, persistent constraint and the spatial
//! index, and drives the per-step pipeline:
//!
//! ```text
//! commands -> broadphase -> narrowphase -> manifolds -> shuffle
//!          -> pre-solve -> integrate velocity -> N x impulses -> integrate position
//! ```
//!
//! # Fixed timestep
//!
//! [`PhysicsWorld::step`] banks wall-clock time and consumes it in fixed
//! increments, at most `max_substeps` per call. If a full increment is still
//! banked afterwards the world is falling behind real time: the remainder is
//! dropped and a warning is logged.
//!
//! # Deferred mutation
//!
//! Callbacks run inside a step and cannot borrow the world. They send
//! [`WorldCommand`]s through [`PhysicsWorld::command_sender`] instead; the
//! queue is drained before every sub-step.
//!
//! # Example
//!
//! ```ignore
//! use sat_impulse_engine::physics::{PhysicsConfig, PhysicsWorld, RigidBody};
//! use glam::Vec3;
//!
//! let mut world = PhysicsWorld::new(PhysicsConfig::default())?;
//! let ground = world.add_body(RigidBody::cuboid(Vec3::ZERO, Vec3::new(20.0, 1.0, 20.0), 0.0));
//! let ball = world.add_body(RigidBody::sphere(Vec3::new(0.0, 5.0, 0.0), 0.5, 1.0));
//!
//! loop {
//!     let report = world.step(frame_dt);
//!     render(world.body(ball).map(|b| b.pose()));
//! }
//! ```

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use glam::Vec3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use slotmap::{SecondaryMap, SlotMap};
use tracing::{debug, info, trace, warn};

use super::body::{BodySet, IntegrationParams, RigidBody};
use super::broadphase::{CollisionPair, find_pairs};
use super::config::{BroadphaseMode, DebugDrawFlags, PhysicsConfig, SolverOrder, check_damping};
use super::constraint::Constraint;
use super::debug_draw::{DebugDrawList, NORMAL_COLOR, VOLUME_COLOR};
use super::error::{PhysicsError, PhysicsResult};
use super::manifold::Manifold;
use super::octree::Octree;
use super::raycast::{self, RayHit};
use super::sat::{self, CollisionData, ShapeInstance};
use super::types::{BodyHandle, ConstraintHandle};

/// A mutation requested from outside the step (or from a callback inside it).
pub enum WorldCommand {
    /// Add a body; the new handle is sent to `reply` if given.
    AddBody {
        /// Body to insert
        body: Box<RigidBody>,
        /// Receives the assigned handle
        reply: Option<Sender<BodyHandle>>,
    },
    /// Remove a body.
    RemoveBody(BodyHandle),
    /// Add a persistent constraint; the new handle is sent to `reply` if given.
    AddConstraint {
        /// Constraint to insert
        constraint: Box<dyn Constraint>,
        /// Receives the assigned handle
        reply: Option<Sender<ConstraintHandle>>,
    },
    /// Remove a persistent constraint.
    RemoveConstraint(ConstraintHandle),
    /// Pause or resume the simulation.
    SetPaused(bool),
}

impl std::fmt::Debug for WorldCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorldCommand::AddBody { body, .. } => f.debug_tuple("AddBody").field(body).finish(),
            WorldCommand::RemoveBody(h) => f.debug_tuple("RemoveBody").field(h).finish(),
            WorldCommand::AddConstraint { constraint, .. } => f
                .debug_tuple("AddConstraint")
                .field(&constraint.bodies())
                .finish(),
            WorldCommand::RemoveConstraint(h) => f.debug_tuple("RemoveConstraint").field(h).finish(),
            WorldCommand::SetPaused(p) => f.debug_tuple("SetPaused").field(p).finish(),
        }
    }
}

/// Counters and timings for the most recent sub-step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepStats {
    /// Pairs proposed by the broadphase
    pub candidate_pairs: usize,
    /// Pairs the narrowphase confirmed as overlapping
    pub colliding_pairs: usize,
    /// Manifolds kept after callbacks and contact generation
    pub manifolds: usize,
    /// Contact points across all manifolds
    pub contacts: usize,
    /// Time spent in the broadphase (including octree maintenance)
    pub broadphase_time: Duration,
    /// Time spent in SAT and contact generation
    pub narrowphase_time: Duration,
    /// Time spent in pre-solve and impulse iterations
    pub solver_time: Duration,
    /// Time spent integrating velocities and positions
    pub integration_time: Duration,
}

/// Outcome of one [`PhysicsWorld::step`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UpdateReport {
    /// Fixed sub-steps executed
    pub substeps: u32,
    /// True if banked time was dropped because the sub-step cap was hit
    pub fell_behind: bool,
    /// Seconds of simulation time dropped
    pub dropped_time: f32,
}

/// The simulation: bodies, constraints and the fixed-timestep loop.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    bodies: BodySet,
    constraints: SlotMap<ConstraintHandle, Box<dyn Constraint>>,
    constraint_order: Vec<ConstraintHandle>,
    octree: Octree,

    // Per-step buffers, reused across steps
    pairs: Vec<CollisionPair>,
    manifolds: Vec<Manifold>,
    solve_order: Vec<ConstraintHandle>,
    collision_debug: Vec<CollisionData>,

    dragged: SecondaryMap<BodyHandle, f32>,
    command_tx: Sender<WorldCommand>,
    command_rx: Receiver<WorldCommand>,
    rng: StdRng,

    paused: bool,
    time_bank: f32,
    total_substeps: u64,
    stats: StepStats,
}

impl std::fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("bodies", &self.bodies.len())
            .field("constraints", &self.constraints.len())
            .field("manifolds", &self.manifolds.len())
            .field("paused", &self.paused)
            .field("time_bank", &self.time_bank)
            .field("total_substeps", &self.total_substeps)
            .finish()
    }
}

impl PhysicsWorld {
    /// Creates an empty world.
    ///
    /// # Errors
    ///
    /// [`PhysicsError::InvalidConfig`] if the configuration fails validation.
    pub fn new(config: PhysicsConfig) -> PhysicsResult<Self> {
        config.validate()?;

        let rng = match config.solver.order {
            SolverOrder::Shuffled { seed: Some(seed) } => StdRng::seed_from_u64(seed),
            SolverOrder::Shuffled { seed: None } => StdRng::from_entropy(),
            SolverOrder::Fixed => StdRng::seed_from_u64(0),
        };
        let (command_tx, command_rx) = mpsc::channel();

        info!(
            timestep = config.timestep,
            max_substeps = config.max_substeps,
            iterations = config.solver.iterations,
            broadphase = ?config.broadphase,
            "Physics world created"
        );

        Ok(Self {
            octree: Octree::new(&config.octree),
            config,
            bodies: BodySet::with_key(),
            constraints: SlotMap::with_key(),
            constraint_order: Vec::new(),
            pairs: Vec::new(),
            manifolds: Vec::new(),
            solve_order: Vec::new(),
            collision_debug: Vec::new(),
            dragged: SecondaryMap::new(),
            command_tx,
            command_rx,
            rng,
            paused: false,
            time_bank: 0.0,
            total_substeps: 0,
            stats: StepStats::default(),
        })
    }

    // =========================================================================
    // Bodies and constraints
    // =========================================================================

    /// Adds a body and registers it with the spatial index.
    ///
    /// A body whose shape fails [`crate::physics::CollisionShape::validate`] is still added,
    /// but gets no rotational response and a warning is logged.
    pub fn add_body(&mut self, body: RigidBody) -> BodyHandle {
        if let Some(Err(error)) = body.shape().map(|s| s.validate()) {
            warn!(%error, "Adding body with degenerate shape");
        }
        let handle = self.bodies.insert(body);
        self.octree.insert(handle, &self.bodies);
        trace!(?handle, "Body added");
        handle
    }

    /// Removes a body and returns it.
    ///
    /// Constraints still referencing the body become inert; remove them first.
    pub fn remove_body(&mut self, handle: BodyHandle) -> PhysicsResult<RigidBody> {
        let body = self
            .bodies
            .remove(handle)
            .ok_or(PhysicsError::UnknownBody(handle))?;
        self.octree.remove(handle);
        self.dragged.remove(handle);

        let dangling = self
            .constraints
            .values()
            .filter(|c| {
                let (a, b) = c.bodies();
                a == handle || b == handle
            })
            .count();
        if dangling > 0 {
            warn!(?handle, dangling, "Removed body is still referenced by constraints");
        }
        trace!(?handle, "Body removed");
        Ok(body)
    }

    /// Adds a persistent constraint.
    pub fn add_constraint(&mut self, constraint: impl Constraint + 'static) -> ConstraintHandle {
        self.add_boxed_constraint(Box::new(constraint))
    }

    /// Adds an already boxed persistent constraint.
    pub fn add_boxed_constraint(&mut self, constraint: Box<dyn Constraint>) -> ConstraintHandle {
        let handle = self.constraints.insert(constraint);
        self.constraint_order.push(handle);
        handle
    }

    /// Removes a persistent constraint and returns it.
    pub fn remove_constraint(&mut self, handle: ConstraintHandle) -> PhysicsResult<Box<dyn Constraint>> {
        let constraint = self
            .constraints
            .remove(handle)
            .ok_or(PhysicsError::UnknownConstraint(handle))?;
        self.constraint_order.retain(|h| *h != handle);
        Ok(constraint)
    }

    /// Removes every body and constraint and empties the time bank.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.constraints.clear();
        self.constraint_order.clear();
        self.manifolds.clear();
        self.dragged.clear();
        self.octree.clear();
        self.time_bank = 0.0;
        info!("Physics world cleared");
    }

    /// Sender for deferred [`WorldCommand`]s.
    pub fn command_sender(&self) -> Sender<WorldCommand> {
        self.command_tx.clone()
    }

    /// Applies every queued command now.
    pub fn apply_pending_commands(&mut self) {
        while let Ok(command) = self.command_rx.try_recv() {
            self.apply_command(command);
        }
    }

    fn apply_command(&mut self, command: WorldCommand) {
        trace!(?command, "Applying deferred command");
        match command {
            WorldCommand::AddBody { body, reply } => {
                let handle = self.add_body(*body);
                if let Some(reply) = reply {
                    let _ = reply.send(handle);
                }
            }
            WorldCommand::RemoveBody(handle) => {
                if let Err(err) = self.remove_body(handle) {
                    debug!(%err, "Deferred body removal skipped");
                }
            }
            WorldCommand::AddConstraint { constraint, reply } => {
                let handle = self.add_boxed_constraint(constraint);
                if let Some(reply) = reply {
                    let _ = reply.send(handle);
                }
            }
            WorldCommand::RemoveConstraint(handle) => {
                if let Err(err) = self.remove_constraint(handle) {
                    debug!(%err, "Deferred constraint removal skipped");
                }
            }
            WorldCommand::SetPaused(paused) => self.set_paused(paused),
        }
    }

    // =========================================================================
    // Accessors and global parameters
    // =========================================================================

    /// All bodies.
    pub fn bodies(&self) -> &BodySet {
        &self.bodies
    }

    /// A body by handle.
    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    /// A body by handle, mutably (external control between steps).
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    /// Number of bodies.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// A persistent constraint by handle.
    pub fn constraint(&self, handle: ConstraintHandle) -> Option<&dyn Constraint> {
        self.constraints.get(handle).map(|c| c.as_ref())
    }

    /// Number of persistent constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Manifolds from the most recent sub-step.
    pub fn manifolds(&self) -> &[Manifold] {
        &self.manifolds
    }

    /// The spatial index.
    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    /// Statistics of the most recent sub-step.
    pub fn stats(&self) -> &StepStats {
        &self.stats
    }

    /// Sub-steps executed since creation.
    pub fn total_substeps(&self) -> u64 {
        self.total_substeps
    }

    /// Time banked but not yet simulated (seconds).
    pub fn time_bank(&self) -> f32 {
        self.time_bank
    }

    /// Active configuration.
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Gravity acceleration.
    pub fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    /// Sets gravity acceleration.
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.config.gravity = gravity;
    }

    /// Velocity damping factor.
    pub fn damping(&self) -> f32 {
        self.config.damping
    }

    /// Sets the per-sub-step velocity damping factor.
    ///
    /// # Errors
    ///
    /// [`PhysicsError::InvalidConfig`] outside (0, 1], the same range
    /// [`PhysicsConfig::validate`] accepts. The current factor is kept.
    pub fn set_damping(&mut self, damping: f32) -> PhysicsResult<()> {
        check_damping(damping)?;
        self.config.damping = damping;
        Ok(())
    }

    /// True while paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pauses or resumes. Takes effect before the next sub-step.
    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            debug!(paused, "Physics pause toggled");
        }
        self.paused = paused;
    }

    /// Switches the broadphase strategy.
    pub fn set_broadphase(&mut self, mode: BroadphaseMode) {
        self.config.broadphase = mode;
    }

    /// Replaces the debug-draw flags.
    pub fn set_debug_draw_flags(&mut self, flags: DebugDrawFlags) {
        self.config.debug_draw = flags;
    }

    // =========================================================================
    // Fixed-timestep loop
    // =========================================================================

    /// Banks `delta_time` and runs as many fixed sub-steps as it covers, up to
    /// the configured cap.
    ///
    /// Negative or non-finite deltas are treated as zero.
    pub fn step(&mut self, delta_time: f32) -> UpdateReport {
        let mut report = UpdateReport::default();

        self.apply_pending_commands();
        if self.paused {
            return report;
        }

        if delta_time.is_finite() && delta_time > 0.0 {
            self.time_bank += delta_time;
        }

        let timestep = self.config.timestep;
        while self.time_bank >= timestep && report.substeps < self.config.max_substeps {
            self.apply_pending_commands();
            // A pause requested mid-loop stops the remaining sub-steps
            if self.paused {
                return report;
            }
            self.time_bank -= timestep;
            self.run_substep();
            report.substeps += 1;
        }

        if self.time_bank >= timestep {
            report.fell_behind = true;
            report.dropped_time = self.time_bank;
            warn!(
                dropped = self.time_bank,
                substeps = report.substeps,
                "Physics too slow to run in real time, dropping banked time"
            );
            self.time_bank = 0.0;
        }
        report
    }

    /// Runs exactly one fixed sub-step, ignoring the time bank and pause state.
    ///
    /// Useful for frame-by-frame debugging and tests.
    pub fn step_once(&mut self) -> &StepStats {
        self.apply_pending_commands();
        self.run_substep();
        &self.stats
    }

    fn run_substep(&mut self) {
        let dt = self.config.timestep;
        let mut stats = StepStats::default();

        // 1. Broadphase, using positions from the previous step
        let started = Instant::now();
        if self.config.broadphase == BroadphaseMode::Octree {
            self.octree.update(&self.bodies);
        }
        find_pairs(self.config.broadphase, &self.bodies, &self.octree, &mut self.pairs);
        stats.candidate_pairs = self.pairs.len();
        stats.broadphase_time = started.elapsed();

        // 2. Narrowphase and contact generation
        let started = Instant::now();
        self.manifolds.clear();
        self.collision_debug.clear();
        let keep_debug = self.config.debug_draw.collision_normals;
        for pair in &self.pairs {
            if is_excluded(&self.bodies, &self.config.excluded_tag_pairs, pair) {
                continue;
            }
            let Some(collision) = detect_pair(&self.bodies, pair) else {
                continue;
            };
            stats.colliding_pairs += 1;
            if keep_debug {
                self.collision_debug.push(collision);
            }

            let Some([a, b]) = self.bodies.get_disjoint_mut([pair.a, pair.b]) else {
                continue;
            };
            let accept_a = a.fire_collision_event(pair.a, pair.b);
            let accept_b = b.fire_collision_event(pair.b, pair.a);
            if !(accept_a && accept_b) {
                trace!(a = ?pair.a, b = ?pair.b, "Collision vetoed by callback");
                continue;
            }
            if let Some(manifold) = Manifold::build(pair.a, a, pair.b, b, &collision) {
                self.manifolds.push(manifold);
            }
        }
        stats.manifolds = self.manifolds.len();
        stats.contacts = self.manifolds.iter().map(|m| m.contacts().len()).sum();
        stats.narrowphase_time = started.elapsed();

        // 3. Ordering
        self.solve_order.clear();
        self.solve_order.extend_from_slice(&self.constraint_order);
        if let SolverOrder::Shuffled { .. } = self.config.solver.order {
            self.manifolds.shuffle(&mut self.rng);
            self.solve_order.shuffle(&mut self.rng);
        }

        // 4. Pre-solve
        let started = Instant::now();
        let solver = self.config.solver;
        for manifold in &mut self.manifolds {
            manifold.pre_solver_step(&self.bodies, dt, &solver);
        }
        for handle in &self.solve_order {
            if let Some(constraint) = self.constraints.get_mut(*handle) {
                constraint.pre_solver_step(&self.bodies, dt, &solver);
            }
        }
        let mut solver_time = started.elapsed();

        // 5. Velocities
        let started = Instant::now();
        let params = IntegrationParams {
            gravity: self.config.gravity,
            damping: self.config.damping,
        };
        for (_, body) in self.bodies.iter_mut() {
            body.integrate_velocity(&params, dt);
        }
        let mut integration_time = started.elapsed();

        // 6. Sequential impulses
        let started = Instant::now();
        for _ in 0..solver.iterations {
            for manifold in &mut self.manifolds {
                manifold.apply_impulse(&mut self.bodies);
            }
            for handle in &self.solve_order {
                if let Some(constraint) = self.constraints.get_mut(*handle) {
                    constraint.apply_impulse(&mut self.bodies);
                }
            }
        }
        solver_time += started.elapsed();

        // 7. Positions
        let started = Instant::now();
        for (handle, body) in self.bodies.iter_mut() {
            body.integrate_position(handle, dt);
        }
        integration_time += started.elapsed();

        stats.solver_time = solver_time;
        stats.integration_time = integration_time;
        self.stats = stats;
        self.total_substeps += 1;

        debug!(
            pairs = stats.candidate_pairs,
            colliding = stats.colliding_pairs,
            manifolds = stats.manifolds,
            contacts = stats.contacts,
            "Physics sub-step"
        );
    }

    // =========================================================================
    // Interactive control
    // =========================================================================

    /// Starts dragging a body: it becomes kinematic (infinite mass) until
    /// [`end_drag`](Self::end_drag).
    pub fn begin_drag(&mut self, handle: BodyHandle) -> PhysicsResult<()> {
        let body = self
            .bodies
            .get_mut(handle)
            .ok_or(PhysicsError::UnknownBody(handle))?;
        if self.dragged.contains_key(handle) {
            return Ok(());
        }
        self.dragged.insert(handle, body.inverse_mass());
        body.set_inverse_mass(0.0);
        body.angular_velocity = Vec3::ZERO;
        Ok(())
    }

    /// Moves a dragged body to `position`, giving it the velocity that covers
    /// the displacement over `dt` so it pushes what it hits.
    pub fn drag_to(&mut self, handle: BodyHandle, position: Vec3, dt: f32) -> PhysicsResult<()> {
        if !self.dragged.contains_key(handle) {
            return Err(PhysicsError::NotDragging(handle));
        }
        let body = self
            .bodies
            .get_mut(handle)
            .ok_or(PhysicsError::UnknownBody(handle))?;
        body.linear_velocity = if dt > 0.0 {
            (position - body.position()) / dt
        } else {
            Vec3::ZERO
        };
        body.angular_velocity = Vec3::ZERO;
        body.set_position(position);
        Ok(())
    }

    /// Releases a dragged body, restoring its mass. It keeps its velocity.
    pub fn end_drag(&mut self, handle: BodyHandle) -> PhysicsResult<()> {
        let inverse_mass = self
            .dragged
            .remove(handle)
            .ok_or(PhysicsError::NotDragging(handle))?;
        let body = self
            .bodies
            .get_mut(handle)
            .ok_or(PhysicsError::UnknownBody(handle))?;
        body.set_inverse_mass(inverse_mass);
        Ok(())
    }

    /// True if the body is currently being dragged.
    pub fn is_dragging(&self, handle: BodyHandle) -> bool {
        self.dragged.contains_key(handle)
    }

    /// Closest body hit by a ray within `max_distance`.
    pub fn ray_cast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        raycast::ray_cast(&self.bodies, origin, direction, max_distance)
    }

    // =========================================================================
    // Debug draw
    // =========================================================================

    /// Emits the primitives selected by the configured flags.
    pub fn debug_draw(&self, out: &mut DebugDrawList) {
        self.debug_draw_with(self.config.debug_draw, out);
    }

    /// Emits the primitives selected by `flags`.
    pub fn debug_draw_with(&self, flags: DebugDrawFlags, out: &mut DebugDrawList) {
        if flags.octree {
            self.octree.debug_draw(out);
        }
        if flags.collision_volumes {
            for (_, body) in &self.bodies {
                if let Some(shape) = body.shape() {
                    shape.debug_draw(&body.pose(), VOLUME_COLOR, out);
                }
            }
        }
        if flags.manifolds {
            for manifold in &self.manifolds {
                manifold.debug_draw(&self.bodies, out);
            }
        }
        if flags.constraints {
            for handle in &self.constraint_order {
                if let Some(constraint) = self.constraints.get(*handle) {
                    constraint.debug_draw(&self.bodies, out);
                }
            }
        }
        if flags.collision_normals {
            for collision in &self.collision_debug {
                let p = collision.point_on_plane;
                out.point(p, 0.1, NORMAL_COLOR);
                out.line(p, p - collision.normal * collision.penetration, NORMAL_COLOR);
            }
        }
    }
}

fn is_excluded(bodies: &BodySet, excluded: &[(String, String)], pair: &CollisionPair) -> bool {
    if excluded.is_empty() {
        return false;
    }
    let (Some(a), Some(b)) = (bodies.get(pair.a), bodies.get(pair.b)) else {
        return true;
    };
    let (Some(tag_a), Some(tag_b)) = (a.tag.as_deref(), b.tag.as_deref()) else {
        return false;
    };
    excluded
        .iter()
        .any(|(x, y)| (x == tag_a && y == tag_b) || (x == tag_b && y == tag_a))
}

fn detect_pair(bodies: &BodySet, pair: &CollisionPair) -> Option<CollisionData> {
    let a = bodies.get(pair.a)?;
    let b = bodies.get(pair.b)?;
    let shape_a = a.shape()?;
    let shape_b = b.shape()?;
    sat::detect(
        &ShapeInstance::new(shape_a, a.pose()),
        &ShapeInstance::new(shape_b, b.pose()),
    )
}
