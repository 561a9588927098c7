//! Terrain generation and destruction
//!
//! The surface is a bounded random walk sampled at unit x stride. Each
//! consecutive sample pair becomes one static angled obstacle; the subsurface
//! between the surface and the water line is filled with small destructible
//! cells; decorations are sprinkled along the surface. Explosions carve all
//! three away by center distance.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use rapier2d::prelude::RigidBodyHandle;

use crate::consts::*;
use crate::physics::{BodyDef, BodyTag, PhysicsWorld, ShapeDef};

/// Decoration glyph options (trees and cactus).
pub const DECORATION_GLYPHS: [&str; 4] = ["🌲", "🌳", "🌴", "🌵"];

/// One static obstacle owned by the terrain model.
#[derive(Debug, Clone, Copy)]
pub struct Obstacle {
    pub handle: RigidBodyHandle,
    pub center: Vec2,
}

/// A cosmetic but collidable surface decoration.
#[derive(Debug, Clone, Copy)]
pub struct Decoration {
    pub handle: RigidBodyHandle,
    pub center: Vec2,
    pub glyph: &'static str,
}

/// Generate surface sample points as a bounded random walk.
///
/// X coordinates strictly increase at unit stride over `[0, width)`; y moves
/// by a uniform delta in `[-smoothness, +smoothness]` per step and is clamped
/// to `[min_height, max_height]` at every step.
pub fn generate(
    rng: &mut Pcg32,
    width: usize,
    smoothness: f32,
    min_height: f32,
    max_height: f32,
) -> Vec<Vec2> {
    let mut points = Vec::with_capacity(width);
    let mut y = rng.random_range(min_height..=max_height);
    for x in 0..width {
        y += rng.random_range(-smoothness..=smoothness);
        y = y.clamp(min_height, max_height);
        points.push(Vec2::new(x as f32, y));
    }
    points
}

/// The terrain model: surface segments, subsurface cells, decorations.
#[derive(Default)]
pub struct Terrain {
    pub points: Vec<Vec2>,
    segments: Vec<Obstacle>,
    cells: Vec<Obstacle>,
    decorations: Vec<Decoration>,
}

impl Terrain {
    /// Build the full terrain (segments + cells + decorations) from scratch.
    pub fn build(
        rng: &mut Pcg32,
        physics: &mut PhysicsWorld,
        smoothness: f32,
        min_height: f32,
        max_height: f32,
    ) -> Self {
        let points = generate(rng, CANVAS_WIDTH as usize, smoothness, min_height, max_height);
        let mut terrain = Self {
            points,
            segments: Vec::new(),
            cells: Vec::new(),
            decorations: Vec::new(),
        };
        terrain.build_segments(physics);
        terrain.generate_cells(physics);
        terrain.generate_decorations(rng, physics);
        terrain
    }

    /// One static obstacle per consecutive sample pair, oriented along the
    /// pair's slope.
    fn build_segments(&mut self, physics: &mut PhysicsWorld) {
        for pair in self.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let center = (a + b) / 2.0;
            let length = a.distance(b);
            let angle = (b.y - a.y).atan2(b.x - a.x);
            let handle = physics.spawn(
                BodyDef::fixed(
                    center,
                    ShapeDef::Rect {
                        width: length,
                        height: CELL_SIZE,
                        angle,
                    },
                    BodyTag::Terrain,
                )
                .with_material(0.6, 0.0, 1.0),
            );
            self.segments.push(Obstacle { handle, center });
        }
    }

    /// Fill the subsurface with destructible cells at [`CELL_SIZE`] stride.
    ///
    /// Clears and regenerates the full cell set; no incremental diffing.
    pub fn generate_cells(&mut self, physics: &mut PhysicsWorld) {
        for cell in self.cells.drain(..) {
            physics.remove(cell.handle);
        }
        let mut x = 0.0;
        while x < CANVAS_WIDTH {
            // Nearest surface sample within one cell of this column.
            let surface = self
                .points
                .iter()
                .find(|point| (point.x - x).abs() < CELL_SIZE);
            if let Some(surface) = surface {
                let mut y = surface.y;
                while y < WATER_LEVEL {
                    let center = Vec2::new(x, y);
                    let handle = physics.spawn(
                        BodyDef::fixed(
                            center,
                            ShapeDef::Rect {
                                width: CELL_SIZE,
                                height: CELL_SIZE,
                                angle: 0.0,
                            },
                            BodyTag::DestructibleCell,
                        )
                        .with_material(0.3, 0.0, 1.0),
                    );
                    self.cells.push(Obstacle { handle, center });
                    y += CELL_SIZE;
                }
            }
            x += CELL_SIZE;
        }
    }

    /// Place decorations probabilistically along the surface.
    fn generate_decorations(&mut self, rng: &mut Pcg32, physics: &mut PhysicsWorld) {
        for point in self.points.iter().step_by(DECORATION_STRIDE) {
            if rng.random_bool(DECORATION_CHANCE) {
                let glyph = DECORATION_GLYPHS[rng.random_range(0..DECORATION_GLYPHS.len())];
                let center = Vec2::new(point.x, point.y - DECORATION_SIZE / 2.0);
                let handle = physics.spawn(BodyDef::fixed(
                    center,
                    ShapeDef::Rect {
                        width: DECORATION_SIZE,
                        height: DECORATION_SIZE,
                        angle: 0.0,
                    },
                    BodyTag::Decoration,
                ));
                self.decorations.push(Decoration {
                    handle,
                    center,
                    glyph,
                });
            }
        }
    }

    /// Remove every segment, decoration, and cell whose center lies strictly
    /// within `radius` of `point`. Idempotent; returns the number removed.
    pub fn remove_within_radius(
        &mut self,
        physics: &mut PhysicsWorld,
        point: Vec2,
        radius: f32,
    ) -> usize {
        let before = self.segments.len() + self.cells.len() + self.decorations.len();
        self.segments.retain(|segment| {
            let hit = segment.center.distance(point) < radius;
            if hit {
                physics.remove(segment.handle);
            }
            !hit
        });
        self.decorations.retain(|decoration| {
            let hit = decoration.center.distance(point) < radius;
            if hit {
                physics.remove(decoration.handle);
            }
            !hit
        });
        self.cells.retain(|cell| {
            let hit = cell.center.distance(point) < radius;
            if hit {
                physics.remove(cell.handle);
            }
            !hit
        });
        before - (self.segments.len() + self.cells.len() + self.decorations.len())
    }

    /// Remove one specific obstacle by handle (direct projectile hits chip
    /// the segment they struck before the explosion resolves).
    pub fn remove_obstacle(&mut self, physics: &mut PhysicsWorld, handle: RigidBodyHandle) {
        self.segments.retain(|segment| segment.handle != handle);
        self.decorations.retain(|decoration| decoration.handle != handle);
        self.cells.retain(|cell| cell.handle != handle);
        physics.remove(handle);
    }

    /// Tear down every terrain body (match restart).
    pub fn clear(&mut self, physics: &mut PhysicsWorld) {
        for obstacle in self.segments.drain(..) {
            physics.remove(obstacle.handle);
        }
        for obstacle in self.cells.drain(..) {
            physics.remove(obstacle.handle);
        }
        for decoration in self.decorations.drain(..) {
            physics.remove(decoration.handle);
        }
        self.points.clear();
    }

    /// Surface height at a given x, if sampled there.
    pub fn height_at(&self, x: f32) -> Option<f32> {
        self.points
            .iter()
            .find(|point| (point.x - x).abs() < 1.0)
            .map(|point| point.y)
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn decoration_count(&self) -> usize {
        self.decorations.len()
    }

    pub fn decorations(&self) -> &[Decoration] {
        &self.decorations
    }
}
