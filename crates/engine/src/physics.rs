use crate::geom::{Rect, Vec2};

const MAX_SUBSTEPS: u32 = 16;
const MAX_PUSH_ITERATIONS: usize = 4;
const PENETRATION_EPSILON: f32 = 1e-4;

/// Narrow view of a simulated circle body.
pub trait PhysicsBody {
    fn position(&self) -> Vec2;
    fn set_position(&mut self, position: Vec2);
    fn velocity(&self) -> Vec2;
    fn set_velocity(&mut self, velocity: Vec2);
    fn radius(&self) -> f32;

    /// Region the body's circle is kept inside of, if any.
    fn bounds(&self) -> Option<Rect>;
    fn set_bounds(&mut self, bounds: Option<Rect>);

    /// Fraction of velocity kept (and reflected) when hitting the bounds.
    fn restitution(&self) -> f32;
    fn set_restitution(&mut self, restitution: f32);

    fn overlaps(&self, other: &dyn PhysicsBody) -> bool {
        let reach = self.radius() + other.radius();
        (other.position() - self.position()).length_squared() < reach * reach
    }
}

/// Host side of the physics capability: body construction, integration and
/// pairwise overlap resolution.
pub trait PhysicsWorld {
    fn create_body(&mut self, position: Vec2, radius: f32) -> Box<dyn PhysicsBody>;

    /// Advances `body` by `dt_seconds`, blocking against `solids` and clamping to
    /// the body's bounds.
    fn step(&mut self, body: &mut dyn PhysicsBody, dt_seconds: f32, solids: Option<&SolidMask>);

    /// Pushes two overlapping bodies apart. Returns whether they were in contact.
    fn separate(&mut self, a: &mut dyn PhysicsBody, b: &mut dyn PhysicsBody) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CircleBody {
    position: Vec2,
    velocity: Vec2,
    radius: f32,
    bounds: Option<Rect>,
    restitution: f32,
}

impl CircleBody {
    pub fn new(position: Vec2, radius: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            radius: radius.max(0.0),
            bounds: None,
            restitution: 0.0,
        }
    }
}

impl PhysicsBody for CircleBody {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    fn velocity(&self) -> Vec2 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    fn radius(&self) -> f32 {
        self.radius
    }

    fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    fn set_bounds(&mut self, bounds: Option<Rect>) {
        self.bounds = bounds;
    }

    fn restitution(&self) -> f32 {
        self.restitution
    }

    fn set_restitution(&mut self, restitution: f32) {
        self.restitution = restitution.clamp(0.0, 1.0);
    }
}

/// Static collision geometry: a grid of blocking tiles in world pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct SolidMask {
    width: u32,
    height: u32,
    tile_width: f32,
    tile_height: f32,
    solid: Vec<bool>,
}

impl SolidMask {
    pub fn new(width: u32, height: u32, tile_width: u32, tile_height: u32) -> Self {
        Self {
            width,
            height,
            tile_width: tile_width.max(1) as f32,
            tile_height: tile_height.max(1) as f32,
            solid: vec![false; width as usize * height as usize],
        }
    }

    pub fn mark(&mut self, x: u32, y: u32) {
        if let Some(index) = self.index_of(x, y) {
            self.solid[index] = true;
        }
    }

    pub fn is_solid(&self, x: u32, y: u32) -> bool {
        self.index_of(x, y)
            .map(|index| self.solid[index])
            .unwrap_or(false)
    }

    pub fn solid_count(&self) -> usize {
        self.solid.iter().filter(|solid| **solid).count()
    }

    pub fn is_solid_at_world(&self, point: Vec2) -> bool {
        if point.x < 0.0 || point.y < 0.0 {
            return false;
        }
        let x = (point.x / self.tile_width).floor() as u32;
        let y = (point.y / self.tile_height).floor() as u32;
        self.is_solid(x, y)
    }

    fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    fn tile_rect(&self, x: u32, y: u32) -> Rect {
        let min = Vec2::new(x as f32 * self.tile_width, y as f32 * self.tile_height);
        Rect {
            min,
            max: Vec2::new(min.x + self.tile_width, min.y + self.tile_height),
        }
    }

    fn min_tile_extent(&self) -> f32 {
        self.tile_width.min(self.tile_height)
    }

    /// Inclusive tile range touched by a circle's bounding box.
    fn tile_span(&self, center: Vec2, radius: f32) -> Option<(u32, u32, u32, u32)> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let x_min = ((center.x - radius) / self.tile_width).floor() as i64;
        let x_max = ((center.x + radius) / self.tile_width).floor() as i64;
        let y_min = ((center.y - radius) / self.tile_height).floor() as i64;
        let y_max = ((center.y + radius) / self.tile_height).floor() as i64;
        let x_min = x_min.max(0);
        let y_min = y_min.max(0);
        let x_max = x_max.min(self.width as i64 - 1);
        let y_max = y_max.min(self.height as i64 - 1);
        if x_min > x_max || y_min > y_max {
            return None;
        }
        Some((x_min as u32, x_max as u32, y_min as u32, y_max as u32))
    }
}

/// Top-down arcade physics: no gravity, no rotation, circle colliders only.
#[derive(Debug, Default)]
pub struct ArcadePhysics;

impl PhysicsWorld for ArcadePhysics {
    fn create_body(&mut self, position: Vec2, radius: f32) -> Box<dyn PhysicsBody> {
        Box::new(CircleBody::new(position, radius))
    }

    fn step(&mut self, body: &mut dyn PhysicsBody, dt_seconds: f32, solids: Option<&SolidMask>) {
        if !dt_seconds.is_finite() || dt_seconds <= 0.0 {
            return;
        }
        let mut velocity = body.velocity();
        let mut position = body.position();
        let radius = body.radius();
        let travel = velocity * dt_seconds;

        let substeps = match solids {
            Some(mask) => {
                let max_move = (mask.min_tile_extent() * 0.5).max(1.0);
                ((travel.length() / max_move).ceil() as u32).clamp(1, MAX_SUBSTEPS)
            }
            None => 1,
        };
        let step_dt = dt_seconds / substeps as f32;

        for _ in 0..substeps {
            position += velocity * step_dt;
            if let Some(mask) = solids {
                position = push_out_of_solids(mask, position, radius, &mut velocity);
            }
        }

        if let Some(bounds) = body.bounds() {
            (position, velocity) =
                clamp_into_bounds(bounds, position, radius, velocity, body.restitution());
        }

        body.set_position(position);
        body.set_velocity(velocity);
    }

    fn separate(&mut self, a: &mut dyn PhysicsBody, b: &mut dyn PhysicsBody) -> bool {
        if !a.overlaps(&*b) {
            return false;
        }
        let delta = b.position() - a.position();
        let distance = delta.length();
        let normal = delta.normalized().unwrap_or(Vec2::new(1.0, 0.0));
        let overlap = a.radius() + b.radius() - distance;
        let half_push = normal * (overlap * 0.5);

        nudge_within_bounds(a, half_push * -1.0);
        nudge_within_bounds(b, half_push);
        true
    }
}

fn nudge_within_bounds(body: &mut dyn PhysicsBody, push: Vec2) {
    let mut position = body.position() + push;
    if let Some(bounds) = body.bounds() {
        position = bounds.inset(body.radius()).clamp(position);
    }
    body.set_position(position);
}

fn push_out_of_solids(mask: &SolidMask, center: Vec2, radius: f32, velocity: &mut Vec2) -> Vec2 {
    let mut position = center;
    for _ in 0..MAX_PUSH_ITERATIONS {
        let Some((x_min, x_max, y_min, y_max)) = mask.tile_span(position, radius) else {
            return position;
        };
        let mut pushed = false;
        for ty in y_min..=y_max {
            for tx in x_min..=x_max {
                if !mask.is_solid(tx, ty) {
                    continue;
                }
                let tile = mask.tile_rect(tx, ty);
                let Some((normal, depth)) = circle_rect_penetration(position, radius, &tile) else {
                    continue;
                };
                position += normal * depth;
                let into_surface = velocity.dot(normal);
                if into_surface < 0.0 {
                    *velocity = *velocity - normal * into_surface;
                }
                pushed = true;
            }
        }
        if !pushed {
            break;
        }
    }
    position
}

fn circle_rect_penetration(center: Vec2, radius: f32, rect: &Rect) -> Option<(Vec2, f32)> {
    let closest = rect.clamp(center);
    let delta = center - closest;
    let dist_sq = delta.length_squared();
    if dist_sq >= radius * radius {
        return None;
    }
    if dist_sq > PENETRATION_EPSILON {
        let dist = dist_sq.sqrt();
        return Some((delta * dist.recip(), radius - dist));
    }

    // Center is inside the tile: leave through the nearest edge.
    let exits = [
        (Vec2::new(-1.0, 0.0), center.x - rect.min.x),
        (Vec2::new(1.0, 0.0), rect.max.x - center.x),
        (Vec2::new(0.0, -1.0), center.y - rect.min.y),
        (Vec2::new(0.0, 1.0), rect.max.y - center.y),
    ];
    exits
        .into_iter()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(normal, edge_distance)| (normal, edge_distance + radius))
}

fn clamp_into_bounds(
    bounds: Rect,
    position: Vec2,
    radius: f32,
    velocity: Vec2,
    restitution: f32,
) -> (Vec2, Vec2) {
    let inner = bounds.inset(radius);
    let clamped = inner.clamp(position);
    let mut velocity = velocity;
    if clamped.x != position.x {
        velocity.x = -velocity.x * restitution;
    }
    if clamped.y != position.y {
        velocity.y = -velocity.y * restitution;
    }
    (clamped, velocity)
}
