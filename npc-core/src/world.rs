//! World model: named objects at positions in a 3D scene.
//!
//! Stands in for the engine's scene graph and overlap queries. Objects are
//! plain data; lookups are linear scans, which is plenty for a hand-built
//! scene.

use serde::{Deserialize, Serialize};

/// A point or direction in world space. Missing components read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(self, other: Vec3) -> f32 {
        (self - other).length()
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    pub fn normalized(self) -> Vec3 {
        let len = self.length();
        if len <= f32::EPSILON {
            Vec3::ZERO
        } else {
            self * (1.0 / len)
        }
    }

    /// Move from `self` toward `target` by at most `max_step`.
    pub fn step_toward(self, target: Vec3, max_step: f32) -> Vec3 {
        let offset = target - self;
        let dist = offset.length();
        if dist <= max_step || dist <= f32::EPSILON {
            target
        } else {
            self + offset * (max_step / dist)
        }
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// A named object the NPC can walk to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldObject {
    pub name: String,
    pub position: Vec3,
}

impl WorldObject {
    pub fn new(name: impl Into<String>, position: Vec3) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }
}

/// Scene layout as read from configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub objects: Vec<WorldObject>,
    /// Patrol route, visited in order and wrapping around.
    pub waypoints: Vec<Vec3>,
    pub npc_start: Vec3,
    pub player_start: Vec3,
}

/// The set of objects currently known to the scene.
#[derive(Debug, Clone, Default)]
pub struct World {
    objects: Vec<WorldObject>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_objects(objects: Vec<WorldObject>) -> Self {
        Self { objects }
    }

    pub fn add(&mut self, object: WorldObject) {
        self.objects.push(object);
    }

    pub fn objects(&self) -> &[WorldObject] {
        &self.objects
    }

    /// Objects within `radius` of `origin`.
    pub fn within(&self, origin: Vec3, radius: f32) -> impl Iterator<Item = &WorldObject> {
        self.objects
            .iter()
            .filter(move |o| o.position.distance(origin) <= radius)
    }

    /// The closest object within `radius` whose name contains `query`,
    /// compared case-insensitively.
    pub fn nearest_matching(&self, origin: Vec3, query: &str, radius: f32) -> Option<&WorldObject> {
        let query = query.to_lowercase();
        self.within(origin, radius)
            .filter(|o| o.name.to_lowercase().contains(&query))
            .min_by(|a, b| {
                a.position
                    .distance(origin)
                    .total_cmp(&b.position.distance(origin))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> World {
        World::from_objects(vec![
            WorldObject::new("Lamp01", Vec3::new(3.0, 0.0, 0.0)),
            WorldObject::new("lamp02", Vec3::new(1.0, 0.0, 0.0)),
            WorldObject::new("Crate", Vec3::new(0.0, 0.0, 5.0)),
            WorldObject::new("FarLamp", Vec3::new(100.0, 0.0, 0.0)),
        ])
    }

    #[test]
    fn test_vector_math() {
        let a = Vec3::new(3.0, 0.0, 4.0);
        assert_eq!(a.length(), 5.0);
        assert_eq!(a.distance(Vec3::ZERO), 5.0);
        assert!((a.normalized().length() - 1.0).abs() < 1e-6);
        assert_eq!(Vec3::ZERO.normalized(), Vec3::ZERO);
    }

    #[test]
    fn test_step_toward() {
        let start = Vec3::ZERO;
        let target = Vec3::new(10.0, 0.0, 0.0);
        assert_eq!(start.step_toward(target, 5.0), Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(start.step_toward(target, 20.0), target);
    }

    #[test]
    fn test_nearest_matching_is_case_insensitive() {
        let world = scene();
        let hit = world.nearest_matching(Vec3::ZERO, "LAMP", 20.0).unwrap();
        assert_eq!(hit.name, "lamp02");
    }

    #[test]
    fn test_nearest_matching_respects_radius() {
        let world = scene();
        assert!(world.nearest_matching(Vec3::ZERO, "farlamp", 20.0).is_none());
        assert!(world.nearest_matching(Vec3::ZERO, "farlamp", 200.0).is_some());
    }

    #[test]
    fn test_no_match() {
        assert!(scene().nearest_matching(Vec3::ZERO, "barrel", 20.0).is_none());
    }

    #[test]
    fn test_within() {
        let names: Vec<_> = scene()
            .within(Vec3::ZERO, 4.0)
            .map(|o| o.name.clone())
            .collect();
        assert_eq!(names, vec!["Lamp01", "lamp02"]);
    }
}
