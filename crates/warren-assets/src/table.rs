//! The rigid-body asset table shared by every world.
//!
//! One entry per [`SimObject`]: collision shape, inverse mass, friction,
//! inverse inertia. Built once at manager construction from the embedded
//! hull sources and never mutated afterwards; worlds hold it behind an
//! `Arc` and read placement extents and mass properties from it.

use crate::error::AssetError;
use crate::obj::{parse_hull, HullMesh};
use std::fmt;

/// The fixed set of simulation objects.
///
/// Discriminants index [`RigidBodyTable`] rows. `Plane` is last and is the
/// only analytic (mesh-free) shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum SimObject {
    /// Movable block agents can push and grab.
    Cube,
    /// Static wall segment.
    Wall,
    /// Door panel blocking a wall gap until opened.
    Door,
    /// Player-controlled agent body.
    Agent,
    /// Floor pressure plate.
    Button,
    /// Collectible key.
    Key,
    /// Infinite floor plane.
    Plane,
}

impl SimObject {
    /// Number of simulation objects.
    pub const COUNT: usize = 7;

    /// All objects in table order.
    pub const ALL: [SimObject; Self::COUNT] = [
        SimObject::Cube,
        SimObject::Wall,
        SimObject::Door,
        SimObject::Agent,
        SimObject::Button,
        SimObject::Key,
        SimObject::Plane,
    ];

    /// Table row index.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            SimObject::Cube => "cube",
            SimObject::Wall => "wall",
            SimObject::Door => "door",
            SimObject::Agent => "agent",
            SimObject::Button => "button",
            SimObject::Key => "key",
            SimObject::Plane => "plane",
        }
    }
}

impl fmt::Display for SimObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static and dynamic friction coefficients.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Friction {
    /// Static friction coefficient.
    pub mu_s: f32,
    /// Dynamic friction coefficient.
    pub mu_d: f32,
}

/// A processed convex hull: vertex cloud plus derived placement extents.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvexHull {
    /// Hull vertices in mesh-local coordinates.
    pub vertices: Vec<[f32; 3]>,
    /// Center of the axis-aligned bounding box.
    pub center: [f32; 3],
    /// Half extents of the axis-aligned bounding box.
    pub half_extents: [f32; 3],
}

impl ConvexHull {
    fn from_mesh(mesh: &HullMesh) -> Self {
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for v in &mesh.vertices {
            for axis in 0..3 {
                min[axis] = min[axis].min(v[axis]);
                max[axis] = max[axis].max(v[axis]);
            }
        }
        let center = [
            (min[0] + max[0]) * 0.5,
            (min[1] + max[1]) * 0.5,
            (min[2] + max[2]) * 0.5,
        ];
        let half_extents = [
            (max[0] - min[0]) * 0.5,
            (max[1] - min[1]) * 0.5,
            (max[2] - min[2]) * 0.5,
        ];
        Self {
            vertices: mesh.vertices.clone(),
            center,
            half_extents,
        }
    }
}

/// Collision geometry of one object.
#[derive(Clone, Debug, PartialEq)]
pub enum CollisionShape {
    /// Convex hull from an embedded mesh.
    Hull(ConvexHull),
    /// Infinite z=0 half-space.
    Plane,
}

/// Mass and contact properties plus collision shape for one object.
#[derive(Clone, Debug, PartialEq)]
pub struct RigidBody {
    /// Collision geometry.
    pub shape: CollisionShape,
    /// Inverse mass; 0 marks an immovable body.
    pub inv_mass: f32,
    /// Contact friction.
    pub friction: Friction,
    /// Per-axis inverse rotational inertia; 0 locks rotation about that
    /// axis.
    pub inv_inertia: [f32; 3],
}

/// The immutable per-object physics table.
#[derive(Clone, Debug)]
pub struct RigidBodyTable {
    bodies: Vec<RigidBody>,
}

impl RigidBodyTable {
    /// Look up one object's entry.
    pub fn body(&self, object: SimObject) -> &RigidBody {
        &self.bodies[object.index()]
    }

    /// Convenience: the AABB half extents of a hull-backed object.
    ///
    /// # Panics
    ///
    /// Panics if called for [`SimObject::Plane`], which has no hull.
    pub fn half_extents(&self, object: SimObject) -> [f32; 3] {
        match &self.body(object).shape {
            CollisionShape::Hull(hull) => hull.half_extents,
            CollisionShape::Plane => panic!("plane has no hull extents"),
        }
    }
}

const CUBE_SRC: &str = include_str!("data/cube_collision.obj");
const WALL_SRC: &str = include_str!("data/wall_collision.obj");
const DOOR_SRC: &str = include_str!("data/door_collision.obj");
const AGENT_SRC: &str = include_str!("data/agent_collision.obj");
const BUTTON_SRC: &str = include_str!("data/button_collision.obj");
const KEY_SRC: &str = include_str!("data/key_collision.obj");

/// Build the complete rigid-body table from the embedded hull sources.
///
/// Inverse masses and friction follow the fixed per-object tuning: cubes
/// are heavy-but-movable (inverse mass 0.075, raised dynamic friction so
/// pushed cubes settle), walls/doors/plane are immovable, agents, buttons
/// and keys have unit mass. Agent inverse inertia is zeroed on X and Y
/// after hull processing: agents may only rotate about the vertical axis,
/// which keeps them controllable by the policy.
///
/// # Errors
///
/// Returns the first [`AssetError`] encountered; the caller treats any
/// error as fatal to construction.
pub fn load_collision_assets() -> Result<RigidBodyTable, AssetError> {
    let mut bodies = Vec::with_capacity(SimObject::COUNT);

    let hull_body = |object: SimObject,
                     source: &str,
                     inv_mass: f32,
                     friction: Friction|
     -> Result<RigidBody, AssetError> {
        let mesh = parse_hull(object.name(), source)?;
        let hull = ConvexHull::from_mesh(&mesh);
        let inv_inertia = box_inv_inertia(inv_mass, hull.half_extents);
        Ok(RigidBody {
            shape: CollisionShape::Hull(hull),
            inv_mass,
            friction,
            inv_inertia,
        })
    };

    bodies.push(hull_body(
        SimObject::Cube,
        CUBE_SRC,
        0.075,
        Friction {
            mu_s: 0.5,
            mu_d: 0.75,
        },
    )?);
    bodies.push(hull_body(
        SimObject::Wall,
        WALL_SRC,
        0.0,
        Friction {
            mu_s: 0.5,
            mu_d: 0.5,
        },
    )?);
    bodies.push(hull_body(
        SimObject::Door,
        DOOR_SRC,
        0.0,
        Friction {
            mu_s: 0.5,
            mu_d: 0.5,
        },
    )?);
    bodies.push(hull_body(
        SimObject::Agent,
        AGENT_SRC,
        1.0,
        Friction {
            mu_s: 0.5,
            mu_d: 0.5,
        },
    )?);
    bodies.push(hull_body(
        SimObject::Button,
        BUTTON_SRC,
        1.0,
        Friction {
            mu_s: 0.5,
            mu_d: 0.5,
        },
    )?);
    bodies.push(hull_body(
        SimObject::Key,
        KEY_SRC,
        1.0,
        Friction {
            mu_s: 0.5,
            mu_d: 0.5,
        },
    )?);
    bodies.push(RigidBody {
        shape: CollisionShape::Plane,
        inv_mass: 0.0,
        friction: Friction {
            mu_s: 0.5,
            mu_d: 0.5,
        },
        inv_inertia: [0.0; 3],
    });

    // Lock agent rotation to yaw only.
    let agent = &mut bodies[SimObject::Agent.index()];
    agent.inv_inertia[0] = 0.0;
    agent.inv_inertia[1] = 0.0;

    Ok(RigidBodyTable { bodies })
}

/// Inverse inertia of a solid box with the given AABB half extents.
///
/// `I_axis = m/3 * (h_b^2 + h_c^2)` for the two perpendicular half
/// extents; immovable bodies get zero on every axis.
fn box_inv_inertia(inv_mass: f32, h: [f32; 3]) -> [f32; 3] {
    if inv_mass == 0.0 {
        return [0.0; 3];
    }
    let inertia = |b: f32, c: f32| (b * b + c * c) / (3.0 * inv_mass);
    [
        1.0 / inertia(h[1], h[2]),
        1.0 / inertia(h[0], h[2]),
        1.0 / inertia(h[0], h[1]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_loads() {
        let table = load_collision_assets().unwrap();
        for object in SimObject::ALL {
            let body = table.body(object);
            match object {
                SimObject::Plane => assert_eq!(body.shape, CollisionShape::Plane),
                _ => assert!(matches!(body.shape, CollisionShape::Hull(_))),
            }
        }
    }

    #[test]
    fn inverse_masses_match_tuning() {
        let table = load_collision_assets().unwrap();
        assert_eq!(table.body(SimObject::Cube).inv_mass, 0.075);
        assert_eq!(table.body(SimObject::Wall).inv_mass, 0.0);
        assert_eq!(table.body(SimObject::Door).inv_mass, 0.0);
        assert_eq!(table.body(SimObject::Agent).inv_mass, 1.0);
        assert_eq!(table.body(SimObject::Button).inv_mass, 1.0);
        assert_eq!(table.body(SimObject::Key).inv_mass, 1.0);
        assert_eq!(table.body(SimObject::Plane).inv_mass, 0.0);
    }

    #[test]
    fn cube_dynamic_friction_is_raised() {
        let table = load_collision_assets().unwrap();
        let cube = table.body(SimObject::Cube);
        assert_eq!(cube.friction.mu_s, 0.5);
        assert_eq!(cube.friction.mu_d, 0.75);
    }

    #[test]
    fn agent_rotates_only_about_z() {
        let table = load_collision_assets().unwrap();
        let agent = table.body(SimObject::Agent);
        assert_eq!(agent.inv_inertia[0], 0.0);
        assert_eq!(agent.inv_inertia[1], 0.0);
        assert!(agent.inv_inertia[2] > 0.0);
    }

    #[test]
    fn static_bodies_have_zero_inertia() {
        let table = load_collision_assets().unwrap();
        assert_eq!(table.body(SimObject::Wall).inv_inertia, [0.0; 3]);
        assert_eq!(table.body(SimObject::Door).inv_inertia, [0.0; 3]);
    }

    #[test]
    fn hull_extents_are_sane() {
        let table = load_collision_assets().unwrap();
        let cube = table.half_extents(SimObject::Cube);
        assert_eq!(cube, [1.0, 1.0, 1.0]);
        let agent = table.half_extents(SimObject::Agent);
        assert!((agent[0] - 0.4).abs() < 1e-5);
        assert!((agent[2] - 0.9).abs() < 1e-5);
        let key = table.half_extents(SimObject::Key);
        assert!((key[0] - 0.15).abs() < 1e-5);
    }

    #[test]
    #[should_panic(expected = "plane has no hull extents")]
    fn plane_extents_panic() {
        let table = load_collision_assets().unwrap();
        let _ = table.half_extents(SimObject::Plane);
    }
}
