//! Collision asset loading for the Warren simulator.
//!
//! The simulator is built around a fixed set of objects — cube, wall,
//! door, agent, button, key, and an analytic floor plane. This crate
//! parses the embedded convex-hull sources for the mesh-backed objects
//! and assembles the [`RigidBodyTable`] every world shares: geometry,
//! inverse mass, friction, inverse inertia.
//!
//! Loading happens once, at manager construction. Any malformed input is
//! an [`AssetError`] and aborts construction; there is no degraded mode
//! with a partial table.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod obj;
pub mod table;

pub use error::AssetError;
pub use obj::{parse_hull, HullMesh};
pub use table::{
    load_collision_assets, CollisionShape, ConvexHull, Friction, RigidBody, RigidBodyTable,
    SimObject,
};
