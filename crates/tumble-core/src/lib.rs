//! Tumble Core Library
//!
//! Grid model of a marble-run board and its synchronization with a
//! `Rapier2D` physics world.
//!
//! Parts live on the [`Board`]. Only the parts around each ball get a live
//! rigid body; the [`BallRouter`] creates and releases them as balls move and
//! copies state between parts and bodies every tick.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::float_cmp)]

pub mod animator;
pub mod board;
pub mod config;
pub mod disjoint;
pub mod error;
pub mod part;
pub mod part_body;
pub mod physics;
pub mod router;
pub mod shapes;
pub mod sim;
pub mod wireframe;

pub use animator::{AnimatedProperty, Animatable, Animator};
pub use board::{Board, BoardHooks, Geometry, NoopHooks};
pub use config::SimConfig;
pub use error::{Result, TumbleError};
pub use part::{FenceVariant, Part, PartId, PartType};
pub use physics::{PHYSICS_DT, PhysicsWorld, default_gravity};
pub use router::BallRouter;
pub use shapes::ShapeTable;
pub use sim::Simulation;
pub use wireframe::Wireframe;
