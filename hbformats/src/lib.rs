//! Readers for Project DIVA asset databases and the Project Heartbeat replay format.
//!
//! Every decoder works on an in-memory byte slice and returns plain data; loading
//! files and handing results to an engine is left to the caller. Scene-graph
//! integration goes through the [`SkeletonBuilder`] and [`MeshBuilder`] traits.

#![forbid(unsafe_code)]

mod bone_db;
mod cursor;
mod error;
mod kv_table;
mod module_table;
mod motion;
mod motion_db;
mod object_db;
mod object_set;
mod replay;
mod sprite_db;
mod sprite_set;
mod txp;

#[cfg(feature = "json")]
mod dump;

#[cfg(feature = "glam")]
mod math;

pub use bone_db::*;
pub use cursor::*;
pub use error::*;
pub use kv_table::*;
pub use module_table::*;
pub use motion::*;
pub use motion_db::*;
pub use object_db::*;
pub use object_set::*;
pub use replay::*;
pub use sprite_db::*;
pub use sprite_set::*;
pub use txp::*;

#[cfg(feature = "json")]
pub use dump::*;

#[cfg(test)]
mod test_support;



#[cfg(all(test, feature = "json"))]
mod dump_tests;
