//! Asset indexing module.
//!
//! The index keeps a relative path → presence map for everything under a
//! root directory. It is filled by a full walk when opened and then updated
//! by a single consumer thread that applies watcher events in arrival order.
//!
//! ## Module Structure
//!
//! - `presence` - Lock-guarded presence map
//! - `shared` - State shared between the index handle and its worker threads
//! - `manager` - Main API (`AssetIndex`)

mod manager;
mod presence;
mod shared;

pub use manager::AssetIndex;
