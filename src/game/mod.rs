//! Game simulation modules

pub mod arena;
pub mod broadcast;
pub mod input;
pub mod physics;
pub mod queue;
pub mod snapshot;
pub mod spawner;
pub mod world;

pub use arena::{ArenaHandle, GameArena};
