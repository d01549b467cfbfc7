//! Game loop foundation for browser games built with Rust and WebAssembly.
//!
//! Implement [`Game`] for your type, hand it to a [`GameLoop`], and call
//! [`GameLoop::run`]. The loop drives one `update`/`render` pair per
//! animation frame and loads the assets returned by `load` concurrently,
//! filing them into an [`Assets`] table by category.

// ==================== Modules ====================
#[macro_use]
pub mod browser;
pub mod assets;
pub mod engine;

// ==================== Re-exports ====================
pub use assets::{
    load_image, load_json, load_sound, AssetDescriptor, AssetKind, Assets, PendingLoad,
};
pub use engine::{Game, GameLoop};
