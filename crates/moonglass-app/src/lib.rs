//! Moonglass viewer: spins a textured sphere in a window, or renders a
//! single frame to an image without one.

pub mod animation;
pub mod platform;
pub mod scene;
pub mod snapshot;
pub mod viewer;
