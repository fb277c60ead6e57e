//! Request handlers.

pub mod health;
pub mod local;
pub mod progress;
pub mod render;
pub mod variations;

pub use health::*;
pub use local::*;
pub use progress::*;
pub use render::*;
pub use variations::*;
