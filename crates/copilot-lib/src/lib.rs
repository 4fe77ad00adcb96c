// Copilot core library
// Tool detection, streaming chat orchestration and rendering helpers

pub mod models;
pub mod services;
pub mod utils;

// Re-export models for use by front ends
pub use models::*;
pub use services::copilot::*;
