// Data models module
// Conversation, tool and rendering types shared by the copilot services

pub mod copilot;
pub mod tool;

pub use copilot::*;
pub use tool::*;
