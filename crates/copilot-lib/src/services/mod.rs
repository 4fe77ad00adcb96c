// Services module
// Business logic for the copilot

pub mod copilot;
