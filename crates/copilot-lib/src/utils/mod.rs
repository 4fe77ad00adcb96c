// Utility modules

pub mod store;

pub use store::{CopilotPreferences, PreferencesStore, APP_IDENTIFIER};
