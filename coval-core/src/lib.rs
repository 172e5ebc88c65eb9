pub mod config;
pub mod submission;
pub mod transcript;
pub mod types;

// Keep the public surface small and intentional.
pub use config::*;
pub use submission::*;
pub use transcript::*;
pub use types::*;
