// Signer avatar library
// Sign resolution and avatar playback for sign-language reading pages

pub mod assets;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod logging;
pub mod metadata;
pub mod notifier;
pub mod playback;
pub mod resolver;

pub use cli::Cli;
pub use config::Options;
pub use logging::LogLevel;
