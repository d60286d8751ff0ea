pub mod dispatch;
pub mod engine;
pub mod error;
pub mod gesture;
pub mod locator;
pub mod logger;
pub mod orchestrator;
pub mod palette;
pub mod perception;
pub mod plan;
pub mod platform;
pub mod resolver;
pub mod session;
pub mod settings;
pub mod sleep;
pub mod types;

pub use engine::ActionEngine;
pub use session::SessionContext;
