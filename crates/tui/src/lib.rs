mod app;
pub mod preview;
pub mod event;
pub mod ui;

pub use app::App;
