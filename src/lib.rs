pub mod config;
pub mod editor;
pub mod services;
pub mod waveform;

pub use editor::controller::EditorController;
