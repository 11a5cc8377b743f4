pub mod autosave;
pub mod controller;
pub mod event;
pub mod media;
pub mod overlay;
pub mod pipeline;
pub mod regions;
pub mod segment;
