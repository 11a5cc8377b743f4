pub mod engine;
pub mod stub;
