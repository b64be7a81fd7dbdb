#[allow(clippy::module_inception)]
pub mod orchestrator;
pub mod state;
