pub mod auth;
#[allow(clippy::module_inception)]
pub mod server;
