mod auth;
mod case_insensitive_string_ext;
mod config;
mod error;
mod identity;
mod password;
mod resources;
mod routes;
mod store;
mod telemetry;
mod token;
mod types;

pub use auth::*;
pub use config::*;
pub use error::*;
pub use identity::*;
pub use password::*;
pub use resources::*;
pub use routes::*;
pub use store::*;
pub use telemetry::*;
pub use token::*;
pub use types::*;
