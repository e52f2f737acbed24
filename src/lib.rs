mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod pagination;
    pub mod schema;
    pub mod validation;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod http {
    pub mod handlers;
    pub mod reply;
    pub mod routes;
}
mod config;
mod constants;
mod media;

pub use authentication::*;
pub use config::*;
pub use constants::*;
pub use database::*;
pub use http::*;
pub use media::*;
pub use routes::{routes, AppContext};
