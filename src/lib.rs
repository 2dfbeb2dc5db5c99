pub mod database {
    pub mod actions;
    pub mod connection;
    pub mod error;
    pub mod form;
    pub mod memory;
    pub mod schema;
    pub mod store;
}
pub mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
}
pub mod services {
    pub mod media;
    pub mod users;
}
pub mod api {
    pub mod openapi;
    pub mod query;
    pub mod recipes;
    pub mod routes;
    pub mod serializers;
    pub mod taxonomy;
    pub mod users;
}
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod state;

pub use api::routes::app;
pub use config::Config;
pub use state::AppState;
