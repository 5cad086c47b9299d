//! Short-lived access tokens and single-use, fingerprint-bound refresh
//! sessions behind an axum HTTP API.

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;

pub mod crypto {
    pub mod password;
    pub mod token;
}

pub mod models;

pub mod repositories;

pub mod services {
    pub mod auth;
    pub mod credentials;
    pub mod rotator;
}

pub mod handlers {
    pub mod auth;
}

pub mod middleware_layer {
    pub mod auth;
    pub mod rate_limit;
}

pub mod validation {
    pub mod auth;
}
