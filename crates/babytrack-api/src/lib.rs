//! HTTP service for baby profiles, tracker entries, reports and the
//! pregnancy checklist.

pub mod auth;
pub mod config;
pub mod errors;
pub mod routes;
pub mod state;
