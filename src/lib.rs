pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod docs;
pub mod engine;
pub mod error;
pub mod model;
pub mod repo;
pub mod routes;
