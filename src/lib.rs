//! Museum tour backend
//!
//! Visitors join guided tours built by producers from checkpoints: text,
//! pictures, museum objects and questions. This library provides the
//! storage, service and API layers behind the `/app` and `/web` GraphQL
//! endpoints and the `/file` REST endpoints.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod storage;
