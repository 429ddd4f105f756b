//! Photo Booth
//!
//! Backend for a face-swap photo booth: a child's photo is uploaded to an
//! S3-compatible image store, optionally masked around the face, and blended
//! into a character template by a Replicate model. Clients poll for the result.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
