//! HTTP handlers

pub mod health;
pub mod auth;
pub mod student;
pub mod lecturer;
pub mod academic;
pub mod users;
