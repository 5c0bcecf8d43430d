pub mod api;
pub mod attendance;
pub mod config;
pub mod db;
pub mod error;
pub mod extraction;
pub mod layout;
pub mod models;
pub mod services;
pub mod state;
pub mod timer;
