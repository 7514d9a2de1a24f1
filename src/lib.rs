pub mod app;
pub mod auth;
pub mod categories;
pub mod config;
pub mod currency;
pub mod db;
pub mod error;
pub mod memory;
pub mod state;
pub mod transactions;
