pub mod auth;
pub mod bidding;
pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod import;
pub mod notification;
pub mod query;
pub mod routes;
pub mod state;
pub mod storage;
