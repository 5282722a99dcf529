pub mod advice;
pub mod alerts;
pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod schedule;
pub mod state;
