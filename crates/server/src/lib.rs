//! HTTP backend of the Inquisition admin console.

pub mod alerts;
pub mod api;
pub mod cache;
pub mod cli;
pub mod db;
pub mod router;
pub mod startup;
pub mod state;
pub mod stats;
