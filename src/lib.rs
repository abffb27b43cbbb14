// src/lib.rs

//! Maven2 artifact repository library.

pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;
