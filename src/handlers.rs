// src/handlers.rs

pub mod analytics;
pub mod date_range;
pub mod products;
pub mod sales;
