pub mod config;
pub mod data_mapping;
pub mod dataset;
pub mod errors;
pub mod export;
pub mod models;
pub mod services;
pub mod storage;
pub mod web;
