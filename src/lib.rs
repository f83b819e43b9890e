pub mod access;
pub mod config;
pub mod db;
pub mod error;
pub mod i18n;
pub mod service;
