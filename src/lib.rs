pub mod api;
pub mod config;
pub mod providers;
pub mod subscribe;
pub mod types;
pub mod unsubscribe;
