pub mod api;
pub mod app;
pub mod changes;
pub mod models;
pub mod ratings;
pub mod sync;
pub mod tmdb;
pub mod view;
