pub mod animation;
pub mod error;
pub mod lamp;
pub mod models;
pub mod settings;
