pub mod config;
pub mod doctor;
pub mod form;
pub mod formatters;
pub mod record;
pub mod registry;
pub mod summary;
pub mod time;
pub mod wizard;
