pub mod api;
pub mod error;
pub mod gui;
pub mod lang_data;
pub mod persistence;
