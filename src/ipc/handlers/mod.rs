pub mod categories;
pub mod core;
pub mod grades;
pub mod setup;
