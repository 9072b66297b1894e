pub mod base;
pub mod discord;
pub mod instagram;
