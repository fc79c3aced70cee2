pub mod events;
pub mod persistence;
