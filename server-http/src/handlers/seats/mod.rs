pub mod basic;
pub mod events;
pub mod health;
