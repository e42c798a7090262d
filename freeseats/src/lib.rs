pub mod cache;
pub mod domain;
pub mod events;
pub mod listener;
pub mod persistence;
pub mod planes;
pub mod ports;

pub use cache::TtlCache;
pub use listener::ChangeFeedListener;
pub use planes::data::seat_operations::SeatService;
