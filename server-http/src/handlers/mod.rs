pub mod seats;

pub use seats::basic::{get_free_seats, index, sell_ticket};
pub use seats::events::stream_events;
pub use seats::health::health_check;
