pub mod operation;
pub mod seat_operations;

pub use operation::SeatOperations;
pub use seat_operations::SeatService;
