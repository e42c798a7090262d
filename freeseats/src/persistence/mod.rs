pub mod channel_feed;
pub mod sled_feed;
pub mod sled_store;

pub use channel_feed::ChannelChangeFeed;
pub use sled_feed::SledChangeFeed;
pub use sled_store::SledSeatStore;
