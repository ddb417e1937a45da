//! Delivery channels and newsletter subscriptions.

mod model;
mod repository;

pub use model::DeliveryChannel;
pub use repository::ChannelRepository;
