pub mod error;
pub mod scoring;
pub mod service;
pub mod storage;
#[cfg(test)]
mod tests;
pub mod types;
pub mod validation;

pub use error::RoomError;
pub use service::{RoomService, RoomServiceFactory};
pub use types::*;
pub use validation::*;
