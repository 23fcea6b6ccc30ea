//! Domain layer - Error taxonomy and the seams to the outside world
//!
//! Event data, the manifest, durable storage and time are all reached
//! through the traits defined here, so the playback core never touches
//! files, the network or the system clock directly.

pub mod clock;
pub mod errors;
pub mod repositories;

pub use clock::*;
pub use errors::*;
pub use repositories::*;
