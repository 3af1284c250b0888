//! Plain business data shared by the order desk and the stock take.
//!
//! Nothing in here talks to actors or storage; services own these values and
//! hand out clones.

pub mod airport;
pub mod order;
pub mod uld;

pub use airport::*;
pub use order::*;
pub use uld::*;
