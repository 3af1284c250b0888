//! # Airfreight desk
//!
//! Back office for a cargo lessor: order drafting with flight-leg quantity
//! allocation and flow checks, and a ULD stock take that tracks containers
//! moving between locations.
//!
//! The stateful parts run as service actors in the usual shape: a `Service`
//! owns its state and a mailbox, and a cloneable `Client` sends it typed
//! requests with a oneshot channel for the reply.
//!
//! - [`order_desk::OrderDeskService`] owns the draft and published tables.
//! - [`stocktake::StockTakeService`] owns one stock take and asks through a
//!   [`confirm::Confirmer`] before committing moves.
//! - [`catalog`] is the ULD backend, built on the generic
//!   [`actor_framework::ResourceActor`].
//! - [`system::DeskSystem`] starts them in dependency order and shuts them
//!   down again.
//!
//! The planning logic ([`flight_plan`], [`stocktake::movement`]) is plain
//! synchronous code with no actors involved.

#[macro_use]
mod macros;

pub mod actor_framework;
pub mod catalog;
pub mod completeness;
pub mod config;
pub mod confirm;
pub mod domain;
pub mod drafts;
pub mod error;
pub mod flight_plan;
pub mod messages;
pub mod order_desk;
pub mod order_details;
pub mod products;
pub mod stocktake;
pub mod storage;
pub mod system;

#[cfg(test)]
mod mock_framework;

pub use config::DeskConfig;
pub use system::{setup_tracing, DeskSystem};
