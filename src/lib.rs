#![deny(missing_debug_implementations)]
#![deny(rustdoc::all)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::cargo)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_errors_doc)]
// #![deny(missing_docs)]

//! # cordwire
//!
//! A Discord client library built around the gateway: connect, identify,
//! heartbeat, resume and iterate over dispatch events.
//!
//! ```no_run
//! use cordwire::gateway::Gateway;
//! use cordwire::model::gateway::GatewayIntents;
//!
//! # async fn run() -> cordwire::error::Result<()> {
//! let mut gateway = Gateway::new("token", GatewayIntents::non_privileged());
//! gateway.connect().await?;
//!
//! while let Some(dispatch) = gateway.next_event().await? {
//!     println!("{}: {}", dispatch.event, dispatch.data);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod gateway;
pub mod model;
pub mod rest;

/// The User-Agent presented on gateway and REST connections when the
/// caller does not override it.
pub const USER_AGENT: &str = concat!("cordwire/", env!("CARGO_PKG_VERSION"));
