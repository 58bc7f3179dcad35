//! Registry core: dispatch tables, refcounting and panic containment.
//!
//! The only public API from this module is [`Registry`], its
//! [`RegistryBuilder`] and the [`Config`] both are built from.
//!
//! Internal modules:
//! - [`calls`]: name → call handler table and the observing result sink;
//! - [`subscriptions`]: name → subscription handler table and the refcounted active table;
//! - [`panic`]: converts handler panics into errors with a backtrace;
//! - [`registry`]: the dispatcher tying the tables together;
//! - [`builder`]: wires the registry to its diagnostics bus and broadcaster.

mod builder;
mod calls;
mod config;
pub(crate) mod panic;
mod registry;
mod subscriptions;

pub use builder::RegistryBuilder;
pub use config::{Config, OverflowPolicy};
pub use registry::Registry;
