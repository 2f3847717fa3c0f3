//! Emyzelium Runtime - The three roles of the overlay
//!
//! - [`Efunguz`]: publishes etales, authorizes subscribers, beacons to
//!   catalogs and owns the subscription handles of the peers it reads
//! - [`Ehypha`]: one subscription to another peer, with catalog-voted
//!   address resolution and the latest value of every subscribed topic
//! - [`Ecataloguz`]: collects beacons and republishes the directory
//!
//! Every role is driven by the caller through a non-blocking `update()`.

pub mod config;
pub mod ecataloguz;
pub mod efunguz;
pub mod ehypha;
pub mod etale;
pub mod logging;
pub mod stats;
pub mod votes;

pub use config::*;
pub use ecataloguz::*;
pub use efunguz::*;
pub use ehypha::*;
pub use etale::*;
pub use logging::*;
pub use stats::*;
pub use votes::*;
