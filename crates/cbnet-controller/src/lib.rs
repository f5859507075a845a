//! CBNet Controller
//!
//! Round-synchronous control plane for a self-adjusting tree network.
//!
//! # Rounds
//!
//! Between rounds, nodes report what they hold: a message waiting for a
//! routing decision ([`HasMessage`]) or a message still being forwarded under
//! an earlier directive ([`RoutingInfo`]). [`Controller::step`] then decides
//! the whole round at once and returns a [`RoundReport`] of
//! [`RoutingDirective`]s.
//!
//! # Rotations
//!
//! A message climbing toward the root tries to lift its holder two levels;
//! a message descending tries to lift the node two hops below. The
//! [`RotationEngine`] prices each rotation with the weighted rank potential
//! and applies it only if the potential drops below `epsilon` and every
//! participant is free this round. Otherwise the message just hops.
//!
//! # Example
//!
//! ```
//! use cbnet_controller::{Controller, ControllerConfig};
//! use cbnet_topology::NodeId;
//!
//! let mut controller = Controller::new(ControllerConfig::with_nodes(7)).unwrap();
//! controller.report_has_message(NodeId(1), NodeId(2)).unwrap();
//!
//! let report = controller.step().unwrap();
//! assert_eq!(report.directives[0].next, NodeId(2));
//! ```

mod arbiter;
mod config;
mod driver;
mod error;
mod events;
mod rotation;
mod router;

pub use arbiter::RoundArbiter;
pub use config::{ControllerConfig, DEFAULT_EPSILON, DEFAULT_FALLBACK_HOPS};
pub use driver::{Controller, ControllerStats, RoundReport};
pub use error::{Error, Result};
pub use events::{DrainOrder, EventQueue, HasMessage, QueuedEvent, RoutingDirective, RoutingInfo};
pub use rotation::{rank, Participants, RejectReason, RotationEngine, RotationOutcome, RotationRecord};
pub use router::{direction, plan, Direction, Rotation};
