//! CBNet Simulation
//!
//! Generates traffic, drives the round-synchronous controller and records a
//! timeline of what happened.
//!
//! # Rounds
//!
//! Each round every node with an idle source queue injects its next message.
//! Holders then report to the controller: messages still executing a
//! directive announce their remaining hops, all others ask for a decision.
//! After the controller answers, every forwarding message moves one hop and
//! arrivals are delivered, which is what feeds the weights the controller
//! prices its rotations with.
//!
//! # Usage
//!
//! ```
//! use cbnet_sim::{Simulation, SimulationConfig};
//!
//! let config = SimulationConfig {
//!     nodes: 31,
//!     messages: 50,
//!     ..SimulationConfig::default()
//! };
//! let mut sim = Simulation::new(config).unwrap();
//! let stats = sim.run().unwrap();
//! assert_eq!(stats.delivered, 50);
//! ```

mod error;
mod events;
mod simulation;
mod workload;

pub use error::{Error, Result};
pub use events::{MessageId, SimEvent};
pub use simulation::{Message, SimStats, Simulation, SimulationConfig};
pub use workload::Workload;
