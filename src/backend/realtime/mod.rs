//! Real-time Update Module
//!
//! Pushes message events to the clients viewing a chat surface.
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs       - Module exports and documentation
//! ├── registry.rs  - Connection Registry (connections, topics, subscribers)
//! ├── bus.rs       - Event Bus (sequenced per-topic fan-out)
//! └── transport.rs - WebSocket endpoint
//! ```
//!
//! # Delivery
//!
//! Delivery is at-most-once to connections subscribed at publish time, in
//! publish order within a topic. Disconnected clients miss events and
//! reconcile by re-fetching history after they rejoin.

/// Connection and subscription tracking
pub mod registry;

/// Topic-addressed event fan-out
pub mod bus;

/// WebSocket endpoint
pub mod transport;

pub use bus::EventBus;
pub use registry::{ConnectionId, ConnectionRegistry, EventReceiver, EventSender, RegistryError};
pub use transport::handle_ws_upgrade;
