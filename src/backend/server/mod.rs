//! Server Module
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs    - Module exports and documentation
//! ├── state.rs  - AppState and FromRef implementations
//! ├── config.rs - Store selection from configuration
//! └── init.rs   - State construction and app creation
//! ```
//!
//! # Initialization Flow
//!
//! 1. **Configuration**: `AppConfig::load()` in the binary
//! 2. **Store**: sqlite when `database_url` is set, otherwise in-memory
//! 3. **State**: registry, bus, gateway, history and token verifier
//! 4. **Router**: message API, websocket endpoint, health check

/// Application state management
pub mod state;

/// Store selection
pub mod config;

/// Server initialization
pub mod init;

// Re-export commonly used types
pub use init::{build_state, create_app};
pub use state::AppState;
