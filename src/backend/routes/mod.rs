//! Route Configuration Module
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs        - Module exports and documentation
//! ├── router.rs     - Main router creation
//! └── api_routes.rs - Message API routes
//! ```

/// Main router creation
pub mod router;

/// Message API routes
pub mod api_routes;

// Re-export commonly used functions
pub use router::create_router;
