//! Socketlink command line tools - Main Library
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, logging)
//! - **socketlink**: Request/response client over one socket (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust
//! use socketlink_cli::bin_common::{init_tracing, load_config_from_env, ConfigType};
//! use socketlink_cli::socketlink::ClientConfig;
//! ```

// Re-export workspace libraries for convenience
pub use socketlink;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;

    pub use cli::{init_tracing, load_config_from_env, parse_args, parse_request, ConfigType};
}
