//! Public SDK surface for Kwik.
//!
//! This crate re-exports the building blocks of the knowledge assistant and
//! hosts the `kwik` command line.

pub mod cli;

/// Re-export for convenience.
pub use kwik_rs_config as config;
pub use kwik_rs_core as core;
/// Re-export for convenience.
pub use kwik_rs_knowledge as knowledge;
pub use kwik_rs_memory as memory;
/// Re-export for convenience.
pub use kwik_rs_protocol as protocol;
pub use kwik_rs_server as server;
pub use kwik_rs_tools as tools;

/// Initialize `env_logger` with millisecond timestamps, honoring `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();
}
