//! Serial-to-HTTP bridge for a sensor-equipped beer pong table.
//!
//! A microcontroller reports cup sensors over a serial line as
//! `sensor(v1, v2, ...);` commands. The bridge decodes that stream, keeps
//! the latest reading, and exposes it with per-player scores over HTTP.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte sources (serial TTY, scripted mock)
//! - [`protocol`]: the streaming command decoder and sensor state
//! - [`store`]: user/score persistence
//! - [`http`]: the HTTP surface (behind `http` feature)

/// Re-export transport types.
pub mod transport {
    pub use beerpong_transport::*;
}

/// Re-export protocol types.
pub mod protocol {
    pub use beerpong_protocol::*;
}

/// Re-export store types.
pub mod store {
    pub use beerpong_store::*;
}

/// Re-export HTTP types (requires `http` feature).
#[cfg(feature = "http")]
pub mod http {
    pub use beerpong_http::*;
}
