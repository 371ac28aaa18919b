//! Port traits: the seams between the pure domain and the outside world.

pub mod candle_port;
pub mod clock_port;
pub mod config_port;
pub mod record_port;
pub mod win_rate_port;
