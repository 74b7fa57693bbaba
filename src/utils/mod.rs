pub mod dump;

pub use dump::{hex_preview, payload_summary};
