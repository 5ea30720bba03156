// Protocol Adapters Module
// One module per protocol; each type implements `ProtocolAdapter`

pub mod flux;

pub use flux::{FluxConfig, FluxPoolAdapter};

// Re-export the trait
pub use crate::protocol_adapter::ProtocolAdapter;
