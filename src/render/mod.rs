//! Offline rendering
//!
//! Parameter change -> graph built against the original buffer ->
//! graph executed once -> new buffer.

pub mod builder;
pub mod graph;
pub mod offline;
pub mod processor;

pub use builder::{output_length, GraphBuilder};
pub use graph::{NodeId, RenderGraph, RenderNode};
pub use offline::OfflineRenderer;
pub use processor::{AudioProcessor, RenderTicket};
