pub mod events;

pub use events::{Destination, InboundEvent, MediaAttachment, MediaKind, OutboundMessage};
