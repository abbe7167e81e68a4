mod events;
mod message;
mod session;

pub use events::{Delivery, StreamEvent, StreamEventPayload, SubmitRejection, TurnSink};
pub use message::{GenerationState, Message, MessageStatus, Role, Turn};
pub use session::ChatSession;
