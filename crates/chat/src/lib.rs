pub mod dispatcher;
pub mod intents;
pub mod replies;

pub use dispatcher::Dispatcher;
pub use intents::{Intent, IntentEnvelope, SlotSpec};
pub use replies::{ListItem, Reply};
