//! Call sessions: the per-call state machine, the events it consumes and
//! produces, and the registry of bound calls.

mod call;
mod control;
mod delivery;
mod error;
mod events;
mod registry;
mod settings;
mod state;

pub use call::CallSession;
pub use control::ControlMessage;
pub use error::{SessionError, SessionResult};
pub use events::{DeliveryOutcome, InboundEvent, OutboundFrame};
pub use registry::{SessionHandle, SessionRegistry};
pub use settings::{CallServices, DeliveryMode, SessionSettings};
pub use state::SessionState;
