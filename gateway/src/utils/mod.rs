pub mod retry;
pub use retry::{CallPolicy, PolicyError};
