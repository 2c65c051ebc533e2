//! Session state for the KetoHelper client.
//!
//! This crate owns the one piece of mutable shared state in the auth
//! stack:
//!
//! 1. **Session**: who is signed in, with which tokens, and the guest
//!    identity used when nobody is ([`Session`])
//! 2. **Store**: the shared handle every other component reads and
//!    writes through ([`SessionStore`])
//! 3. **Persistence**: a versioned record in durable storage, migrated
//!    forward on load ([`Storage`], [`MemoryStorage`], [`FileStorage`])
//! 4. **Navigation**: the seam through which clearing a session can send
//!    the app back to `/` ([`Navigator`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Guard / Interceptor (above)  ← read session validity, trigger refresh
//!     ↕
//! Session Layer (this crate)   ← holds identity + tokens, persists them
//!     ↕
//! Protocol Layer (below)       ← provides User, claim decoding, JsonCodec
//! ```

mod error;
mod navigator;
mod persist;
mod session;
mod storage;
mod store;

pub use error::SessionError;
pub use navigator::{HeadlessNavigator, Navigator, ROOT_PATH};
pub use persist::CURRENT_VERSION;
pub use session::{Session, StoreConfig};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::SessionStore;
