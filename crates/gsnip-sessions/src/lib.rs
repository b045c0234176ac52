//! # gsnip-sessions
//!
//! Two small web apps from the getting-started guides.
//!
//! | Module   | Route | Backend                                  |
//! |----------|-------|------------------------------------------|
//! | `app`    | `/`   | Firestore collection `hello-views`       |
//! | `visits` | `/`   | Redis `INCR visits` over a shared pool   |

pub mod app;
pub mod error;
pub mod store;
pub mod visits;

pub use error::{SessionError, SessionResult};
pub use store::{FirestoreSessionStore, MemorySessionStore, Session, SessionStore};
pub use visits::{LazyRedisCounter, MemoryCounter, RedisPool, RedisSettings, VisitCounter};
