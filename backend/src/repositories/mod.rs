pub mod sos_session;

pub use sos_session::{InMemorySessionRepository, SessionRepository, SessionTables};
