//! Data models shared across the session store and API handlers.

pub mod sos_session;
