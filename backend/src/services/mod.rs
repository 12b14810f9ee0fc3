pub mod notification;
pub mod sms;
pub mod sos_session;
