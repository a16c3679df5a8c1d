pub mod admin_gate;
pub mod request_log;
