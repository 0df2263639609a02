pub mod diagnostics_controller;
pub mod health_controller;
pub mod stream_controller;
