pub mod home_controller;
pub mod monitors_controller;
pub mod realtime_controller;
