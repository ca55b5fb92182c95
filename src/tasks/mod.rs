pub mod flight_task;
pub mod led_task;
pub mod telemetry_task;
