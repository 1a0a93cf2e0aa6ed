pub mod bluetooth;
pub mod logging;
pub mod system_bluetooth;
