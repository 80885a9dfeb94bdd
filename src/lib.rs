//! SenceIt - Sensor Node Firmware
//!
//! Core library for the provisioning web server and the sensor data loggers.

pub mod app;
pub mod config;
pub mod datalogger;
pub mod device;
pub mod http;
pub mod server;
pub mod util;
