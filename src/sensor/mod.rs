//! Sensor records for the mini-games, carried over a data channel.
pub mod sensor_error;
pub mod sensor_link;
pub mod sensor_message;

pub use sensor_error::SensorError;
pub use sensor_link::SensorLink;
pub use sensor_message::SensorMessage;
