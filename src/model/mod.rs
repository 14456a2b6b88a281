//! The model module contains the structs, enums and types used by the
//! library to represent data sent to and received from the Discord API.

pub mod gateway;
