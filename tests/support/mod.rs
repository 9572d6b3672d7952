#![allow(dead_code)]

pub mod layer_server;
pub mod socket_guard;
