#![allow(dead_code)]

pub mod remote;
