#![allow(dead_code)]

pub mod dispatcher;
pub mod locator;
pub mod synthesizer;
