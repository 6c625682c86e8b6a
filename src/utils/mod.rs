#[allow(dead_code)]
pub mod backoff;

#[allow(dead_code)]
pub mod codec;

#[allow(dead_code)]
pub mod hostname;
