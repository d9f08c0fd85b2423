// Domain layer - Channels, samples and the series shapes built from them
pub mod channel;
pub mod reading;
pub mod sample;
pub mod view;
