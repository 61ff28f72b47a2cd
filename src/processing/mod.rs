pub mod aec;
pub mod frame_queue;
pub mod gain;
pub mod mixer;
pub mod resampler;
pub mod synchronizer;
