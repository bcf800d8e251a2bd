pub mod ffmpeg;
pub mod frame;
pub mod sampler;

pub use ffmpeg::{FfmpegOpener, FfmpegSource};
pub use frame::{Frame, FrameImage};
pub use sampler::{sample_count, FrameSampler, MediaOpener, MediaSource};
