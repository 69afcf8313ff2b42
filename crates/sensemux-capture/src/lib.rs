pub mod encoder;
pub mod frame;
pub mod mic;
pub mod ring;

pub use encoder::{encode_audio, encode_frame, Sampler};
pub use frame::{FrameSource, TestPatternSource};
pub use mic::{find_input_device, MicHandle, MicNode, MicStatus};
pub use ring::{AudioRingBuffer, DEFAULT_CAPACITY_SAMPLES};
