pub mod gateway;
pub mod normalize;
pub mod null_transport;
pub mod registry;
pub mod remote;
pub mod speech;
pub mod transport;

pub use gateway::{GatewayState, GatewayTuning, InferenceGateway};
pub use normalize::{parse, repair_json, Parsed};
pub use null_transport::NullTransport;
pub use registry::TransportRegistry;
pub use remote::RemoteTransport;
pub use speech::{NullSink, PlaybackSink, SpeechDirector};
pub use transport::{classify_remote_error, InferenceRequest, InferenceTransport};
