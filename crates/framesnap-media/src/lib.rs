pub mod encoder;
pub mod error;
pub mod extract_profile;
pub mod extractor;
pub mod ffmpeg_source;
pub mod pipeline;
pub mod surface;
pub mod thumbnail;
