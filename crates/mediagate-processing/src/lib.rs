//! mediagate processing library
//!
//! The leaf components of the ingestion pipeline: filename safety, content
//! sniffing, the stream duplicator used to persist uploads while they are
//! forwarded, and derived-audio extraction.

pub mod audio;
pub mod classifier;
pub mod filename;
pub mod relocate;
pub mod tee;

pub use audio::{audio_file_name, AudioExtractor, ExtractError, FfmpegAudioExtractor};
pub use classifier::{classify, is_audio, is_video, sniff, MediaKind};
pub use filename::{ensure_unique, reserve_unique, sanitize, ReserveError, SanitizeError};
pub use relocate::{move_file, persist_generated, PersistError};
pub use tee::{TeeProgress, TeeReader};
