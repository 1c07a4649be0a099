//! Core RTCM 3.x decoder: byte-stream framing, CRC validation, bit-level
//! message decoding and observation-epoch assembly. No RINEX types, no file
//! I/O — that's `rtcm2rnx`'s job.

pub mod bitreader;
pub mod constants;
pub mod crc24q;
pub mod epoch;
pub mod ephemeris;
pub mod error;
pub mod frame;
pub mod lock;
pub mod msm;
pub mod observation;
pub mod parser;
pub mod time;

pub use epoch::{Band, DataFlags2, Entry, Gnssdata, Quantity, SatelliteData};
pub use error::{BitReaderError, DecodeError};
pub use ephemeris::{GalileoEphemeris, GlonassEphemeris, GpsEphemeris};
pub use parser::{FrameResult, ParserState};
