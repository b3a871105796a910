//! Convert V8 CPU profiles into Chrome trace documents.
//!
//! A `.cpuprofile` on its own is just a list of nodes and samples. DevTools'
//! Performance panel only renders it as a flame chart when it arrives wrapped
//! in the scaffolding a real browser trace has: named process/thread lanes, a
//! tracing-started marker with a main frame, profiler start/stop brackets, and
//! a `Profile` event followed by `ProfileChunk`s that share its id.
//!
//! # Modules
//!
//! - [`profile`] - capture records ([`CpuProfileInfo`]) and the V8 payload
//! - [`selection`] - picking the primary capture of a batch
//! - [`events`] - constructors for every synthesized trace event
//! - [`ids`] - synthetic frame and profile identifiers
//! - [`session`] - assembling captures into an ordered [`ctef::TraceDocument`]
//! - [`loader`] - reading `.cpuprofile` files written by `node --cpu-prof`
//!
//! # Example
//!
//! ```no_run
//! use cpuprof_trace::loader;
//! use cpuprof_trace::session::{SessionBuilder, SessionOptions};
//! use ctef::TraceWriter;
//! use std::fs::File;
//! use std::path::PathBuf;
//!
//! let profiles = loader::load_all(&[PathBuf::from("profiles/")]).unwrap();
//! let document = SessionBuilder::new(SessionOptions::default())
//!     .extend(&profiles)
//!     .build()
//!     .unwrap();
//!
//! let mut writer = TraceWriter::new(File::create("Trace.json").unwrap());
//! writer.write_document(&document).unwrap();
//! ```

pub mod error;
pub mod events;
pub mod ids;
pub mod loader;
pub mod profile;
pub mod selection;
pub mod session;

pub use error::{Result, TraceError};
pub use profile::{CpuProfile, CpuProfileInfo};
pub use selection::select_primary;

// Re-export ctef for convenience
pub use ctef;
