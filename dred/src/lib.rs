//! A library for decoding the Device Removed Extended Data (DRED) a d3d12
//! runtime leaves behind when a GPU device is removed.
//!
//! DRED lives in the memory of the crashed process. This crate doesn't read
//! that memory itself: it asks a [`DredProvider`] for typed values, the way a
//! debugger's data model would. Implement the trait on top of whatever you have
//! (a debugger engine, a minidump reader) or use [`MemoryProvider`] if you
//! already hold the relevant bytes and want to describe the types by hand.
//!
//! The usual entry point is [`decode_global_device_removed_data`], which
//! finds the runtime's `D3D12DeviceRemovedExtendedData` global and decodes it.
//!
//! ```
//! use dred::{decode_global_device_removed_data, DecodeError, DecodeOptions, MemoryProvider};
//!
//! // A process without the d3d12 runtime loaded has no DRED to find.
//! let provider = MemoryProvider::new();
//! let err = decode_global_device_removed_data(&provider, &DecodeOptions::default()).unwrap_err();
//! assert_eq!(err.name(), "SymbolMetadataUnavailable");
//! if let DecodeError::SymbolMetadataUnavailable { attempts, .. } = err {
//!     assert_eq!(attempts.len(), 2);
//! }
//! ```
//!
//! A decoded record gives access to each breadcrumb node's history, split into
//! the ops the GPU completed and those it never got to:
//!
//! ```no_run
//! # fn dump(provider: &dred::MemoryProvider, address: u64) -> Result<(), dred::DecodeError> {
//! let dred = dred::decode_device_removed_data(provider, address, &Default::default())?;
//! for node in dred.record.breadcrumb_nodes() {
//!     println!("{} on {}", node.command_list_name(), node.command_queue_name());
//!     for op in node.outstanding_ops() {
//!         let op = op?;
//!         println!("  {} {:?} {:?}", op.index, op.op_kind(), op.context);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate enum_primitive_derive;

mod breadcrumbs;
mod context;
mod error;
pub mod format;
mod list;
mod memory;
mod name;
mod options;
mod page_fault;
mod provider;
mod record;
mod ring;
mod symbols;

pub use breadcrumbs::*;
pub use context::*;
pub use error::*;
pub use list::*;
pub use memory::*;
pub use name::*;
pub use options::*;
pub use page_fault::*;
pub use provider::*;
pub use record::*;
pub use ring::*;
pub use symbols::*;
