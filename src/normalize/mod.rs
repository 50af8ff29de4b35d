//! Container option normalization.
//!
//! Turns the convenience shapes users write (size strings, port tuples,
//! volume maps, mount descriptors, extra-hosts maps, device strings) into
//! the exact structures the engine's create endpoint expects.
//!
//! ## Components
//!
//! - [`size`]: memory-size strings to exact byte counts
//! - [`mount`]: bind/tmpfs/volume descriptors to bind strings or tmpfs options
//! - [`ports`]: port specifications to ordered host bindings
//! - [`volume`]: shorthand volume maps to bind strings and expected mounts
//! - [`hosts`]: extra-hosts maps to `host:ip` entries and `/etc/hosts` lines
//! - [`device`]: `host:container[:perms]` strings to device mappings
//! - [`request`]: composition of all of the above into one create payload
//!
//! Everything here is pure: no I/O, no shared state, and every failure is
//! reported synchronously as a [`NormalizeError`].
//!
//! ## Usage
//!
//! ```rust
//! use podnorm::normalize::{CreateOptions, CreateRequestBuilder, SizeSpec};
//!
//! let options = CreateOptions {
//!     mem_limit: Some(SizeSpec::from("44m")),
//!     ..Default::default()
//! };
//!
//! let request = CreateRequestBuilder::new("quay.io/libpod/alpine:latest")
//!     .options(options)
//!     .build()
//!     .unwrap();
//!
//! let host_config = request.body.host_config.unwrap();
//! assert_eq!(host_config.memory, Some(44 * 1024 * 1024));
//! ```

pub mod device;
pub mod hosts;
pub mod mount;
pub mod options;
pub mod ports;
pub mod request;
pub mod size;
pub mod volume;

pub use device::parse_device;
pub use hosts::{ExtraHostsSpec, expand_extra_hosts, expected_hosts_file_lines};
pub use mount::{EncodedMount, MountSpec, Propagation, encode_mount};
pub use options::{ConflictPolicy, CreateOptions, ModePrecedence, NormalizerConfig};
pub use ports::{HostPortEntry, PortMap, PortSpec, expand_port_map, expand_ports};
pub use request::{CreateRequest, CreateRequestBuilder, build_create_request};
pub use size::{SizeSpec, parse_size};
pub use volume::{ExpectedMount, VolumeMap, VolumeSpec, resolve_rw};

/// Normalization errors.
///
/// Every variant carries the offending input so callers can report it
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// Malformed or negative size value
    #[error("Invalid size: {0}")]
    InvalidSize(String),

    /// Conflicting or unrecognized configuration combination
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Conflicting read-only/read-write signals
    #[error("Ambiguous mode: {0}")]
    AmbiguousMode(String),

    /// Device, mount or port string missing a required part
    #[error("Malformed spec: {0}")]
    MalformedSpec(String),
}

/// Result type for normalization.
pub type Result<T> = std::result::Result<T, NormalizeError>;
