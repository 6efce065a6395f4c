//! Global constants for the adgraph-collector application.
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make configuration changes easier.

// Pipeline sizing constants
/// Bounded capacity of the per-domain input queue; the producer blocks when
/// workers lag, so memory stays bounded regardless of directory size.
pub const INPUT_QUEUE_CAPACITY: usize = 1000;

/// Lines written to one edge-kind file between flushes.
pub const FILE_FLUSH_INTERVAL: usize = 100;

/// Cumulative statements that trigger one remote batch submission.
pub const REST_BATCH_SIZE: usize = 500;

// Timer and timeout constants
/// Default status reporter interval in milliseconds.
pub const DEFAULT_STATUS_INTERVAL_MS: u64 = 30_000;

/// Default delay between session-loop passes in minutes.
pub const DEFAULT_LOOP_INTERVAL_MINS: u64 = 5;

/// Timeout for one host reachability probe in milliseconds.
pub const PROBE_TIMEOUT_MS: u64 = 500;

/// Upper bound for one session/logon/admin enumeration call against a host.
pub const HOST_COLLECTOR_TIMEOUT_SECS: u64 = 30;

// Host contact constants
/// SMB service port probed to decide whether a host is worth contacting.
pub const PROBE_PORT: u16 = 445;

/// Local group whose members carry administrative rights on a host.
pub const LOCAL_ADMIN_GROUP: &str = "Administrators";

/// Distinguished-name fragment marking the domain controllers container.
pub const DOMAIN_CONTROLLERS_OU_MARKER: &str = "OU=Domain Controllers";

// Directory query constants
/// Locates domain controllers: the server-trust-account control bit.
pub const DC_LOCATOR_FILTER: &str = "(userAccountControl:1.2.840.113556.1.4.803:=8192)";

// Trust record bitmask constants
/// Relationship flag: trusted domain is in the same forest.
pub const TRUST_FLAG_IN_FOREST: u32 = 0x1;

/// Relationship flag: this domain trusts the listed domain.
pub const TRUST_FLAG_DIRECT_OUTBOUND: u32 = 0x2;

/// Relationship flag: listed domain is the root of a tree in the forest.
pub const TRUST_FLAG_TREE_ROOT: u32 = 0x4;

/// Relationship flag: listed domain is the primary domain of the server.
pub const TRUST_FLAG_PRIMARY: u32 = 0x8;

/// Relationship flag: primary domain runs in native mode.
pub const TRUST_FLAG_NATIVE_MODE: u32 = 0x10;

/// Relationship flag: the listed domain trusts this domain.
pub const TRUST_FLAG_DIRECT_INBOUND: u32 = 0x20;

/// Capability mask passed to the native enumeration call; all six flags.
pub const TRUST_ENUMERATION_FLAGS: u32 = TRUST_FLAG_IN_FOREST
    | TRUST_FLAG_DIRECT_OUTBOUND
    | TRUST_FLAG_TREE_ROOT
    | TRUST_FLAG_PRIMARY
    | TRUST_FLAG_NATIVE_MODE
    | TRUST_FLAG_DIRECT_INBOUND;

/// Attribute bit marking a trust as non-transitive.
pub const TRUST_ATTRIB_NON_TRANSITIVE: u32 = 0x1;
