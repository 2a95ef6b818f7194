use std::fmt;

use tracing::warn;

/// Errors reported by a [`DredProvider`](crate::DredProvider).
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Module {module} is not loaded or has no symbols")]
    ModuleNotFound { module: String },
    #[error("Type {type_name} not found in the symbols of {module}")]
    TypeNotFound { module: String, type_name: String },
    #[error("Type {type_name} has no field {field}")]
    FieldNotFound { type_name: String, field: String },
    #[error("Symbol {symbol} not found in {module}")]
    SymbolNotFound { module: String, symbol: String },
    #[error("Failed to read {size} bytes of memory at {address:#x}")]
    MemoryReadFailure { address: u64, size: u64 },
    #[error("Value is not a pointer")]
    NotAPointer,
    #[error("Value is not a struct")]
    NotAnObject,
    #[error("Value is not a scalar")]
    NotAScalar,
    #[error("Cannot reinterpret a value of {from} bytes as {type_name} ({to} bytes)")]
    SizeMismatch { type_name: String, from: u64, to: u64 },
}

impl ProviderError {
    /// Returns just the name of the error, as a more human-friendly version of
    /// an error-code for error logging.
    pub fn name(&self) -> &'static str {
        match self {
            ProviderError::ModuleNotFound { .. } => "ModuleNotFound",
            ProviderError::TypeNotFound { .. } => "TypeNotFound",
            ProviderError::FieldNotFound { .. } => "FieldNotFound",
            ProviderError::SymbolNotFound { .. } => "SymbolNotFound",
            ProviderError::MemoryReadFailure { .. } => "MemoryReadFailure",
            ProviderError::NotAPointer => "NotAPointer",
            ProviderError::NotAnObject => "NotAnObject",
            ProviderError::NotAScalar => "NotAScalar",
            ProviderError::SizeMismatch { .. } => "SizeMismatch",
        }
    }
}

/// One failed attempt of the [`SymbolSourceResolver`](crate::SymbolSourceResolver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolAttempt {
    pub module: String,
    pub error: ProviderError,
}

/// Why a linked list walk was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListCorruption {
    /// A node links back to one already visited.
    Cycle { address: u64 },
    /// The list is longer than the configured node cap.
    TooLong { limit: usize },
}

impl fmt::Display for ListCorruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListCorruption::Cycle { address } => write!(f, "node {:#x} visited twice", address),
            ListCorruption::TooLong { limit } => write!(f, "more than {} nodes", limit),
        }
    }
}

/// Errors encountered while decoding a DRED record.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unsupported DRED version {0}")]
    UnsupportedVersion(u64),
    #[error("{type_name} not found in any loaded symbol files")]
    SymbolMetadataUnavailable {
        type_name: String,
        attempts: Vec<SymbolAttempt>,
    },
    #[error("Corrupt linked list after {nodes_read} nodes: {reason}")]
    CorruptLinkedList {
        nodes_read: usize,
        reason: ListCorruption,
    },
    #[error("Value {value:#x} of {field} does not fit in 32 bits")]
    ValueOutOfRange { field: String, value: u64 },
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl DecodeError {
    /// Returns just the name of the error, as a more human-friendly version of
    /// an error-code for error logging.
    pub fn name(&self) -> &'static str {
        match self {
            DecodeError::UnsupportedVersion(_) => "UnsupportedVersion",
            DecodeError::SymbolMetadataUnavailable { .. } => "SymbolMetadataUnavailable",
            DecodeError::CorruptLinkedList { .. } => "CorruptLinkedList",
            DecodeError::ValueOutOfRange { .. } => "ValueOutOfRange",
            DecodeError::Provider(e) => e.name(),
        }
    }
}

/// Which linked list of the record a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    BreadcrumbNodes,
    ExistingAllocations,
    RecentFreedAllocations,
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ListKind::BreadcrumbNodes => "breadcrumb nodes",
            ListKind::ExistingAllocations => "existing allocations",
            ListKind::RecentFreedAllocations => "recently freed allocations",
        })
    }
}

/// A non-fatal problem found while decoding.
///
/// Diagnostics ride alongside the best-effort decoded record; none of them
/// stop the decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// `completed` was larger than `total` and was clamped.
    CountOverflow {
        node: usize,
        total: u32,
        completed: u32,
    },
    /// More completed ops were recorded than the history ring retains.
    CompletedOpsDropped {
        node: usize,
        capacity: u32,
        dropped: u32,
        completed_dropped: u32,
    },
    /// Only the last `retained` of `outstanding` ops are still in the ring.
    OutstandingOpsUnavailable {
        node: usize,
        outstanding: u32,
        retained: u32,
        unavailable: u32,
    },
    /// The context count exceeded the ring capacity and was clamped.
    ContextsClamped {
        node: usize,
        reported: u32,
        capacity: u32,
    },
    /// Reading the contexts failed; the ones read before the failure are kept.
    ContextsUnreadable { node: usize, error: DecodeError },
    /// Context indices are not strictly ascending, so some may not correlate.
    UnorderedContexts { node: usize },
    /// A node could not be read and was left out.
    NodeUnreadable { list: ListKind, position: usize, error: DecodeError },
    /// A list walk stopped early; the nodes read before the problem are kept.
    ListTruncated { list: ListKind, error: DecodeError },
    /// The auto-breadcrumbs output could not be read, so there are no nodes.
    BreadcrumbsUnreadable { error: DecodeError },
    /// The page fault output could not be read.
    PageFaultUnreadable { error: DecodeError },
    /// The removal reason could not be decoded.
    ReasonUnavailable { error: DecodeError },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::CountOverflow {
                node,
                total,
                completed,
            } => write!(
                f,
                "node {}: completed op count {} exceeds total {}, clamping",
                node, completed, total
            ),
            Diagnostic::CompletedOpsDropped {
                node,
                capacity,
                dropped,
                completed_dropped,
            } => write!(
                f,
                "node {}: number of command operations exceeds {}, the capacity of the \
                 command history; total commands dropped: {}, completed commands dropped: {}",
                node, capacity, dropped, completed_dropped
            ),
            Diagnostic::OutstandingOpsUnavailable {
                node,
                outstanding,
                retained,
                unavailable,
            } => write!(
                f,
                "node {}: only the last {} of {} outstanding operations are available ({} lost)",
                node, retained, outstanding, unavailable
            ),
            Diagnostic::ContextsClamped {
                node,
                reported,
                capacity,
            } => write!(
                f,
                "node {}: {} breadcrumb contexts reported, only {} can exist",
                node, reported, capacity
            ),
            Diagnostic::ContextsUnreadable { node, error } => {
                write!(f, "node {}: breadcrumb contexts unreadable: {}", node, error)
            }
            Diagnostic::UnorderedContexts { node } => {
                write!(f, "node {}: breadcrumb contexts are not in ascending order", node)
            }
            Diagnostic::NodeUnreadable {
                list,
                position,
                error,
            } => write!(f, "{} [{}] unreadable: {}", list, position, error),
            Diagnostic::ListTruncated { list, error } => {
                write!(f, "{} truncated: {}", list, error)
            }
            Diagnostic::BreadcrumbsUnreadable { error } => {
                write!(f, "auto-breadcrumbs output unreadable: {}", error)
            }
            Diagnostic::PageFaultUnreadable { error } => {
                write!(f, "page fault output unreadable: {}", error)
            }
            Diagnostic::ReasonUnavailable { error } => {
                write!(f, "device removed reason unavailable: {}", error)
            }
        }
    }
}

/// Collects diagnostics for one decode, logging each one as it arrives.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_names() {
        let err = DecodeError::from(ProviderError::NotAPointer);
        assert_eq!(err.name(), "NotAPointer");
        assert_eq!(DecodeError::UnsupportedVersion(5).name(), "UnsupportedVersion");
        assert_eq!(
            DecodeError::UnsupportedVersion(5).to_string(),
            "Unsupported DRED version 5"
        );
        let err = DecodeError::ValueOutOfRange {
            field: "BreadcrumbCount".to_owned(),
            value: 0x1_0000_0000,
        };
        assert_eq!(err.name(), "ValueOutOfRange");
        assert_eq!(
            err.to_string(),
            "Value 0x100000000 of BreadcrumbCount does not fit in 32 bits"
        );
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::OutstandingOpsUnavailable {
            node: 2,
            outstanding: 20000,
            retained: 15360,
            unavailable: 4640,
        };
        assert_eq!(
            diag.to_string(),
            "node 2: only the last 15360 of 20000 outstanding operations are available (4640 lost)"
        );
        let diag = Diagnostic::ListTruncated {
            list: ListKind::ExistingAllocations,
            error: DecodeError::CorruptLinkedList {
                nodes_read: 3,
                reason: ListCorruption::Cycle { address: 0x1000 },
            },
        };
        assert_eq!(
            diag.to_string(),
            "existing allocations truncated: Corrupt linked list after 3 nodes: node 0x1000 visited twice"
        );
    }
}
