use crate::format::AUTO_BREADCRUMBS_COMMAND_HISTORY_MAX;

/// Options for [`decode_device_removed_data`](crate::decode_device_removed_data).
///
/// The defaults match the current d3d12 runtime; there is rarely a reason to
/// change them outside of tests.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Number of ops the command history ring of each breadcrumb node holds.
    ///
    /// Defaults to 15360.
    pub ring_capacity: u32,
    /// Upper bound on the length of any linked list in the record.
    ///
    /// Defaults to 65536.
    pub max_list_nodes: usize,
    /// The module whose symbols are expected to describe the DRED types.
    ///
    /// Defaults to `d3d12core`.
    pub primary_module: String,
    /// Where older runtimes kept the DRED types and the DRED global.
    ///
    /// Defaults to `d3d12`.
    pub legacy_module: String,
}

impl DecodeOptions {
    pub fn with_ring_capacity(mut self, capacity: u32) -> DecodeOptions {
        self.ring_capacity = capacity;
        self
    }

    pub fn with_max_list_nodes(mut self, max: usize) -> DecodeOptions {
        self.max_list_nodes = max;
        self
    }
}

impl Default for DecodeOptions {
    fn default() -> DecodeOptions {
        DecodeOptions {
            ring_capacity: AUTO_BREADCRUMBS_COMMAND_HISTORY_MAX,
            max_list_nodes: 65536,
            primary_module: "d3d12core".to_owned(),
            legacy_module: "d3d12".to_owned(),
        }
    }
}
