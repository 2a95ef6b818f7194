//! Synthetic DRED records for testing
//!
//! This intentionally doesn't use the layouts registered by the `dred` crate,
//! so that a mistake there shows up as a test failure instead of being
//! reproduced here. All layouts are 64-bit little-endian.
//!
//! Basic usage is to create a [SynthMemory][] at some base address, [add][SynthMemory::add]
//! strings, nodes and histories to it, and `finish()` to get the bytes of the
//! region. Everything added can be pointed at through its [`MemorySection::address`]
//! label, including things that have not been added yet.

// Some test_assembler types do not have Debug, so be a bit more lenient here.
#![allow(missing_debug_implementations)]

use test_assembler::*;

/// Where synthetic memory starts unless told otherwise.
pub const DEFAULT_BASE: u64 = 0x0000_7ff6_1234_0000;

/// Capacity of the command history ring of a real breadcrumb node.
pub const COMMAND_HISTORY_CAPACITY: u32 = 15360;

/// Size of a `D3D12_VERSIONED_DEVICE_REMOVED_EXTENDED_DATA`.
const VERSIONED_RECORD_SIZE: u64 = 48;

/// A contiguous range of process memory.
pub struct SynthMemory {
    section: Section,
    base: u64,
}

/// A block of data placed in synthetic memory.
pub trait MemorySection {
    /// A label holding the address of this block once it has been added.
    fn address(&self) -> Label;
}

impl MemorySection for Section {
    fn address(&self) -> Label {
        self.start()
    }
}

macro_rules! impl_memorysection {
    ( $x:ty ) => {
        impl MemorySection for $x {
            fn address(&self) -> Label {
                self.section.address()
            }
        }

        impl From<$x> for Section {
            fn from(item: $x) -> Self {
                item.section
            }
        }
    };
}

/// Append a pointer to `target`, or a null pointer.
fn pointer(section: Section, target: Option<&Label>) -> Section {
    match target {
        Some(target) => section.D64(target),
        None => section.D64(0),
    }
}

fn zeroes(section: Section, count: u64) -> Section {
    section.append_bytes(&vec![0; count as usize])
}

impl SynthMemory {
    pub fn new() -> SynthMemory {
        SynthMemory::with_base(DEFAULT_BASE)
    }

    /// Create memory starting at `base`.
    pub fn with_base(base: u64) -> SynthMemory {
        let section = Section::with_endian(Endian::Little);
        section.start().set_const(base);
        SynthMemory { section, base }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    /// Append `item` at the next 8-byte aligned address, setting its address label.
    // Perhaps should have been called .add_section().
    #[allow(clippy::should_implement_trait)]
    pub fn add<T>(mut self, item: T) -> SynthMemory
    where
        T: MemorySection + Into<Section>,
    {
        let padding = (8 - self.section.size() % 8) % 8;
        let address = item.address();
        self.section = zeroes(self.section, padding)
            .mark(&address)
            .append_section(item);
        self
    }

    /// Finish generating memory, returning its base address and contents.
    pub fn finish(self) -> Option<(u64, Vec<u8>)> {
        let base = self.base;
        self.section.get_contents().map(|bytes| (base, bytes))
    }
}

impl Default for SynthMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// A NUL-terminated `char` string.
pub struct NarrowString {
    section: Section,
}

impl NarrowString {
    pub fn new(s: &str) -> NarrowString {
        let section = Section::with_endian(Endian::Little)
            .append_bytes(s.as_bytes())
            .D8(0);
        NarrowString { section }
    }
}

impl_memorysection!(NarrowString);

/// A NUL-terminated `wchar_t` string.
pub struct WideString {
    section: Section,
}

impl WideString {
    pub fn new(s: &str) -> WideString {
        let section = s
            .encode_utf16()
            .fold(Section::with_endian(Endian::Little), |section, unit| {
                section.D16(unit)
            })
            .D16(0);
        WideString { section }
    }
}

impl_memorysection!(WideString);

/// A lone `UINT`, the target of `pLastBreadcrumbValue`.
pub struct Counter {
    section: Section,
}

impl Counter {
    pub fn new(value: u32) -> Counter {
        Counter {
            section: Section::with_endian(Endian::Little).D32(value),
        }
    }
}

impl_memorysection!(Counter);

/// The `D3D12_AUTO_BREADCRUMB_OP` ring of a breadcrumb node.
pub struct CommandHistory {
    section: Section,
}

impl CommandHistory {
    /// A history holding `slots` verbatim.
    pub fn from_slots(slots: &[u32]) -> CommandHistory {
        let section = slots
            .iter()
            .fold(Section::with_endian(Endian::Little), |section, &op| {
                section.D32(op)
            });
        CommandHistory { section }
    }

    /// The ring a runtime would leave behind after recording `total` ops
    /// into `capacity` slots, where op `i` is `op(i)`.
    ///
    /// Slots never written hold `0xffffffff`.
    pub fn ring<F>(total: u32, capacity: u32, op: F) -> CommandHistory
    where
        F: Fn(u32) -> u32,
    {
        let mut slots = vec![u32::MAX; capacity as usize];
        for logical in total.saturating_sub(capacity)..total {
            slots[(logical % capacity) as usize] = op(logical);
        }
        CommandHistory::from_slots(&slots)
    }
}

impl_memorysection!(CommandHistory);

/// An array of `D3D12_DRED_BREADCRUMB_CONTEXT`.
pub struct BreadcrumbContexts {
    section: Section,
}

impl BreadcrumbContexts {
    /// Each entry is an op index and the `wchar_t` string attached to it.
    pub fn new(entries: &[(u32, Option<Label>)]) -> BreadcrumbContexts {
        let section = entries.iter().fold(
            Section::with_endian(Endian::Little),
            |section, (index, string)| pointer(section.D32(*index).D32(0), string.as_ref()),
        );
        BreadcrumbContexts { section }
    }
}

impl_memorysection!(BreadcrumbContexts);

/// The pieces of a breadcrumb node. Pointers left as `None` are null.
#[derive(Default)]
pub struct BreadcrumbNodeFields {
    pub command_list_name_a: Option<Label>,
    pub command_list_name_w: Option<Label>,
    pub command_queue_name_a: Option<Label>,
    pub command_queue_name_w: Option<Label>,
    pub breadcrumb_count: u32,
    pub last_breadcrumb_value: Option<Label>,
    pub command_history: Option<Label>,
    pub next: Option<Label>,
    /// Context count and array. Setting this makes the node a
    /// `D3D12_AUTO_BREADCRUMB_NODE1`.
    pub contexts: Option<(u32, Option<Label>)>,
}

/// A `D3D12_AUTO_BREADCRUMB_NODE` or `D3D12_AUTO_BREADCRUMB_NODE1`.
pub struct BreadcrumbNode {
    section: Section,
}

impl BreadcrumbNode {
    pub fn new(fields: BreadcrumbNodeFields) -> BreadcrumbNode {
        let mut section = Section::with_endian(Endian::Little);
        section = pointer(section, fields.command_list_name_a.as_ref());
        section = pointer(section, fields.command_list_name_w.as_ref());
        section = pointer(section, fields.command_queue_name_a.as_ref());
        section = pointer(section, fields.command_queue_name_w.as_ref());
        // pCommandList, pCommandQueue
        section = section.D64(0).D64(0);
        section = section.D32(fields.breadcrumb_count).D32(0);
        section = pointer(section, fields.last_breadcrumb_value.as_ref());
        section = pointer(section, fields.command_history.as_ref());
        section = pointer(section, fields.next.as_ref());
        if let Some((count, contexts)) = fields.contexts {
            section = pointer(section.D32(count).D32(0), contexts.as_ref());
        }
        BreadcrumbNode { section }
    }
}

impl_memorysection!(BreadcrumbNode);

/// A `D3D12_DRED_ALLOCATION_NODE`.
pub struct AllocationNode {
    section: Section,
}

impl AllocationNode {
    pub fn new(
        name_a: Option<&Label>,
        name_w: Option<&Label>,
        allocation_type: u32,
        next: Option<&Label>,
    ) -> AllocationNode {
        let section = pointer(Section::with_endian(Endian::Little), name_a);
        let section = pointer(section, name_w).D32(allocation_type).D32(0);
        AllocationNode {
            section: pointer(section, next),
        }
    }
}

impl_memorysection!(AllocationNode);

/// The contents of a `D3D12_DRED_PAGE_FAULT_OUTPUT`.
#[derive(Default)]
pub struct PageFault {
    pub virtual_address: u64,
    pub existing_allocations: Option<Label>,
    pub recent_freed_allocations: Option<Label>,
}

/// A `D3D12_VERSIONED_DEVICE_REMOVED_EXTENDED_DATA`.
pub struct DeviceRemovedData {
    section: Section,
}

impl DeviceRemovedData {
    /// A DRED 1.0 record, or any `version` laid out like one.
    pub fn breadcrumbs_only(version: u32, head: Option<&Label>) -> DeviceRemovedData {
        let section = Section::with_endian(Endian::Little)
            .D32(version)
            .D32(0)
            // Flags
            .D32(0)
            .D32(0);
        let section = pointer(section, head);
        let padding = VERSIONED_RECORD_SIZE - section.size();
        DeviceRemovedData {
            section: zeroes(section, padding),
        }
    }

    /// A DRED 1.1 or later record.
    pub fn with_page_fault(
        version: u32,
        reason: u32,
        head: Option<&Label>,
        page_fault: &PageFault,
    ) -> DeviceRemovedData {
        let section = Section::with_endian(Endian::Little)
            .D32(version)
            .D32(0)
            .D32(reason)
            .D32(0);
        let section = pointer(section, head).D64(page_fault.virtual_address);
        let section = pointer(section, page_fault.existing_allocations.as_ref());
        let section = pointer(section, page_fault.recent_freed_allocations.as_ref());
        assert_eq!(section.size(), VERSIONED_RECORD_SIZE);
        DeviceRemovedData { section }
    }
}

impl_memorysection!(DeviceRemovedData);
