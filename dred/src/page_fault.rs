//! The page fault output of DRED 1.1 and later.

use crate::error::{DecodeError, ListKind};
use crate::format::{self, AllocationType};
use crate::list::decode_node_list;
use crate::name::DebugName;
use crate::provider::{optional_pointer, optional_string, to_u32, DredProvider};
use crate::record::DecodeContext;

/// An object the runtime was tracking when the fault happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationNode {
    pub name: DebugName,
    /// The raw `D3D12_DRED_ALLOCATION_TYPE` value.
    pub allocation_type: u32,
}

impl AllocationNode {
    pub fn kind(&self) -> Option<AllocationType> {
        AllocationType::from_raw(self.allocation_type)
    }
}

/// A decoded `D3D12_DRED_PAGE_FAULT_OUTPUT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFaultReport {
    /// The GPU virtual address that faulted, or 0 if there was no page fault.
    pub virtual_address: u64,
    /// Objects alive at the time of the fault whose memory spans the faulting address.
    pub existing_allocations: Vec<AllocationNode>,
    /// Recently freed objects whose memory spanned the faulting address.
    pub recent_freed_allocations: Vec<AllocationNode>,
}

pub(crate) fn read_page_fault<P: DredProvider + ?Sized>(
    ctx: &mut DecodeContext<'_, P>,
    output: &P::Value,
) -> Result<PageFaultReport, DecodeError> {
    let provider = ctx.provider;
    let va = provider.field(output, "PageFaultVA")?;
    let virtual_address = provider.to_u64(&va)?;
    let existing = optional_pointer(provider, output, "pHeadExistingAllocationNode")?;
    let freed = optional_pointer(provider, output, "pHeadRecentFreedAllocationNode")?;

    let existing_allocations = decode_node_list(
        ctx,
        ListKind::ExistingAllocations,
        existing,
        read_allocation_node::<P>,
    );
    let recent_freed_allocations = decode_node_list(
        ctx,
        ListKind::RecentFreedAllocations,
        freed,
        read_allocation_node::<P>,
    );
    Ok(PageFaultReport {
        virtual_address,
        existing_allocations,
        recent_freed_allocations,
    })
}

fn read_allocation_node<P: DredProvider + ?Sized>(
    ctx: &mut DecodeContext<'_, P>,
    _position: usize,
    pointer: &P::Value,
) -> Result<AllocationNode, DecodeError> {
    let provider = ctx.provider;
    let node = provider.dereference(pointer)?;
    let name = DebugName::select(
        optional_string(provider, &node, "ObjectNameA"),
        optional_string(provider, &node, "ObjectNameW"),
    );
    let raw = provider.field(&node, "AllocationType")?;
    let allocation_type = provider.marshal_as(&raw, &ctx.module, format::DRED_ALLOCATION_TYPE)?;
    Ok(AllocationNode {
        name,
        allocation_type: to_u32(provider, &allocation_type, "AllocationType")?,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_allocation_kind() {
        let node = AllocationNode {
            name: DebugName::Narrow("vertex buffer".to_owned()),
            allocation_type: 34,
        };
        assert_eq!(node.kind(), Some(AllocationType::Resource));
        let node = AllocationNode {
            name: DebugName::Unnamed,
            allocation_type: 26,
        };
        assert_eq!(node.kind(), None);
    }
}
