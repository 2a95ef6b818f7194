//! Auto-breadcrumb nodes: one per command list the runtime was tracking.
//!
//! A node's op history is only read when one of its op iterators is driven,
//! so looking at the names and counts of every node in a large record is cheap.

use std::fmt;

use crate::context::{BreadcrumbContext, ContextCorrelator};
use crate::error::{DecodeError, Diagnostic, ListKind, ProviderError};
use crate::format::{self, AutoBreadcrumbOp};
use crate::list::decode_node_list;
use crate::name::DebugName;
use crate::provider::{optional_pointer, optional_string, read_u32, to_u32, DredProvider};
use crate::record::DecodeContext;
use crate::ring::{CompletedSlots, OutstandingSlots, RingSlot, RingWindow};

/// One op of a breadcrumb history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    /// Position of the op in the logical history of its command list.
    pub index: u32,
    /// The raw `D3D12_AUTO_BREADCRUMB_OP` value.
    pub op: u32,
    pub context: Option<String>,
}

impl Breadcrumb {
    pub fn op_kind(&self) -> Option<AutoBreadcrumbOp> {
        AutoBreadcrumbOp::from_raw(self.op)
    }
}

/// A decoded `D3D12_AUTO_BREADCRUMB_NODE` or `D3D12_AUTO_BREADCRUMB_NODE1`.
pub struct BreadcrumbNode<'a, P: DredProvider + ?Sized> {
    provider: &'a P,
    module: String,
    command_list_name: DebugName,
    command_queue_name: DebugName,
    window: RingWindow,
    history: P::Value,
    contexts: Vec<BreadcrumbContext>,
}

impl<'a, P: DredProvider + ?Sized> BreadcrumbNode<'a, P> {
    pub fn command_list_name(&self) -> &DebugName {
        &self.command_list_name
    }

    pub fn command_queue_name(&self) -> &DebugName {
        &self.command_queue_name
    }

    /// The number of ops recorded in the command list.
    pub fn total_ops(&self) -> u32 {
        self.window.total()
    }

    /// The number of ops the GPU finished, clamped to [`total_ops`](Self::total_ops).
    pub fn completed_op_count(&self) -> u32 {
        self.window.completed()
    }

    pub fn window(&self) -> &RingWindow {
        &self.window
    }

    /// Context strings, ordered by op index. Always empty before DRED 1.3.
    pub fn contexts(&self) -> &[BreadcrumbContext] {
        &self.contexts
    }

    /// Completed ops still in the history ring, most recent first.
    pub fn completed_ops(&self) -> CompletedOps<'_, P> {
        Ops {
            provider: self.provider,
            module: &self.module,
            history: &self.history,
            slots: ContextCorrelator::descending(self.window.completed_slots(), &self.contexts),
        }
    }

    /// Ops that were submitted but never finished, oldest first.
    ///
    /// The op the GPU was working on when the device was removed is usually
    /// the first of these.
    pub fn outstanding_ops(&self) -> OutstandingOps<'_, P> {
        Ops {
            provider: self.provider,
            module: &self.module,
            history: &self.history,
            slots: ContextCorrelator::ascending(self.window.outstanding_slots(), &self.contexts),
        }
    }
}

impl<'a, P: DredProvider + ?Sized> fmt::Debug for BreadcrumbNode<'a, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreadcrumbNode")
            .field("command_list_name", &self.command_list_name)
            .field("command_queue_name", &self.command_queue_name)
            .field("window", &self.window)
            .field("contexts", &self.contexts)
            .finish_non_exhaustive()
    }
}

/// A lazy walk over part of a node's op history.
///
/// Each op is read from the provider as it is yielded; an op that can't be
/// read is yielded as an error and the walk carries on with the next one.
pub struct Ops<'n, P: DredProvider + ?Sized, I> {
    provider: &'n P,
    module: &'n str,
    history: &'n P::Value,
    slots: ContextCorrelator<'n, I>,
}

pub type CompletedOps<'n, P> = Ops<'n, P, CompletedSlots>;
pub type OutstandingOps<'n, P> = Ops<'n, P, OutstandingSlots>;

impl<'n, P: DredProvider + ?Sized, I> Ops<'n, P, I> {
    fn read_op(&self, slot: RingSlot) -> Result<u32, ProviderError> {
        let entry = self
            .provider
            .index_array(self.history, u64::from(slot.physical))?;
        let op = self
            .provider
            .marshal_as(&entry, self.module, format::AUTO_BREADCRUMB_OP)?;
        // D3D12_AUTO_BREADCRUMB_OP is a 32-bit enum.
        Ok(self.provider.to_u64(&op)? as u32)
    }
}

impl<'n, P: DredProvider + ?Sized, I: Clone> Clone for Ops<'n, P, I> {
    fn clone(&self) -> Self {
        Ops {
            provider: self.provider,
            module: self.module,
            history: self.history,
            slots: self.slots.clone(),
        }
    }
}

impl<'n, P, I> Iterator for Ops<'n, P, I>
where
    P: DredProvider + ?Sized,
    I: Iterator<Item = RingSlot>,
{
    type Item = Result<Breadcrumb, ProviderError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (slot, context) = self.slots.next()?;
        Some(self.read_op(slot).map(|op| Breadcrumb {
            index: slot.logical,
            op,
            context: context.map(str::to_owned),
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}

impl<'n, P, I> ExactSizeIterator for Ops<'n, P, I>
where
    P: DredProvider + ?Sized,
    I: ExactSizeIterator<Item = RingSlot>,
{
}

/// Decode the breadcrumb node list starting at the pointer `head`.
pub(crate) fn read_breadcrumb_nodes<'a, P: DredProvider + ?Sized>(
    ctx: &mut DecodeContext<'a, P>,
    head: Option<P::Value>,
    has_contexts: bool,
) -> Vec<BreadcrumbNode<'a, P>> {
    decode_node_list(ctx, ListKind::BreadcrumbNodes, head, |ctx, position, pointer| {
        read_breadcrumb_node(ctx, position, pointer, has_contexts)
    })
}

fn read_breadcrumb_node<'a, P: DredProvider + ?Sized>(
    ctx: &mut DecodeContext<'a, P>,
    position: usize,
    pointer: &P::Value,
    has_contexts: bool,
) -> Result<BreadcrumbNode<'a, P>, DecodeError> {
    let provider = ctx.provider;
    let capacity = ctx.ring_capacity;
    let node = provider.dereference(pointer)?;

    let command_list_name = DebugName::select(
        optional_string(provider, &node, "pCommandListDebugNameA"),
        optional_string(provider, &node, "pCommandListDebugNameW"),
    );
    let command_queue_name = DebugName::select(
        optional_string(provider, &node, "pCommandQueueDebugNameA"),
        optional_string(provider, &node, "pCommandQueueDebugNameW"),
    );

    let total = read_u32(provider, &node, "BreadcrumbCount")?;
    let last_value = provider.field(&node, "pLastBreadcrumbValue")?;
    let completed = to_u32(
        provider,
        &provider.dereference(&last_value)?,
        "pLastBreadcrumbValue",
    )?;
    let history = provider.field(&node, "pCommandHistory")?;

    let mut contexts = NodeContexts::default();
    if has_contexts {
        if let Err(error) = read_contexts(provider, &node, capacity, &mut contexts) {
            contexts.error = Some(error);
        }
    }
    let NodeContexts {
        contexts,
        reported: reported_contexts,
        error: context_error,
    } = contexts;

    let window = RingWindow::new(total, completed, capacity);
    if let Some(completed) = window.overflow() {
        ctx.diagnostics.push(Diagnostic::CountOverflow {
            node: position,
            total,
            completed,
        });
    }
    if let Some(drop) = window.completed_drop() {
        ctx.diagnostics.push(Diagnostic::CompletedOpsDropped {
            node: position,
            capacity,
            dropped: drop.dropped,
            completed_dropped: drop.completed_dropped,
        });
    }
    if let Some(shortfall) = window.outstanding_shortfall() {
        ctx.diagnostics.push(Diagnostic::OutstandingOpsUnavailable {
            node: position,
            outstanding: shortfall.outstanding,
            retained: shortfall.retained,
            unavailable: shortfall.unavailable,
        });
    }
    if reported_contexts > capacity {
        ctx.diagnostics.push(Diagnostic::ContextsClamped {
            node: position,
            reported: reported_contexts,
            capacity,
        });
    }
    if let Some(error) = context_error {
        ctx.diagnostics.push(Diagnostic::ContextsUnreadable {
            node: position,
            error,
        });
    }
    if contexts.windows(2).any(|w| w[0].index >= w[1].index) {
        ctx.diagnostics.push(Diagnostic::UnorderedContexts { node: position });
    }

    Ok(BreadcrumbNode {
        provider,
        module: ctx.module.clone(),
        command_list_name,
        command_queue_name,
        window,
        history,
        contexts,
    })
}

/// The contexts of a `D3D12_AUTO_BREADCRUMB_NODE1`.
#[derive(Default)]
struct NodeContexts {
    contexts: Vec<BreadcrumbContext>,
    /// The count the node claims, before clamping.
    reported: u32,
    error: Option<DecodeError>,
}

/// Read up to `capacity` contexts into `read`. On failure, the contexts read
/// so far stay in `read.contexts`.
fn read_contexts<P: DredProvider + ?Sized>(
    provider: &P,
    node: &P::Value,
    capacity: u32,
    read: &mut NodeContexts,
) -> Result<(), DecodeError> {
    read.reported = read_u32(provider, node, "BreadcrumbContextsCount")?;
    let array = match optional_pointer(provider, node, "pBreadcrumbContexts")? {
        Some(array) => array,
        None => return Ok(()),
    };
    for i in 0..read.reported.min(capacity) {
        let entry = provider.index_array(&array, u64::from(i))?;
        let index = read_u32(provider, &entry, "BreadcrumbIndex")?;
        // A context without a string carries no information.
        if let Some(text) = optional_string(provider, &entry, "pContextString") {
            read.contexts.push(BreadcrumbContext { index, text });
        }
    }
    Ok(())
}
