//! Flattening of the singly linked node lists DRED is built from.

use std::collections::HashSet;

use crate::error::{DecodeError, Diagnostic, ListCorruption, ListKind};
use crate::provider::DredProvider;
use crate::record::DecodeContext;

/// A list walk that stopped before reaching the terminating null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialList<T> {
    /// The nodes read before the walk stopped, head first.
    pub nodes: Vec<T>,
    pub error: DecodeError,
}

/// Walk a linked list from `head` until `next` returns `None`.
///
/// `address` identifies each node so that a list linking back onto itself is
/// caught on its first repeated node; `max_nodes` bounds lists that are
/// corrupt in ways that never repeat, or whose nodes have no address. Either
/// condition, or an error from `next`, ends the walk with a [`PartialList`].
pub fn flatten_linked_list<T, N, A>(
    head: Option<T>,
    max_nodes: usize,
    mut next: N,
    address: A,
) -> Result<Vec<T>, PartialList<T>>
where
    N: FnMut(&T) -> Result<Option<T>, DecodeError>,
    A: Fn(&T) -> Option<u64>,
{
    let mut nodes = Vec::new();
    let mut seen = HashSet::new();
    let mut current = head;
    while let Some(node) = current {
        let revisited = address(&node).filter(|&a| !seen.insert(a));
        let corruption = if let Some(address) = revisited {
            Some(ListCorruption::Cycle { address })
        } else if nodes.len() == max_nodes {
            Some(ListCorruption::TooLong { limit: max_nodes })
        } else {
            None
        };
        if let Some(reason) = corruption {
            let nodes_read = nodes.len();
            return Err(PartialList {
                nodes,
                error: DecodeError::CorruptLinkedList { nodes_read, reason },
            });
        }
        current = match next(&node) {
            Ok(next) => next,
            Err(error) => {
                nodes.push(node);
                return Err(PartialList { nodes, error });
            }
        };
        nodes.push(node);
    }
    Ok(nodes)
}

/// Walk a list of provider pointers linked through the pointer field `next_field`.
///
/// `head` and every yielded value are non-null pointers to nodes.
pub(crate) fn flatten_pointer_list<P: DredProvider + ?Sized>(
    provider: &P,
    head: Option<P::Value>,
    next_field: &str,
    max_nodes: usize,
) -> Result<Vec<P::Value>, PartialList<P::Value>> {
    flatten_linked_list(
        head,
        max_nodes,
        |pointer| {
            let node = provider.dereference(pointer)?;
            let next = provider.field(&node, next_field)?;
            Ok(if provider.is_null(&next) {
                None
            } else {
                Some(next)
            })
        },
        |pointer| provider.to_u64(pointer).ok(),
    )
}

/// Flatten the list at `head` and decode each of its nodes with `read`.
///
/// Nodes that fail to decode are left out and a list that can't be walked to
/// its end is cut short. Both are reported as diagnostics.
pub(crate) fn decode_node_list<'a, P, T, F>(
    ctx: &mut DecodeContext<'a, P>,
    list: ListKind,
    head: Option<P::Value>,
    mut read: F,
) -> Vec<T>
where
    P: DredProvider + ?Sized,
    F: FnMut(&mut DecodeContext<'a, P>, usize, &P::Value) -> Result<T, DecodeError>,
{
    let pointers = match flatten_pointer_list(ctx.provider, head, "pNext", ctx.max_list_nodes) {
        Ok(pointers) => pointers,
        Err(PartialList { nodes, error }) => {
            ctx.diagnostics.push(Diagnostic::ListTruncated { list, error });
            nodes
        }
    };
    let mut decoded = Vec::with_capacity(pointers.len());
    for (position, pointer) in pointers.iter().enumerate() {
        match read(ctx, position, pointer) {
            Ok(node) => decoded.push(node),
            Err(error) => ctx.diagnostics.push(Diagnostic::NodeUnreadable {
                list,
                position,
                error,
            }),
        }
    }
    decoded
}
