//! Join trace events and stack traces into one node per async resource.
//!
//! Nodes keep the order in which their `init` events were seen. Callbacks
//! are bracketed by `before`/`after` pairs; an `after` closes the most
//! recent open callback of the same resource.

use super::schema::{AsyncNode, CallbackInterval};
use crate::decoder::{StackTraceRecord, TraceEventKind, TraceEventRecord};
use log::debug;
use std::collections::HashMap;

/// Incrementally built set of async resource nodes
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<AsyncNode>,
    index: HashMap<u64, usize>,

    /// Events referring to a resource without an `init`
    pub orphaned_events: u64,

    /// Stack traces with no matching resource
    pub unmatched_stack_traces: u64,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one lifecycle event
    pub fn add_event(&mut self, event: TraceEventRecord) {
        match event.kind {
            TraceEventKind::Init => {
                self.index.insert(event.async_id, self.nodes.len());
                self.nodes.push(AsyncNode {
                    async_id: event.async_id,
                    trigger_async_id: event.trigger_async_id,
                    execution_async_id: event.execution_async_id,
                    resource_type: event.resource_type,
                    init: event.timestamp,
                    destroy: None,
                    callbacks: Vec::new(),
                    frames: Vec::new(),
                });
            }
            TraceEventKind::Before => {
                if let Some(node) = self.known_node(&event) {
                    node.callbacks.push(CallbackInterval {
                        before: event.timestamp,
                        after: None,
                    });
                }
            }
            TraceEventKind::After => {
                let closed = self.known_node(&event).map(|node| {
                    node.callbacks
                        .iter_mut()
                        .rev()
                        .find(|cb| cb.after.is_none())
                        .map(|open| open.after = Some(event.timestamp))
                        .is_some()
                });
                if closed == Some(false) {
                    self.orphaned_events += 1;
                }
            }
            TraceEventKind::Destroy => {
                if let Some(node) = self.known_node(&event) {
                    node.destroy = Some(event.timestamp);
                }
            }
        }
    }

    /// Node an event refers to; unknown ids count as orphaned
    fn known_node(&mut self, event: &TraceEventRecord) -> Option<&mut AsyncNode> {
        match self.index.get(&event.async_id) {
            Some(&i) => Some(&mut self.nodes[i]),
            None => {
                debug!("{:?} event for unknown async id {}", event.kind, event.async_id);
                self.orphaned_events += 1;
                None
            }
        }
    }

    /// Attach the creation stack of a resource
    pub fn add_stack_trace(&mut self, trace: StackTraceRecord) {
        match self.index.get(&trace.async_id) {
            Some(&i) => {
                self.nodes[i].frames = trace.frames.iter().map(|frame| frame.format()).collect();
            }
            None => self.unmatched_stack_traces += 1,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Finished nodes in `init` order
    pub fn into_nodes(self) -> Vec<AsyncNode> {
        self.nodes
    }
}
