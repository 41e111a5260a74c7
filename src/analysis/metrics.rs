//! Per-type totals over the async resource nodes of a run.

use super::schema::{AnalysisSummary, AsyncNode};
use log::debug;

/// Summarize finished nodes
///
/// **Public** - builds the trailing summary record
///
/// # Arguments
/// * `nodes` - nodes in `init` order
/// * `orphaned_events` - events that referred to no known resource
/// * `unmatched_stack_traces` - stack traces that referred to no known resource
pub fn summarize(
    nodes: &[AsyncNode],
    orphaned_events: u64,
    unmatched_stack_traces: u64,
) -> AnalysisSummary {
    let mut summary = AnalysisSummary {
        orphaned_events,
        unmatched_stack_traces,
        ..Default::default()
    };

    for node in nodes {
        *summary
            .resources
            .entry(node.resource_type.clone())
            .or_insert(0) += 1;

        let time: f64 = node.callbacks.iter().filter_map(|cb| cb.duration()).sum();
        *summary
            .callback_time
            .entry(node.resource_type.clone())
            .or_insert(0.0) += time;

        summary.total_callbacks += node.callbacks.len() as u64;
    }

    debug!(
        "Summarized {} resources of {} types, {} callbacks",
        nodes.len(),
        summary.resources.len(),
        summary.total_callbacks
    );

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::schema::CallbackInterval;
    use pretty_assertions::assert_eq;

    fn node(resource_type: &str, callbacks: Vec<CallbackInterval>) -> AsyncNode {
        AsyncNode {
            async_id: 1,
            trigger_async_id: None,
            execution_async_id: None,
            resource_type: resource_type.to_string(),
            init: 0.0,
            destroy: None,
            callbacks,
            frames: Vec::new(),
        }
    }

    #[test]
    fn test_summarize_by_type() {
        let nodes = vec![
            node(
                "TIMERWRAP",
                vec![CallbackInterval {
                    before: 1.0,
                    after: Some(3.0),
                }],
            ),
            node(
                "TIMERWRAP",
                vec![CallbackInterval {
                    before: 4.0,
                    after: Some(4.5),
                }],
            ),
            node("TCPWRAP", Vec::new()),
        ];

        let summary = summarize(&nodes, 1, 2);

        assert_eq!(summary.resources["TIMERWRAP"], 2);
        assert_eq!(summary.resources["TCPWRAP"], 1);
        assert_eq!(summary.callback_time["TIMERWRAP"], 2.5);
        assert_eq!(summary.total_callbacks, 2);
        assert_eq!(summary.orphaned_events, 1);
        assert_eq!(summary.unmatched_stack_traces, 2);
    }

    #[test]
    fn test_open_callbacks_add_no_time() {
        let nodes = vec![node(
            "FSREQCALLBACK",
            vec![CallbackInterval {
                before: 1.0,
                after: None,
            }],
        )];

        let summary = summarize(&nodes, 0, 0);
        assert_eq!(summary.callback_time["FSREQCALLBACK"], 0.0);
        assert_eq!(summary.total_callbacks, 1);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[], 0, 0);
        assert_eq!(summary, AnalysisSummary::default());
    }
}
