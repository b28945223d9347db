//! History value (§3, §4.5 step 6): for every history node exited, the
//! stepper records which concrete descendants were active just before the
//! exit — shallow records only the ancestor's immediate children, deep
//! records the whole active subtree. A later transition that targets the
//! history node restores that recording, or falls back to the node's
//! declared default target when nothing has been recorded yet.

use std::collections::HashMap;

use super::node::NodeId;

#[derive(Debug, Clone, Default)]
pub struct HistoryValue {
    recorded: HashMap<NodeId, Vec<NodeId>>,
}

impl HistoryValue {
    pub fn record(&mut self, history_node: NodeId, descendants: Vec<NodeId>) {
        self.recorded.insert(history_node, descendants);
    }

    pub fn get(&self, history_node: NodeId) -> Option<&[NodeId]> {
        self.recorded.get(&history_node).map(|v| v.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.recorded.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecorded_history_node_has_no_entry() {
        let history = HistoryValue::default();
        assert_eq!(history.get(NodeId(3)), None);
    }

    #[test]
    fn recorded_history_is_retrievable() {
        let mut history = HistoryValue::default();
        history.record(NodeId(1), vec![NodeId(2), NodeId(3)]);
        assert_eq!(history.get(NodeId(1)), Some(&[NodeId(2), NodeId(3)][..]));
    }
}
