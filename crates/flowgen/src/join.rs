//! 分支汇合点计算

use crate::structure::FlowGraph;
use indexmap::IndexSet;
use std::collections::{HashSet, VecDeque};

/// 从 `start` 深度优先可达的节点，barrier 节点包含在内但不展开
pub fn reachable(graph: &dyn FlowGraph, start: &str, barriers: &[String]) -> IndexSet<String> {
    let mut seen = IndexSet::new();
    let mut pending = vec![start.to_string()];

    while let Some(name) = pending.pop() {
        if seen.contains(&name) {
            continue;
        }
        let expand = !barriers.contains(&name);
        if expand {
            pending.extend(graph.successors(&name).iter().rev().map(|t| t.to.clone()));
        }
        seen.insert(name);
    }
    seen
}

/// 所有分支共同可达的第一个节点 (从第一个分支广度优先搜索)
///
/// 分支在 barrier 之前不相交时返回 `None`
pub fn find_join(graph: &dyn FlowGraph, branches: &[&str], barriers: &[String]) -> Option<String> {
    let (first, rest) = branches.split_first()?;

    let mut common = reachable(graph, first, barriers);
    for branch in rest {
        let other = reachable(graph, branch, barriers);
        common.retain(|n| other.contains(n));
        if common.is_empty() {
            return None;
        }
    }

    let mut queue = VecDeque::from([first.to_string()]);
    let mut seen = HashSet::new();
    while let Some(name) = queue.pop_front() {
        if !seen.insert(name.clone()) {
            continue;
        }
        if common.contains(&name) {
            return Some(name);
        }
        if barriers.contains(&name) {
            continue;
        }
        for t in graph.successors(&name) {
            queue.push_back(t.to.clone());
        }
    }
    None
}
