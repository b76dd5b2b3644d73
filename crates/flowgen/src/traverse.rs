//! flow 与 integration 共用的图遍历
//!
//! 顺序路径迭代处理，只有分支块递归。多后继节点先计算汇合点，
//! 各分支绘制到汇合点为止，然后从汇合点继续一次。

use crate::join;
use crate::labels;
use crate::puml::PumlWriter;
use crate::structure::{FlowGraph, GroupNode, ProcessStructure, Transition, GROUP_END, GROUP_START};
use std::collections::HashSet;

/// 组内遍历步数上限
pub const GROUP_STEP_LIMIT: usize = 50;

/// [`walk`] 的绘制策略
pub(crate) trait Visitor {
    fn writer(&mut self) -> &mut PumlWriter;

    /// 绘制 `name`，未知节点不输出
    fn visit(&mut self, graph: &dyn FlowGraph, name: &str);

    /// `name` 是否会输出内容
    fn renders(&mut self, graph: &dyn FlowGraph, name: &str) -> bool;

    /// 单条带标签的边是否绘制为 `-> label;`
    fn labels_arrows(&self) -> bool;

    /// 分类前是否丢弃无内容的分支，关闭时每个不同目标都是一个分支
    fn prunes_branches(&self) -> bool;

    /// `start` 到停止节点之间是否有内容
    fn has_content(&mut self, graph: &dyn FlowGraph, start: &str, stops: &[String]) -> bool {
        if stops.iter().any(|s| s == start) {
            return false;
        }
        join::reachable(graph, start, stops)
            .iter()
            .filter(|n| !stops.contains(*n))
            .any(|n| self.renders(graph, n))
    }
}

/// 单次遍历的步数额度
#[derive(Debug, Clone, Copy)]
pub(crate) struct Budget(Option<usize>);

impl Budget {
    pub fn unlimited() -> Self {
        Budget(None)
    }

    pub fn limited(steps: usize) -> Self {
        Budget(Some(steps))
    }

    fn take(&mut self) -> bool {
        match &mut self.0 {
            None => true,
            Some(0) => false,
            Some(n) => {
                *n -= 1;
                true
            }
        }
    }
}

/// 从 `start` 遍历，遇到停止节点、已访问节点或无后继时结束
pub(crate) fn walk<V: Visitor + ?Sized>(
    v: &mut V,
    graph: &dyn FlowGraph,
    start: &str,
    stops: &[String],
    visited: &mut HashSet<String>,
    budget: &mut Budget,
) {
    let mut current = start.to_string();

    loop {
        if stops.contains(&current) || visited.contains(&current) {
            break;
        }
        if !budget.take() {
            tracing::warn!("Step limit reached at '{}', truncating", current);
            break;
        }
        visited.insert(current.clone());

        v.writer().maybe_split();
        v.visit(graph, &current);

        let mut candidates = distinct_targets(graph.successors(&current));
        if v.prunes_branches() {
            candidates.retain(|t| v.has_content(graph, &t.to, stops));
        }

        match candidates.as_slice() {
            [] => break,
            [edge] => {
                if v.labels_arrows() {
                    if let Some(label) = edge.label() {
                        v.writer().arrow(&labels::clean_label(&label));
                    }
                }
                current = edge.to.clone();
            }
            _ => match branch(v, graph, &current, &candidates, stops, visited, budget) {
                Some(join) => current = join,
                None => break,
            },
        }
    }
}

/// 从 `origin` 绘制 switch 或 fork，返回继续遍历的节点
fn branch<V: Visitor + ?Sized>(
    v: &mut V,
    graph: &dyn FlowGraph,
    origin: &str,
    candidates: &[&Transition],
    stops: &[String],
    visited: &mut HashSet<String>,
    budget: &mut Budget,
) -> Option<String> {
    let targets: Vec<&str> = candidates.iter().map(|t| t.to.as_str()).collect();
    let join = join::find_join(graph, &targets, stops);

    let mut inner_stops = stops.to_vec();
    if let Some(join) = &join {
        inner_stops.push(join.clone());
    }

    // 直接结束或直达汇合点的分支保留为空 case
    let kept: Vec<&Transition> = if v.prunes_branches() {
        candidates
            .iter()
            .copied()
            .filter(|t| Some(&t.to) != join.as_ref() && v.has_content(graph, &t.to, &inner_stops))
            .collect()
    } else {
        candidates.to_vec()
    };
    tracing::debug!(
        "Branch at '{}': {} of {} paths, join {:?}",
        origin,
        kept.len(),
        candidates.len(),
        join
    );

    match kept.as_slice() {
        [] => {}
        [edge] => {
            if v.labels_arrows() {
                if let Some(label) = edge.label() {
                    v.writer().arrow(&labels::clean_label(&label));
                }
            }
            walk(v, graph, &edge.to, &inner_stops, visited, budget);
        }
        _ => {
            let is_switch = candidates.iter().any(|t| t.condition.is_conditional());
            if is_switch {
                v.writer().switch(&labels::condition_label(origin));
            } else {
                v.writer().fork();
            }

            let mut merged = visited.clone();
            for (i, edge) in kept.iter().enumerate() {
                if is_switch {
                    let label = edge.label().unwrap_or_else(|| "Success".to_string());
                    v.writer().case(&labels::condition_label(&label));
                } else if i > 0 {
                    v.writer().fork_again();
                }
                let mut branch_visited = visited.clone();
                walk(v, graph, &edge.to, &inner_stops, &mut branch_visited, budget);
                merged.extend(branch_visited);
            }
            *visited = merged;

            if is_switch {
                v.writer().end_switch();
            } else {
                v.writer().end_fork();
            }
        }
    }

    join
}

/// 每个目标的第一条转移 (声明顺序)
fn distinct_targets(transitions: &[Transition]) -> Vec<&Transition> {
    let mut seen = HashSet::new();
    transitions.iter().filter(|t| seen.insert(t.to.as_str())).collect()
}

/// 组的 partition: 内部流程，然后是遍历未到达的节点
pub(crate) fn render_group<V: Visitor + ?Sized>(v: &mut V, group: &GroupNode) {
    v.writer().open_partition(None, &labels::group_label(group));

    let mut visited = HashSet::new();
    let mut budget = Budget::limited(GROUP_STEP_LIMIT);
    let stops = vec![GROUP_END.to_string()];
    walk(v, group, GROUP_START, &stops, &mut visited, &mut budget);

    let leftovers: Vec<&String> = group
        .activities()
        .keys()
        .chain(group.groups().keys())
        .filter(|name| !visited.contains(*name))
        .collect();
    for name in leftovers {
        if v.renders(group, name) {
            v.visit(group, name);
        }
    }

    v.writer().close_partition();
}

/// 追加 "Error Handling" partition，每个 catch 活动单独遍历
/// 返回 catch 遍历访问过的节点
pub(crate) fn render_catches<V: Visitor + ?Sized>(
    v: &mut V,
    structure: &ProcessStructure,
) -> HashSet<String> {
    let mut reached = HashSet::new();
    let catches: Vec<&String> = structure
        .catch_activities()
        .iter()
        .filter(|c| v.has_content(structure, c, &[]))
        .collect();
    if catches.is_empty() {
        return reached;
    }

    v.writer().maybe_split();
    v.writer().open_partition(Some("#MistyRose"), "Error Handling");
    let several = catches.len() > 1;
    if several {
        v.writer().split();
    }
    for (i, catch) in catches.iter().enumerate() {
        if i > 0 {
            v.writer().split_again();
        }
        let mut visited = HashSet::new();
        walk(v, structure, catch, &[], &mut visited, &mut Budget::unlimited());
        reached.extend(visited);
    }
    if several {
        v.writer().end_split();
    }
    v.writer().close_partition();
    reached
}
