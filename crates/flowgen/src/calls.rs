use crate::call_chain::CallChain;
use crate::error::{GenerateError, Result};
use crate::source::ProcessSource;
use crate::structure::ProcessStructure;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

/// 调用树节点
#[derive(Debug, Clone, Serialize)]
pub struct CallTreeNode {
    pub name: String,
    pub path: String,
    pub depth: usize,
    /// 被父流程异步调用 (spawn)
    pub spawn: bool,
    /// 已在上层调用链中，不再展开
    pub recursive: bool,
    /// 目标无法加载
    pub unresolved: bool,
    pub children: Vec<CallTreeNode>,
}

impl CallTreeNode {
    fn leaf(path: &str, depth: usize, spawn: bool) -> Self {
        Self {
            name: CallChain::process_name(path),
            path: path.to_string(),
            depth,
            spawn,
            recursive: false,
            unresolved: false,
            children: Vec::new(),
        }
    }

    /// 先序展开
    pub fn flatten(&self) -> Vec<&CallTreeNode> {
        let mut result = Vec::new();
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            result.push(node);
            pending.extend(node.children.iter().rev());
        }
        result
    }
}

/// 子流程调用树构建器
pub struct CallTreeBuilder<S> {
    source: S,
    max_depth: usize,
}

impl<S: ProcessSource> CallTreeBuilder<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            max_depth: 10,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// 以 `path` 为根构建调用树
    pub fn build(&self, path: &str) -> Result<CallTreeNode> {
        let root = self
            .source
            .load(path)?
            .ok_or_else(|| GenerateError::NotFound(PathBuf::from(path)))?;

        let mut cache: HashMap<String, Option<Rc<ProcessStructure>>> = HashMap::new();
        let mut node = CallTreeNode::leaf(path, 0, false);
        node.name = root.name().to_string();
        self.expand(&mut node, &root, &CallChain::starting_at(path), &mut cache);
        Ok(node)
    }

    fn expand(
        &self,
        node: &mut CallTreeNode,
        structure: &ProcessStructure,
        chain: &CallChain,
        cache: &mut HashMap<String, Option<Rc<ProcessStructure>>>,
    ) {
        for activity in structure.all_activities() {
            let Some(info) = &activity.subprocess else {
                continue;
            };
            for target in info.targets() {
                let mut child = CallTreeNode::leaf(&target, node.depth + 1, info.spawn);

                if chain.contains(&target) {
                    child.recursive = true;
                } else if child.depth <= self.max_depth {
                    match self.load(&target, cache) {
                        Some(sub) => self.expand(&mut child, &sub, &chain.push(&target), cache),
                        None => child.unresolved = true,
                    }
                }
                node.children.push(child);
            }
        }
    }

    fn load(
        &self,
        path: &str,
        cache: &mut HashMap<String, Option<Rc<ProcessStructure>>>,
    ) -> Option<Rc<ProcessStructure>> {
        cache
            .entry(CallChain::normalize(path))
            .or_insert_with(|| match self.source.load(path) {
                Ok(found) => found.map(Rc::new),
                Err(e) => {
                    tracing::warn!("Skipping unreadable subprocess {}: {}", path, e);
                    None
                }
            })
            .clone()
    }
}
