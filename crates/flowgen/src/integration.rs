//! 跨流程集成图
//!
//! 只绘制连接器及通向连接器的路径。相关的子流程调用以 partition 形式递归内联，
//! 遇到循环或深度上限时停止。

use crate::call_chain::CallChain;
use crate::config::DiagramGenerationConfig;
use crate::connector::ConnectorRules;
use crate::error::{GenerateError, Result};
use crate::labels;
use crate::puml::{Diagram, PumlWriter, ACTIVITY_SKIN, PARTITION_SKIN};
use crate::source::ProcessSource;
use crate::structure::{ActivityNode, FlowGraph, GroupNode, NodeRef, ProcessStructure};
use crate::traverse::{self, Budget, Visitor};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::rc::Rc;

pub struct IntegrationDiagramGenerator<S> {
    source: S,
    config: DiagramGenerationConfig,
    rules: ConnectorRules,
    starter_label: Option<String>,
}

impl<S: ProcessSource> IntegrationDiagramGenerator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            config: DiagramGenerationConfig::integration(),
            rules: ConnectorRules::default(),
            starter_label: None,
        }
    }

    pub fn with_config(mut self, config: DiagramGenerationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_rules(mut self, rules: ConnectorRules) -> Self {
        self.rules = rules;
        self
    }

    /// 替换图顶部加粗的 starter 类型
    pub fn with_starter_label(mut self, label: impl Into<String>) -> Self {
        self.starter_label = Some(label.into());
        self
    }

    pub fn config(&self) -> &DiagramGenerationConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// 从 source 加载 `path` 并生成
    pub fn generate_path(&self, path: &str) -> Result<Diagram> {
        let structure = self
            .source
            .load(path)?
            .ok_or_else(|| GenerateError::NotFound(PathBuf::from(path)))?;
        Ok(self.generate(&structure, path))
    }

    /// 生成已分析的流程，`path` 用于循环检测
    pub fn generate(&self, structure: &ProcessStructure, path: &str) -> Diagram {
        let mut session = Session::new(self, path, structure);

        if let Some(starter) = structure.starter() {
            let label = match &self.starter_label {
                Some(label) => labels::clean_label(label),
                None => format!("**{}**", labels::short_type(&starter.activity_type)),
            };
            session.writer.step(&label);
        }
        session.synthesize(structure);

        let skin: Vec<&str> = ACTIVITY_SKIN.iter().chain(PARTITION_SKIN).copied().collect();
        let diagram = session.writer.finish(&skin);
        tracing::info!(
            "Integration diagram for {}: {} page(s), {} process(es) explored",
            structure.name(),
            diagram.page_count(),
            session.loaded.len()
        );
        diagram
    }
}

/// 调用的绘制方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Sync,
    Spawn,
    Override,
}

/// 单次生成请求的状态
struct Session<'g, S> {
    generator: &'g IntegrationDiagramGenerator<S>,
    writer: PumlWriter,
    /// 按规范化路径缓存的流程，无法解析时为 `None`
    loaded: HashMap<String, Option<Rc<ProcessStructure>>>,
    relevance: HashMap<String, bool>,
    chain: CallChain,
    depth: usize,
    root_starter: Option<String>,
}

impl<'g, S: ProcessSource> Session<'g, S> {
    fn new(generator: &'g IntegrationDiagramGenerator<S>, path: &str, root: &ProcessStructure) -> Self {
        let config = &generator.config;
        let mut loaded = HashMap::new();
        loaded.insert(CallChain::normalize(path), Some(Rc::new(root.clone())));

        Self {
            generator,
            writer: PumlWriter::new(config.max_activities_per_page(), config.use_partitions()),
            loaded,
            relevance: HashMap::new(),
            chain: CallChain::starting_at(path),
            depth: 0,
            root_starter: root.starter().map(|s| s.name.clone()),
        }
    }

    fn config(&self) -> &DiagramGenerationConfig {
        &self.generator.config
    }

    fn synthesize(&mut self, structure: &ProcessStructure) {
        let mut visited = HashSet::new();
        traverse::walk(
            self,
            structure,
            structure.entry(),
            &[],
            &mut visited,
            &mut Budget::unlimited(),
        );
        traverse::render_catches(self, structure);
    }

    /// 按请求缓存的流程。无法读取的流程记录日志并视为未解析
    fn load(&mut self, path: &str) -> Option<Rc<ProcessStructure>> {
        let key = CallChain::normalize(path);
        if let Some(cached) = self.loaded.get(&key) {
            return cached.clone();
        }
        let structure = match self.generator.source.load(path) {
            Ok(found) => found.map(Rc::new),
            Err(e) => {
                tracing::warn!("Skipping unreadable subprocess {}: {}", path, e);
                None
            }
        };
        self.loaded.insert(key, structure.clone());
        structure
    }

    fn is_connector(&self, activity: &ActivityNode) -> bool {
        self.generator.rules.is_connector(&activity.activity_type)
    }

    fn activity_relevant(&mut self, activity: &ActivityNode) -> bool {
        if self.config().show_all_activities() {
            return true;
        }
        if activity.is_call_process() {
            return activity
                .subprocess
                .as_ref()
                .map(|info| info.targets())
                .unwrap_or_default()
                .iter()
                .any(|target| self.process_relevant(target));
        }
        self.is_connector(activity)
    }

    fn group_relevant(&mut self, group: &GroupNode) -> bool {
        group
            .descendant_activities()
            .into_iter()
            .any(|a| self.activity_relevant(a))
    }

    /// 流程是否直接或经由调用包含连接器
    ///
    /// 在从 `path` 可达且尚未缓存的流程上求最小不动点，调用循环也能得到正确结果。
    /// 所有探索过的流程都会缓存。
    fn process_relevant(&mut self, path: &str) -> bool {
        let key = CallChain::normalize(path);
        if let Some(&known) = self.relevance.get(&key) {
            return known;
        }

        let mut direct: HashMap<String, bool> = HashMap::new();
        let mut callees: HashMap<String, Vec<String>> = HashMap::new();
        let mut pending = vec![path.to_string()];

        while let Some(current) = pending.pop() {
            let current_key = CallChain::normalize(&current);
            if direct.contains_key(&current_key) || self.relevance.contains_key(&current_key) {
                continue;
            }
            let Some(structure) = self.load(&current) else {
                direct.insert(current_key, false);
                continue;
            };

            let mut has_connector = false;
            let mut targets = Vec::new();
            for activity in structure.all_activities() {
                if activity.is_call_process() {
                    if let Some(info) = &activity.subprocess {
                        targets.extend(info.targets());
                    }
                } else if self.is_connector(activity) {
                    has_connector = true;
                }
            }

            pending.extend(targets.iter().cloned());
            callees.insert(
                current_key.clone(),
                targets.iter().map(|t| CallChain::normalize(t)).collect(),
            );
            direct.insert(current_key, has_connector);
        }

        let mut relevant: HashSet<String> = direct
            .iter()
            .filter(|&(_, &has)| has)
            .map(|(k, _)| k.clone())
            .collect();
        loop {
            let newly: Vec<String> = callees
                .iter()
                .filter(|(k, _)| !relevant.contains(*k))
                .filter(|(_, calls)| {
                    calls.iter().any(|c| {
                        relevant.contains(c) || self.relevance.get(c).copied().unwrap_or(false)
                    })
                })
                .map(|(k, _)| k.clone())
                .collect();
            if newly.is_empty() {
                break;
            }
            relevant.extend(newly);
        }

        for explored in direct.into_keys() {
            let is_relevant = relevant.contains(&explored);
            self.relevance.insert(explored, is_relevant);
        }
        tracing::debug!("Relevance of {}: {}", path, relevant.contains(&key));
        relevant.contains(&key)
    }

    fn call_kind(&self, activity: &ActivityNode) -> CallKind {
        let Some(info) = activity.subprocess.as_ref() else {
            return CallKind::Sync;
        };
        if !self.config().show_spawn_override() {
            CallKind::Sync
        } else if info.has_override() {
            CallKind::Override
        } else if info.spawn {
            CallKind::Spawn
        } else {
            CallKind::Sync
        }
    }

    fn partition_for(&self, activity: &ActivityNode, target: &str) -> (Option<&'static str>, String) {
        match self.call_kind(activity) {
            CallKind::Spawn => (
                Some("#LightGreen"),
                format!("<b>spawn-subprocess</b>\\n{}", labels::quoted(&activity.name)),
            ),
            CallKind::Override => (
                Some("#Orange"),
                format!(
                    "<b>override-subprocess</b>\\n{}",
                    labels::quoted(&CallChain::process_name(target))
                ),
            ),
            CallKind::Sync => (
                None,
                format!(
                    "{}: {}",
                    labels::readable_type_label(activity.resource_type.as_deref()),
                    labels::quoted(&activity.name)
                ),
            ),
        }
    }

    /// 绘制调用: 每个相关目标一个 partition，已在调用链上的目标绘制递归标记，
    /// 超过深度上限时绘制普通步骤
    fn inline_call(&mut self, activity: &ActivityNode) {
        let targets = activity
            .subprocess
            .as_ref()
            .map(|info| info.targets())
            .unwrap_or_default();
        if targets.is_empty() {
            self.writer.step(&labels::activity_label(activity));
            return;
        }

        for target in &targets {
            if !self.process_relevant(target) && !self.config().show_all_activities() {
                continue;
            }

            if self.config().detect_circular_references() && self.chain.contains(target) {
                tracing::debug!("Cycle: {} -> {}", self.chain, target);
                self.writer
                    .styled_step("#LightGray", &CallChain::recursion_message(target));
                continue;
            }

            if !self.config().traverse_subprocesses() {
                self.writer.step(&labels::activity_label(activity));
                continue;
            }
            if self.depth + 1 > self.config().max_depth() {
                tracing::warn!(
                    "Max depth {} reached at {}, not inlining {}",
                    self.config().max_depth(),
                    activity.name,
                    target
                );
                self.writer.step(&labels::activity_label(activity));
                continue;
            }

            let Some(sub) = self.load(target) else {
                self.writer.step(&labels::activity_label(activity));
                continue;
            };

            let (color, label) = self.partition_for(activity, target);
            self.writer.open_partition(color, &label);

            let inner = self.chain.push(target);
            let outer = std::mem::replace(&mut self.chain, inner);
            self.depth += 1;
            self.synthesize(&sub);
            self.depth -= 1;
            self.chain = outer;

            self.writer.close_partition();
        }
    }
}

impl<S: ProcessSource> Visitor for Session<'_, S> {
    fn writer(&mut self) -> &mut PumlWriter {
        &mut self.writer
    }

    fn visit(&mut self, graph: &dyn FlowGraph, name: &str) {
        if self.depth == 0 && self.root_starter.as_deref() == Some(name) {
            return;
        }
        match graph.node(name) {
            Some(NodeRef::Activity(a)) => {
                if a.is_null() || !self.activity_relevant(a) {
                    return;
                }
                if a.is_call_process() {
                    self.inline_call(a);
                } else if self.is_connector(a) {
                    self.writer.step(&labels::connector_label(a));
                } else {
                    self.writer.step(&labels::activity_label(a));
                }
            }
            Some(NodeRef::Group(g)) => {
                if self.group_relevant(g) {
                    traverse::render_group(self, g);
                }
            }
            None => {}
        }
    }

    fn renders(&mut self, graph: &dyn FlowGraph, name: &str) -> bool {
        match graph.node(name) {
            Some(NodeRef::Activity(a)) => !a.is_null() && self.activity_relevant(a),
            Some(NodeRef::Group(g)) => self.group_relevant(g),
            None => false,
        }
    }

    fn labels_arrows(&self) -> bool {
        false
    }

    fn prunes_branches(&self) -> bool {
        true
    }
}
