use crate::config::DiagramGenerationConfig;
use crate::labels;
use crate::puml::{Diagram, PumlWriter, ACTIVITY_SKIN};
use crate::structure::{FlowGraph, NodeRef, ProcessStructure};
use crate::traverse::{self, Budget, Visitor};
use std::collections::HashSet;

/// 单流程详细图生成器: 所有活动和组，不遍历子流程
pub struct FlowDiagramGenerator {
    config: DiagramGenerationConfig,
}

impl FlowDiagramGenerator {
    pub fn new() -> Self {
        Self {
            config: DiagramGenerationConfig::flow(),
        }
    }

    pub fn with_config(mut self, config: DiagramGenerationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DiagramGenerationConfig {
        &self.config
    }

    pub fn generate(&self, structure: &ProcessStructure) -> Diagram {
        let mut visitor = FlowVisitor {
            writer: PumlWriter::new(
                self.config.max_activities_per_page(),
                self.config.use_partitions(),
            ),
        };

        let mut visited = HashSet::new();
        traverse::walk(
            &mut visitor,
            structure,
            structure.entry(),
            &[],
            &mut visited,
            &mut Budget::unlimited(),
        );
        visited.extend(traverse::render_catches(&mut visitor, structure));

        // 补充未被遍历到的顶层节点 (声明顺序)
        let leftovers: Vec<&String> = structure
            .activities()
            .keys()
            .chain(structure.groups().keys())
            .filter(|name| !visited.contains(*name))
            .collect();
        for name in leftovers {
            traverse::walk(
                &mut visitor,
                structure,
                name,
                &[],
                &mut visited,
                &mut Budget::unlimited(),
            );
        }

        let diagram = visitor.writer.finish(ACTIVITY_SKIN);
        tracing::info!(
            "Flow diagram for {}: {} page(s)",
            structure.name(),
            diagram.page_count()
        );
        diagram
    }
}

impl Default for FlowDiagramGenerator {
    fn default() -> Self {
        Self::new()
    }
}

struct FlowVisitor {
    writer: PumlWriter,
}

impl Visitor for FlowVisitor {
    fn writer(&mut self) -> &mut PumlWriter {
        &mut self.writer
    }

    fn visit(&mut self, graph: &dyn FlowGraph, name: &str) {
        match graph.node(name) {
            Some(NodeRef::Activity(a)) if a.is_null() => {}
            Some(NodeRef::Activity(a)) => self.writer.step(&labels::activity_label(a)),
            Some(NodeRef::Group(g)) => traverse::render_group(self, g),
            None => tracing::trace!("'{}' is not declared, passing through", name),
        }
    }

    fn renders(&mut self, graph: &dyn FlowGraph, name: &str) -> bool {
        graph.node(name).is_some()
    }

    fn labels_arrows(&self) -> bool {
        true
    }

    fn prunes_branches(&self) -> bool {
        false
    }
}
