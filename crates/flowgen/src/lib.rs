//! flowgen - 流程图生成
//!
//! 控制流分析、单流程图、跨流程集成图 (PlantUML)

pub mod analyzer;
pub mod call_chain;
pub mod calls;
pub mod config;
pub mod connector;
pub mod error;
pub mod flow;
pub mod integration;
pub mod join;
pub mod labels;
pub mod puml;
pub mod source;
pub mod structure;
mod traverse;

pub use analyzer::ProcessAnalyzer;
pub use call_chain::CallChain;
pub use calls::{CallTreeBuilder, CallTreeNode};
pub use config::{ActivityCounter, DiagramGenerationConfig};
pub use connector::ConnectorRules;
pub use error::{GenerateError, Result};
pub use flow::FlowDiagramGenerator;
pub use integration::IntegrationDiagramGenerator;
pub use puml::Diagram;
pub use source::{MemorySource, ProcessSource, ProjectSource};
pub use structure::{
    ActivityNode, Condition, FlowGraph, GroupNode, NodeRef, ProcessStructure, SubprocessInfo,
    Transition,
};
pub use traverse::GROUP_STEP_LIMIT;
