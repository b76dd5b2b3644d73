use crate::error::{GenerateError, Result};
use crate::structure::{
    ActivityNode, Condition, GroupNode, ProcessStructure, SubprocessInfo, Transition, UNKNOWN_TYPE,
};
use procdef::{Document, Element};
use std::path::Path;

/// 流程分析器
pub struct ProcessAnalyzer;

impl ProcessAnalyzer {
    /// 构建流程定义的控制流图
    ///
    /// `group` 内的元素归属该组，不进入顶层。缺失的可选字段保持为空。
    pub fn analyze(doc: &Document, process_name: &str) -> ProcessStructure {
        let Some(root) = doc.root() else {
            return ProcessStructure::new(process_name, None);
        };

        let mut structure = ProcessStructure::new(
            process_name,
            root.child_text("startName").map(str::to_string),
        );
        structure.set_end_name(root.child_text("endName").map(str::to_string));

        let top = TopLevel::collect(root);

        for group in &top.groups {
            structure.add_group(Self::analyze_group(*group));
        }
        for activity in &top.activities {
            structure.add_activity(Self::analyze_activity(*activity));
        }
        if let Some(starter) = top.starter {
            structure.set_starter(Self::analyze_activity(starter));
        }
        for transition in &top.transitions {
            if let Some(t) = Self::analyze_transition(*transition) {
                structure.add_transition(t);
            }
        }

        tracing::debug!(
            "Analyzed {}: {} activities, {} groups, {} catch handlers",
            process_name,
            structure.activity_count(),
            structure.groups().len(),
            structure.catch_activities().len()
        );
        structure
    }

    /// 解析并分析内存中的定义
    pub fn analyze_str(xml: &str, process_name: &str) -> procdef::Result<ProcessStructure> {
        let doc = procdef::parse_str(xml)?;
        Ok(Self::analyze(&doc, process_name))
    }

    /// 读取 `.process` 文件，以文件名作为流程名
    pub fn analyze_file(path: &Path) -> Result<ProcessStructure> {
        let doc = procdef::parse_file(path).map_err(|source| GenerateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::analyze(&doc, &name))
    }

    /// 只处理直接子元素，嵌套组递归
    fn analyze_group(element: Element<'_>) -> GroupNode {
        let mut group = GroupNode::new(
            element.attr("name").unwrap_or_default(),
            element.child_text("type").unwrap_or(UNKNOWN_TYPE),
        );
        group.resource_type = element.child_text("resourceType").map(str::to_string);
        group.group_kind = element
            .child("config")
            .and_then(|c| c.child_text("groupType"))
            .map(str::to_string);

        for child in element.children() {
            if child.is("activity") {
                group.add_activity(Self::analyze_activity(child));
            } else if child.is("group") {
                group.add_group(Self::analyze_group(child));
            } else if child.is("transition") {
                if let Some(t) = Self::analyze_transition(child) {
                    group.add_transition(t);
                }
            }
        }
        group
    }

    #[doc(hidden)]
    pub fn analyze_activity(element: Element<'_>) -> ActivityNode {
        let activity = ActivityNode::new(
            element.attr("name").unwrap_or_default(),
            element.child_text("type").unwrap_or(UNKNOWN_TYPE),
        )
        .with_resource_type(element.child_text("resourceType").map(str::to_string));

        if !activity.is_call_process() {
            return activity;
        }
        match element.child("config") {
            Some(config) => activity.with_subprocess(SubprocessInfo {
                process_path: config.child_text("processName").map(str::to_string),
                spawn: config
                    .child_text("spawn")
                    .map_or(false, |s| s.eq_ignore_ascii_case("true")),
                override_xpath: config.child_text("processNameXPath").map(str::to_string),
            }),
            None => activity,
        }
    }

    fn analyze_transition(element: Element<'_>) -> Option<Transition> {
        let (Some(from), Some(to)) = (element.child_text("from"), element.child_text("to")) else {
            tracing::debug!("Skipping transition without from/to");
            return None;
        };
        let condition = Condition::parse(element.child_text("conditionType"), element.child_text("xpath"));
        let mut transition = Transition::new(from, to).with_condition(condition);
        if let Some(description) = element.child_text("xpathDescription") {
            transition = transition.with_description(description);
        }
        Some(transition)
    }
}

/// 定义的顶层元素 (文档顺序)
struct TopLevel<'d> {
    groups: Vec<Element<'d>>,
    activities: Vec<Element<'d>>,
    starter: Option<Element<'d>>,
    transitions: Vec<Element<'d>>,
}

impl<'d> TopLevel<'d> {
    /// 遍历元素树，不进入 group、activity 和 starter
    fn collect(root: Element<'d>) -> Self {
        let mut top = TopLevel {
            groups: Vec::new(),
            activities: Vec::new(),
            starter: None,
            transitions: Vec::new(),
        };

        let mut pending: Vec<Element<'d>> = root.children().collect();
        pending.reverse();
        while let Some(element) = pending.pop() {
            if element.is("group") {
                top.groups.push(element);
            } else if element.is("activity") {
                top.activities.push(element);
            } else if element.is("starter") {
                top.starter.get_or_insert(element);
            } else if element.is("transition") {
                top.transitions.push(element);
            } else {
                let before = pending.len();
                pending.extend(element.children());
                pending[before..].reverse();
            }
        }
        top
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{FlowGraph, NodeRef};
    use std::io::Write;

    const ORDER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<pd:ProcessDefinition xmlns:pd="http://xmlns.tibco.com/bw/process/2003">
    <pd:name>Processes/Order.process</pd:name>
    <pd:startName>Start</pd:startName>
    <pd:endName>End</pd:endName>
    <pd:starter name="Start">
        <pd:type>com.tibco.plugin.jms.JMSQueueEventSource</pd:type>
        <pd:resourceType>ae.activities.JMSQueueEventSource</pd:resourceType>
    </pd:starter>
    <pd:activity name="Save">
        <pd:type>com.tibco.plugin.jdbc.JDBCUpdateActivity</pd:type>
        <pd:resourceType>ae.activities.JDBCUpdateActivity</pd:resourceType>
    </pd:activity>
    <pd:activity name="Notify">
        <pd:type>com.tibco.pe.core.CallProcessActivity</pd:type>
        <config>
            <processName>/Processes/Notify.process</processName>
            <spawn>TRUE</spawn>
        </config>
    </pd:activity>
    <pd:activity name="Catch">
        <pd:type>com.tibco.pe.core.CatchActivity</pd:type>
    </pd:activity>
    <pd:group name="Each Line">
        <pd:type>com.tibco.pe.core.LoopGroup</pd:type>
        <pd:resourceType>ae.process.group</pd:resourceType>
        <config>
            <pd:groupType>inputLoop</pd:groupType>
        </config>
        <pd:activity name="Map Line">
            <pd:type>com.tibco.plugin.mapper.MapperActivity</pd:type>
        </pd:activity>
        <pd:transition>
            <pd:from>start</pd:from>
            <pd:to>Map Line</pd:to>
        </pd:transition>
        <pd:transition>
            <pd:from>Map Line</pd:from>
            <pd:to>end</pd:to>
        </pd:transition>
    </pd:group>
    <pd:transition>
        <pd:from>Start</pd:from>
        <pd:to>Each Line</pd:to>
    </pd:transition>
    <pd:transition>
        <pd:from>Each Line</pd:from>
        <pd:to>Save</pd:to>
        <pd:conditionType>xpath</pd:conditionType>
        <pd:xpath>count($lines) &gt; 0</pd:xpath>
        <pd:xpathDescription>has lines</pd:xpathDescription>
    </pd:transition>
    <pd:transition>
        <pd:from>Save</pd:from>
    </pd:transition>
</pd:ProcessDefinition>
"#;

    #[test]
    fn test_analyze_top_level() {
        let s = ProcessAnalyzer::analyze_str(ORDER, "Order").unwrap();
        assert_eq!(s.name(), "Order");
        assert_eq!(s.start_name(), Some("Start"));
        assert_eq!(s.end_name(), Some("End"));
        assert_eq!(s.entry(), "Start");

        let names: Vec<_> = s.activities().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Save", "Notify", "Catch", "Start"]);
        assert!(s.activities().get("Map Line").is_none());
        assert_eq!(s.catch_activities(), &["Catch".to_string()]);
        assert_eq!(
            s.starter().and_then(|a| a.resource_type.as_deref()),
            Some("ae.activities.JMSQueueEventSource")
        );
    }

    #[test]
    fn test_analyze_transitions() {
        let s = ProcessAnalyzer::analyze_str(ORDER, "Order").unwrap();
        // 组内部转移和不完整的转移不进入顶层
        assert_eq!(s.transitions().len(), 2);
        let edge = &s.successors("Each Line")[0];
        assert_eq!(edge.to, "Save");
        assert_eq!(edge.condition, Condition::Xpath("count($lines) > 0".to_string()));
        assert_eq!(edge.label().as_deref(), Some("has lines"));
        assert!(s.successors("start").is_empty());
    }

    #[test]
    fn test_analyze_group() {
        let s = ProcessAnalyzer::analyze_str(ORDER, "Order").unwrap();
        let Some(NodeRef::Group(group)) = s.node("Each Line") else {
            panic!("group missing");
        };
        assert_eq!(group.group_kind.as_deref(), Some("inputLoop"));
        assert_eq!(group.start(), Some("Map Line"));
        assert!(group.contains_activity("Map Line"));
        assert_eq!(group.successors("Map Line")[0].to, "end");
    }

    #[test]
    fn test_analyze_subprocess_info() {
        let s = ProcessAnalyzer::analyze_str(ORDER, "Order").unwrap();
        let info = s.activities()["Notify"].subprocess.clone().unwrap();
        assert_eq!(info.process_path.as_deref(), Some("/Processes/Notify.process"));
        assert!(info.spawn);
        assert!(!info.has_override());
    }

    #[test]
    fn test_missing_type_is_unknown() {
        let xml = r#"<ProcessDefinition><activity name="A"/></ProcessDefinition>"#;
        let s = ProcessAnalyzer::analyze_str(xml, "P").unwrap();
        assert_eq!(s.activities()["A"].activity_type, UNKNOWN_TYPE);
        assert_eq!(s.entry(), "Start");
    }

    #[test]
    fn test_nested_groups() {
        let xml = r#"<ProcessDefinition>
            <group name="Outer"><type>com.tibco.pe.core.LoopGroup</type>
                <group name="Inner"><type>com.tibco.pe.core.CriticalSectionGroup</type>
                    <activity name="Deep"><type>x.JDBCQueryActivity</type></activity>
                </group>
                <transition><from>start</from><to>Inner</to></transition>
            </group>
        </ProcessDefinition>"#;
        let s = ProcessAnalyzer::analyze_str(xml, "P").unwrap();
        assert_eq!(s.groups().len(), 1);
        let outer = &s.groups()["Outer"];
        assert_eq!(outer.start(), Some("Inner"));
        assert!(outer.groups()["Inner"].contains_activity("Deep"));
        assert_eq!(s.containing_group("Deep").map(|g| g.name.as_str()), Some("Inner"));
    }

    #[test]
    fn test_analyze_file_uses_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Order.process");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(ORDER.as_bytes())
            .unwrap();

        let s = ProcessAnalyzer::analyze_file(&path).unwrap();
        assert_eq!(s.name(), "Order");
    }

    #[test]
    fn test_analyze_file_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Broken.process");
        std::fs::write(&path, "<ProcessDefinition><activity></ProcessDefinition>").unwrap();

        let err = ProcessAnalyzer::analyze_file(&path).unwrap_err();
        assert!(matches!(err, GenerateError::Read { .. }));
    }
}
