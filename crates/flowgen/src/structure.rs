use indexmap::IndexMap;
use serde::Serialize;

/// 组内部入口伪节点
pub const GROUP_START: &str = "start";
/// 组内部出口伪节点
pub const GROUP_END: &str = "end";
/// 未声明类型的活动
pub const UNKNOWN_TYPE: &str = "Unknown";

/// 转移条件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "expression", rename_all = "lowercase")]
pub enum Condition {
    Always,
    Otherwise,
    Error,
    Xpath(String),
}

impl Condition {
    /// 由 `pd:conditionType` 和 `pd:xpath` 构造
    /// 未知或缺失的类型 (`always`, `success` 等) 视为无条件
    pub fn parse(condition_type: Option<&str>, xpath: Option<&str>) -> Self {
        match condition_type.map(str::trim) {
            Some(t) if t.eq_ignore_ascii_case("otherwise") => Condition::Otherwise,
            Some(t) if t.eq_ignore_ascii_case("error") => Condition::Error,
            Some(t) if t.eq_ignore_ascii_case("xpath") => {
                Condition::Xpath(xpath.unwrap_or_default().to_string())
            }
            _ => Condition::Always,
        }
    }

    pub fn is_conditional(&self) -> bool {
        !matches!(self, Condition::Always)
    }
}

/// 同一作用域内两个节点之间的有向边
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub condition: Condition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Transition {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            condition: Condition::Always,
            description: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 显示用标签，普通无条件边为 `None`
    pub fn label(&self) -> Option<String> {
        let raw = match &self.condition {
            Condition::Always => return self.description.clone(),
            Condition::Otherwise => "Otherwise".to_string(),
            Condition::Error => "Error".to_string(),
            Condition::Xpath(expr) => match &self.description {
                Some(d) => d.clone(),
                None if expr.trim().is_empty() => "xpath".to_string(),
                None => expr.clone(),
            },
        };
        Some(raw)
    }
}

/// `CallProcessActivity` 的调用参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubprocessInfo {
    pub process_path: Option<String>,
    pub spawn: bool,
    pub override_xpath: Option<String>,
}

impl SubprocessInfo {
    pub fn has_override(&self) -> bool {
        self.override_xpath
            .as_deref()
            .map_or(false, |x| !x.trim().is_empty())
    }

    /// override 表达式中引号包裹的流程路径
    pub fn override_paths(&self) -> Vec<String> {
        self.override_xpath
            .as_deref()
            .map(extract_process_paths)
            .unwrap_or_default()
    }

    /// 可能调用的流程: 有 override 字面量时取字面量，否则取静态 `processName`
    pub fn targets(&self) -> Vec<String> {
        let overrides = self.override_paths();
        if !overrides.is_empty() {
            return overrides;
        }
        self.process_path.iter().cloned().collect()
    }
}

/// 提取像流程路径的引号字面量 (以 `/` 开头或包含 `.process`)
fn extract_process_paths(expr: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut chars = expr.chars();

    while let Some(c) = chars.next() {
        if c != '"' && c != '\'' {
            continue;
        }
        let mut literal = String::new();
        let mut closed = false;
        for nc in chars.by_ref() {
            if nc == '"' || nc == '\'' {
                closed = true;
                break;
            }
            literal.push(nc);
        }
        if !closed {
            break;
        }
        if !literal.is_empty() && (literal.starts_with('/') || literal.contains(".process")) {
            paths.push(literal);
        }
    }
    paths
}

/// 流程或组中的活动 (含 starter)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityNode {
    pub name: String,
    pub activity_type: String,
    pub resource_type: Option<String>,
    pub is_catch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subprocess: Option<SubprocessInfo>,
}

impl ActivityNode {
    pub fn new(name: impl Into<String>, activity_type: impl Into<String>) -> Self {
        let activity_type = activity_type.into();
        Self {
            name: name.into(),
            is_catch: activity_type.contains("CatchActivity"),
            activity_type,
            resource_type: None,
            subprocess: None,
        }
    }

    pub fn with_resource_type(mut self, resource_type: Option<String>) -> Self {
        self.resource_type = resource_type;
        self
    }

    pub fn with_subprocess(mut self, info: SubprocessInfo) -> Self {
        self.subprocess = Some(info);
        self
    }

    pub fn is_call_process(&self) -> bool {
        self.activity_type.contains("CallProcessActivity")
    }

    pub fn is_null(&self) -> bool {
        self.activity_type.contains("NullActivity")
    }
}

/// 嵌套作用域 (循环、临界区、普通组)，有自己的内部流程
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupNode {
    pub name: String,
    pub activity_type: String,
    pub resource_type: Option<String>,
    /// config 中的 `pd:groupType` (`inputLoop`, `repeat`, `critical` 等)
    pub group_kind: Option<String>,
    start: Option<String>,
    activities: IndexMap<String, ActivityNode>,
    transitions: IndexMap<String, Vec<Transition>>,
    groups: IndexMap<String, GroupNode>,
}

impl GroupNode {
    pub fn new(name: impl Into<String>, activity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            activity_type: activity_type.into(),
            resource_type: None,
            group_kind: None,
            start: None,
            activities: IndexMap::new(),
            transitions: IndexMap::new(),
            groups: IndexMap::new(),
        }
    }

    pub fn add_activity(&mut self, activity: ActivityNode) {
        self.activities.insert(activity.name.clone(), activity);
    }

    /// 记录内部边，第一条从 `start` 出发的边决定入口
    pub fn add_transition(&mut self, transition: Transition) {
        if transition.from == GROUP_START && self.start.is_none() {
            self.start = Some(transition.to.clone());
        }
        self.transitions
            .entry(transition.from.clone())
            .or_default()
            .push(transition);
    }

    pub fn add_group(&mut self, group: GroupNode) {
        self.groups.insert(group.name.clone(), group);
    }

    /// `start` 伪节点之后的第一个节点
    pub fn start(&self) -> Option<&str> {
        self.start.as_deref()
    }

    pub fn activities(&self) -> &IndexMap<String, ActivityNode> {
        &self.activities
    }

    pub fn transitions(&self) -> &IndexMap<String, Vec<Transition>> {
        &self.transitions
    }

    pub fn groups(&self) -> &IndexMap<String, GroupNode> {
        &self.groups
    }

    pub fn contains_activity(&self, name: &str) -> bool {
        self.activities.contains_key(name)
    }

    /// 本组及嵌套组的所有活动
    pub fn descendant_activities(&self) -> Vec<&ActivityNode> {
        let mut result = Vec::new();
        let mut pending = vec![self];
        while let Some(group) = pending.pop() {
            result.extend(group.activities.values());
            pending.extend(group.groups.values().rev());
        }
        result
    }
}

/// 转移可指向的节点
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Activity(&'a ActivityNode),
    Group(&'a GroupNode),
}

/// 流程与组内部共用的图视图
pub trait FlowGraph {
    /// `name` 的出边 (声明顺序)
    fn successors(&self, name: &str) -> &[Transition];

    /// 本作用域内名为 `name` 的活动或组
    fn node(&self, name: &str) -> Option<NodeRef<'_>>;
}

impl FlowGraph for GroupNode {
    fn successors(&self, name: &str) -> &[Transition] {
        self.transitions.get(name).map_or(&[], Vec::as_slice)
    }

    fn node(&self, name: &str) -> Option<NodeRef<'_>> {
        self.activities
            .get(name)
            .map(NodeRef::Activity)
            .or_else(|| self.groups.get(name).map(NodeRef::Group))
    }
}

/// 单个流程定义的控制流图
#[derive(Debug, Clone, Serialize)]
pub struct ProcessStructure {
    name: String,
    start_name: Option<String>,
    end_name: Option<String>,
    starter: Option<String>,
    activities: IndexMap<String, ActivityNode>,
    groups: IndexMap<String, GroupNode>,
    transitions: IndexMap<String, Vec<Transition>>,
    catch_activities: Vec<String>,
}

impl ProcessStructure {
    pub fn new(name: impl Into<String>, start_name: Option<String>) -> Self {
        Self {
            name: name.into(),
            start_name,
            end_name: None,
            starter: None,
            activities: IndexMap::new(),
            groups: IndexMap::new(),
            transitions: IndexMap::new(),
            catch_activities: Vec::new(),
        }
    }

    pub fn set_end_name(&mut self, end_name: Option<String>) {
        self.end_name = end_name;
    }

    /// 注册活动，catch 活动同时加入 catch 列表
    pub fn add_activity(&mut self, activity: ActivityNode) {
        if activity.is_catch && !self.catch_activities.contains(&activity.name) {
            self.catch_activities.push(activity.name.clone());
        }
        self.activities.insert(activity.name.clone(), activity);
    }

    /// 将 starter (触发器) 注册为普通活动
    pub fn set_starter(&mut self, starter: ActivityNode) {
        self.starter = Some(starter.name.clone());
        self.activities.insert(starter.name.clone(), starter);
    }

    pub fn add_group(&mut self, group: GroupNode) {
        self.groups.insert(group.name.clone(), group);
    }

    pub fn add_transition(&mut self, transition: Transition) {
        self.transitions
            .entry(transition.from.clone())
            .or_default()
            .push(transition);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_name(&self) -> Option<&str> {
        self.start_name.as_deref()
    }

    pub fn end_name(&self) -> Option<&str> {
        self.end_name.as_deref()
    }

    pub fn starter(&self) -> Option<&ActivityNode> {
        self.starter.as_deref().and_then(|name| self.activities.get(name))
    }

    /// 遍历入口: `pd:startName`，否则 starter，否则 `Start`
    pub fn entry(&self) -> &str {
        self.start_name
            .as_deref()
            .or(self.starter.as_deref())
            .unwrap_or("Start")
    }

    pub fn activities(&self) -> &IndexMap<String, ActivityNode> {
        &self.activities
    }

    pub fn groups(&self) -> &IndexMap<String, GroupNode> {
        &self.groups
    }

    pub fn transitions(&self) -> &IndexMap<String, Vec<Transition>> {
        &self.transitions
    }

    pub fn catch_activities(&self) -> &[String] {
        &self.catch_activities
    }

    pub fn activity_count(&self) -> usize {
        self.activities.len()
    }

    pub fn is_inside_group(&self, name: &str) -> bool {
        self.containing_group(name).is_some()
    }

    /// 声明活动 `name` 的最内层组
    pub fn containing_group(&self, name: &str) -> Option<&GroupNode> {
        let mut pending: Vec<&GroupNode> = self.groups.values().collect();
        while let Some(group) = pending.pop() {
            if group.contains_activity(name) {
                return Some(group);
            }
            pending.extend(group.groups.values());
        }
        None
    }

    /// 顶层活动，然后是组内嵌套的所有活动
    pub fn all_activities(&self) -> Vec<&ActivityNode> {
        let mut result: Vec<&ActivityNode> = self.activities.values().collect();
        for group in self.groups.values() {
            result.extend(group.descendant_activities());
        }
        result
    }
}

impl FlowGraph for ProcessStructure {
    fn successors(&self, name: &str) -> &[Transition] {
        self.transitions.get(name).map_or(&[], Vec::as_slice)
    }

    fn node(&self, name: &str) -> Option<NodeRef<'_>> {
        self.activities
            .get(name)
            .map(NodeRef::Activity)
            .or_else(|| self.groups.get(name).map(NodeRef::Group))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_parse() {
        assert_eq!(Condition::parse(None, None), Condition::Always);
        assert_eq!(Condition::parse(Some("always"), None), Condition::Always);
        assert_eq!(Condition::parse(Some("success"), None), Condition::Always);
        assert_eq!(Condition::parse(Some("otherwise"), None), Condition::Otherwise);
        assert_eq!(Condition::parse(Some(" error "), None), Condition::Error);
        assert_eq!(
            Condition::parse(Some("xpath"), Some("$a > 1")),
            Condition::Xpath("$a > 1".to_string())
        );
    }

    #[test]
    fn test_transition_label_prefers_description() {
        let t = Transition::new("A", "B")
            .with_condition(Condition::Xpath("count($x) > 0".to_string()))
            .with_description("has items");
        assert_eq!(t.label().as_deref(), Some("has items"));

        let t = Transition::new("A", "B").with_condition(Condition::Xpath("count($x) > 0".to_string()));
        assert_eq!(t.label().as_deref(), Some("count($x) > 0"));

        assert_eq!(Transition::new("A", "B").label(), None);
        assert_eq!(
            Transition::new("A", "B").with_condition(Condition::Error).label().as_deref(),
            Some("Error")
        );
    }

    #[test]
    fn test_override_paths_extracts_quoted_processes() {
        let info = SubprocessInfo {
            process_path: Some("/Processes/Default.process".to_string()),
            spawn: false,
            override_xpath: Some(
                "if ($x = 'A') then '/Processes/A.process' else \"Processes/B.process\"".to_string(),
            ),
        };
        assert!(info.has_override());
        assert_eq!(
            info.override_paths(),
            vec!["/Processes/A.process".to_string(), "Processes/B.process".to_string()]
        );
        assert_eq!(info.targets(), info.override_paths());
    }

    #[test]
    fn test_targets_fall_back_to_static_path() {
        let info = SubprocessInfo {
            process_path: Some("/Processes/Default.process".to_string()),
            spawn: true,
            override_xpath: Some("$Start/root/target".to_string()),
        };
        assert!(info.has_override());
        assert_eq!(info.targets(), vec!["/Processes/Default.process".to_string()]);
    }

    #[test]
    fn test_activity_kind_checks() {
        let catch = ActivityNode::new("Catch", "com.tibco.pe.core.CatchActivity");
        assert!(catch.is_catch);
        let call = ActivityNode::new("Call", "com.tibco.pe.core.CallProcessActivity");
        assert!(call.is_call_process());
        assert!(!call.is_catch);
        assert!(ActivityNode::new("N", "com.tibco.plugin.timer.NullActivity").is_null());
    }

    #[test]
    fn test_group_start_is_first_start_edge() {
        let mut group = GroupNode::new("Loop", "com.tibco.pe.core.LoopGroup");
        group.add_transition(Transition::new("start", "X"));
        group.add_transition(Transition::new("X", "end"));
        assert_eq!(group.start(), Some("X"));
        assert_eq!(group.successors("X")[0].to, "end");
        assert!(group.successors("missing").is_empty());
    }

    #[test]
    fn test_structure_lookups() {
        let mut inner = GroupNode::new("Inner", "com.tibco.pe.core.CriticalSectionGroup");
        inner.add_activity(ActivityNode::new("Deep", "x.JDBCQueryActivity"));
        let mut outer = GroupNode::new("Outer", "com.tibco.pe.core.LoopGroup");
        outer.add_activity(ActivityNode::new("Shallow", "x.MapperActivity"));
        outer.add_group(inner);

        let mut s = ProcessStructure::new("P", Some("Start".to_string()));
        s.add_activity(ActivityNode::new("Catch", "com.tibco.pe.core.CatchActivity"));
        s.add_group(outer);

        assert_eq!(s.catch_activities(), &["Catch".to_string()]);
        assert_eq!(s.containing_group("Deep").map(|g| g.name.as_str()), Some("Inner"));
        assert!(s.is_inside_group("Shallow"));
        assert!(!s.is_inside_group("Catch"));
        assert_eq!(s.all_activities().len(), 3);
        assert!(matches!(s.node("Outer"), Some(NodeRef::Group(_))));
        assert!(s.node("Deep").is_none());
    }

    #[test]
    fn test_entry_fallbacks() {
        let mut s = ProcessStructure::new("P", None);
        assert_eq!(s.entry(), "Start");
        s.set_starter(ActivityNode::new("Timer", "com.tibco.plugin.timer.TimerEventSource"));
        assert_eq!(s.entry(), "Timer");
        assert_eq!(s.starter().map(|a| a.name.as_str()), Some("Timer"));
    }
}
