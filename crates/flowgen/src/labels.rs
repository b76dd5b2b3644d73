//! 图元素中显示的文本

use crate::connector::ConnectorRules;
use crate::structure::{ActivityNode, GroupNode, UNKNOWN_TYPE};

/// 条件/箭头标签的最大长度
pub const MAX_LABEL_LEN: usize = 40;

/// 资源类型的最后一段，去掉 `Activity` 后缀
///
/// `ae.activities.FileCopyActivity` -> `FileCopy`, `ae.process.group` -> `group`
pub fn readable_type_label(resource_type: Option<&str>) -> String {
    let Some(resource_type) = resource_type.map(str::trim).filter(|r| !r.is_empty()) else {
        return UNKNOWN_TYPE.to_string();
    };
    let last = short_type(resource_type);
    last.strip_suffix("Activity")
        .filter(|s| !s.is_empty())
        .unwrap_or(last)
        .to_string()
}

/// 类型名的最后一段
pub fn short_type(activity_type: &str) -> &str {
    activity_type.rsplit('.').next().unwrap_or(activity_type)
}

/// 活动的构造型行，不需要时为 `None`
pub fn stereotype(activity_type: &str) -> Option<String> {
    let stereo = if activity_type.contains("CallProcessActivity") {
        "Call Process"
    } else if activity_type.contains("MapperActivity") {
        "Map Data"
    } else if activity_type.contains("AssignActivity") {
        "Assign"
    } else if activity_type.contains("NullActivity") {
        return None;
    } else if activity_type.contains("SetSharedVariable") || activity_type.contains("SetJobSharedVariable") {
        "Set Variable"
    } else if activity_type.contains("GetSharedVariable") || activity_type.contains("GetJobSharedVariable") {
        "Get Variable"
    } else {
        short_type(activity_type)
    };
    Some(stereo.to_string())
}

/// flow 模式步骤文本: 名称、构造型、override 表达式
pub fn activity_label(activity: &ActivityNode) -> String {
    let mut label = single_line(&activity.name);
    if let Some(stereo) = stereotype(&activity.activity_type) {
        label.push_str(&format!("\\n<size:10>[{}]</size>", stereo));
    }
    if let Some(info) = activity.subprocess.as_ref().filter(|i| i.has_override()) {
        let expr = info.override_xpath.as_deref().unwrap_or_default();
        label.push_str(&format!("\\nDynamic: {}", clean_label(expr)));
    }
    label
}

/// integration 模式连接器步骤: 图标 + 加粗类型，下方为名称
pub fn connector_label(activity: &ActivityNode) -> String {
    let type_label = readable_type_label(
        activity
            .resource_type
            .as_deref()
            .or(Some(activity.activity_type.as_str())),
    );
    format!(
        "{} <b>{}</b>\\n{}",
        ConnectorRules::icon(&activity.activity_type),
        type_label,
        single_line(&activity.name)
    )
}

/// 组的 partition 标题: `LoopGroup: Each Order (inputLoop)`
pub fn group_label(group: &GroupNode) -> String {
    let type_label = readable_type_label(
        group
            .resource_type
            .as_deref()
            .or(Some(group.activity_type.as_str())),
    );
    let mut label = format!("{}: {}", type_label, single_line(&group.name));
    if let Some(kind) = group.group_kind.as_deref() {
        label.push_str(&format!(" ({})", kind));
    }
    quoted(&label)
}

/// 单行标签，截断到 [`MAX_LABEL_LEN`] 个字符
pub fn clean_label(text: &str) -> String {
    let line = single_line(text);
    if line.chars().count() <= MAX_LABEL_LEN {
        return line;
    }
    let mut truncated: String = line.chars().take(MAX_LABEL_LEN - 3).collect();
    truncated.push_str("...");
    truncated
}

/// 可用于 `switch (...)` 和 `case (...)` 的标签
pub fn condition_label(text: &str) -> String {
    clean_label(text).replace('(', "[").replace(')', "]")
}

/// 可放入双引号 partition 标题的文本
pub fn quoted(text: &str) -> String {
    text.replace('"', "'")
}

fn single_line(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::SubprocessInfo;

    #[test]
    fn test_readable_type_label() {
        assert_eq!(readable_type_label(Some("ae.activities.FileCopyActivity")), "FileCopy");
        assert_eq!(readable_type_label(Some("ae.process.group")), "group");
        assert_eq!(readable_type_label(Some("ae.process.subprocess")), "subprocess");
        assert_eq!(readable_type_label(Some("Activity")), "Activity");
        assert_eq!(readable_type_label(None), "Unknown");
        assert_eq!(readable_type_label(Some("  ")), "Unknown");
    }

    #[test]
    fn test_stereotypes() {
        assert_eq!(stereotype("com.tibco.pe.core.CallProcessActivity").as_deref(), Some("Call Process"));
        assert_eq!(stereotype("com.tibco.plugin.mapper.MapperActivity").as_deref(), Some("Map Data"));
        assert_eq!(stereotype("com.tibco.pe.core.AssignActivity").as_deref(), Some("Assign"));
        assert_eq!(stereotype("com.tibco.pe.core.SetSharedVariableActivity").as_deref(), Some("Set Variable"));
        assert_eq!(stereotype("com.tibco.pe.core.GetSharedVariableActivity").as_deref(), Some("Get Variable"));
        assert_eq!(stereotype("com.tibco.plugin.jdbc.JDBCQueryActivity").as_deref(), Some("JDBCQueryActivity"));
        assert_eq!(stereotype("com.tibco.plugin.timer.NullActivity"), None);
    }

    #[test]
    fn test_activity_label_with_override() {
        let call = ActivityNode::new("Route", "com.tibco.pe.core.CallProcessActivity").with_subprocess(
            SubprocessInfo {
                process_path: None,
                spawn: false,
                override_xpath: Some("$Start/root/target".to_string()),
            },
        );
        assert_eq!(
            activity_label(&call),
            "Route\\n<size:10>[Call Process]</size>\\nDynamic: $Start/root/target"
        );
    }

    #[test]
    fn test_connector_label() {
        let act = ActivityNode::new("Load Orders", "com.tibco.plugin.jdbc.JDBCQueryActivity")
            .with_resource_type(Some("ae.activities.JDBCQueryActivity".to_string()));
        assert_eq!(
            connector_label(&act),
            "<&data-transfer-download> <b>JDBCQuery</b>\\nLoad Orders"
        );
    }

    #[test]
    fn test_group_label() {
        let mut group = GroupNode::new("Each \"Order\"", "com.tibco.pe.core.LoopGroup");
        group.group_kind = Some("inputLoop".to_string());
        assert_eq!(group_label(&group), "LoopGroup: Each 'Order' (inputLoop)");
    }

    #[test]
    fn test_clean_label_truncates_and_flattens() {
        assert_eq!(clean_label("a\n  b\r\nc"), "a b c");
        let long = "x".repeat(60);
        let cleaned = clean_label(&long);
        assert_eq!(cleaned.chars().count(), MAX_LABEL_LEN);
        assert!(cleaned.ends_with("..."));
        assert_eq!(condition_label("count($a) > 0"), "count[$a] > 0");
    }
}
