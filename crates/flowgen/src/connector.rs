//! 连接器分类
//!
//! 连接器是与引擎外部交互的活动 (数据库、消息队列、文件系统、Web 服务等)。
//! 集成模式下以连接器判断相关性。

const DEFAULT_PATTERNS: &[&str] = &[
    ".jms.",
    ".jdbc.",
    ".file.",
    ".soap.",
    ".http.",
    ".mail.",
    ".ftp.",
    ".tcp.",
    ".ae.activities.",
    ".json.",
    ".rv.",
    "getsharedvariable",
    "setsharedvariable",
    "getjobsharedvariable",
    "setjobsharedvariable",
    "sleepactivity",
    "enginecommandactivity",
    "javaactivity",
    "javamethodactivity",
    "javaevent",
    "aesubscriberactivity",
    "aerpcserveractivity",
    "restadapteractivity",
];

const DEFAULT_EXCLUDES: &[&str] = &["xmltojava", "javatoxml"];

/// 判断活动类型是否为连接器的子串规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorRules {
    patterns: Vec<String>,
    excludes: Vec<String>,
}

impl ConnectorRules {
    /// 默认规则，可由 `PROCFLOW_CONNECTOR_PATTERNS` 和
    /// `PROCFLOW_CONNECTOR_EXCLUDES` (逗号分隔) 覆盖
    pub fn from_env() -> Self {
        let mut rules = Self::default();

        if let Ok(v) = std::env::var("PROCFLOW_CONNECTOR_PATTERNS") {
            let patterns = parse_list(&v);
            if !patterns.is_empty() {
                rules.patterns = patterns;
            }
        }

        if let Ok(v) = std::env::var("PROCFLOW_CONNECTOR_EXCLUDES") {
            rules.excludes = parse_list(&v);
        }

        rules
    }

    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.patterns = patterns.into_iter().map(|p| p.as_ref().to_lowercase()).collect();
        self
    }

    pub fn with_excludes<I, S>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.excludes = excludes.into_iter().map(|p| p.as_ref().to_lowercase()).collect();
        self
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    /// 排除规则优先，不区分大小写
    pub fn is_connector(&self, activity_type: &str) -> bool {
        let t = activity_type.to_lowercase();
        if let Some(exclude) = self.excludes.iter().find(|e| t.contains(e.as_str())) {
            tracing::trace!("{} excluded by '{}'", activity_type, exclude);
            return false;
        }
        self.patterns.iter().any(|p| t.contains(p.as_str()))
    }

    /// 连接器类别对应的 PlantUML OpenIconic 图标
    pub fn icon(activity_type: &str) -> &'static str {
        let t = activity_type.to_lowercase();
        if t.contains(".jdbc.") || t.contains("database") {
            "<&data-transfer-download>"
        } else if t.contains(".jms.") || t.contains(".rv.") {
            "<&envelope-closed>"
        } else if t.contains(".file.") || t.contains(".ftp.") {
            "<&file>"
        } else if t.contains(".soap.") || t.contains(".http.") || t.contains("restadapter") {
            "<&cloud>"
        } else if t.contains(".mail.") {
            "<&envelope-open>"
        } else if t.contains(".java.") && !t.contains("xmltojava") && !t.contains("javatoxml") {
            "<&code>"
        } else if t.contains("sleep") {
            "<&clock>"
        } else if t.contains("enginecommand") || t.contains("serviceagent") {
            "<&cog>"
        } else if t.contains("aesubscriber") || t.contains("aerpcserver") || t.contains(".ae.") {
            "<&link>"
        } else if t.contains("sharedvariable") {
            "<&key>"
        } else {
            "<&puzzle-piece>"
        }
    }
}

impl Default for ConnectorRules {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect(),
            excludes: DEFAULT_EXCLUDES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
