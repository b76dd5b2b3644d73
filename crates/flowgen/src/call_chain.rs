use std::fmt;

/// 图中一条分支上访问过的子流程路径
///
/// 路径以规范化形式保存，`\Processes\A.process` 与 `/processes/a.process` 相同。
/// `push` 不修改原链，兄弟分支各自扩展自己的副本。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallChain {
    chain: Vec<String>,
}

impl CallChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以起始流程初始化
    pub fn starting_at(path: &str) -> Self {
        Self::new().push(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        let normalized = Self::normalize(path);
        self.chain.iter().any(|p| *p == normalized)
    }

    #[must_use]
    pub fn push(&self, path: &str) -> Self {
        let mut chain = self.chain.clone();
        chain.push(Self::normalize(path));
        Self { chain }
    }

    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    pub fn paths(&self) -> &[String] {
        &self.chain
    }

    /// `\A\B.process` -> `a/b.process`
    pub fn normalize(path: &str) -> String {
        path.trim()
            .trim_start_matches(['/', '\\'])
            .replace('\\', "/")
            .to_lowercase()
    }

    /// 流程路径的文件名: `/Processes/Order.process` -> `Order`
    pub fn process_name(path: &str) -> String {
        let last = path.rsplit(['/', '\\']).next().unwrap_or(path);
        last.strip_suffix(".process").unwrap_or(last).to_string()
    }

    pub fn recursion_message(path: &str) -> String {
        format!("⟲ Recursive call to {}", Self::process_name(path))
    }
}

impl fmt::Display for CallChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.chain.join(" -> "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(CallChain::normalize("/Processes/A.process"), "processes/a.process");
        assert_eq!(CallChain::normalize("\\Processes\\A.process"), "processes/a.process");
        assert_eq!(CallChain::normalize("Processes/A.process"), "processes/a.process");
    }

    #[test]
    fn test_push_is_persistent() {
        let root = CallChain::starting_at("/Processes/Main.process");
        let a = root.push("/Processes/A.process");
        let b = root.push("/Processes/B.process");

        assert_eq!(root.depth(), 1);
        assert_eq!(a.depth(), 2);
        assert!(a.contains("processes\\a.process"));
        assert!(!b.contains("/Processes/A.process"));
        assert!(b.contains("/processes/main.process"));
    }

    #[test]
    fn test_process_name_and_message() {
        assert_eq!(CallChain::process_name("/Processes/Sub/Order.process"), "Order");
        assert_eq!(CallChain::process_name("Order"), "Order");
        assert_eq!(
            CallChain::recursion_message("\\Processes\\Loop.process"),
            "⟲ Recursive call to Loop"
        );
    }

    #[test]
    fn test_display() {
        let chain = CallChain::starting_at("/A.process").push("/B.process");
        assert_eq!(chain.to_string(), "a.process -> b.process");
    }
}
