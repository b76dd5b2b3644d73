//! PlantUML 活动图输出 (支持分页)

use crate::config::ActivityCounter;
use std::fmt;

/// 两种图共用的样式
pub const ACTIVITY_SKIN: &[&str] = &[
    "skinparam shadowing false",
    "skinparam activity {",
    "  BackgroundColor #E6E6FA",
    "  BorderColor #663399",
    "  ArrowColor #663399",
    "  FontSize 11",
    "}",
];

/// 集成图的 partition 样式
pub const PARTITION_SKIN: &[&str] = &[
    "skinparam partition {",
    "  BackgroundColor #F0F0F0",
    "  BorderColor #999999",
    "  FontSize 11",
    "  BorderThickness 2",
    "}",
];

/// 按页累积图的行
///
/// 块原语记录嵌套层级，只在层级 0 分页，fork/switch/split/partition 不会跨页
#[derive(Debug)]
pub struct PumlWriter {
    pages: Vec<Vec<String>>,
    lines: Vec<String>,
    nesting: usize,
    partitions: Vec<bool>,
    counter: ActivityCounter,
    use_partitions: bool,
}

impl PumlWriter {
    pub fn new(max_per_page: usize, use_partitions: bool) -> Self {
        Self {
            pages: Vec::new(),
            lines: Vec::new(),
            nesting: 0,
            partitions: Vec::new(),
            counter: ActivityCounter::new(max_per_page),
            use_partitions,
        }
    }

    fn push(&mut self, level: usize, line: String) {
        self.lines.push(format!("{}{}", "  ".repeat(level), line));
    }

    /// 计入一个节点，partition 整体只计一次
    fn count_node(&mut self) {
        if self.partitions.is_empty() {
            self.counter.increment();
        }
    }

    pub fn step(&mut self, label: &str) {
        self.push(self.nesting, format!(":{};", label));
        self.count_node();
    }

    /// 带背景色的步骤 (如递归标记)
    pub fn styled_step(&mut self, color: &str, label: &str) {
        self.push(self.nesting, format!("{}:{};", color, label));
        self.count_node();
    }

    pub fn arrow(&mut self, label: &str) {
        self.push(self.nesting, format!("-> {};", label));
    }

    /// 打开 `partition [color] "label" {`，禁用 partition 时只输出内容
    pub fn open_partition(&mut self, color: Option<&str>, label: &str) {
        self.count_node();
        self.partitions.push(self.use_partitions);
        if !self.use_partitions {
            return;
        }
        let line = match color {
            Some(color) => format!("partition {} \"{}\" {{", color, label),
            None => format!("partition \"{}\" {{", label),
        };
        self.push(self.nesting, line);
        self.nesting += 1;
    }

    pub fn close_partition(&mut self) {
        if self.partitions.pop().unwrap_or(false) {
            self.nesting = self.nesting.saturating_sub(1);
            self.push(self.nesting, "}".to_string());
        }
    }

    pub fn fork(&mut self) {
        self.open_block("fork".to_string());
    }

    pub fn fork_again(&mut self) {
        self.block_divider("fork again".to_string());
    }

    pub fn end_fork(&mut self) {
        self.close_block("end fork");
    }

    pub fn switch(&mut self, header: &str) {
        self.open_block(format!("switch ({})", header));
    }

    pub fn case(&mut self, label: &str) {
        self.block_divider(format!("case ({})", label));
    }

    pub fn end_switch(&mut self) {
        self.close_block("endswitch");
    }

    pub fn split(&mut self) {
        self.open_block("split".to_string());
    }

    pub fn split_again(&mut self) {
        self.block_divider("split again".to_string());
    }

    pub fn end_split(&mut self) {
        self.close_block("end split");
    }

    fn open_block(&mut self, line: String) {
        self.push(self.nesting, line);
        self.nesting += 1;
    }

    fn block_divider(&mut self, line: String) {
        self.push(self.nesting.saturating_sub(1), line);
    }

    fn close_block(&mut self, line: &str) {
        self.nesting = self.nesting.saturating_sub(1);
        self.push(self.nesting, line.to_string());
    }

    /// 当前页已满且没有未关闭的块时换页，页之间用编号连接符相连
    pub fn maybe_split(&mut self) -> bool {
        if self.nesting > 0 || !self.partitions.is_empty() || !self.counter.should_split() {
            return false;
        }
        let connector = format!("({})", self.pages.len() + 1);
        self.lines.push(connector.clone());
        self.pages.push(std::mem::take(&mut self.lines));
        self.lines.push(connector);
        self.counter.reset();
        tracing::debug!("Page {} full, continuing on a new page", self.pages.len());
        true
    }

    pub fn nesting(&self) -> usize {
        self.nesting
    }

    /// 当前页已写入的行
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// 为每页加上 `@startuml`/`@enduml` 和样式
    pub fn finish(mut self, skin: &[&str]) -> Diagram {
        self.pages.push(std::mem::take(&mut self.lines));
        let last = self.pages.len() - 1;

        let pages = self
            .pages
            .into_iter()
            .enumerate()
            .map(|(i, body)| {
                let mut page = vec!["@startuml".to_string()];
                page.extend(skin.iter().map(|s| s.to_string()));
                if i == 0 {
                    page.push("start".to_string());
                }
                page.extend(body);
                if i == last {
                    page.push("stop".to_string());
                }
                page.push("@enduml".to_string());
                let mut text = page.join("\n");
                text.push('\n');
                text
            })
            .collect();

        Diagram { pages }
    }
}

/// 生成的图，每页是一个完整的 PlantUML 文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagram {
    pages: Vec<String>,
}

impl Diagram {
    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn into_pages(self) -> Vec<String> {
        self.pages
    }

    /// 所有页拼接
    pub fn text(&self) -> String {
        self.pages.concat()
    }
}

impl fmt::Display for Diagram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for page in &self.pages {
            f.write_str(page)?;
        }
        Ok(())
    }
}
