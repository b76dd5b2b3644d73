/// 图生成配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagramGenerationConfig {
    show_all_activities: bool,
    traverse_subprocesses: bool,
    max_depth: usize,
    detect_circular_references: bool,
    show_spawn_override: bool,
    use_partitions: bool,
    max_activities_per_page: usize,
}

impl DiagramGenerationConfig {
    /// 集成视图: 只含连接器，内联子流程
    pub fn integration() -> Self {
        Self {
            show_all_activities: false,
            traverse_subprocesses: true,
            max_depth: 50,
            detect_circular_references: true,
            show_spawn_override: true,
            use_partitions: true,
            max_activities_per_page: 50,
        }
    }

    /// 流程视图: 所有活动，不遍历子流程
    pub fn flow() -> Self {
        Self {
            show_all_activities: true,
            traverse_subprocesses: false,
            max_depth: 0,
            detect_circular_references: false,
            show_spawn_override: true,
            use_partitions: true,
            max_activities_per_page: 50,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// 每页上限，0 表示不分页
    pub fn with_max_activities_per_page(mut self, max: usize) -> Self {
        self.max_activities_per_page = max;
        self
    }

    pub fn with_partitions(mut self, use_partitions: bool) -> Self {
        self.use_partitions = use_partitions;
        self
    }

    pub fn show_all_activities(&self) -> bool {
        self.show_all_activities
    }

    pub fn traverse_subprocesses(&self) -> bool {
        self.traverse_subprocesses
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn detect_circular_references(&self) -> bool {
        self.detect_circular_references
    }

    pub fn show_spawn_override(&self) -> bool {
        self.show_spawn_override
    }

    pub fn use_partitions(&self) -> bool {
        self.use_partitions
    }

    pub fn max_activities_per_page(&self) -> usize {
        self.max_activities_per_page
    }
}

impl Default for DiagramGenerationConfig {
    fn default() -> Self {
        Self::flow()
    }
}

/// 当前页已输出的节点计数
#[derive(Debug, Clone)]
pub struct ActivityCounter {
    count: usize,
    threshold: usize,
}

impl ActivityCounter {
    pub fn new(threshold: usize) -> Self {
        Self { count: 0, threshold }
    }

    pub fn increment(&mut self) {
        self.count += 1;
    }

    /// 达到 `threshold` 时为 true，threshold 为 0 时始终为 false
    pub fn should_split(&self) -> bool {
        self.threshold > 0 && self.count >= self.threshold
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let integration = DiagramGenerationConfig::integration();
        assert!(!integration.show_all_activities());
        assert!(integration.traverse_subprocesses());
        assert_eq!(integration.max_depth(), 50);
        assert!(integration.detect_circular_references());

        let flow = DiagramGenerationConfig::flow();
        assert!(flow.show_all_activities());
        assert!(!flow.traverse_subprocesses());
        assert_eq!(flow.max_depth(), 0);
        assert!(!flow.detect_circular_references());
        assert!(flow.use_partitions());
        assert_eq!(flow.max_activities_per_page(), 50);
        assert_eq!(DiagramGenerationConfig::default(), flow);
    }

    #[test]
    fn test_builder_overrides() {
        let config = DiagramGenerationConfig::integration()
            .with_max_depth(3)
            .with_max_activities_per_page(10);
        assert_eq!(config.max_depth(), 3);
        assert_eq!(config.max_activities_per_page(), 10);
        assert!(config.show_spawn_override());
    }

    #[test]
    fn test_counter_split_and_reset() {
        let mut counter = ActivityCounter::new(2);
        assert!(!counter.should_split());
        counter.increment();
        counter.increment();
        assert!(counter.should_split());
        assert_eq!(counter.count(), 2);
        counter.reset();
        assert!(!counter.should_split());
        assert_eq!(counter.threshold(), 2);
    }

    #[test]
    fn test_counter_zero_threshold_never_splits() {
        let mut counter = ActivityCounter::new(0);
        for _ in 0..100 {
            counter.increment();
        }
        assert!(!counter.should_split());
    }
}
