use crate::analyzer::ProcessAnalyzer;
use crate::call_chain::CallChain;
use crate::error::{GenerateError, Result};
use crate::structure::ProcessStructure;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// 按引用路径加载子流程定义
pub trait ProcessSource {
    /// 路径不存在时返回 `Ok(None)`
    fn load(&self, path: &str) -> Result<Option<ProcessStructure>>;
}

impl<S: ProcessSource + ?Sized> ProcessSource for &S {
    fn load(&self, path: &str) -> Result<Option<ProcessStructure>> {
        (**self).load(path)
    }
}

/// 项目根目录下的流程文件
#[derive(Debug, Clone)]
pub struct ProjectSource {
    root: PathBuf,
}

impl ProjectSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `/Processes/A.process` -> `<root>/Processes/A.process`
    pub fn resolve(&self, path: &str) -> PathBuf {
        let relative = path.trim().trim_start_matches(['/', '\\']).replace('\\', "/");
        self.root.join(relative)
    }

    /// 相对项目根的路径 (`/` 分隔，以 `/` 开头)
    pub fn relative_path(&self, file: &Path) -> String {
        let relative = file.strip_prefix(&self.root).unwrap_or(file);
        let joined = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        format!("/{}", joined)
    }

    /// 递归收集 .process 文件 (已排序)
    pub fn process_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        collect_process_files(&self.root, &mut files)?;
        files.sort();
        Ok(files)
    }
}

impl ProcessSource for ProjectSource {
    fn load(&self, path: &str) -> Result<Option<ProcessStructure>> {
        let file = self.resolve(path);
        if !file.is_file() {
            tracing::debug!("Unresolved process {} ({})", path, file.display());
            return Ok(None);
        }
        ProcessAnalyzer::analyze_file(&file).map(Some)
    }
}

fn collect_process_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            // 跳过隐藏目录 (.git, .designtimelibs)
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            collect_process_files(&path, files)?;
        } else if path.extension().map(|e| e == "process").unwrap_or(false) {
            files.push(path);
        }
    }

    Ok(())
}

/// 内存中的流程定义，按规范化路径索引
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    definitions: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_process(mut self, path: &str, xml: impl Into<String>) -> Self {
        self.definitions.insert(CallChain::normalize(path), xml.into());
        self
    }
}

impl ProcessSource for MemorySource {
    fn load(&self, path: &str) -> Result<Option<ProcessStructure>> {
        let Some(xml) = self.definitions.get(&CallChain::normalize(path)) else {
            return Ok(None);
        };
        let name = CallChain::process_name(path);
        ProcessAnalyzer::analyze_str(xml, &name)
            .map(Some)
            .map_err(|source| GenerateError::Read {
                path: PathBuf::from(path),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY: &str = "<ProcessDefinition/>";

    #[test]
    fn test_resolve_strips_leading_separator() {
        let source = ProjectSource::new("/project");
        assert_eq!(
            source.resolve("/Processes/A.process"),
            PathBuf::from("/project/Processes/A.process")
        );
        assert_eq!(
            source.resolve("\\Processes\\A.process"),
            PathBuf::from("/project/Processes/A.process")
        );
    }

    #[test]
    fn test_relative_path() {
        let source = ProjectSource::new("/project");
        assert_eq!(
            source.relative_path(Path::new("/project/Processes/A.process")),
            "/Processes/A.process"
        );
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let source = ProjectSource::new(dir.path());
        assert!(source.load("/Processes/Missing.process").unwrap().is_none());
    }

    #[test]
    fn test_load_and_collect() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Processes/Sub")).unwrap();
        fs::create_dir_all(dir.path().join(".hidden")).unwrap();
        fs::write(dir.path().join("Processes/B.process"), EMPTY).unwrap();
        fs::write(dir.path().join("Processes/Sub/A.process"), EMPTY).unwrap();
        fs::write(dir.path().join("Processes/notes.txt"), "x").unwrap();
        fs::write(dir.path().join(".hidden/C.process"), EMPTY).unwrap();

        let source = ProjectSource::new(dir.path());
        let loaded = source.load("/Processes/Sub/A.process").unwrap().unwrap();
        assert_eq!(loaded.name(), "A");

        let files = source.process_files().unwrap();
        let relative: Vec<_> = files.iter().map(|f| source.relative_path(f)).collect();
        assert_eq!(relative, vec!["/Processes/B.process", "/Processes/Sub/A.process"]);
    }

    #[test]
    fn test_memory_source_is_case_insensitive() {
        let source = MemorySource::new().with_process("/Processes/A.process", EMPTY);
        assert!(source.load("processes/a.process").unwrap().is_some());
        assert!(source.load("/Processes/B.process").unwrap().is_none());

        let broken = MemorySource::new().with_process("/X.process", "<a>");
        assert!(broken.load("/X.process").is_err());
    }
}
