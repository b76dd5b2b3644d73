//! diagram subcommand - PlantUML generation

use clap::{Subcommand, ValueEnum};
use flowgen::{
    ConnectorRules, Diagram, DiagramGenerationConfig, FlowDiagramGenerator,
    IntegrationDiagramGenerator, ProcessAnalyzer, ProjectSource,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinSet;

#[derive(Subcommand)]
pub enum DiagramCommands {
    /// Detailed flow of a single process file
    Flow {
        /// Process file (.process)
        file: String,
        /// Activities per page (0 = single page)
        #[arg(long, default_value = "50")]
        max_per_page: usize,
        /// Output file; multi-page diagrams get a _N suffix
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Cross-process integration view
    Integration {
        /// Project root
        project: String,
        /// Process path relative to the project root
        process: String,
        /// Max subprocess nesting
        #[arg(long, default_value = "50")]
        max_depth: usize,
        /// Activities per page (0 = single page)
        #[arg(long, default_value = "50")]
        max_per_page: usize,
        /// Label shown instead of the starter type
        #[arg(long)]
        starter_label: Option<String>,
        /// Output file; multi-page diagrams get a _N suffix
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Diagram every process of a project
    Batch {
        /// Project root
        project: String,
        /// Diagram kind
        #[arg(short, long, value_enum, default_value = "flow")]
        mode: Mode,
        /// Output directory
        #[arg(long)]
        out_dir: String,
        /// Per-process time limit in seconds
        #[arg(long, default_value = "60")]
        timeout_secs: u64,
        /// JSON output
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Flow,
    Integration,
}

pub async fn run(cmd: DiagramCommands) -> anyhow::Result<()> {
    match cmd {
        DiagramCommands::Flow { file, max_per_page, output } => {
            cmd_flow(&file, max_per_page, output.as_deref())
        }
        DiagramCommands::Integration {
            project,
            process,
            max_depth,
            max_per_page,
            starter_label,
            output,
        } => cmd_integration(
            &project,
            &process,
            max_depth,
            max_per_page,
            starter_label,
            output.as_deref(),
        ),
        DiagramCommands::Batch { project, mode, out_dir, timeout_secs, json } => {
            cmd_batch(&project, mode, &out_dir, timeout_secs, json).await
        }
    }
}

fn cmd_flow(file: &str, max_per_page: usize, output: Option<&str>) -> anyhow::Result<()> {
    let path = PathBuf::from(file);
    if !path.is_file() {
        anyhow::bail!("Process file not found: {}", file);
    }

    let structure = ProcessAnalyzer::analyze_file(&path)?;
    let config = DiagramGenerationConfig::flow().with_max_activities_per_page(max_per_page);
    let diagram = FlowDiagramGenerator::new().with_config(config).generate(&structure);

    emit(&diagram, output)
}

fn cmd_integration(
    project: &str,
    process: &str,
    max_depth: usize,
    max_per_page: usize,
    starter_label: Option<String>,
    output: Option<&str>,
) -> anyhow::Result<()> {
    let root = PathBuf::from(project).canonicalize()?;
    tracing::info!("Project root: {}", root.display());

    let config = DiagramGenerationConfig::integration()
        .with_max_depth(max_depth)
        .with_max_activities_per_page(max_per_page);
    let mut generator = IntegrationDiagramGenerator::new(ProjectSource::new(&root))
        .with_config(config)
        .with_rules(ConnectorRules::from_env());
    if let Some(label) = starter_label {
        generator = generator.with_starter_label(label);
    }

    let diagram = generator.generate_path(process)?;
    emit(&diagram, output)
}

#[derive(serde::Serialize)]
struct BatchItem {
    process: String,
    mode: Mode,
    outputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn cmd_batch(
    project: &str,
    mode: Mode,
    out_dir: &str,
    timeout_secs: u64,
    json: bool,
) -> anyhow::Result<()> {
    let root = PathBuf::from(project).canonicalize()?;
    let source = ProjectSource::new(&root);
    let files = source.process_files()?;
    let out_dir = PathBuf::from(out_dir);
    fs::create_dir_all(&out_dir)?;
    tracing::info!("{} process files under {}", files.len(), root.display());

    let rules = ConnectorRules::from_env();
    let limit = Duration::from_secs(timeout_secs);
    let mut set = JoinSet::new();

    for file in files {
        let process = source.relative_path(&file);
        let root = root.clone();
        let out_dir = out_dir.clone();
        let rules = rules.clone();

        set.spawn(async move {
            let job = tokio::task::spawn_blocking({
                let process = process.clone();
                move || render_one(&root, &file, &process, mode, rules, &out_dir)
            });

            // the blocking thread keeps running after a timeout; its result is discarded
            let (outputs, error) = match tokio::time::timeout(limit, job).await {
                Ok(Ok(Ok(paths))) => (paths, None),
                Ok(Ok(Err(e))) => (Vec::new(), Some(e.to_string())),
                Ok(Err(e)) => (Vec::new(), Some(e.to_string())),
                Err(_) => {
                    tracing::warn!("{} timed out after {}s", process, timeout_secs);
                    (Vec::new(), Some(format!("timed out after {}s", timeout_secs)))
                }
            };

            BatchItem {
                process,
                mode,
                outputs: outputs.iter().map(|p| p.display().to_string()).collect(),
                error,
            }
        });
    }

    let mut items = Vec::new();
    while let Some(item) = set.join_next().await {
        items.push(item?);
    }
    items.sort_by(|a, b| a.process.cmp(&b.process));

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        let ok = items.iter().filter(|i| i.error.is_none()).count();
        for item in &items {
            match &item.error {
                None => println!("  ok    {} ({} page(s))", item.process, item.outputs.len()),
                Some(e) => println!("  FAIL  {}: {}", item.process, e),
            }
        }
        println!("\nGenerated {} of {} diagrams in {}", ok, items.len(), out_dir.display());
    }

    Ok(())
}

fn render_one(
    root: &Path,
    file: &Path,
    process: &str,
    mode: Mode,
    rules: ConnectorRules,
    out_dir: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    let diagram = match mode {
        Mode::Flow => {
            let structure = ProcessAnalyzer::analyze_file(file)?;
            FlowDiagramGenerator::new().generate(&structure)
        }
        Mode::Integration => IntegrationDiagramGenerator::new(ProjectSource::new(root))
            .with_rules(rules)
            .generate_path(process)?,
    };

    let target = out_dir
        .join(process.trim_start_matches('/'))
        .with_extension("puml");
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    write_pages(&target, &diagram)
}

fn emit(diagram: &Diagram, output: Option<&str>) -> anyhow::Result<()> {
    match output {
        Some(file) => {
            for path in write_pages(Path::new(file), diagram)? {
                println!("Saved to: {}", path.display());
            }
        }
        None => print!("{}", diagram),
    }
    Ok(())
}

/// Writes one file per page: `out.puml`, or `out_1.puml`, `out_2.puml`, ...
fn write_pages(path: &Path, diagram: &Diagram) -> anyhow::Result<Vec<PathBuf>> {
    if diagram.page_count() == 1 {
        fs::write(path, diagram.text())?;
        return Ok(vec![path.to_path_buf()]);
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "diagram".to_string());
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "puml".to_string());

    let mut written = Vec::new();
    for (i, page) in diagram.pages().iter().enumerate() {
        let page_path = path.with_file_name(format!("{}_{}.{}", stem, i + 1, ext));
        fs::write(&page_path, page)?;
        written.push(page_path);
    }
    Ok(written)
}
