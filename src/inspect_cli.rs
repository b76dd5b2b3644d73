//! inspect subcommand - process structure and call trees

use clap::Subcommand;
use flowgen::{CallTreeBuilder, GroupNode, ProcessAnalyzer, ProjectSource};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum InspectCommands {
    /// Show the analyzed structure of a process file
    Structure {
        /// Process file (.process)
        file: String,
        /// JSON output
        #[arg(long)]
        json: bool,
    },
    /// Show the subprocess call tree of a process
    Calls {
        /// Project root
        project: String,
        /// Process path relative to the project root
        process: String,
        /// Max depth
        #[arg(short, long, default_value = "10")]
        depth: usize,
        /// JSON output
        #[arg(long)]
        json: bool,
    },
}

pub fn run(cmd: InspectCommands) -> anyhow::Result<()> {
    match cmd {
        InspectCommands::Structure { file, json } => cmd_structure(&file, json),
        InspectCommands::Calls { project, process, depth, json } => {
            cmd_calls(&project, &process, depth, json)
        }
    }
}

fn cmd_structure(file: &str, json: bool) -> anyhow::Result<()> {
    let path = PathBuf::from(file);
    if !path.is_file() {
        anyhow::bail!("Process file not found: {}", file);
    }
    let structure = ProcessAnalyzer::analyze_file(&path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&structure)?);
        return Ok(());
    }

    println!("Process: {}", structure.name());
    println!("Entry:   {}", structure.entry());
    if let Some(end) = structure.end_name() {
        println!("End:     {}", end);
    }
    if let Some(starter) = structure.starter() {
        println!("Starter: {} ({})", starter.name, starter.activity_type);
    }

    println!("\nActivities ({}):", structure.activity_count());
    for activity in structure.activities().values() {
        println!("  {}  [{}]", activity.name, activity.activity_type);
        if let Some(info) = &activity.subprocess {
            for target in info.targets() {
                let kind = if info.spawn { "spawns" } else { "calls" };
                println!("    {} {}", kind, target);
            }
        }
    }

    if !structure.groups().is_empty() {
        println!("\nGroups:");
        for group in structure.groups().values() {
            print_group(group, 1);
        }
    }

    println!("\nTransitions:");
    for transition in structure.transitions().values().flatten() {
        match transition.label() {
            Some(label) => println!("  {} -> {}  ({})", transition.from, transition.to, label),
            None => println!("  {} -> {}", transition.from, transition.to),
        }
    }

    if !structure.catch_activities().is_empty() {
        println!("\nCatch handlers: {}", structure.catch_activities().join(", "));
    }

    Ok(())
}

fn print_group(group: &GroupNode, level: usize) {
    let indent = "  ".repeat(level);
    match &group.group_kind {
        Some(kind) => println!("{}{} [{}, {}]", indent, group.name, group.activity_type, kind),
        None => println!("{}{} [{}]", indent, group.name, group.activity_type),
    }
    for activity in group.activities().values() {
        println!("{}  - {}", indent, activity.name);
    }
    for nested in group.groups().values() {
        print_group(nested, level + 1);
    }
}

fn cmd_calls(project: &str, process: &str, depth: usize, json: bool) -> anyhow::Result<()> {
    let root = PathBuf::from(project).canonicalize()?;
    let tree = CallTreeBuilder::new(ProjectSource::new(&root))
        .with_max_depth(depth)
        .build(process)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
        return Ok(());
    }

    println!("Call tree ({}):\n", process);
    for node in tree.flatten() {
        let indent = "  ".repeat(node.depth);
        let mut flags = Vec::new();
        if node.spawn {
            flags.push("spawn");
        }
        if node.recursive {
            flags.push("recursive");
        }
        if node.unresolved {
            flags.push("unresolved");
        }
        if flags.is_empty() {
            println!("{}- {}", indent, node.name);
        } else {
            println!("{}- {} ({})", indent, node.name, flags.join(", "));
        }
    }

    Ok(())
}
