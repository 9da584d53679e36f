use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use remold_core::{
    init_tracing, rules, CancelToken, Engine, EngineConfig, FileKind, SourceFile, SymbolTable,
    ToSource,
};

fn main() -> Result<()> {
    // Initialize logging
    init_tracing();

    let matches = Command::new("remold")
        .version(remold_core::VERSION)
        .about("Batch driver for the remold source-migration engine")
        .arg(
            Arg::new("files")
                .value_name("FILE")
                .help("Input files to migrate (*.build is treated as a build script)")
                .num_args(1..)
                .required_unless_present("list-rules"),
        )
        .arg(
            Arg::new("write")
                .long("write")
                .help("Rewrite changed files in place instead of printing them")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("emit-json")
                .long("emit-json")
                .help("Print per-file outcomes as JSON to stdout")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("jobs")
                .long("jobs")
                .short('j')
                .value_name("N")
                .help("Worker threads for the batch"),
        )
        .arg(
            Arg::new("list-rules")
                .long("list-rules")
                .help("List the rule catalog and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let rules = rules::default_rules();
    if matches.get_flag("list-rules") {
        for rule in &rules {
            println!("{}", rule.name());
        }
        return Ok(());
    }

    let mut config = EngineConfig::default();
    if let Some(jobs) = matches.get_one::<String>("jobs") {
        config.workers = jobs.parse().context("--jobs expects a number")?;
    }
    let engine = Engine::with_rules(rules, config);

    let paths: Vec<String> = matches
        .get_many::<String>("files")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let mut files = Vec::new();
    for path in &paths {
        let source = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        let file = SourceFile::parse(path.clone(), kind_for(path), &source, SymbolTable::new())
            .with_context(|| format!("parsing {path}"))?;
        files.push(file);
    }

    let results = engine.run_batch(files, &CancelToken::new());

    let mut changed = 0usize;
    for result in &results {
        if result.outcome.changed {
            changed += 1;
            let rendered = result.file.tree.to_source();
            if matches.get_flag("write") {
                fs::write(&result.file.path, rendered)
                    .with_context(|| format!("writing {}", result.file.path))?;
                tracing::info!(path = %result.file.path, "rewrote");
            } else {
                println!("// {}", result.file.path);
                print!("{rendered}");
            }
        }
        for diagnostic in &result.outcome.diagnostics {
            eprintln!(
                "{}: rule {} failed at {}: {}",
                result.file.path, diagnostic.rule, diagnostic.node, diagnostic.error
            );
        }
    }

    if matches.get_flag("emit-json") {
        let outcomes: Vec<_> = results
            .iter()
            .map(|result| {
                serde_json::json!({
                    "path": &result.file.path,
                    "changed": result.outcome.changed,
                    "cancelled": result.outcome.cancelled,
                    "diagnostics": &result.outcome.diagnostics,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    }

    tracing::info!(total = results.len(), changed, "batch finished");
    Ok(())
}

fn kind_for(path: &str) -> FileKind {
    match Path::new(path).extension().and_then(|ext| ext.to_str()) {
        Some("build") => FileKind::BuildScript,
        _ => FileKind::Source,
    }
}
