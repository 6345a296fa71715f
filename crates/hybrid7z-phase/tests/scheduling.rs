mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hybrid7z_config::Hybrid7zConfig;
use hybrid7z_phase::{
    FilterCatalog, FilterPartitioner, Hybrid7zPipeline, InvocationContext, Lane, PhaseScheduler,
    Target,
};
use hybrid7z_test_support::fixtures::{config_document, write_filter_file, write_tree};
use tempfile::TempDir;

use common::{Event, RecordingArchiver, phases};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_lane_drains_before_exclusive_lane() -> Result<()> {
    let temp = TempDir::new()?;
    let filters = temp.path().join("filters");
    let first = temp.path().join("first");
    let second = temp.path().join("second");
    write_tree(&first, &["a.txt", "b.exe"])?;
    write_tree(&second, &["c.txt", "d.exe"])?;
    write_filter_file(&filters, "Text", &["*.txt"])?;
    let phases = phases(&[
        ("Text", Lane::EmbarrassinglyParallel),
        ("Rest", Lane::ExclusiveResource),
    ]);
    let targets = vec![
        Target::new(&first, false, None, None),
        Target::new(&second, false, None, None),
    ];
    let loaded = FilterCatalog::new(&filters).load_all(&phases).await;
    let table = FilterPartitioner::new(phases.clone(), loaded, &filters)
        .partition(&targets)
        .await;
    let archiver = Arc::new(RecordingArchiver::new(Duration::from_millis(30)));

    let summary = PhaseScheduler::new(&phases, archiver.clone())
        .run(&targets, &table, &InvocationContext::default())
        .await;

    let events = archiver.events();
    assert_eq!(events.len(), 8);
    let last_parallel_finish = events
        .iter()
        .rposition(|event| matches!(event, Event::Finished { phase, .. } if phase == "Text"))
        .ok_or_else(|| anyhow::anyhow!("no parallel finish"))?;
    let first_exclusive_start = events
        .iter()
        .position(|event| matches!(event, Event::Started { phase, .. } if phase == "Rest"))
        .ok_or_else(|| anyhow::anyhow!("no exclusive start"))?;
    assert!(last_parallel_finish < first_exclusive_start);

    let parallel_starts = events
        .iter()
        .take(2)
        .filter(|event| matches!(event, Event::Started { phase, .. } if phase == "Text"))
        .count();
    assert_eq!(parallel_starts, 2, "parallel invocations overlap");

    assert_eq!(
        &events[4..],
        [
            Event::Started { phase: "Rest".to_string(), target: 0 },
            Event::Finished { phase: "Rest".to_string(), target: 0 },
            Event::Started { phase: "Rest".to_string(), target: 1 },
            Event::Finished { phase: "Rest".to_string(), target: 1 },
        ]
    );
    assert_eq!(summary.invocations, 4);
    Ok(())
}

#[tokio::test]
async fn exclusive_lane_keeps_declared_order_per_target() -> Result<()> {
    let temp = TempDir::new()?;
    let filters = temp.path().join("filters");
    let root = temp.path().join("album");
    write_tree(&root, &["a.exe", "b.raw"])?;
    write_filter_file(&filters, "X86", &["*.exe"])?;
    let phases = phases(&[
        ("X86", Lane::ExclusiveResource),
        ("Rest", Lane::ExclusiveResource),
    ]);
    let targets = vec![Target::new(&root, false, None, None)];
    let loaded = FilterCatalog::new(&filters).load_all(&phases).await;
    let table = FilterPartitioner::new(phases.clone(), loaded, &filters)
        .partition(&targets)
        .await;
    let archiver = Arc::new(RecordingArchiver::new(Duration::from_millis(5)));

    PhaseScheduler::new(&phases, archiver.clone())
        .run(&targets, &table, &InvocationContext::default())
        .await;

    let order: Vec<String> = archiver
        .invocations()
        .into_iter()
        .map(|invocation| invocation.phase)
        .collect();
    assert_eq!(order, vec!["X86", "Rest"]);
    let terminal = &archiver.invocations_of("Rest")[0];
    let excluded: Vec<&String> = terminal
        .arguments
        .iter()
        .filter(|argument| argument.starts_with("-xr@"))
        .collect();
    assert_eq!(excluded.len(), 1);
    assert!(excluded[0].ends_with("album.0.X86.lst"));
    Ok(())
}

#[tokio::test]
async fn failures_do_not_cancel_siblings() -> Result<()> {
    let temp = TempDir::new()?;
    let filters = temp.path().join("filters");
    let first = temp.path().join("first");
    let second = temp.path().join("second");
    write_tree(&first, &["a.txt", "b.raw"])?;
    write_tree(&second, &["c.txt", "d.raw"])?;
    write_filter_file(&filters, "Text", &["*.txt"])?;
    let phases = phases(&[
        ("Text", Lane::EmbarrassinglyParallel),
        ("Rest", Lane::ExclusiveResource),
    ]);
    let targets = vec![
        Target::new(&first, false, None, None),
        Target::new(&second, false, None, None),
    ];
    let loaded = FilterCatalog::new(&filters).load_all(&phases).await;
    let table = FilterPartitioner::new(phases.clone(), loaded, &filters)
        .partition(&targets)
        .await;
    let archiver = Arc::new(RecordingArchiver::new(Duration::ZERO).failing("Text"));

    let summary = PhaseScheduler::new(&phases, archiver.clone())
        .run(&targets, &table, &InvocationContext::default())
        .await;

    assert_eq!(archiver.invocations().len(), 4);
    assert!(summary.any_failed);
    assert_eq!(summary.failures.len(), 2);
    assert!(summary.failures.iter().all(|failure| failure.phase == "Text"));
    assert_eq!(summary.ratios.len(), 2);
    Ok(())
}

#[tokio::test]
async fn relative_filter_folder_lists_resolve_from_archiver_directory() -> Result<()> {
    let temp = tempfile::Builder::new()
        .prefix("relative-folders")
        .tempdir_in(".")?;
    let base = PathBuf::from(temp.path().file_name().context("temp folder name")?);
    let filters = base.join("filters");
    assert!(filters.is_relative());
    let root = std::path::absolute(base.join("album"))?;
    write_tree(&root, &["a.txt", "b.raw"])?;
    write_filter_file(&filters, "Text", &["*.txt"])?;
    fs::write(filters.join("Exclude.txt"), "Thumbs.db\n")?;
    let document = config_document(Path::new("7z"), "a -t7z", &[("Text", true), ("Rest", false)]);
    let config = Hybrid7zConfig::from_toml_str(&document, Path::new("test.toml"))?;
    let archiver = Arc::new(RecordingArchiver::new(Duration::ZERO));
    let pipeline = Hybrid7zPipeline::new(config, &filters, base.join("logs"))
        .with_archiver(archiver.clone());

    pipeline.run(&[Target::new(&root, false, None, None)]).await;

    let invocations = archiver.invocations();
    assert_eq!(invocations.len(), 2);
    let mut list_arguments = 0;
    for invocation in &invocations {
        for argument in &invocation.arguments {
            let Some(list) = argument
                .strip_prefix("-ir@")
                .or_else(|| argument.strip_prefix("-xr@"))
            else {
                continue;
            };
            list_arguments += 1;
            assert!(Path::new(list).is_absolute(), "{list} is relative");
            assert!(
                invocation.working_directory.join(list).is_file(),
                "{list} unreachable from {}",
                invocation.working_directory.display()
            );
        }
    }
    assert_eq!(list_arguments, 4);
    Ok(())
}
