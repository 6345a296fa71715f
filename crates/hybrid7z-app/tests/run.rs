#![cfg(unix)]

use std::fs;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use hybrid7z_app::{AppError, Cli, run_app};
use hybrid7z_test_support::fake_archiver::{FakeArchiver, FakeArchiverBehaviour};
use hybrid7z_test_support::fixtures::{config_document, write_filter_file, write_tree};
use tempfile::TempDir;

const PHASES: &[(&str, bool)] = &[("PPMd", true), ("LZMA2", false)];

fn install(temp: &Path, behaviour: &FakeArchiverBehaviour) -> Result<FakeArchiver> {
    let fake = FakeArchiver::install(&temp.join("bin"), behaviour)?;
    let parameters = format!("{} a -t7z", fake.script().display());
    fs::write(
        temp.join("hybrid7z.toml"),
        config_document(&fake.executable(), &parameters, PHASES),
    )?;
    Ok(fake)
}

fn cli(temp: &Path, targets: &[&str]) -> Result<Cli> {
    let config = temp.join("hybrid7z.toml").display().to_string();
    let filters = temp.join("filters").display().to_string();
    let logs = temp.join("logs").display().to_string();
    let mut args = vec![
        "hybrid7z",
        "-y",
        "-c",
        config.as_str(),
        "-f",
        filters.as_str(),
        "-l",
        logs.as_str(),
    ];
    args.extend_from_slice(targets);
    Ok(Cli::try_parse_from(args)?)
}

#[tokio::test]
async fn successful_run_writes_summary_and_deletes_filter_lists() -> Result<()> {
    let temp = TempDir::new()?;
    let root = temp.path().join("album");
    write_tree(&root, &["a.txt", "b.raw"])?;
    let filters = temp.path().join("filters");
    write_filter_file(&filters, "PPMd", &["*.txt"])?;
    fs::write(filters.join("old.9.PPMd.lst"), "*.doc\n")?;
    let fake = install(temp.path(), &FakeArchiverBehaviour::default())?;
    let target = root.display().to_string();

    let status = run_app(&cli(temp.path(), &[&target])?).await?;

    assert!(!status.any_failed);
    assert_eq!(status.exit_code(), 0);
    assert_eq!(status.targets, 1);
    assert_eq!(fake.calls()?.len(), 2);
    assert!(!filters.join("old.9.PPMd.lst").exists());
    assert!(!filters.join("album.0.PPMd.lst").exists());
    assert!(filters.join("PPMd.txt").exists());
    assert_eq!(fs::metadata(temp.path().join("album.7z"))?.len(), 2);

    let summary_path = status
        .summary_path
        .ok_or_else(|| anyhow::anyhow!("summary not written"))?;
    assert_eq!(summary_path, temp.path().join("logs").join("run-summary.json"));
    let summary: serde_json::Value = serde_json::from_str(&fs::read_to_string(&summary_path)?)?;
    assert_eq!(summary["invocations"], 2);
    assert_eq!(summary["any_failed"], false);
    Ok(())
}

#[tokio::test]
async fn failed_invocation_still_deletes_filter_lists_and_reports_exit_code_one() -> Result<()> {
    let temp = TempDir::new()?;
    let root = temp.path().join("album");
    write_tree(&root, &["a.txt", "b.raw"])?;
    let filters = temp.path().join("filters");
    write_filter_file(&filters, "PPMd", &["*.txt"])?;
    let behaviour = FakeArchiverBehaviour {
        exit_code: 2,
        ..FakeArchiverBehaviour::default()
    };
    install(temp.path(), &behaviour)?;
    let target = root.display().to_string();

    let status = run_app(&cli(temp.path(), &[&target])?).await?;

    assert!(status.any_failed);
    assert_eq!(status.exit_code(), 1);
    assert!(!filters.join("album.0.PPMd.lst").exists());
    assert!(filters.join("PPMd.txt").exists());
    Ok(())
}

#[tokio::test]
async fn batch_file_targets_follow_command_line_targets() -> Result<()> {
    let temp = TempDir::new()?;
    let first = temp.path().join("first");
    let second = temp.path().join("second");
    write_tree(&first, &["a.raw"])?;
    write_tree(&second, &["b.raw"])?;
    fs::create_dir_all(temp.path().join("filters"))?;
    fs::create_dir_all(temp.path().join("packed"))?;
    let fake = install(temp.path(), &FakeArchiverBehaviour::default())?;
    let batch = temp.path().join("batch.txt");
    fs::write(
        &batch,
        format!("\n{}|packed/second.7z\n\n", second.display()),
    )?;
    let first_arg = first.display().to_string();
    let batch_arg = batch.display().to_string();

    let status = run_app(&cli(temp.path(), &[&first_arg, "-b", &batch_arg])?).await?;

    assert_eq!(status.targets, 2);
    let calls = fake.calls()?;
    assert_eq!(calls.len(), 2);
    assert!(calls[0].ends_with(&format!("{} *", temp.path().join("first.7z").display())));
    assert!(calls[1].ends_with(&format!("{} *", temp.path().join("packed/second.7z").display())));
    assert!(temp.path().join("packed/second.7z").exists());
    Ok(())
}

#[tokio::test]
async fn missing_targets_abort_without_running() -> Result<()> {
    let temp = TempDir::new()?;
    let fake = install(temp.path(), &FakeArchiverBehaviour::default())?;
    let file = temp.path().join("plain.txt");
    fs::write(&file, "not a folder")?;
    let file_arg = file.display().to_string();

    let result = run_app(&cli(temp.path(), &["/definitely/missing", &file_arg])?).await;

    assert!(matches!(result, Err(AppError::NoTargets { rejected: 2 })));
    assert!(fake.calls()?.is_empty());
    Ok(())
}

#[tokio::test]
async fn broken_config_is_backed_up_and_replaced_by_default() -> Result<()> {
    let temp = TempDir::new()?;
    let config = temp.path().join("hybrid7z.toml");
    fs::write(&config, "[archiver\nexecutable = ")?;

    let result = run_app(&cli(temp.path(), &["/definitely/missing"])?).await;

    assert!(matches!(result, Err(AppError::NoTargets { .. })));
    assert_eq!(
        fs::read_to_string(temp.path().join("hybrid7z.toml.bak"))?,
        "[archiver\nexecutable = "
    );
    assert_eq!(fs::read_to_string(&config)?, hybrid7z_config::DEFAULT_CONFIG);
    Ok(())
}
