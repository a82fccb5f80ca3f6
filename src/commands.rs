use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::export::{self, ExportFormat};
use crate::job::{JobStatus, SegmentPatch, TranscriptionJob};
use crate::services::llm::LlmClient;
use crate::services::oembed::OEmbedResolver;
use crate::services::{MetadataResolver, Services, Unconfigured};
use crate::session::{RefineOutcome, Session, SubmitOutcome};
use crate::store::RecordStore;

/// Collaborators backed by the configured oEmbed endpoint and LLM deployment.
/// Fails if the LLM is not configured; a bad metadata endpoint only disables
/// lookups.
pub fn build_services(config: &Config) -> Result<Services> {
    let llm = Arc::new(LlmClient::from_config(&config.llm)?);
    let metadata: Arc<dyn MetadataResolver> = match OEmbedResolver::from_config(&config.metadata) {
        Ok(resolver) => Arc::new(resolver),
        Err(e) => {
            tracing::warn!("{:#}; continuing without metadata lookups", e);
            Arc::new(Unconfigured::new(format!("{:#}", e)))
        }
    };
    Ok(Services {
        metadata,
        generator: llm.clone(),
        rewriter: llm,
    })
}

/// Collaborators for commands that never call out.
fn offline_services() -> Services {
    let offline = Arc::new(Unconfigured::new("not available to this command"));
    Services {
        metadata: offline.clone(),
        generator: offline.clone(),
        rewriter: offline,
    }
}

fn open_session(config: &Config, services: Services) -> Arc<Session> {
    let store = RecordStore::new(&config.storage.directory);
    Arc::new(
        Session::restore(services, store)
            .with_notification_duration(Duration::from_secs(config.notifications.display_secs)),
    )
}

fn open_saved(session: &Session, job_id: &str) -> Result<TranscriptionJob> {
    session
        .open(job_id)
        .with_context(|| format!("No saved project with id {}", job_id))
}

fn notification_message(session: &Session) -> Option<String> {
    session.notification().map(|n| n.message)
}

fn print_notification(session: &Session) {
    if let Some(message) = notification_message(session) {
        println!("{}", message);
    }
}

fn print_job(job: &TranscriptionJob) {
    println!("Job {} [{}]", job.id(), job.status());
    if let Some(video) = job.video() {
        println!("  Title:   {}", video.title);
        println!("  Author:  {}", video.author);
        println!("  URL:     {}", video.url);
    }
    println!("  Created: {}", format_timestamp(job.created_at()));
    if let Some(summary) = job.summary() {
        println!();
        println!("Summary:");
        println!("  {}", summary);
    }
    if !job.segments().is_empty() {
        println!();
        println!("Segments:");
        for segment in job.segments() {
            println!(
                "  {:>4}  [{}] {}: {}",
                segment.id, segment.start_time, segment.speaker, segment.text
            );
        }
    }
}

fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| {
            t.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Submit a video link and wait for the job to finish.
pub async fn transcribe(
    config: &Config,
    url: &str,
    export_format: Option<ExportFormat>,
    output: Option<&Path>,
) -> Result<()> {
    let session = open_session(config, build_services(config)?);

    let handle = match session.submit(url) {
        SubmitOutcome::Started { job_id, handle } => {
            println!("Processing {} (job {})...", url, job_id);
            handle
        }
        SubmitOutcome::Rejected => anyhow::bail!(
            "{}",
            notification_message(&session).unwrap_or_else(|| format!("Invalid link: {}", url))
        ),
        SubmitOutcome::Ignored => anyhow::bail!("No video URL given"),
    };
    let status = handle.await.context("Transcription task failed")?;

    let job = session
        .current_job()
        .context("Job disappeared before completion")?;
    print_job(&job);

    if status == JobStatus::Error {
        anyhow::bail!(
            "{}",
            notification_message(&session).unwrap_or_else(|| "Transcription failed".to_string())
        );
    }

    if let Some(format) = export_format {
        let cwd = std::env::current_dir()?;
        let path = export::write_export(&job, format, output, &cwd)?;
        println!();
        println!("Exported to {}", path.display());
    }

    if session.user().is_none() {
        println!();
        println!("Not signed in: this transcript was not saved. Run `tubescribe login` to keep future transcripts.");
    }
    Ok(())
}

pub fn history_list(config: &Config) -> Result<()> {
    let session = open_session(config, offline_services());
    let saved = session.history();
    if saved.is_empty() {
        println!("No saved projects.");
        return Ok(());
    }
    for job in &saved {
        println!(
            "{}  {}  {:>3} segments  {}",
            job.id(),
            format_timestamp(job.created_at()),
            job.segments().len(),
            job.title().unwrap_or("(untitled)")
        );
    }
    Ok(())
}

pub fn history_show(config: &Config, job_id: &str) -> Result<()> {
    let session = open_session(config, offline_services());
    print_job(&open_saved(&session, job_id)?);
    Ok(())
}

pub fn history_delete(config: &Config, job_id: &str) -> Result<()> {
    let session = open_session(config, offline_services());
    if !session.delete(job_id) {
        anyhow::bail!("No saved project with id {}", job_id);
    }
    print_notification(&session);
    Ok(())
}

pub fn edit(
    config: &Config,
    job_id: &str,
    segment_id: &str,
    speaker: Option<String>,
    text: Option<String>,
) -> Result<()> {
    let patch = SegmentPatch { speaker, text };
    if patch.is_empty() {
        anyhow::bail!("Nothing to change: pass --speaker and/or --text");
    }

    let session = open_session(config, offline_services());
    let job = open_saved(&session, job_id)?;
    if job.segment(segment_id).is_none() {
        anyhow::bail!("Job {} has no segment {}", job_id, segment_id);
    }

    let updated = session
        .update_segment(segment_id, &patch)
        .context("No live job to edit")?;
    if let Some(segment) = updated.segment(segment_id) {
        println!("[{}] {}: {}", segment.start_time, segment.speaker, segment.text);
    }
    Ok(())
}

pub async fn refine(config: &Config, job_id: &str, segment_id: &str) -> Result<()> {
    let session = open_session(config, build_services(config)?);
    let job = open_saved(&session, job_id)?;
    if let Some(segment) = job.segment(segment_id) {
        println!("Before: {}", segment.text);
    }

    match session.refine(segment_id).await {
        RefineOutcome::Refined(text) => {
            println!("After:  {}", text);
            print_notification(&session);
            Ok(())
        }
        RefineOutcome::Failed => anyhow::bail!(
            "{}",
            notification_message(&session).unwrap_or_else(|| "Refining failed".to_string())
        ),
        RefineOutcome::Busy(in_flight) => anyhow::bail!(
            "Segment {} of job {} is already being refined",
            in_flight.segment_id,
            in_flight.job_id
        ),
        RefineOutcome::Ignored => anyhow::bail!(
            "Job {} has no segment {} or is not completed",
            job_id,
            segment_id
        ),
    }
}

pub fn export(
    config: &Config,
    job_id: &str,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<()> {
    let session = open_session(config, offline_services());
    let job = open_saved(&session, job_id)?;
    match output {
        Some(path) => {
            let cwd = std::env::current_dir()?;
            let written = export::write_export(&job, format, Some(path), &cwd)?;
            println!("Exported to {}", written.display());
        }
        None => println!("{}", export::render(&job, format)),
    }
    Ok(())
}

pub fn login(config: &Config, name: &str, email: &str) -> Result<()> {
    let session = open_session(config, offline_services());
    session.sign_in(name, email);
    print_notification(&session);
    Ok(())
}

pub fn logout(config: &Config) -> Result<()> {
    let session = open_session(config, offline_services());
    session.sign_out();
    print_notification(&session);
    Ok(())
}

pub fn whoami(config: &Config) -> Result<()> {
    let session = open_session(config, offline_services());
    match session.user() {
        Some(user) => {
            println!("{} <{}>", user.name, user.email);
            println!("  Avatar: {}", user.avatar);
        }
        None => println!("Not signed in."),
    }
    Ok(())
}

/// Write a commented default config. Refuses to overwrite an existing file.
pub fn init_config(output: Option<PathBuf>) -> Result<()> {
    let path = match output {
        Some(path) => path,
        None => Config::default_path().context("Could not determine config directory")?,
    };
    if path.exists() {
        anyhow::bail!("Config file already exists: {}", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, Config::generate_default_commented())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::identity::IdentityStore;
    use crate::job::fixtures::completed_job;
    use crate::store::HISTORY_RECORD;
    use tempfile::TempDir;

    fn config_in(tmp: &TempDir) -> Config {
        Config {
            storage: StorageConfig {
                directory: tmp.path().to_path_buf(),
            },
            ..Default::default()
        }
    }

    fn seed_history(tmp: &TempDir) {
        RecordStore::new(tmp.path())
            .save(HISTORY_RECORD, &vec![completed_job("job1")])
            .unwrap();
    }

    fn saved(tmp: &TempDir) -> Vec<TranscriptionJob> {
        RecordStore::new(tmp.path())
            .load(HISTORY_RECORD)
            .unwrap()
            .unwrap_or_default()
    }

    #[test]
    fn test_login_logout_persist_identity() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);

        login(&config, "Jane Cooper", "").unwrap();
        let user = IdentityStore::new(RecordStore::new(tmp.path())).load().unwrap();
        assert_eq!(user.name, "Jane Cooper");
        whoami(&config).unwrap();

        logout(&config).unwrap();
        assert!(IdentityStore::new(RecordStore::new(tmp.path())).load().is_none());
        whoami(&config).unwrap();
    }

    #[test]
    fn test_history_commands() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);
        history_list(&config).unwrap();

        seed_history(&tmp);
        history_list(&config).unwrap();
        history_show(&config, "job1").unwrap();
        assert!(history_show(&config, "missing").is_err());

        history_delete(&config, "job1").unwrap();
        assert!(saved(&tmp).is_empty());
        assert!(history_delete(&config, "job1").is_err());
    }

    #[test]
    fn test_edit_syncs_saved_job() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);
        seed_history(&tmp);

        edit(&config, "job1", "B", Some("Guest".to_string()), None).unwrap();
        let job = &saved(&tmp)[0];
        assert_eq!(job.segment("B").unwrap().speaker, "Guest");
        assert_eq!(job.segment("B").unwrap().text, "world");
        assert_eq!(job.segment("A").unwrap().speaker, "Host");
    }

    #[test]
    fn test_edit_rejects_empty_patch_and_unknown_segment() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);
        seed_history(&tmp);

        assert!(edit(&config, "job1", "B", None, None).is_err());
        assert!(edit(&config, "job1", "Z", None, Some("x".to_string())).is_err());
        assert!(edit(&config, "nope", "B", None, Some("x".to_string())).is_err());
        assert_eq!(saved(&tmp)[0], completed_job("job1"));
    }

    #[test]
    fn test_export_to_file() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);
        seed_history(&tmp);

        let out = tmp.path().join("out.md");
        export(&config, "job1", ExportFormat::Md, Some(&out)).unwrap();
        let content = std::fs::read_to_string(&out).unwrap();
        assert!(content.starts_with("# Never Gonna Give You Up"));
    }

    #[tokio::test]
    async fn test_transcribe_requires_llm_config() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);
        let err = transcribe(&config, "https://youtu.be/dQw4w9WgXcQ", None, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("endpoint"));
    }

    #[test]
    fn test_init_config_writes_and_refuses_overwrite() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("conf").join("tubescribe.toml");
        init_config(Some(path.clone())).unwrap();

        let config: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.notifications.display_secs, 4);
        assert!(init_config(Some(path)).is_err());
    }
}
