use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Local;
use docqa_core::{AskResponse, DocItem, DocStatus, Health, LogEntry, QaItem, RemoteDocument};
use docqa_engine::{ensure_output_dir, AskOutcome, DeleteOutcome, LocalFile, SubmitOutcome};
use docqa_logging::docqa_info;
use log::LevelFilter;

use crate::config::AppConfig;
use crate::session::Session;
use crate::{logging, shell, Cli, Command};

pub async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(base) = cli.api_base {
        config.api_base = base;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    ensure_output_dir(&config.data_dir)
        .with_context(|| format!("unusable data dir {}", config.data_dir.display()))?;

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    logging::initialize(cli.log, level, &config.data_dir);
    docqa_info!(
        "docqa {} using service at {}",
        env!("CARGO_PKG_VERSION"),
        config.api_base
    );

    let session = Session::open(&config)?;
    match cli.command {
        Command::Health => {
            let status = session.health.probe().await;
            println!("service is {}", health_label(status));
        }
        Command::Watch => watch(&session).await?,
        Command::Docs => {
            session.registry.activate().await;
            if let Some(error) = session.registry.error() {
                bail!("could not list documents: {error}");
            }
            print_documents(&session.registry.documents(), &session.registry.selected());
        }
        Command::Ingest { paths } => {
            let mut files = Vec::with_capacity(paths.len());
            for path in &paths {
                let file = LocalFile::read(path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                files.push(file);
            }
            let outcome = session.ingest.submit_files(files).await;
            while session.ingest.pending_timers() > 0 {
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
            print_uploads(&session.ingest.docs());
            print_logs(&session.ingest.logs());
            if let SubmitOutcome::Failed { message, .. } = outcome {
                bail!("ingest failed: {message}");
            }
        }
        Command::Ask {
            question,
            top_k,
            docs,
        } => {
            let top_k = top_k.unwrap_or(session.top_k);
            match session.qa.ask(&question, top_k, &docs).await {
                AskOutcome::Skipped => bail!("question is empty"),
                AskOutcome::Answered | AskOutcome::Failed { .. } => {
                    if let Some(answer) = session.qa.answer() {
                        print_answer(&answer);
                    }
                }
            }
        }
        Command::Delete { filename } => match session.registry.delete_document(&filename).await {
            DeleteOutcome::Deleted { filename } => println!("deleted {filename}"),
            DeleteOutcome::Failed { filename, message } => {
                bail!("failed to delete {filename}: {message}")
            }
            DeleteOutcome::Skipped => {}
        },
        Command::History => print_history(&session.qa.history()),
        Command::Shell => shell::run(&session).await?,
    }
    Ok(())
}

async fn watch(session: &Session) -> Result<()> {
    session.health.activate();
    let mut last = session.health.status();
    println!("service is {}", health_label(last));
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                let status = session.health.status();
                if status != last {
                    println!("service is {}", health_label(status));
                    last = status;
                }
            }
        }
    }
    session.health.deactivate();
    Ok(())
}

pub fn health_label(status: Health) -> &'static str {
    match status {
        Health::Up => "up",
        Health::Down => "down",
        Health::Unknown => "unknown",
    }
}

pub fn status_label(status: DocStatus) -> &'static str {
    match status {
        DocStatus::Queued => "Queued",
        DocStatus::Parsing => "Parsing",
        DocStatus::Chunked => "Chunked",
        DocStatus::Embedded => "Embedded",
        DocStatus::Error => "Error",
    }
}

pub fn print_documents(documents: &[RemoteDocument], selected: &[String]) {
    if documents.is_empty() {
        println!("no documents");
        return;
    }
    for doc in documents {
        let mark = if selected.contains(&doc.filename) { "*" } else { " " };
        println!(
            "{mark} {}  ({} chunks, uploaded {})",
            doc.filename, doc.chunks, doc.upload_time
        );
    }
}

pub fn print_uploads(docs: &[DocItem]) {
    if docs.is_empty() {
        println!("no uploads");
        return;
    }
    for doc in docs {
        match &doc.error {
            Some(error) => println!(
                "#{} {} ({} bytes): {} - {error}",
                doc.id,
                doc.name,
                doc.size,
                status_label(doc.status)
            ),
            None => println!(
                "#{} {} ({} bytes): {}",
                doc.id,
                doc.name,
                doc.size,
                status_label(doc.status)
            ),
        }
    }
}

pub fn print_logs(logs: &[LogEntry]) {
    for entry in logs {
        println!("  {}", log_line(entry));
    }
}

/// Local wall-clock time, then the activity text.
pub fn log_line(entry: &LogEntry) -> String {
    format!(
        "{} \u{2022} {}",
        entry.time.with_timezone(&Local).format("%H:%M:%S"),
        entry.text
    )
}

pub fn print_answer(answer: &AskResponse) {
    println!("{}", answer.answer);
    if let Some(confidence) = answer.confidence {
        println!("\nconfidence: {confidence:?}");
    }
    if let Some(tokens) = answer.context_tokens {
        println!("context tokens: {tokens}");
    }
    if let Some(citations) = answer.citations.as_ref().filter(|c| !c.is_empty()) {
        println!("sources:");
        for citation in citations {
            match citation.page {
                Some(page) => println!("  - {} p.{page}", citation.source),
                None => println!("  - {}", citation.source),
            }
        }
    }
}

pub fn print_history(items: &[QaItem]) {
    if items.is_empty() {
        println!("no history");
        return;
    }
    for item in items {
        println!("[{}] Q: {}", item.time.format("%Y-%m-%d %H:%M"), item.question);
        println!("    A: {}", item.answer.lines().next().unwrap_or_default());
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn log_line_puts_local_time_before_text() {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 15).unwrap();
        let line = log_line(&LogEntry {
            time,
            text: "Ingested 2 file(s).".to_string(),
        });

        let clock = time.with_timezone(&Local).format("%H:%M:%S").to_string();
        assert_eq!(line, format!("{clock} \u{2022} Ingested 2 file(s)."));
    }
}
