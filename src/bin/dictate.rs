//! Minimal dictation walkthrough: record from the default microphone
//! until Enter is pressed, transcribe with fallback, compile the note,
//! and print it.
//!
//! Usage: dictate [native|web] [user-id]

use std::io::BufRead;

use anyhow::{Context, Result};

use chartscribe::{AppContext, Platform, Recorder};

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let platform = match args.next().as_deref() {
        Some("web") => Platform::Web,
        Some("native") | None => Platform::Native,
        Some(other) => anyhow::bail!("unknown platform '{}', expected native or web", other),
    };
    let user_id = args.next().unwrap_or_else(|| "local-clinician".to_string());

    let context = AppContext::initialize(platform).context("failed to initialize")?;

    context
        .recorder()
        .start()
        .await
        .context("failed to start recording")?;
    println!("Recording... press Enter to stop.");

    let stdin = std::io::stdin();
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;

    let note = context
        .finish_dictation(&user_id)
        .await
        .context("dictation failed")?;

    println!("--- note {} ---", note.id);
    if let Some(procedure) = &note.procedure_type {
        println!("procedure: {}", procedure);
    }
    if !note.tags.is_empty() {
        println!("tags: {}", note.tags.join(", "));
    }
    println!("{}", note.content);

    Ok(())
}
