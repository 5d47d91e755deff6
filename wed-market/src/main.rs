use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use wed_auth::{AuthUser, MemoryIdentityProvider, SignInProvider};
use wed_market::telemetry::init_tracing;
use wed_market::{CandidateFile, MarketConfig, MarketServices, MemoryPreviews, SessionController};

const USAGE: &str = "usage: wed-market upload <paths...>";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("upload") => {}
        _ => bail!(USAGE),
    }
    let paths: Vec<String> = args.collect();
    if paths.is_empty() {
        bail!(USAGE);
    }

    let config = MarketConfig::from_env()?;
    let identity = MemoryIdentityProvider::new().with_account(
        SignInProvider::Google,
        AuthUser::new("dev-user").with_display_name("Local Developer"),
    );
    let services = MarketServices::connect(config, Arc::new(identity)).await;
    let session = SessionController::new(services, Arc::new(MemoryPreviews::new()));

    let user = session.sign_in(SignInProvider::Google).await?;
    if let Err(e) = session.apply_session(Some(user)).await {
        eprintln!("[wed-market] could not load stored photos: {e}");
    }

    let mut candidates = Vec::with_capacity(paths.len());
    for path in &paths {
        candidates.push(read_candidate(Path::new(path)).await?);
    }
    let accepted = session.add_files(candidates)?;
    println!("[wed-market] staged {} of {} file(s)", accepted.len(), paths.len());

    for (id, result) in session.upload_pending().await? {
        match result {
            Ok(outcome) => println!("[wed-market] {id}: {outcome:?}"),
            Err(e) => println!("[wed-market] {id}: failed: {e}"),
        }
    }

    for file in session.files() {
        println!(
            "{:<40} {:?} {}",
            file.name,
            file.upload_state(),
            file.url().as_str()
        );
    }

    Ok(())
}

async fn read_candidate(path: &Path) -> Result<CandidateFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let modified = tokio::fs::metadata(path)
        .await
        .and_then(|m| m.modified())
        .map(|t| DateTime::<Utc>::from(t).timestamp_millis())
        .unwrap_or_default();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let media_type = mime_guess::from_path(path).first_or_octet_stream().to_string();

    Ok(CandidateFile::new(name, media_type, modified, Bytes::from(bytes)))
}
