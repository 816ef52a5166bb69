use anyhow::{Context, Result};
use rdx_config::Config;
use rdx_core::{DocumentRef, RedactedContent, RedactionRequest, Requester};
use rdx_storage::Storage;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::cli::RedactArgs;
use crate::commands::build_redactor;

pub async fn handle(args: RedactArgs, config: &Config, storage: &Storage) -> Result<()> {
    let content = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let content_type = args
        .content_type
        .unwrap_or_else(|| infer_content_type(&args.file).to_string());

    let mut document = DocumentRef::new(args.document_id, args.document_type);
    document.version_id = args.version;
    document.document_subtype = args.subtype;
    document.tenant_id = args.tenant;

    let fields = if args.fields.is_empty() {
        config.redaction.sensitive_fields.clone()
    } else {
        args.fields
    };

    let requester = Requester {
        token_id: args.requester,
        ip: None,
        user_agent: Some(format!("rdx-cli/{}", env!("CARGO_PKG_VERSION"))),
    };

    let redactor = build_redactor(config, storage);
    let request = RedactionRequest::new(document, content_type, content)
        .with_sensitive_fields(fields)
        .with_requester(requester);
    let result = redactor.redact(request).await;

    if let Some(warning) = &result.warning {
        eprintln!("⚠ {}", warning);
    }

    let bytes = match result.content {
        RedactedContent::Structured(value) => serde_json::to_vec_pretty(&value)?,
        other => other.into_bytes(),
    };
    write_output(args.output.as_deref(), &bytes).await?;

    eprintln!("✓ Redacted {}", args.file.display());
    eprintln!("  Output type: {}", result.content_type);
    eprintln!("  Patterns applied: {}", result.patterns_applied);
    eprintln!("  Matches found: {}", result.matches_found);
    eprintln!("  Time: {}ms", result.execution_time_ms);

    Ok(())
}

pub async fn entities(
    file: PathBuf,
    output: Option<PathBuf>,
    config: &Config,
    storage: &Storage,
) -> Result<()> {
    let content = tokio::fs::read(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let text = String::from_utf8_lossy(&content);

    let redacted = build_redactor(config, storage).redact_entities(&text);
    write_output(output.as_deref(), redacted.as_bytes()).await
}

async fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            tokio::fs::write(path, bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(bytes).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}

/// Guess a MIME type from the file extension
pub fn infer_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("txt" | "md" | "csv" | "log") => "text/plain",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}
