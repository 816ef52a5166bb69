use anyhow::Result;
use rdx_core::RulePattern;
use rdx_storage::{NewRule, Storage};

use crate::cli::RuleCommands;

pub async fn handle(cmd: RuleCommands, storage: &Storage) -> Result<()> {
    match cmd {
        RuleCommands::Add {
            document_type,
            document_id,
            subtype,
            tenant,
            pattern,
            replacement,
            priority,
            regex,
            case_sensitive,
            first_only,
        } => {
            let rule = RulePattern {
                pattern,
                replacement,
                priority,
                is_regex: regex,
                is_global: !first_only,
                case_sensitive,
            };
            let new_rule = NewRule {
                document_id,
                document_type,
                document_subtype: subtype,
                tenant_id: tenant,
                rule,
            };
            add(storage, new_rule).await
        }
        RuleCommands::List { document_type } => list(storage, document_type).await,
        RuleCommands::Remove { id } => remove(storage, id).await,
    }
}

async fn add(storage: &Storage, rule: NewRule) -> Result<()> {
    // Reject patterns that would only be skipped at redaction time
    rdx_security::compile_rule(&rule.rule)?;

    let id = storage.add_rule(&rule).await?;

    println!("✓ Added rule {}", id);
    println!("  Type: {}", rule.document_type);
    println!(
        "  Document: {}",
        rule.document_id.as_deref().unwrap_or("(all)")
    );
    println!("  Priority: {}", rule.rule.priority);

    Ok(())
}

async fn list(storage: &Storage, document_type: Option<String>) -> Result<()> {
    let rules = storage.list_rules(document_type.as_deref()).await?;

    if rules.is_empty() {
        println!("No rules found.");
        return Ok(());
    }

    println!("Rules:");
    for record in rules {
        let status = if record.is_active { "" } else { " (inactive)" };
        println!(
            "  [{}] {} / {} priority {}{}",
            record.id,
            record.document_type,
            record.document_id.as_deref().unwrap_or("*"),
            record.rule.priority,
            status
        );
        println!(
            "    {} {:?} -> {:?}",
            if record.rule.is_regex { "regex" } else { "literal" },
            record.rule.pattern,
            record.rule.replacement
        );
    }

    Ok(())
}

async fn remove(storage: &Storage, id: i64) -> Result<()> {
    storage.deactivate_rule(id).await?;
    println!("✓ Deactivated rule {}", id);
    Ok(())
}
