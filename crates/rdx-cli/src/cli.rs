use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rdx")]
#[command(about = "Rule-driven document redaction", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Redact a document with its configured rules
    Redact(RedactArgs),

    /// Redact people, organizations and places (best-effort heuristic)
    Entities {
        /// Text file to redact
        file: PathBuf,

        /// Write the result here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Manage redaction rules
    #[command(subcommand)]
    Rules(RuleCommands),

    /// Start the HTTP redaction service
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Args)]
pub struct RedactArgs {
    /// Document to redact
    pub file: PathBuf,

    #[arg(long)]
    pub document_id: String,

    /// Document type (e.g. 510k, cer)
    #[arg(long)]
    pub document_type: String,

    #[arg(long)]
    pub subtype: Option<String>,

    #[arg(long)]
    pub tenant: Option<String>,

    /// Document version recorded in the audit trail
    #[arg(long = "version-id")]
    pub version: Option<String>,

    /// MIME type (inferred from the file extension if omitted)
    #[arg(long)]
    pub content_type: Option<String>,

    /// JSON field to black out entirely (repeatable; default from config)
    #[arg(long = "field")]
    pub fields: Vec<String>,

    /// Requester token recorded in the audit trail
    #[arg(long, env = "RDX_REQUESTER_TOKEN")]
    pub requester: Option<String>,

    /// Write the result here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum RuleCommands {
    /// Add a rule
    Add {
        /// Document type the rule belongs to
        #[arg(long)]
        document_type: String,

        /// Limit to one document (default: every document of the type)
        #[arg(long)]
        document_id: Option<String>,

        #[arg(long)]
        subtype: Option<String>,

        #[arg(long)]
        tenant: Option<String>,

        /// Literal text, or a regex with --regex
        pattern: String,

        /// Replacement text
        replacement: String,

        /// Lower runs first
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        priority: i64,

        #[arg(long)]
        regex: bool,

        #[arg(long)]
        case_sensitive: bool,

        /// Replace only the first match
        #[arg(long)]
        first_only: bool,
    },

    /// List rules
    List {
        #[arg(long)]
        document_type: Option<String>,
    },

    /// Deactivate a rule
    Remove {
        /// Rule ID
        id: i64,
    },
}
