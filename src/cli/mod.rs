//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// AuraFin CLI - personal finance records, scoped to the signed-in identity
#[derive(Parser, Debug)]
#[command(name = "af", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.aurafin/data/aurafin.db)
    #[arg(long, global = true, env = "AURAFIN_DB")]
    pub db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign up, sign in and manage the session
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Query records of a table
    Query(QueryArgs),

    /// Insert a record (fields as a JSON object)
    Insert {
        /// Table name
        table: String,

        /// Fields as a JSON object
        data: String,
    },

    /// Merge fields into the first record where FIELD equals VALUE
    Update {
        /// Table name
        table: String,

        /// Field to match
        field: String,

        /// Value to match (JSON if it parses, otherwise a string)
        value: String,

        /// Fields to merge as a JSON object
        data: String,
    },

    /// Delete every record where FIELD equals VALUE
    Delete {
        /// Table name
        table: String,

        /// Field to match
        field: String,

        /// Value to match (JSON if it parses, otherwise a string)
        value: String,
    },

    /// Balance, totals, budget split and recent activity
    Dashboard {
        /// Ask the AI collaborator for a tip
        #[arg(long)]
        tip: bool,
    },

    /// List transactions with filters
    Transactions(TransactionArgs),

    /// Monthly expenses, split into fixed and variable
    Expenses {
        /// Month (YYYY-MM, default: current month)
        #[arg(short, long)]
        month: Option<String>,

        /// Tab to list (fixed, variable)
        #[arg(short, long, default_value = "fixed")]
        tab: String,
    },

    /// Income and expense totals per category
    Tax,

    /// Credit card invoices and purchases
    Card {
        #[command(subcommand)]
        command: CardCommands,
    },

    /// Receipt folders and scanning
    Receipt {
        #[command(subcommand)]
        command: ReceiptCommands,
    },

    /// AI tips, mentorship and insights
    Ai {
        #[command(subcommand)]
        command: AiCommands,
    },

    /// Messaging webhook handling
    Webhook {
        #[command(subcommand)]
        command: WebhookCommands,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Auth Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Create the profile for the configured identity and sign in
    SignUp {
        /// Email address
        email: String,

        /// Password
        #[arg(long, env = "AURAFIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign in as the configured identity
    SignIn {
        /// Email address
        email: String,

        /// Password
        #[arg(long, env = "AURAFIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out
    SignOut,

    /// Show the current session
    Status,

    /// Request a password reset email
    ResetPassword {
        /// Email address
        email: String,
    },

    /// Delete every record owned by the signed-in identity
    DeleteAccount {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

// ============================================================================
// Record Commands
// ============================================================================

#[derive(Args, Debug, Default)]
pub struct QueryArgs {
    /// Table name
    pub table: String,

    /// Equality filter FIELD=VALUE (repeatable)
    #[arg(long = "eq", value_name = "FIELD=VALUE")]
    pub filters: Vec<String>,

    /// Sort by field
    #[arg(long)]
    pub order: Option<String>,

    /// Sort descending
    #[arg(long, requires = "order")]
    pub desc: bool,

    /// Return exactly one record (error if none)
    #[arg(long)]
    pub single: bool,

    /// Maximum rows to print
    #[arg(short, long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub struct TransactionArgs {
    /// Case-insensitive search in the description
    #[arg(short = 's', long)]
    pub search: Option<String>,

    /// Filter by type (income, expense)
    #[arg(short = 't', long = "type")]
    pub kind: Option<String>,

    /// Filter by status (paid, pending)
    #[arg(long)]
    pub status: Option<String>,

    /// Filter by expense type (fixed, variable)
    #[arg(long)]
    pub sub_type: Option<String>,

    /// Filter by category
    #[arg(short, long)]
    pub category: Option<String>,

    /// Filter by payment method
    #[arg(short, long)]
    pub payment_method: Option<String>,

    /// Filter by date (YYYY-MM-DD)
    #[arg(short, long)]
    pub date: Option<String>,
}

// ============================================================================
// Card Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum CardCommands {
    /// Show a card's invoice for a month
    Invoice {
        /// Card ID
        card_id: String,

        /// Month (YYYY-MM, default: current month)
        #[arg(short, long)]
        month: Option<String>,
    },

    /// Record a purchase split into monthly installments
    Purchase {
        /// Card ID
        card_id: String,

        /// Description
        description: String,

        /// Total amount
        amount: f64,

        /// Number of installments
        #[arg(short = 'n', long, default_value_t = 1)]
        installments: u32,

        /// Purchase date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<String>,

        /// Category
        #[arg(short, long, default_value = "Geral")]
        category: String,
    },
}

// ============================================================================
// Receipt Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ReceiptCommands {
    /// Show receipts grouped by year and month
    Tree {
        /// Only list one folder (YYYY/MM)
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Scan, upload and record a receipt file
    Scan {
        /// File to scan
        file: PathBuf,

        /// MIME type (default: guessed from the extension)
        #[arg(long)]
        mime: Option<String>,
    },
}

// ============================================================================
// AI Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum AiCommands {
    /// Short tip for the current balance and expenses
    Tip,

    /// Strategic mentorship for debts, cards and investments
    Mentor,

    /// Investment options for an amount
    Invest {
        /// Amount to invest
        amount: f64,
    },

    /// Free-form insights over all transactions
    Insights,
}

// ============================================================================
// Webhook Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum WebhookCommands {
    /// Answer a subscription verification request
    Verify {
        /// hub.mode
        #[arg(long)]
        mode: Option<String>,

        /// hub.verify_token
        #[arg(long)]
        token: Option<String>,

        /// hub.challenge
        #[arg(long)]
        challenge: Option<String>,
    },

    /// Process an inbound payload (JSON file, or - for stdin)
    Ingest {
        /// Payload file
        payload: PathBuf,
    },
}
