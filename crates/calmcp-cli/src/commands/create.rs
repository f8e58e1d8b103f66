use clap::Args;
use serde_json::json;

use calmcp_core::workflow::{CreateEventOutcome, CreateEventWorkflow};
use calmcp_core::Config;

use super::event_args::EventArgs;

/// Exit code when a write is refused as a duplicate.
const EXIT_BLOCKED: i32 = 2;

#[derive(Args)]
pub struct CreateArgs {
    #[command(flatten)]
    pub event: EventArgs,
    #[arg(long)]
    pub description: Option<String>,
    /// Attendee email (repeatable)
    #[arg(long = "attendee")]
    pub attendees: Vec<String>,
    /// Create even when a near-identical event exists
    #[arg(long)]
    pub allow_duplicates: bool,
    /// Similarity above which creation is refused (0-1)
    #[arg(long)]
    pub block_threshold: Option<f64>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: CreateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let mut request = args.event.request(&config)?;
    request.description = args.description;
    request.attendees = args.attendees;
    request.block_threshold = args.block_threshold;
    if args.allow_duplicates {
        request.block_on_high_similarity = Some(false);
    }

    let auth = super::access_token().await?;
    let workflow = CreateEventWorkflow::from_config(super::calendar_source(&config), &config)?;
    let outcome = workflow.create(&auth, &request).await?;

    if args.json {
        let value = match &outcome {
            CreateEventOutcome::Created { event, scan, .. } => json!({
                "status": "created",
                "event": event,
                "warnings": scan,
            }),
            CreateEventOutcome::Blocked { explanation, text } => json!({
                "status": "blocked",
                "duplicate": explanation.duplicate,
                "blockThreshold": explanation.block_threshold,
                "message": text,
            }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{}", outcome.text());
    }

    if !outcome.is_created() {
        std::process::exit(EXIT_BLOCKED);
    }
    Ok(())
}
