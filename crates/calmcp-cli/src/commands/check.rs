use clap::Args;

use calmcp_core::conflict::format_conflict_warnings;
use calmcp_core::workflow::CreateEventWorkflow;
use calmcp_core::{ConflictCheckResult, Config};

use super::event_args::EventArgs;

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub event: EventArgs,
    /// Use the free/busy endpoint instead of listing events
    #[arg(long)]
    pub free_busy: bool,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: CheckArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let request = args.event.request(&config)?;
    let auth = super::access_token().await?;
    let workflow = CreateEventWorkflow::from_config(super::calendar_source(&config), &config)?;

    let result = if args.free_busy {
        let plan = request.options.resolve(&request.calendar_id)?;
        let conflicts = workflow
            .orchestrator()
            .check_conflicts_with_free_busy(&auth, &request.candidate(), &plan.calendars)
            .await;
        ConflictCheckResult {
            has_conflicts: !conflicts.is_empty(),
            duplicates: Vec::new(),
            conflicts,
            skipped_calendars: Vec::new(),
        }
    } else {
        workflow.scan(&auth, &request).await?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let report = format_conflict_warnings(&result);
    if report.is_empty() {
        println!("No duplicates or conflicts found.");
    } else {
        print!("{report}");
    }
    Ok(())
}
