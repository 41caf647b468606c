//! `kycgate status`: show a subject's workflow status.

use clap::Args;

use crate::client::{field, ApiClient};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Subject id returned by `kycgate start`.
    pub subject: String,

    /// Print the full report as JSON.
    #[arg(long)]
    pub json: bool,
}

pub async fn run(client: &ApiClient, args: &StatusArgs) -> anyhow::Result<()> {
    let report = client
        .get(&format!("/subjects/{}/status", args.subject))
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let subject = report.get("subject").cloned().unwrap_or_default();
    let stages: Vec<String> = report
        .get("completed_stages")
        .and_then(|s| s.as_array())
        .map(|stages| {
            stages
                .iter()
                .filter_map(|s| s.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    println!("Subject {}:", field(&subject, "id"));
    println!("  Onboarding:  {}", field(&subject, "onboarding_status"));
    println!("  Phase:       {}", field(&report, "phase"));
    println!("  Overall:     {}", field(&report, "overall_status"));
    if stages.is_empty() {
        println!("  Stages:      (none)");
    } else {
        println!("  Stages:      {}", stages.join(", "));
    }
    Ok(())
}
