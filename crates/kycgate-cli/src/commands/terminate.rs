//! `kycgate terminate`: delete a subject's verification data.

use clap::Args;

use crate::client::{field, ApiClient};

#[derive(Args, Debug)]
pub struct TerminateArgs {
    /// Subject id returned by `kycgate start`.
    pub subject: String,
}

pub async fn run(client: &ApiClient, args: &TerminateArgs) -> anyhow::Result<()> {
    let report = client.delete(&format!("/subjects/{}", args.subject)).await?;

    println!("{}", field(&report, "message"));
    for what in ["selfie", "liveness"] {
        if let Some(outcome) = report.get(what) {
            match outcome.get("outcome").and_then(|o| o.as_str()) {
                Some("failed") => println!(
                    "  {what:<9} failed ({}): {}",
                    field(outcome, "kind"),
                    field(outcome, "message")
                ),
                Some(other) => println!("  {what:<9} {other}"),
                None => {}
            }
        }
    }
    Ok(())
}
