//! `kycgate start`: begin a verification for a new subject.

use clap::Args;
use serde::Serialize;

use crate::client::{field, ApiClient};

#[derive(Args, Debug)]
pub struct StartArgs {
    /// Caller-side correlation id stored with the subject.
    #[arg(short, long)]
    pub correlation_id: Option<String>,
}

#[derive(Serialize)]
struct StartRequest<'a> {
    correlation_id: Option<&'a str>,
}

pub async fn run(client: &ApiClient, args: &StartArgs) -> anyhow::Result<()> {
    let body = StartRequest {
        correlation_id: args.correlation_id.as_deref(),
    };
    let subject = client.post("/subjects", &body).await?;

    println!("Verification started!");
    println!("  Subject:      {}", field(&subject, "id"));
    println!("  Correlation:  {}", field(&subject, "correlation_id"));
    println!("  Status:       {}", field(&subject, "onboarding_status"));
    println!("  Created:      {}", field(&subject, "created_at"));
    Ok(())
}
