//! `kycgate compare`: compare a detected face against a reference.

use clap::Args;
use serde::Serialize;

use crate::client::{field, ApiClient};

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Subject id returned by `kycgate start`.
    pub subject: String,

    /// Face id from `kycgate face`.
    #[arg(short, long)]
    pub probe: String,

    /// Reference image URL the provider fetches.
    #[arg(long, conflicts_with = "template", required_unless_present = "template")]
    pub image_url: Option<String>,

    /// Reference face template, e.g. a document portrait template.
    #[arg(long)]
    pub template: Option<String>,
}

#[derive(Serialize)]
struct CompareRequest<'a> {
    probe_face_id: &'a str,
    reference_image_url: Option<&'a str>,
    reference_template: Option<&'a str>,
}

pub async fn run(client: &ApiClient, args: &CompareArgs) -> anyhow::Result<()> {
    let body = CompareRequest {
        probe_face_id: &args.probe,
        reference_image_url: args.image_url.as_deref(),
        reference_template: args.template.as_deref(),
    };
    let result = client
        .post(&format!("/subjects/{}/faces/compare", args.subject), &body)
        .await?;

    println!("Faces compared:");
    println!("  Status:      {}", field(&result, "status"));
    println!("  Similarity:  {}", field(&result, "similarity"));
    Ok(())
}
