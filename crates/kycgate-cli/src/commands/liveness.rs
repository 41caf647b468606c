//! `kycgate liveness`: evaluate liveness on a selfie image.

use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::client::{field, read_image, ApiClient};

#[derive(Args, Debug)]
pub struct LivenessArgs {
    /// Subject id returned by `kycgate start`.
    pub subject: String,

    /// Selfie image file.
    #[arg(short, long)]
    pub image: PathBuf,

    /// Existing challenge id. A fresh challenge is issued when omitted.
    #[arg(long)]
    pub challenge_id: Option<String>,

    /// Challenge type (passive, blink, smile, turn_head).
    #[arg(short = 't', long)]
    pub challenge_type: Option<String>,

    /// Also request a deepfake signal.
    #[arg(long)]
    pub deepfake: bool,
}

#[derive(Serialize)]
struct LivenessRequest {
    image: String,
    challenge_id: Option<String>,
    challenge_type: Option<String>,
    deepfake_check: Option<bool>,
}

pub async fn run(client: &ApiClient, args: &LivenessArgs) -> anyhow::Result<()> {
    let body = LivenessRequest {
        image: read_image(&args.image)?,
        challenge_id: args.challenge_id.clone(),
        challenge_type: args.challenge_type.clone(),
        deepfake_check: args.deepfake.then_some(true),
    };
    let result = client
        .post(&format!("/subjects/{}/liveness", args.subject), &body)
        .await?;

    println!("Liveness evaluated:");
    println!("  Status:      {}", field(&result, "status"));
    println!("  Confidence:  {}", field(&result, "confidence"));
    println!(
        "  Challenge:   {} ({})",
        field(&result, "challenge_id"),
        field(&result, "challenge_type")
    );
    if let Some(deepfake) = result.get("deepfake").filter(|d| !d.is_null()) {
        println!(
            "  Deepfake:    score {} detected {}",
            field(deepfake, "score"),
            field(deepfake, "detected")
        );
    }
    Ok(())
}
