//! `kycgate face`: detect a face in an image.

use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::client::{field, read_image, ApiClient};

#[derive(Args, Debug)]
pub struct FaceArgs {
    /// Subject id returned by `kycgate start`.
    pub subject: String,

    /// Image file containing the face.
    #[arg(short, long)]
    pub image: PathBuf,
}

#[derive(Serialize)]
struct ImageRequest {
    image: String,
}

pub async fn run(client: &ApiClient, args: &FaceArgs) -> anyhow::Result<()> {
    let body = ImageRequest {
        image: read_image(&args.image)?,
    };
    let face = client
        .post(&format!("/subjects/{}/faces/detect", args.subject), &body)
        .await?;

    println!("Face detected:");
    println!("  Face ID:     {}", field(&face, "face_id"));
    println!("  Score:       {}", field(&face, "detection_score"));
    println!("  Confidence:  {}", field(&face, "confidence"));
    match face.get("mask") {
        Some(mask) if mask.get("state").and_then(|s| s.as_str()) == Some("measured") => {
            println!("  Mask score:  {}", field(mask, "mask_score"));
        }
        Some(mask) => println!("  Mask check:  unavailable ({})", field(mask, "reason")),
        None => {}
    }
    Ok(())
}
