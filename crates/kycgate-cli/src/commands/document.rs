//! `kycgate document`: submit identity document images.

use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::client::{field, read_image, ApiClient};

#[derive(Args, Debug)]
pub struct DocumentArgs {
    /// Subject id returned by `kycgate start`.
    pub subject: String,

    /// Front side image file.
    #[arg(short, long)]
    pub front: PathBuf,

    /// Back side image file.
    #[arg(short, long)]
    pub back: Option<PathBuf>,

    /// Document type (passport, id_card, drivers_license, residence_permit).
    #[arg(short = 't', long)]
    pub document_type: Option<String>,
}

#[derive(Serialize)]
struct DocumentRequest {
    front_image: String,
    back_image: Option<String>,
    document_type: Option<String>,
}

pub async fn run(client: &ApiClient, args: &DocumentArgs) -> anyhow::Result<()> {
    let body = DocumentRequest {
        front_image: read_image(&args.front)?,
        back_image: args.back.as_deref().map(read_image).transpose()?,
        document_type: args.document_type.clone(),
    };
    let doc = client
        .post(&format!("/subjects/{}/documents", args.subject), &body)
        .await?;

    println!("Document processed:");
    println!("  Status:      {}", field(&doc, "status"));
    println!("  Confidence:  {}", field(&doc, "confidence"));
    println!("  Type:        {}", field(&doc, "document_type"));
    println!("  Country:     {}", field(&doc, "issuing_country"));
    println!("  Number:      {}", field(&doc, "document_number"));
    println!("  Expires:     {}", field(&doc, "expiration_date"));
    println!("  Template:    {}", field(&doc, "portrait_template"));
    Ok(())
}
