use anyhow::Result;
use clap::Parser;
use std::time::Instant;
use tracing::{error, info, warn};

mod aggregate;
mod cli;
mod error;
mod inventory;
mod logging;
mod pricing;
mod report;
mod upload;

use cli::Args;
use error::ReportError;
use inventory::InventoryClient;
use pricing::{PriceBook, PriceFeed};
use upload::UploadClient;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logging::init(&args.log_format, &args.log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        region = %args.region,
        "EC2 cost report starting"
    );
    args.display();

    if let Err(e) = run(&args).await {
        error!(error = %e, "Report run failed");
        std::process::exit(1);
    }
}

async fn run(args: &Args) -> Result<()> {
    let start = Instant::now();

    let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(args.region.clone()))
        .load()
        .await;

    // Collect
    let records = InventoryClient::new(&config).collect(args.all_states).await?;

    // Aggregate
    let rows = aggregate::aggregate(&records);
    info!(
        instance_count = records.len(),
        row_count = rows.len(),
        "Instances aggregated by Role/Environment/InstanceType"
    );

    // Price (lenient: a dead feed degrades to blank cost columns)
    let price_book = if args.no_pricing {
        None
    } else {
        match PriceFeed::new(&args.pricing_url).fetch(&args.region).await {
            Ok(book) => Some(book),
            Err(e) => {
                warn!(
                    error = %e,
                    url = %args.pricing_url,
                    "Pricing feed unavailable, cost columns will be empty"
                );
                Some(PriceBook::Unavailable(e.to_string()))
            }
        }
    };

    // Format and write
    let csv = report::render(&rows, price_book.as_ref());
    let path = report::write_report(&args.output_dir, &csv)?;

    // Upload, then drop the local temp file
    if let Some(bucket) = &args.s3_bucket {
        let location = UploadClient::new(&config)
            .upload_report(bucket, &path)
            .await?;
        std::fs::remove_file(&path).map_err(|e| {
            ReportError::Report(format!(
                "Could not remove temp file {}: {}",
                path.display(),
                e
            ))
        })?;

        info!(
            location = %location,
            elapsed_seconds = start.elapsed().as_secs_f64(),
            "Report run completed"
        );
    } else {
        info!(
            path = %path.display(),
            elapsed_seconds = start.elapsed().as_secs_f64(),
            "Report run completed"
        );
    }

    Ok(())
}
