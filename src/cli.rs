use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_PRICING_URL: &str =
    "https://raw.githubusercontent.com/powdahound/ec2instances.info/master/www/instances.json";

/// EC2 instance report grouped by Role/Environment tags with yearly cost estimates
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// AWS region
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Directory for the generated CSV report
    #[arg(long, env = "OUTPUT_DIR", default_value = "/tmp/ec2pricing")]
    pub output_dir: PathBuf,

    /// S3 bucket to upload the report to (local file is removed after upload)
    #[arg(long, env = "S3_BUCKET_NAME")]
    pub s3_bucket: Option<String>,

    /// Include instances in any lifecycle state (default: running only)
    #[arg(long, default_value = "false")]
    pub all_states: bool,

    /// Skip the pricing feed join and emit the 4-column report
    #[arg(long, default_value = "false")]
    pub no_pricing: bool,

    /// Pricing feed URL (ec2instances.info JSON mirror)
    #[arg(long, env = "PRICING_URL", default_value = DEFAULT_PRICING_URL)]
    pub pricing_url: String,

    /// Log format: json or pretty
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn display(&self) {
        tracing::info!(
            region = %self.region,
            output_dir = %self.output_dir.display(),
            s3_bucket = self.s3_bucket.as_deref().unwrap_or("NONE (local report only)"),
            all_states = self.all_states,
            no_pricing = self.no_pricing,
            "Configuration initialized"
        );

        if self.all_states {
            tracing::warn!(
                "State filter disabled - counting instances in ALL lifecycle states"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // The env fallbacks would shadow the defaults on a configured host.
        for var in ["AWS_REGION", "OUTPUT_DIR", "S3_BUCKET_NAME", "PRICING_URL"] {
            std::env::remove_var(var);
        }

        let args = Args::parse_from(["ec2-cost-report"]);

        assert_eq!(args.region, "us-east-1");
        assert_eq!(args.output_dir, PathBuf::from("/tmp/ec2pricing"));
        assert!(args.s3_bucket.is_none());
        assert!(!args.all_states);
        assert!(!args.no_pricing);
        assert_eq!(args.pricing_url, DEFAULT_PRICING_URL);
    }

    #[test]
    fn test_sink_selection_flags() {
        let args = Args::parse_from([
            "ec2-cost-report",
            "--s3-bucket",
            "reports-bucket",
            "--no-pricing",
            "--all-states",
        ]);

        assert_eq!(args.s3_bucket.as_deref(), Some("reports-bucket"));
        assert!(args.no_pricing);
        assert!(args.all_states);
    }
}
