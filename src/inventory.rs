use anyhow::Result;
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::{InstanceStateName, Reservation};
use aws_sdk_ec2::Client;
use tracing::{debug, info};

use crate::aggregate::InstanceRecord;
use crate::error::ReportError;

const ROLE_TAG: &str = "Role";
const ENVIRONMENT_TAG: &str = "Environment";

pub struct InventoryClient {
    client: Client,
}

impl InventoryClient {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    /// Walk every DescribeInstances page and flatten the reservations into
    /// instance records. A failure on any page aborts the collection.
    pub async fn collect(&self, all_states: bool) -> Result<Vec<InstanceRecord>> {
        let mut records = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0;

        loop {
            let response = self
                .client
                .describe_instances()
                .set_next_token(next_token.clone())
                .send()
                .await
                .map_err(|e| {
                    ReportError::Inventory(DisplayErrorContext(&e).to_string())
                })?;

            pages += 1;
            let page_records =
                records_from_reservations(response.reservations(), all_states);

            debug!(
                page = pages,
                reservations = response.reservations().len(),
                records = page_records.len(),
                "Processed DescribeInstances page"
            );

            records.extend(page_records);

            next_token = response.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        info!(
            pages = pages,
            instance_count = records.len(),
            "Instance inventory collected"
        );

        Ok(records)
    }
}

/// Flatten reservations into records, reading the Role and Environment
/// tags. Instances not in the running state are skipped unless
/// `all_states` is set; a missing tag yields an empty grouping key.
pub fn records_from_reservations(
    reservations: &[Reservation],
    all_states: bool,
) -> Vec<InstanceRecord> {
    let mut records = Vec::new();

    for reservation in reservations {
        for instance in reservation.instances() {
            if !all_states {
                let running = instance
                    .state()
                    .and_then(|s| s.name())
                    .map(|name| *name == InstanceStateName::Running)
                    .unwrap_or(false);
                if !running {
                    continue;
                }
            }

            let instance_type = instance
                .instance_type()
                .map(|t| t.as_str().to_string())
                .unwrap_or_default();

            let mut role = String::new();
            let mut environment = String::new();
            for tag in instance.tags() {
                match tag.key() {
                    Some(ROLE_TAG) => {
                        role = tag.value().unwrap_or_default().to_string();
                    }
                    Some(ENVIRONMENT_TAG) => {
                        environment = tag.value().unwrap_or_default().to_string();
                    }
                    _ => {}
                }
            }

            records.push(InstanceRecord {
                instance_type,
                role,
                environment,
            });
        }
    }

    records
}
