use std::collections::HashSet;

/// One running instance as observed at collection time.
///
/// `role` and `environment` come from the "Role" and "Environment" tags
/// and are empty strings when the tag is absent. An untagged instance is
/// still counted, grouped under the empty keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    pub instance_type: String,
    pub role: String,
    pub environment: String,
}

/// One report line: how many instances of `instance_type` run with this
/// (role, environment) tag pair. `count` is always at least 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedRow {
    pub role: String,
    pub environment: String,
    pub instance_type: String,
    pub count: usize,
}

/// Distinct values in first-occurrence order.
pub fn dedup_preserving_order<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for value in values {
        let value = value.as_ref();
        if seen.insert(value.to_string()) {
            unique.push(value.to_string());
        }
    }
    unique
}

/// Distinct roles across all records, first-seen order.
pub fn roles(records: &[InstanceRecord]) -> Vec<String> {
    dedup_preserving_order(records.iter().map(|r| r.role.as_str()))
}

/// Distinct environments across all records, first-seen order.
pub fn environments(records: &[InstanceRecord]) -> Vec<String> {
    dedup_preserving_order(records.iter().map(|r| r.environment.as_str()))
}

/// Group records into ordered (role, environment, instance type) counts.
///
/// Rows are grouped by role in global first-seen order. Within a role,
/// environments follow the GLOBAL environment first-seen order, filtered
/// to those actually present for that role. Within a (role, environment)
/// bucket, instance types keep the bucket's first-seen order. Only
/// observed combinations are emitted; there is no zero-count fill across
/// the role x environment x type cross-product.
pub fn aggregate(records: &[InstanceRecord]) -> Vec<AggregatedRow> {
    let roles = roles(records);
    let environments = environments(records);

    let mut rows = Vec::new();

    for role in &roles {
        let role_subset: Vec<&InstanceRecord> =
            records.iter().filter(|r| &r.role == role).collect();

        for environment in &environments {
            let bucket: Vec<&str> = role_subset
                .iter()
                .filter(|r| &r.environment == environment)
                .map(|r| r.instance_type.as_str())
                .collect();

            for instance_type in dedup_preserving_order(bucket.iter().copied()) {
                let count = bucket.iter().filter(|t| **t == instance_type).count();
                rows.push(AggregatedRow {
                    role: role.clone(),
                    environment: environment.clone(),
                    instance_type,
                    count,
                });
            }
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn record(instance_type: &str, role: &str, environment: &str) -> InstanceRecord {
        InstanceRecord {
            instance_type: instance_type.to_string(),
            role: role.to_string(),
            environment: environment.to_string(),
        }
    }

    #[test]
    fn test_dedup_preserves_first_occurrence_order() {
        let deduped = dedup_preserving_order(["b", "a", "b", "c", "a"]);
        assert_eq!(deduped, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_dedup_empty_input() {
        let deduped = dedup_preserving_order(Vec::<String>::new());
        assert!(deduped.is_empty());
    }

    #[test]
    fn test_dedup_keeps_empty_string_as_value() {
        let deduped = dedup_preserving_order(["", "web", "", "db"]);
        assert_eq!(deduped, vec!["", "web", "db"]);
    }

    #[test]
    fn test_role_and_environment_sets() {
        let records = vec![
            record("t2.micro", "web", "prod"),
            record("t3.large", "db", "staging"),
            record("t2.micro", "web", "prod"),
        ];

        assert_eq!(roles(&records), vec!["web", "db"]);
        assert_eq!(environments(&records), vec!["prod", "staging"]);
    }

    #[test]
    fn test_aggregate_end_to_end_scenario() {
        let records = vec![
            record("t2.micro", "web", "prod"),
            record("t2.micro", "web", "prod"),
            record("t3.large", "web", "staging"),
            record("t2.micro", "db", "prod"),
        ];

        let rows = aggregate(&records);

        assert_eq!(
            rows,
            vec![
                AggregatedRow {
                    role: "web".to_string(),
                    environment: "prod".to_string(),
                    instance_type: "t2.micro".to_string(),
                    count: 2,
                },
                AggregatedRow {
                    role: "web".to_string(),
                    environment: "staging".to_string(),
                    instance_type: "t3.large".to_string(),
                    count: 1,
                },
                AggregatedRow {
                    role: "db".to_string(),
                    environment: "prod".to_string(),
                    instance_type: "t2.micro".to_string(),
                    count: 1,
                },
            ]
        );
    }

    #[test]
    fn test_aggregate_counts_match_input_multiset() {
        let records = vec![
            record("m5.large", "api", "prod"),
            record("m5.large", "api", "prod"),
            record("m5.xlarge", "api", "prod"),
            record("m5.large", "api", "staging"),
            record("r5.large", "cache", "prod"),
            record("m5.large", "api", "prod"),
        ];

        let rows = aggregate(&records);

        let mut from_input: HashMap<(String, String, String), usize> = HashMap::new();
        for r in &records {
            *from_input
                .entry((r.role.clone(), r.environment.clone(), r.instance_type.clone()))
                .or_default() += 1;
        }

        let mut from_rows: HashMap<(String, String, String), usize> = HashMap::new();
        for row in &rows {
            let previous = from_rows.insert(
                (
                    row.role.clone(),
                    row.environment.clone(),
                    row.instance_type.clone(),
                ),
                row.count,
            );
            assert!(previous.is_none(), "duplicate triple in output");
        }

        assert_eq!(from_rows, from_input);
    }

    #[test]
    fn test_aggregate_no_zero_count_rows() {
        // web never runs in staging, db never in prod: neither pair may
        // show up even though both roles and both environments exist.
        let records = vec![
            record("t2.micro", "web", "prod"),
            record("t2.micro", "db", "staging"),
        ];

        let rows = aggregate(&records);

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.count >= 1));
        assert!(!rows
            .iter()
            .any(|row| row.role == "web" && row.environment == "staging"));
        assert!(!rows
            .iter()
            .any(|row| row.role == "db" && row.environment == "prod"));
    }

    #[test]
    fn test_aggregate_environment_order_is_global_not_role_local() {
        // For role "b", staging was seen before prod, but the global
        // environment order (prod first) still drives its row order.
        let records = vec![
            record("t2.micro", "a", "prod"),
            record("t2.micro", "b", "staging"),
            record("t2.micro", "b", "prod"),
        ];

        let rows = aggregate(&records);
        let b_envs: Vec<&str> = rows
            .iter()
            .filter(|row| row.role == "b")
            .map(|row| row.environment.as_str())
            .collect();

        assert_eq!(b_envs, vec!["prod", "staging"]);
    }

    #[test]
    fn test_aggregate_deterministic_across_runs() {
        let records = vec![
            record("t2.micro", "web", "prod"),
            record("t3.large", "db", "staging"),
            record("t2.micro", "web", "staging"),
            record("c5.large", "worker", "prod"),
            record("t2.micro", "web", "prod"),
        ];

        let first = aggregate(&records);
        let second = aggregate(&records);

        assert_eq!(first, second);
    }

    #[test]
    fn test_aggregate_page_boundaries_do_not_matter() {
        // The same flattened sequence, whether it arrived as one page or
        // three, produces identical rows.
        let page_one = vec![record("t2.micro", "web", "prod")];
        let page_two = vec![
            record("t3.large", "db", "staging"),
            record("t2.micro", "web", "prod"),
        ];
        let page_three = vec![record("t2.micro", "db", "prod")];

        let mut paged = Vec::new();
        paged.extend(page_one.clone());
        paged.extend(page_two.clone());
        paged.extend(page_three.clone());

        let flat = vec![
            record("t2.micro", "web", "prod"),
            record("t3.large", "db", "staging"),
            record("t2.micro", "web", "prod"),
            record("t2.micro", "db", "prod"),
        ];

        assert_eq!(aggregate(&paged), aggregate(&flat));
    }

    #[test]
    fn test_aggregate_untagged_instances_get_their_own_row() {
        let records = vec![
            record("t2.micro", "web", "prod"),
            record("t3.nano", "", ""),
            record("t3.nano", "", ""),
        ];

        let rows = aggregate(&records);

        assert!(rows.contains(&AggregatedRow {
            role: String::new(),
            environment: String::new(),
            instance_type: "t3.nano".to_string(),
            count: 2,
        }));
    }

    #[test]
    fn test_aggregate_empty_input() {
        assert!(aggregate(&[]).is_empty());
    }
}
