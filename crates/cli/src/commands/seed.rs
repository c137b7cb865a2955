use crate::commands::{open_pool, prepare, CommandFailure, CommandResult};
use vendorhub_db::{migrations, DemoDataset, SeedResult};

pub fn run() -> CommandResult {
    CommandResult::from_outcome("seed", execute())
}

fn execute() -> Result<String, CommandFailure> {
    let (config, runtime) = prepare()?;

    runtime.block_on(async {
        let pool = open_pool(&config).await?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| CommandFailure::new("migration", error.to_string(), 5))?;

        let seed_result = DemoDataset::load(&pool)
            .await
            .map_err(|error| CommandFailure::new("seed_execution", error.to_string(), 5))?;

        let verification = DemoDataset::verify(&pool)
            .await
            .map_err(|error| CommandFailure::new("seed_verification", error.to_string(), 6))?;

        pool.close().await;
        if verification.all_present {
            Ok(success_message(&seed_result))
        } else {
            Err(CommandFailure::new(
                "seed_verification",
                verification_failure_message(&verification.checks),
                6,
            ))
        }
    })
}

fn success_message(result: &SeedResult) -> String {
    let vendor_lines: Vec<String> = result
        .vendors_seeded
        .iter()
        .map(|vendor| format!("  - {}: {}", vendor.vendor_code, vendor.name))
        .collect();
    format!(
        "demo dataset ready ({} vendors and {} purchase orders created):\n{}",
        result.vendors_created,
        result.orders_created,
        vendor_lines.join("\n")
    )
}

fn verification_failure_message(checks: &[(String, bool)]) -> String {
    let failed_checks = checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(check.as_str()))
        .collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use vendorhub_db::{SeedResult, SeedVendorInfo};

    use super::{success_message, verification_failure_message};

    #[test]
    fn verification_error_message_targets_failed_checks() {
        let checks = vec![
            ("DEMO-ACME:vendor".to_string(), true),
            ("DEMO-PO-1001:order".to_string(), false),
            ("DEMO-ACME:performance".to_string(), false),
        ];

        assert_eq!(
            verification_failure_message(&checks),
            "Seed verification failed for checks: DEMO-PO-1001:order, DEMO-ACME:performance"
        );
    }

    #[test]
    fn verification_error_message_falls_back_to_generic_when_no_labels() {
        let checks = vec![("DEMO-ACME:vendor".to_string(), true)];

        assert_eq!(verification_failure_message(&checks), "Some seed data failed to load");
    }

    #[test]
    fn success_message_lists_seeded_vendors() {
        let result = SeedResult {
            vendors_created: 1,
            orders_created: 3,
            vendors_seeded: vec![SeedVendorInfo {
                vendor_code: "DEMO-ACME",
                name: "Acme Industrial Supply",
            }],
        };

        let message = success_message(&result);
        assert!(
            message.starts_with("demo dataset ready (1 vendors and 3 purchase orders created)")
        );
        assert!(message.contains("  - DEMO-ACME: Acme Industrial Supply"));
    }
}
