//! Human-readable progress and the final deployment summary.

use alloy_core::primitives::U256;
use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};

use crate::{
    network::{LOCAL_CHAIN_ID, NetworkInfo},
    pipeline::{Diagnostics, PipelineOutcome},
    record::DeploymentRecord,
    units::format_gwei,
};

/// Default command prefix used to build the explorer verification command.
pub const DEFAULT_EXPLORER_TOOL: &str = "npx hardhat";

/// Closing guidance printed after a successful deployment.
pub const NEXT_STEPS: [&str; 9] = [
    "=== Next steps ===",
    "1. Save the contract address for frontend integration",
    "2. Verify the contract on a block explorer (optional)",
    "3. Try the contract functions:",
    "   - Register as client: registerClient()",
    "   - Register as freelancer: registerFreelancer()",
    "   - Create projects: createProject()",
    "   - Apply for projects: applyForProject()",
    "4. Update your frontend/dApp configuration with the new address",
];

/// Renders the outcome of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reporter {
    /// Chain id for which no explorer verification is suggested.
    pub local_chain_id: u64,
    /// Command prefix of the explorer verification tool.
    pub explorer_tool: String,
    /// Title shown in the summary, defaults to the contract name.
    pub display_name: Option<String>,
}

impl Default for Reporter {
    fn default() -> Self {
        Self {
            local_chain_id: LOCAL_CHAIN_ID,
            explorer_tool: DEFAULT_EXPLORER_TOOL.to_string(),
            display_name: None,
        }
    }
}

impl Reporter {
    /// The explorer verification command, or `None` on the local network.
    pub fn explorer_command(&self, network: &NetworkInfo, address: &str) -> Option<String> {
        if network.is_local(self.local_chain_id) {
            return None;
        }
        Some(format!(
            "{} verify --network {} {}",
            self.explorer_tool, network.name, address
        ))
    }

    /// Tabular summary of a deployment record.
    pub fn summary_table(&self, record: &DeploymentRecord) -> Table {
        let title = self
            .display_name
            .clone()
            .unwrap_or_else(|| record.contract_name.clone());
        let gas_price = record
            .gas_price
            .parse::<U256>()
            .map(|wei| format!("{} gwei", format_gwei(wei)))
            .unwrap_or_else(|_| record.gas_price.clone());

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_header(vec!["Contract Information", ""]);

        table.add_row(vec!["Contract Name", title.as_str()]);
        table.add_row(vec!["Contract Address", record.contract_address.as_str()]);
        table.add_row(vec!["Deployer Address", record.deployer.as_str()]);
        table.add_row(vec![
            "Network".to_string(),
            format!("{} (chain id {})", record.network, record.chain_id),
        ]);
        table.add_row(vec!["Block Number".to_string(), record.block_number.to_string()]);
        table.add_row(vec!["Transaction Hash", record.transaction_hash.as_str()]);
        table.add_row(vec!["Gas Used", record.gas_used.as_str()]);
        table.add_row(vec!["Gas Price".to_string(), gas_price]);

        table
    }

    /// Tabular view of the verification results.
    pub fn verification_table(&self, diagnostics: &Diagnostics) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_header(vec!["Check", "Result"]);

        for (name, outcome) in diagnostics.verification.iter() {
            let cell = match outcome {
                Ok(value) => format!("✓ {value}"),
                Err(e) => format!("✗ {e}"),
            };
            table.add_row(vec![name.to_string(), cell]);
        }
        table
    }

    /// Log the outcome of a run.
    pub fn report(&self, outcome: &PipelineOutcome) {
        match outcome {
            PipelineOutcome::Success {
                record,
                diagnostics,
            } => self.report_success(record, diagnostics),
            PipelineOutcome::Fatal(err) => {
                tracing::error!(error = ?err, "Deployment failed: {err}");
            }
        }
    }

    fn report_success(&self, record: &DeploymentRecord, diagnostics: &Diagnostics) {
        tracing::info!("");
        log_table(&self.summary_table(record));

        if !diagnostics.verification.is_empty() {
            tracing::info!("");
            log_table(&self.verification_table(diagnostics));
        }

        if let Some(command) = &diagnostics.explorer_command {
            tracing::info!("");
            tracing::info!("Explorer verification command:");
            tracing::info!("{command}");
        }

        match &diagnostics.persisted {
            Ok(location) => tracing::info!(path = %location.path.display(), "Deployment record"),
            Err(e) => tracing::warn!(error = %e, "Deployment record was not saved"),
        }

        tracing::info!("");
        for line in NEXT_STEPS {
            tracing::info!("{line}");
        }
        tracing::info!("");
        tracing::info!("✓ Deployment completed successfully!");
        tracing::info!(
            contract_address = %record.contract_address,
            deployer = %record.deployer,
            "Deployment summary"
        );
    }
}

fn log_table(table: &Table) {
    for line in table.to_string().lines() {
        tracing::info!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(name: &str, chain_id: u64) -> NetworkInfo {
        NetworkInfo {
            name: name.to_string(),
            chain_id,
            block_number: 5,
        }
    }

    #[test]
    fn test_explorer_command_on_public_network() {
        let reporter = Reporter::default();
        assert_eq!(
            reporter.explorer_command(&network("mainnet", 1), "0xABC").as_deref(),
            Some("npx hardhat verify --network mainnet 0xABC")
        );
    }

    #[test]
    fn test_no_explorer_command_on_local_network() {
        let reporter = Reporter::default();
        assert_eq!(
            reporter.explorer_command(&network("hardhat", 31337), "0xABC"),
            None
        );
    }

    #[test]
    fn test_custom_local_chain_and_tool() {
        let reporter = Reporter {
            local_chain_id: 1337,
            explorer_tool: "forge".to_string(),
            display_name: None,
        };
        assert!(reporter.explorer_command(&network("ganache", 1337), "0xABC").is_none());
        assert_eq!(
            reporter.explorer_command(&network("hardhat", 31337), "0xABC").as_deref(),
            Some("forge verify --network hardhat 0xABC")
        );
    }

    #[test]
    fn test_summary_table_contents() {
        let reporter = Reporter {
            display_name: Some("Decentralized Freelancing Platform".to_string()),
            ..Reporter::default()
        };
        let record = DeploymentRecord {
            contract_name: "Project".to_string(),
            contract_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            deployer: "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".to_string(),
            network: "hardhat".to_string(),
            chain_id: 31337,
            block_number: 5,
            transaction_hash: "0xabc".to_string(),
            gas_used: "3000000".to_string(),
            gas_price: "1500000000".to_string(),
            deployment_time: "2024-05-01T12:00:00.000Z".to_string(),
            abi: "[]".to_string(),
        };

        let rendered = reporter.summary_table(&record).to_string();
        assert!(rendered.contains("Decentralized Freelancing Platform"));
        assert!(rendered.contains("0x5FbDB2315678afecb367f032d93F642f64180aa3"));
        assert!(rendered.contains("1.5 gwei"));
        assert!(rendered.contains("31337"));
    }
}
