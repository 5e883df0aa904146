use clap::{Args, Subcommand};

use policyd_engine::RuleEngine;
use policyd_store::write_rule_xml;

#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub command: RulesCommand,
}

#[derive(Subcommand, Debug)]
pub enum RulesCommand {
    /// Register a new rule, parsed from a rule-definition XML file.
    Add {
        /// Path to the rule's XML definition.
        #[arg(long = "rule-file")]
        rule_file: std::path::PathBuf,
    },
    /// Remove a rule.
    Delete {
        #[arg(long = "app-name")]
        app_name: String,
        #[arg(long = "rule-name")]
        rule_name: String,
    },
    /// Enable a currently disabled rule.
    Enable {
        #[arg(long = "app-name")]
        app_name: String,
        #[arg(long = "rule-name")]
        rule_name: String,
    },
    /// Disable a currently enabled rule.
    Disable {
        #[arg(long = "app-name")]
        app_name: String,
        #[arg(long = "rule-name")]
        rule_name: String,
    },
    /// Print one rule's XML representation.
    Get {
        #[arg(long = "app-name")]
        app_name: String,
        #[arg(long = "rule-name")]
        rule_name: String,
    },
    /// Print the XML representation of every registered rule.
    List,
    /// Force execution of a rule outside its normal trigger schedule.
    Execute {
        #[arg(long = "app-name")]
        app_name: String,
        #[arg(long = "rule-name")]
        rule_name: String,
        /// Application data to evaluate against (only meaningful for
        /// `receive`-mode rules).
        #[arg(long = "data-file")]
        data_file: Option<std::path::PathBuf>,
    },
}

pub async fn run(engine: &RuleEngine, args: &RulesArgs) -> anyhow::Result<()> {
    match &args.command {
        RulesCommand::Add { rule_file } => {
            let bytes = std::fs::read(rule_file)?;
            let rule = policyd_store::parse_rule_xml(&bytes)?;
            let rule_id = rule.rule_id();
            engine.add_rule(rule)?;
            println!("Added rule {rule_id}");
        }
        RulesCommand::Delete { app_name, rule_name } => {
            engine.delete_rule(app_name, rule_name)?;
            println!("Deleted rule {app_name}/{rule_name}");
        }
        RulesCommand::Enable { app_name, rule_name } => {
            engine.enable_rule(app_name, rule_name)?;
            println!("Enabled rule {app_name}/{rule_name}");
        }
        RulesCommand::Disable { app_name, rule_name } => {
            engine.disable_rule(app_name, rule_name)?;
            println!("Disabled rule {app_name}/{rule_name}");
        }
        RulesCommand::Get { app_name, rule_name } => {
            let rule = engine.get_rule(app_name, rule_name)?;
            let xml = write_rule_xml(&rule)?;
            println!("{}", String::from_utf8_lossy(&xml));
        }
        RulesCommand::List => {
            for rule in engine.get_rule_list() {
                let xml = write_rule_xml(&rule)?;
                println!("{}", String::from_utf8_lossy(&xml));
            }
        }
        RulesCommand::Execute { app_name, rule_name, data_file } => {
            let application_data = match data_file {
                Some(path) => {
                    let bytes = std::fs::read(path)?;
                    anyhow::ensure!(!bytes.is_empty(), "empty application data file");
                    bytes
                }
                None => Vec::new(),
            };
            engine.execute_rule(app_name, rule_name, application_data).await?;
            println!("Executed rule {app_name}/{rule_name}");
        }
    }
    Ok(())
}
