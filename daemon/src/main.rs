//! tasknet: opens the ledger in a data directory and runs one operation.

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tasknet_ledger::{StateUpdate, UnlockOutcome};
use tasknet_node::{init_logging, LedgerNode, LogFormat, NodeConfig};
use tasknet_types::{Address, JobId, PublicKeyHash};

#[derive(Parser)]
#[command(name = "tasknet", about = "tasknet ledger command-line interface")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "TASKNET_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for ledger storage.
    #[arg(long, env = "TASKNET_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "TASKNET_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "TASKNET_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Print supply totals, emission state and the certifier.
    Status,
    /// Print the spendable balance of an account.
    Balance { address: Address },
    /// Print a validator record.
    Validator { address: Address },
    /// Print the unclaimed rewards of an account.
    Rewards { address: Address },
    /// Move tokens between two accounts.
    Transfer {
        #[arg(long)]
        caller: Address,
        to: Address,
        amount: u128,
    },
    /// Escrow a payment for a new job.
    RequestJob {
        #[arg(long)]
        caller: Address,
        /// Hex job id. Mutually exclusive with --describe.
        #[arg(long, conflicts_with = "describe", required_unless_present = "describe")]
        job_id: Option<JobId>,
        /// Derive the job id from a free-form description.
        #[arg(long)]
        describe: Option<String>,
        #[arg(long, default_value_t = 0)]
        user_ref: u64,
        /// Requested capacities, comma-separated.
        #[arg(long, value_delimiter = ',', required = true)]
        capacities: Vec<u64>,
        #[arg(long)]
        payment: u128,
    },
    /// Cancel an open job and refund its escrow.
    CancelJob {
        #[arg(long)]
        caller: Address,
        job_id: JobId,
    },
    /// Release one job's escrow into the reward pool (certifier only).
    CompleteJob {
        #[arg(long)]
        caller: Address,
        job_id: JobId,
    },
    /// Register the caller as a validator and lock its initial stake.
    CreateValidator {
        #[arg(long)]
        caller: Address,
        /// Hex public key hash.
        public_key_hash: PublicKeyHash,
        amount: u128,
    },
    /// Add stake to an existing validator.
    Lock {
        #[arg(long)]
        caller: Address,
        amount: u128,
    },
    /// Start the unlock cooldown, or withdraw once it has elapsed.
    Unlock {
        #[arg(long)]
        caller: Address,
        amount: u128,
    },
    /// Move all unclaimed rewards into the caller's balance.
    Claim {
        #[arg(long)]
        caller: Address,
    },
    /// Apply a certified state update read from a JSON file.
    Update {
        #[arg(long)]
        caller: Address,
        file: PathBuf,
    },
    /// Designate the certifier (owner only, once).
    SetCertifier {
        #[arg(long)]
        caller: Address,
        certifier: Address,
    },
    /// Halve the emission and double the halving period (owner only).
    HalveStateTime {
        #[arg(long)]
        caller: Address,
    },
    /// Double the emission and halve the halving period (owner only).
    DoubleStateTime {
        #[arg(long)]
        caller: Address,
    },
    /// Change the minimum validator stake (owner only).
    SetLockAmount {
        #[arg(long)]
        caller: Address,
        amount: u128,
    },
    /// Print durable events from a sequence number on.
    Events {
        #[arg(long, default_value_t = 0)]
        from: u64,
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Print Prometheus metrics for this run.
    Metrics,
}

#[derive(Serialize)]
struct Status {
    owner: Address,
    certifier: Option<Address>,
    last_update: Option<u64>,
    total_supply: u128,
    balances: u128,
    escrowed: u128,
    custody: u128,
    total_locked: u128,
    unclaimed: u128,
    reward_pool: u128,
    forfeited: u128,
    open_jobs: usize,
    validators: u64,
    emission_rate: u128,
    tail_emission: u128,
    halving_period: u64,
    min_stake: u128,
    conserved: bool,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_str().context("config path is not valid utf-8")?;
            NodeConfig::from_toml_file(path)?
        }
        None => NodeConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format.to_string();
    }
    Ok(config)
}

fn status(node: &LedgerNode) -> anyhow::Result<Status> {
    Ok(node.with_ledger(|l| {
        let report = l.conservation();
        Status {
            owner: l.owner().clone(),
            certifier: l.certifier().cloned(),
            last_update: l.last_update().map(|t| t.as_secs()),
            total_supply: report.total_supply,
            balances: report.balances,
            escrowed: report.escrowed,
            custody: report.custody,
            total_locked: l.total_locked(),
            unclaimed: report.unclaimed,
            reward_pool: report.reward_pool,
            forfeited: l.total_forfeited(),
            open_jobs: l.open_jobs(),
            validators: l.validator_count(),
            emission_rate: l.emission().emission_rate(),
            tail_emission: l.emission().tail_emission(),
            halving_period: l.emission().halving_period(),
            min_stake: l.params().min_stake,
            conserved: report.holds(),
        }
    })?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format()?, &config.log_level)?;

    let node = LedgerNode::open_lmdb(&config)
        .with_context(|| format!("opening ledger in {}", config.data_dir.display()))?;

    match cli.command {
        Command::Status => print_json(&status(&node)?)?,
        Command::Balance { address } => println!("{}", node.balance_of(&address)?),
        Command::Validator { address } => match node.validator(&address)? {
            Some(validator) => print_json(&validator)?,
            None => bail!("{address} is not a validator"),
        },
        Command::Rewards { address } => println!("{}", node.unclaimed_rewards(&address)?),
        Command::Transfer { caller, to, amount } => {
            node.transfer(&caller, &to, amount)?;
            tracing::info!(from = %caller, to = %to, amount, "transferred");
        }
        Command::RequestJob {
            caller,
            job_id,
            describe,
            user_ref,
            capacities,
            payment,
        } => {
            let job_id = match (job_id, describe) {
                (Some(id), _) => id,
                (None, Some(text)) => JobId::digest(text.as_bytes()),
                (None, None) => bail!("either --job-id or --describe is required"),
            };
            node.request_job(&caller, user_ref, job_id, capacities, payment)?;
            println!("{job_id}");
        }
        Command::CancelJob { caller, job_id } => {
            println!("{}", node.cancel_job(&caller, &job_id)?);
        }
        Command::CompleteJob { caller, job_id } => {
            println!("{}", node.complete_job(&caller, &job_id)?);
        }
        Command::CreateValidator {
            caller,
            public_key_hash,
            amount,
        } => node.create_validator(&caller, public_key_hash, amount)?,
        Command::Lock { caller, amount } => node.lock_tokens(&caller, amount)?,
        Command::Unlock { caller, amount } => match node.unlock_tokens(&caller, amount)? {
            UnlockOutcome::Initiated {
                unlock_at,
                deactivated,
                ..
            } => println!(
                "unlock initiated; withdrawable from {} (deactivated: {deactivated})",
                unlock_at.as_secs()
            ),
            UnlockOutcome::Withdrawn {
                amount,
                remaining,
                deactivated,
            } => println!("withdrew {amount}; {remaining} still locked (deactivated: {deactivated})"),
        },
        Command::Claim { caller } => println!("{}", node.claim_rewards(&caller)?),
        Command::Update { caller, file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let update: StateUpdate = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", file.display()))?;
            print_json(&node.update_contract(&caller, &update)?)?;
        }
        Command::SetCertifier { caller, certifier } => node.set_certifier(&caller, certifier)?,
        Command::HalveStateTime { caller } => node.halve_state_time(&caller)?,
        Command::DoubleStateTime { caller } => node.double_state_time(&caller)?,
        Command::SetLockAmount { caller, amount } => node.set_lock_amount(&caller, amount)?,
        Command::Events { from, limit } => {
            for event in node.events_since(from, limit)? {
                println!("{}", serde_json::to_string(&event)?);
            }
        }
        Command::Metrics => print!("{}", node.metrics().encode()?),
    }
    Ok(())
}
