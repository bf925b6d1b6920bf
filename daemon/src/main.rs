//! tally: operator CLI over a persisted staking ledger.
//!
//! Opens the LMDB store directly. It reads and compacts the ledger but never
//! moves value, so it needs no access to the value ledger.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tally_staking::{MaturityState, StakingConfig, StakingState};
use tally_store_lmdb::LmdbStakingStore;
use tally_types::{AccountId, Timestamp};
use tally_utils::{format_duration, init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "tally", about = "Time-weighted staking ledger tools")]
struct Cli {
    /// Data directory holding the LMDB environment.
    #[arg(long, default_value = "./tally_data", env = "TALLY_DATA_DIR")]
    data_dir: PathBuf,

    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(long, env = "TALLY_CONFIG")]
    config: Option<PathBuf>,

    /// Log level, overriding the config file: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "TALLY_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Print ledger totals.
    Status {
        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Print one account.
    Account {
        id: String,
        /// Also report the staked balance at this unix time.
        #[arg(long)]
        at: Option<u64>,
    },
    /// List blacklisted accounts.
    Blacklist,
    /// Check ledger invariants; exits non-zero on any violation.
    Verify,
    /// Prune checkpoint history past the retention horizon. Does nothing
    /// unless `[retention] enabled = true` in the config.
    Compact {
        /// Unix time to compact as of. Defaults to the current time and
        /// may not lie in the future.
        #[arg(long)]
        now: Option<u64>,
    },
}

#[derive(Serialize)]
struct AccountView {
    id: String,
    staked: u128,
    staked_at: Option<(u64, u128)>,
    maturity: String,
    valid: bool,
    average: u128,
    staking_profit: u128,
    claimed: u128,
    history_horizon: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => StakingConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => StakingConfig::default(),
    };

    let format: LogFormat = config.logging.format.parse()?;
    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    init_logging(format, level)?;

    let store = LmdbStakingStore::open(&cli.data_dir)
        .with_context(|| format!("opening ledger at {}", cli.data_dir.display()))?;
    let (mut state, fresh) = StakingState::load(&store, config)?;
    if fresh {
        tracing::warn!(data_dir = %cli.data_dir.display(), "no ledger found, showing defaults");
    }
    let now = Timestamp::now();

    match cli.command {
        Command::Status { json } => {
            let summary = state.summary(None);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("accounts             {}", summary.accounts);
                println!("blacklisted          {}", summary.blacklisted);
                println!(
                    "rolling window       {} ({}s)",
                    format_duration(summary.rolling_window_secs),
                    summary.rolling_window_secs
                );
                println!("min stake            {}", summary.min_stake);
                println!("total locked         {}", summary.total_locked);
                println!("total reward         {}", summary.total_reward);
                println!("total distributed    {}", summary.total_distributed);
                println!("total retired        {}", summary.total_retired);
                println!("total claimed        {}", summary.total_claimed);
                println!("reward treasury      {}", summary.reward_treasury);
                println!("undistributed        {}", summary.undistributed_reward);
                match summary.last_distribution {
                    Some(at) => println!("last distribution    {at}"),
                    None => println!("last distribution    never"),
                }
            }
        }
        Command::Account { id, at } => {
            let id = AccountId::parse(&id).context("account id must not be empty")?;
            let staked_at = match at {
                Some(secs) => {
                    let at = Timestamp::new(secs);
                    Some((secs, state.staked_amount_at(&id, at)?))
                }
                None => None,
            };
            let maturity = match state.maturity(&id, now) {
                MaturityState::Empty => "no history".to_string(),
                MaturityState::BelowThreshold => "below minimum stake".to_string(),
                MaturityState::Maturing { since } => format!(
                    "maturing since {since} ({} elapsed)",
                    format_duration(since.elapsed_since(now))
                ),
                MaturityState::Matured { since } => format!("matured, clock started {since}"),
            };
            let view = AccountView {
                staked: state.staked_amount(&id),
                staked_at,
                maturity,
                valid: state.validity(&id, now),
                average: state.average(&id, now)?,
                staking_profit: state.staking_profit(&id),
                claimed: state.claimed(&id),
                history_horizon: state
                    .account(&id)
                    .and_then(|account| account.history_horizon)
                    .map(|t| t.as_secs()),
                id: id.to_string(),
            };
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Command::Blacklist => {
            for id in state.list_blacklist() {
                println!("{id}");
            }
        }
        Command::Verify => {
            let violations = state.check_invariants();
            if violations.is_empty() {
                println!("ok: {} accounts, no violations", state.account_count());
            } else {
                for violation in &violations {
                    println!("violation: {violation}");
                }
                anyhow::bail!("{} invariant violation(s)", violations.len());
            }
        }
        Command::Compact { now: at } => {
            let at = compaction_time(at, now)?;
            if !state.config().retention.enabled {
                println!("retention is disabled in the config, nothing compacted");
                return Ok(());
            }
            let report = state.compact(&store, at)?;
            println!(
                "compacted {} checkpoint(s) across {} account(s), cutoff {}",
                report.removed, report.accounts, report.cutoff
            );
        }
    }
    Ok(())
}

/// The instant to compact as of. Compacting as of a future time would prune
/// checkpoints that averages taken now still read.
fn compaction_time(requested: Option<u64>, now: Timestamp) -> anyhow::Result<Timestamp> {
    match requested.map(Timestamp::new) {
        Some(at) if at > now => anyhow::bail!("--now {at} lies in the future (current time {now})"),
        Some(at) => Ok(at),
        None => Ok(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compaction_time_defaults_to_now() {
        let now = Timestamp::new(1_000);
        assert_eq!(compaction_time(None, now).unwrap(), now);
        assert_eq!(compaction_time(Some(400), now).unwrap(), Timestamp::new(400));
        assert_eq!(compaction_time(Some(1_000), now).unwrap(), now);
    }

    #[test]
    fn compaction_time_rejects_the_future() {
        assert!(compaction_time(Some(1_001), Timestamp::new(1_000)).is_err());
    }

    #[test]
    fn cli_parses_compact_flags() {
        let cli = Cli::try_parse_from(["tally", "--data-dir", "/tmp/x", "compact", "--now", "42"]).unwrap();
        assert!(matches!(cli.command, Command::Compact { now: Some(42) }));
    }
}
