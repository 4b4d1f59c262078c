// SPDX-License-Identifier: GPL-3.0-or-later
//
// mintgate
// Copyright (C) 2025  Nikita Podvirnyi <krypt0nn@vk.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use alloy::signers::local::PrivateKeySigner;
use tracing_subscriber::EnvFilter;

use mintgate_protocol::prelude::*;

pub mod consts;
pub mod config;
pub mod database;
pub mod governance;
pub mod identities;

use config::Config;
use database::Database;
use database::action::{ActionInfo, ActionRecord};
use database::request::{MintRequest, MintRequestInfo, MintRequestRecord};
use governance::*;
use identities::Identity;

/// Timeout of a single JSON-RPC request.
const RPC_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command
}

#[derive(Subcommand)]
enum Command {
    /// Configuration file management.
    Config {
        #[command(subcommand)]
        command: ConfigCommand
    },

    /// Local signer keys management.
    Keypair {
        #[command(subcommand)]
        command: KeypairCommand
    },

    /// Rewarded user actions management.
    Action {
        #[command(subcommand)]
        command: ActionCommand
    },

    /// Mint requests management.
    Request {
        #[command(subcommand)]
        command: RequestCommand
    },

    /// Sign mint requests with a local identity.
    Sign {
        /// Title of the signing identity.
        #[arg(short, long)]
        identity: String,

        /// IDs of the mint requests, signed in the given order.
        #[arg(required = true)]
        ids: Vec<i64>
    },

    /// Submit signed mint requests to the settlement contract.
    Submit {
        /// Submit all the signed mint requests.
        #[arg(long, conflicts_with = "ids")]
        all: bool,

        /// IDs of the mint requests, submitted in the given order.
        ids: Vec<i64>
    },

    /// Check on-chain state of failed mint requests which have a transaction.
    Reconcile,

    /// Print mint requests statistics.
    Stats
}

impl Command {
    pub async fn run(self) -> anyhow::Result<()> {
        match self {
            Self::Config { command } => command.run()?,
            Self::Keypair { command } => command.run()?,
            Self::Action { command } => command.run()?,
            Self::Request { command } => command.run()?,

            Self::Sign { identity, ids } => {
                let identity = identities::find(&identity)?;

                let (database, config) = open()?;

                let records = open_records(&database, &ids)?;
                let batch = batch_orchestrator(&config)?;

                let signer = identity.signer();

                let success = batch.batch_sign(&records, &signer, |progress| {
                    match progress.result {
                        Ok(request) => println!(
                            "[{}/{}] request #{}: {} ({}/3 groups)",
                            progress.done,
                            progress.total,
                            progress.request_id,
                            request.status,
                            request.signatures.len()
                        ),

                        Err(err) => println!(
                            "[{}/{}] request #{}: {err}",
                            progress.done,
                            progress.total,
                            progress.request_id
                        )
                    }
                }).await;

                println!("signed {success} of {} requests", records.len());
            }

            Self::Submit { all, ids } => {
                let (database, config) = open()?;

                let records = if all {
                    database.requests(Some(MintStatus::Signed)).collect()
                } else {
                    open_records(&database, &ids)?
                };

                let batch = batch_orchestrator(&config)?;

                let success = batch.batch_submit(&records, |progress| {
                    match progress.result {
                        Ok(submission) => println!(
                            "[{}/{}] request #{}: {} (tx {})",
                            progress.done,
                            progress.total,
                            progress.request_id,
                            submission.confirmation,
                            submission.tx_hash
                        ),

                        Err(err) => println!(
                            "[{}/{}] request #{}: {err}",
                            progress.done,
                            progress.total,
                            progress.request_id
                        )
                    }
                }).await;

                println!("submitted {success} of {} requests", records.len());
            }

            Self::Reconcile => {
                let (database, config) = open()?;

                let reconciler = Reconciler::new(database, chain_client(&config)?);

                let report = reconciler.reconcile().await
                    .context("failed to reconcile mint requests")?;

                println!("reconciled:       {}", report.reconciled);
                println!("genuinely failed: {}", report.genuinely_failed);
                println!("no receipt:       {}", report.no_receipt);
            }

            Self::Stats => {
                let (database, _) = open()?;

                let stats = database.stats()
                    .context("failed to calculate statistics")?;

                println!("total: {}", stats.total);

                for status in MintStatus::ALL {
                    println!("  {:<12} {}", status.as_str(), stats.count(status));
                }

                println!("confirmed amount: {}", stats.confirmed_amount);
                println!("pending amount:   {}", stats.pending_amount);
                println!("reconcilable:     {}", stats.reconcilable);
            }
        }

        Ok(())
    }
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write default config file to the data folder.
    Init
}

impl ConfigCommand {
    pub fn run(self) -> anyhow::Result<()> {
        match self {
            Self::Init => {
                if consts::CONFIG_PATH.exists() {
                    anyhow::bail!("config file already exists: {:?}", consts::CONFIG_PATH.as_path());
                }

                Config::default().write(consts::CONFIG_PATH.as_path())
                    .context("failed to write config file")?;

                println!("{}", consts::CONFIG_PATH.display());
            }
        }

        Ok(())
    }
}

#[derive(Subcommand)]
enum KeypairCommand {
    /// Create new random identity and print its address.
    Create {
        /// Title of the identity, used as the signer name.
        title: String
    },

    /// Print address of the provided hex-encoded secret key, or of the
    /// identity with the given title.
    Address {
        #[arg(long, conflicts_with = "identity")]
        secret: Option<String>,

        #[arg(long)]
        identity: Option<String>
    },

    /// List stored identities.
    List
}

impl KeypairCommand {
    pub fn run(self) -> anyhow::Result<()> {
        match self {
            Self::Create { title } => {
                let mut identities = identities::read()?;

                if identities.iter().any(|identity| identity.title() == &title) {
                    anyhow::bail!("identity '{title}' already exists");
                }

                let identity = Identity::new(title, PrivateKeySigner::random());

                println!("{}", identity.address());

                identities.push(identity);

                identities::write(identities)
                    .context("failed to write identities list")?;
            }

            Self::Address { secret, identity } => {
                let address = match (secret, identity) {
                    (Some(secret), _) => {
                        secret.trim()
                            .parse::<PrivateKeySigner>()
                            .context("invalid secret key")?
                            .address()
                    }

                    (None, Some(identity)) => identities::find(&identity)?.address(),

                    (None, None) => anyhow::bail!("either secret key or identity must be provided")
                };

                println!("{address}");
            }

            Self::List => {
                for identity in identities::read()? {
                    println!("{}  {}", identity.address(), identity.title());
                }
            }
        }

        Ok(())
    }
}

#[derive(Subcommand)]
enum ActionCommand {
    /// Register new eligible action and print its ID.
    Add {
        #[arg(long)]
        user: String,

        /// Name of the rewarded action kind.
        #[arg(long)]
        kind: String
    }
}

impl ActionCommand {
    pub fn run(self) -> anyhow::Result<()> {
        match self {
            Self::Add { user, kind } => {
                let (database, _) = open()?;

                let action = ActionRecord::create(database, &ActionInfo {
                    user_id: user,
                    kind
                }).context("failed to create action")?;

                println!("{}", action.id());
            }
        }

        Ok(())
    }
}

#[derive(Subcommand)]
enum RequestCommand {
    /// Create new mint request and print its ID.
    Create {
        #[arg(long)]
        user: String,

        #[arg(long)]
        recipient: Address,

        /// Amount of tokens in minor units.
        #[arg(long)]
        amount: u128,

        /// Hash of the rewarded actions evidence.
        #[arg(long)]
        evidence: B256,

        /// Name of the rewarded action passed to the contract.
        #[arg(long)]
        action_name: String,

        /// Recipient's nonce. Next unused one is taken by default.
        #[arg(long)]
        nonce: Option<u64>,

        /// IDs of eligible actions settled by this request.
        #[arg(long, value_delimiter = ',')]
        actions: Vec<i64>,

        /// Hex-encoded signature of the legacy single-signer path.
        #[arg(long)]
        legacy_signature: Option<String>
    },

    /// List mint requests.
    List {
        #[arg(long)]
        status: Option<MintStatus>
    },

    /// Show mint request details.
    Show {
        id: i64
    },

    /// Reject mint request and release its actions as rejected.
    Reject {
        id: i64,

        #[arg(long)]
        reason: String
    },

    /// Reset failed mint request so it can be signed again.
    Reset {
        id: i64
    },

    /// Delete mint request and return its actions to the eligible state.
    Delete {
        id: i64
    }
}

impl RequestCommand {
    pub fn run(self) -> anyhow::Result<()> {
        let (database, _) = open()?;

        match self {
            Self::Create {
                user,
                recipient,
                amount,
                evidence,
                action_name,
                nonce,
                actions,
                legacy_signature
            } => {
                let nonce = match nonce {
                    Some(nonce) => nonce,
                    None => MintRequestRecord::next_nonce(&database, &recipient)?
                };

                let legacy_signature = match legacy_signature {
                    Some(signature) => Some({
                        let signature = alloy::hex::decode(signature.trim())
                            .context("failed to decode legacy signature")?;

                        Signature::from_raw(&signature)
                            .context("invalid legacy signature")?
                    }),

                    None => None
                };

                let record = MintRequestRecord::create(database, &MintRequestInfo {
                    user_id: user,
                    recipient,
                    amount,
                    evidence_hash: evidence,
                    action_hash: Some(action_hash(&action_name)),
                    action_name,
                    nonce,
                    legacy_signature,
                    action_ids: actions
                }).context("failed to create mint request")?;

                println!("{}", record.id());
            }

            Self::List { status } => {
                for record in database.requests(status) {
                    let request = record.load()?;

                    println!(
                        "#{:<6} {:<12} {} amount={} nonce={} groups={}/3",
                        request.id,
                        request.status.as_str(),
                        request.recipient,
                        request.amount,
                        request.nonce,
                        request.signatures.len()
                    );
                }
            }

            Self::Show { id } => {
                let request = MintRequestRecord::open(database, id)?.load()?;

                print_request(&request);
            }

            Self::Reject { id, reason } => {
                let request = MintRequestRecord::open(database, id)?.reject(reason)?;

                print_request(&request);
            }

            Self::Reset { id } => {
                let request = MintRequestRecord::open(database, id)?.reset()?;

                print_request(&request);
            }

            Self::Delete { id } => {
                MintRequestRecord::open(database, id)?.delete()?;
            }
        }

        Ok(())
    }
}

fn print_request(request: &MintRequest) {
    println!("id:            {}", request.id);
    println!("status:        {}", request.status);
    println!("user:          {}", request.user_id);
    println!("recipient:     {}", request.recipient);
    println!("amount:        {}", request.amount);
    println!("action:        {}", request.action_name);
    println!("evidence hash: {}", request.evidence_hash);
    println!("nonce:         {}", request.nonce);
    println!("actions:       {:?}", request.action_ids);

    if request.is_legacy() {
        println!("legacy signature");
    }

    for group in GovernanceGroup::ALL {
        match request.signatures.get(&group) {
            Some(signature) => println!(
                "  {:<8} signed by {} ({})",
                group.as_str(),
                signature.signer_name,
                signature.signer
            ),

            None => println!("  {:<8} missing", group.as_str())
        }
    }

    if let Some(tx_hash) = &request.tx_hash {
        println!("tx hash:       {tx_hash}");
    }

    if let Some(block_number) = request.block_number {
        println!("block:         {block_number}");
    }

    if request.retry_count > 0 {
        println!("retries:       {}", request.retry_count);
    }

    if let Some(error) = &request.error_message {
        println!("error:         {error}");
    }

    if let Some(reason) = &request.rejection_reason {
        println!("rejected:      {reason}");
    }
}

fn open() -> anyhow::Result<(Database, Config)> {
    let database = Database::open(consts::DATABASE_PATH.as_path())
        .context("failed to open mintgate database")?;

    let config = Config::read(consts::CONFIG_PATH.as_path())?;

    Ok((database, config))
}

fn open_records(database: &Database, ids: &[i64]) -> anyhow::Result<Vec<MintRequestRecord>> {
    ids.iter()
        .map(|id| {
            MintRequestRecord::open(database.clone(), *id)
                .with_context(|| format!("failed to open mint request {id}"))
        })
        .collect()
}

fn chain_client(config: &Config) -> anyhow::Result<Arc<dyn ChainClient>> {
    let client = ProviderChainClient::connect_http(&config.rpc_url, config.submitter, RPC_TIMEOUT)
        .context("failed to create rpc client")?;

    let client: Arc<dyn ChainClient> = Arc::new(client);

    Ok(client)
}

fn batch_orchestrator(config: &Config) -> anyhow::Result<BatchOrchestrator> {
    let chain = chain_client(config)?;

    let tracker = ConfirmationTracker::new(
        chain.clone(),
        config.min_confirmations,
        config.confirmation_timeout(),
        config.receipt_poll_interval()
    );

    let submitter = ChainSubmitter::new(chain, config.contract, config.chain_id, tracker);
    let collector = SignatureCollector::new(config.registry()?, config.domain());

    Ok(BatchOrchestrator::new(collector, submitter, config.batch_delay()))
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter({
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        })
        .with_writer(std::io::stderr)
        .init();

    std::fs::create_dir_all(consts::DATA_FOLDER.as_path())
        .map_err(|err| {
            anyhow::anyhow!(err)
                .context("failed to create mintgate data folder")
        })?;

    Cli::parse().command.run().await
}
