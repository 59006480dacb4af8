// Copyright 2023-2025 StorSwift Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::chain::time::time_now;
use crate::client::archive::ArchiveClient;
use crate::client::archive::ArchiveFile;
use crate::client::Client;
use crate::client::VerifyingClient;
use crate::crypto::Bls;
use crate::crypto::Primitives;
use crate::crypto::Scheme;
use crate::info;
use crate::log::init_log;
use crate::log::Logger;
use crate::verify::Config;

use anyhow::bail;
use anyhow::Context;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use energon::drand::schemes::DefaultScheme;
use energon::drand::schemes::SigsOnG1Scheme;
use std::io::Write;
use std::path::PathBuf;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "drand-verify")]
#[command(about = "Verify drand randomness stored in a chain archive", long_about = None)]
pub struct Cli {
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Chain archive file (TOML) with chain info and stored rounds.
    #[arg(long)]
    archive: PathBuf,
    /// Always verify the previous signature of chained rounds by walking the chain from genesis or the latest trusted round.
    #[arg(long)]
    strict: bool,
    /// First round signed with the v2 scheme, v2 verification is disabled if not specified.
    #[arg(long)]
    v2from: Option<u64>,
}

impl VerifyArgs {
    fn config(&self) -> Config {
        Config {
            strict: self.strict,
            v2_from: self.v2from.unwrap_or(u64::MAX),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print a verified round of randomness.
    Get {
        #[command(flatten)]
        args: VerifyArgs,
        /// Round to verify, the latest stored round if not specified.
        round: Option<u64>,
    },
    /// Print all stored rounds in order, rounds failing verification are skipped.
    Watch {
        #[command(flatten)]
        args: VerifyArgs,
    },
    /// Print the round of the chain at the given time.
    RoundAt {
        /// Chain archive file (TOML) with chain info.
        #[arg(long)]
        archive: PathBuf,
        /// UNIX time in seconds, current time if not specified.
        time: Option<u64>,
    },
    /// List all scheme ids available to use
    ListSchemes,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        init_log(self.verbose)?;
        self.commands.execute(&mut std::io::stdout()).await
    }
}

/// Commands served from an archive.
enum Action {
    Get { round: Option<u64>, config: Config },
    Watch { config: Config },
    RoundAt { time: Option<u64> },
}

impl Commands {
    pub async fn execute<W: Write>(self, out: &mut W) -> anyhow::Result<()> {
        let (path, action) = match self {
            Commands::Get { args, round } => {
                let config = args.config();
                (args.archive, Action::Get { round, config })
            }
            Commands::Watch { args } => {
                let config = args.config();
                (args.archive, Action::Watch { config })
            }
            Commands::RoundAt { archive, time } => (archive, Action::RoundAt { time }),
            Commands::ListSchemes => {
                let msg = [DefaultScheme::ID, SigsOnG1Scheme::ID].join("\n");
                writeln!(out, "Supported schemes:\n{msg}")?;
                return Ok(());
            }
        };
        let data = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read archive {}", path.display()))?;
        let archive = ArchiveFile::parse(&data)?;

        match archive.scheme()? {
            DefaultScheme::ID => action.execute(&archive, Bls::<DefaultScheme>::new(), out).await,
            SigsOnG1Scheme::ID => action.execute(&archive, Bls::<SigsOnG1Scheme>::new(), out).await,
            unknown => bail!("unknown scheme: {unknown}"),
        }
    }
}

impl Action {
    async fn execute<P: Primitives, W: Write>(
        self,
        archive: &ArchiveFile,
        primitives: P,
        out: &mut W,
    ) -> anyhow::Result<()> {
        let client: ArchiveClient<P::Key> = archive.load(|bytes| primitives.decode_key(bytes))?;
        let log = Logger::register_client("cli");

        match self {
            Action::Get { round, config } => {
                let round = match round {
                    Some(round) => round,
                    None => client.last_round().context("archive has no rounds")?,
                };
                let verifying = VerifyingClient::from_client(client, primitives, config, log);
                info!(verifying.logger(), "{verifying}: verifying round {round}");

                let rd = verifying.get(round).await?;
                write!(out, "{}", rd.to_toml()?)?;
            }
            Action::Watch { config } => {
                let verifying = VerifyingClient::from_client(client, primitives, config, log);
                let mut stream = verifying.watch(CancellationToken::new()).await;
                while let Some(rd) = stream.next().await {
                    writeln!(out, "{}", rd.to_toml()?)?;
                }
            }
            Action::RoundAt { time } => {
                let time = time.unwrap_or_else(|| time_now().as_secs());
                let info = client.info().await?;
                let round = info.round_at(time);
                writeln!(out, "round = {round}\ntime = {}", info.time_of(round))?;
            }
        }

        Ok(())
    }
}
