use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use dz_protocol::MessageKind;
use dz_types::Network;

#[derive(Parser)]
#[command(
    name = "dz",
    about = "Dropzone: seller and buyer profiles carried in ledger transactions",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Configuration file (defaults to ./dz.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Network addresses are scoped to (mainnet, testnet)
    #[arg(long, global = true)]
    pub network: Option<Network>,

    /// Ledger snapshot file
    #[arg(long, global = true)]
    pub ledger: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum KindArg {
    Seller,
    Buyer,
}

impl From<KindArg> for MessageKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Seller => MessageKind::Seller,
            KindArg::Buyer => MessageKind::Buyer,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a signing key and its address
    Keygen,
    /// Show the address of a signing key
    Address(AddressArgs),
    /// Sign a seller or buyer message into the ledger snapshot
    Publish(PublishArgs),
    /// Advance the snapshot's block height
    Mine(MineArgs),
    /// List verified messages sent or received by an address
    Messages(MessagesArgs),
    /// Reconstruct the current profile at an address
    Profile(ProfileArgs),
    /// Build the bloom filter a peer would use to relay relevant transactions
    Filter(FilterArgs),
}

#[derive(Args)]
pub struct AddressArgs {
    /// Hex-encoded signing key
    #[arg(long, env = "DZ_SECRET")]
    pub secret: String,
}

#[derive(Args)]
pub struct PublishArgs {
    /// Hex-encoded signing key
    #[arg(long, env = "DZ_SECRET")]
    pub secret: String,
    /// Receiver address; defaults to the sender
    #[arg(long)]
    pub to: Option<String>,
    /// Publish a buyer message instead of a seller message
    #[arg(long)]
    pub buyer: bool,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub alias: Option<String>,
    /// Communications address (sellers only)
    #[arg(long)]
    pub communications: Option<String>,
    /// Transfer target address, or 0 to close the profile
    #[arg(long)]
    pub transfer: Option<String>,
}

#[derive(Args)]
pub struct MineArgs {
    #[arg(default_value = "1")]
    pub blocks: u64,
}

#[derive(Args)]
pub struct MessagesArgs {
    pub addr: String,
    #[arg(long = "type")]
    pub kind: Option<KindArg>,
    #[arg(long)]
    pub start_block: Option<u64>,
    #[arg(long)]
    pub end_block: Option<u64>,
    /// Exact block height; overrides the range
    #[arg(long)]
    pub block: Option<u64>,
    /// Only messages exchanged with this address
    #[arg(long)]
    pub with: Option<String>,
}

#[derive(Args)]
pub struct ProfileArgs {
    pub addr: String,
    #[arg(long)]
    pub buyer: bool,
    /// Also report soundness problems with the profile's establishment
    #[arg(long)]
    pub validate: bool,
    /// Abort if the ledger takes longer than this
    #[arg(long)]
    pub deadline_ms: Option<u64>,
}

#[derive(Args)]
pub struct FilterArgs {
    #[arg(required = true)]
    pub addrs: Vec<String>,
    #[arg(long)]
    pub tweak: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "dz", "profile", "someaddr", "--validate", "--network", "mainnet", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.network, Some(Network::Mainnet));
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Command::Profile(args) => {
                assert_eq!(args.addr, "someaddr");
                assert!(args.validate);
                assert!(!args.buyer);
            }
            _ => panic!("expected profile command"),
        }
    }

    #[test]
    fn messages_type_flag() {
        let cli = Cli::try_parse_from(["dz", "messages", "a", "--type", "buyer"]).unwrap();
        match cli.command {
            Command::Messages(args) => {
                assert_eq!(args.kind.map(MessageKind::from), Some(MessageKind::Buyer))
            }
            _ => panic!("expected messages command"),
        }
    }
}
