use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context as _};
use colored::Colorize;
use dz_crypto::SigningKey;
use dz_filter::{FilterConfig, RelevanceTracker};
use dz_ledger::{InMemoryLedger, LedgerConnection, LedgerSnapshot, MemoryLedgerConfig, QueryOptions};
use dz_profile::{Profile, ProfileEngine};
use dz_protocol::{BuyerFields, Message, MessageKind, Payload, SellerFields, TransactionDraft};
use dz_types::{Address, TransferTarget};
use serde_json::json;
use tracing::debug;

use crate::cli::*;
use crate::config::CliConfig;

/// Resolved settings shared by every command.
pub struct Context {
    pub config: CliConfig,
    pub format: OutputFormat,
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context {
        config: CliConfig::from_cli(&cli)?,
        format: cli.format,
    };
    match cli.command {
        Command::Keygen => cmd_keygen(&ctx),
        Command::Address(args) => cmd_address(&ctx, args),
        Command::Publish(args) => cmd_publish(&ctx, args).await,
        Command::Mine(args) => cmd_mine(&ctx, args),
        Command::Messages(args) => cmd_messages(&ctx, args).await,
        Command::Profile(args) => cmd_profile(&ctx, args).await,
        Command::Filter(args) => cmd_filter(&ctx, args),
    }
}

fn cmd_keygen(ctx: &Context) -> anyhow::Result<()> {
    let key = SigningKey::generate();
    let addr = key.address(ctx.config.network);
    match ctx.format {
        OutputFormat::Json => print_json(&json!({
            "network": ctx.config.network,
            "address": addr,
            "secret": key.to_hex(),
        })),
        OutputFormat::Text => {
            println!("{} New {} key", "✓".green().bold(), ctx.config.network);
            println!("  Address: {}", addr.to_string().cyan());
            println!("  Secret:  {}", key.to_hex().yellow());
            Ok(())
        }
    }
}

fn cmd_address(ctx: &Context, args: AddressArgs) -> anyhow::Result<()> {
    let addr = parse_key(&args.secret)?.address(ctx.config.network);
    match ctx.format {
        OutputFormat::Json => print_json(&json!({ "network": ctx.config.network, "address": addr })),
        OutputFormat::Text => {
            println!("{addr}");
            Ok(())
        }
    }
}

async fn cmd_publish(ctx: &Context, args: PublishArgs) -> anyhow::Result<()> {
    let ledger = open_ledger(&ctx.config)?;
    let key = parse_key(&args.secret)?;
    let receiver = args
        .to
        .as_deref()
        .map(|s| ledger.parse_address(s))
        .transpose()?;
    let transfer_addr = args
        .transfer
        .as_deref()
        .map(|s| parse_transfer(&ledger, s))
        .transpose()?;

    let payload = if args.buyer {
        if args.communications.is_some() {
            bail!("buyer messages have no communications address");
        }
        Payload::Buyer(BuyerFields {
            description: args.description,
            alias: args.alias,
            transfer_addr,
        })
    } else {
        Payload::Seller(SellerFields {
            description: args.description,
            alias: args.alias,
            communications_addr: args
                .communications
                .as_deref()
                .map(|s| ledger.parse_address(s))
                .transpose()?,
            transfer_addr,
        })
    };

    let draft = TransactionDraft::message(receiver, &payload)?;
    let record = ledger.create_transaction(draft, &key).await?;
    save_ledger(&ledger, &ctx.config.ledger_path)?;

    match ctx.format {
        OutputFormat::Json => print_json(&record),
        OutputFormat::Text => {
            println!("{} Published {} message", "✓".green().bold(), payload.kind());
            println!("  Txid:     {}", record.txid.to_hex().yellow());
            println!("  Position: {}", record.position);
            println!("  From:     {}", record.sender_addr);
            println!("  To:       {}", record.receiver_addr);
            Ok(())
        }
    }
}

fn cmd_mine(ctx: &Context, args: MineArgs) -> anyhow::Result<()> {
    let ledger = open_ledger(&ctx.config)?;
    let mut height = ledger.snapshot()?.block_height;
    for _ in 0..args.blocks {
        height = ledger.increment_block_height()?;
    }
    save_ledger(&ledger, &ctx.config.ledger_path)?;
    match ctx.format {
        OutputFormat::Json => print_json(&json!({ "block_height": height })),
        OutputFormat::Text => {
            println!("{} Block height {}", "✓".green(), height.to_string().bold());
            Ok(())
        }
    }
}

async fn cmd_messages(ctx: &Context, args: MessagesArgs) -> anyhow::Result<()> {
    let ledger = open_ledger(&ctx.config)?;
    let addr = ledger.parse_address(&args.addr)?;

    let mut options = QueryOptions::new();
    options.start_block = args.start_block;
    options.end_block = args.end_block;
    options.block_height = args.block;
    options.message_type = args.kind.map(MessageKind::from);
    if let Some(other) = &args.with {
        options = options.between(addr, ledger.parse_address(other)?);
    }

    let messages = ledger.messages_for_address(&addr, &options).await?;
    match ctx.format {
        OutputFormat::Json => print_json(&messages),
        OutputFormat::Text => {
            if messages.is_empty() {
                println!("No messages for {}.", addr.to_string().cyan());
            }
            for message in &messages {
                print_message(message);
            }
            Ok(())
        }
    }
}

async fn cmd_profile(ctx: &Context, args: ProfileArgs) -> anyhow::Result<()> {
    let ledger = open_ledger(&ctx.config)?;
    let addr = ledger.parse_address(&args.addr)?;
    let kind = if args.buyer { MessageKind::Buyer } else { MessageKind::Seller };

    let mut engine_config = ctx.config.engine.clone();
    if let Some(ms) = args.deadline_ms {
        engine_config.deadline = Some(Duration::from_millis(ms));
    }
    let engine = ProfileEngine::with_config(&ledger, engine_config);
    let profile = if args.validate {
        engine.validated_profile(&addr, kind).await?
    } else {
        engine.profile(&addr, kind).await?
    };

    match ctx.format {
        OutputFormat::Json => print_json(&profile),
        OutputFormat::Text => {
            print_profile(&profile);
            Ok(())
        }
    }
}

fn cmd_filter(ctx: &Context, args: FilterArgs) -> anyhow::Result<()> {
    let mut config: FilterConfig = ctx.config.filter.clone();
    if let Some(tweak) = args.tweak {
        config.tweak = tweak;
    }
    config.expected_addresses = config.expected_addresses.max(args.addrs.len());

    let mut tracker = RelevanceTracker::new(&config);
    for raw in &args.addrs {
        let addr = Address::parse(raw, Some(ctx.config.network))
            .with_context(|| format!("invalid address {raw}"))?;
        tracker.track(addr);
    }

    let filter = tracker.filter();
    match ctx.format {
        OutputFormat::Json => print_json(&json!({
            "addresses": tracker.addresses().collect::<Vec<_>>(),
            "size_bits": filter.size_bits(),
            "hash_funcs": filter.hash_funcs(),
            "tweak": filter.tweak(),
            "data": hex::encode(filter.as_bytes()),
        })),
        OutputFormat::Text => {
            println!(
                "{} Filter for {} address(es): {} bits, {} hashes, tweak {}",
                "✓".green(),
                tracker.len(),
                filter.size_bits(),
                filter.hash_funcs(),
                filter.tweak()
            );
            println!("  Estimated FPR: {:.6}", filter.estimated_fpr());
            println!("  Data: {}", hex::encode(filter.as_bytes()).dimmed());
            Ok(())
        }
    }
}

/// Load the snapshot at the configured path, or start an empty ledger when
/// the file does not exist yet.
pub fn open_ledger(config: &CliConfig) -> anyhow::Result<InMemoryLedger> {
    let path = &config.ledger_path;
    if !path.exists() {
        return Ok(InMemoryLedger::new(MemoryLedgerConfig {
            network: config.network,
            starting_block_height: 0,
        }));
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading ledger {}", path.display()))?;
    let snapshot: LedgerSnapshot = serde_json::from_str(&text)
        .with_context(|| format!("parsing ledger {}", path.display()))?;
    if snapshot.network != config.network {
        bail!(
            "ledger {} is a {} snapshot, expected {}",
            path.display(),
            snapshot.network,
            config.network
        );
    }
    debug!(
        path = %path.display(),
        transactions = snapshot.transactions.len(),
        block_height = snapshot.block_height,
        "loaded ledger snapshot"
    );
    Ok(InMemoryLedger::from_snapshot(snapshot)?)
}

pub fn save_ledger(ledger: &InMemoryLedger, path: &Path) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(&ledger.snapshot()?)?;
    debug!(path = %path.display(), "saving ledger snapshot");
    std::fs::write(path, text).with_context(|| format!("writing ledger {}", path.display()))
}

fn parse_key(secret: &str) -> anyhow::Result<SigningKey> {
    SigningKey::from_hex(secret.trim()).context("invalid signing key")
}

fn parse_transfer(ledger: &InMemoryLedger, s: &str) -> anyhow::Result<TransferTarget> {
    if s == "0" {
        Ok(TransferTarget::Closed)
    } else {
        Ok(TransferTarget::Address(ledger.parse_address(s)?))
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_message(message: &Message) {
    println!(
        "{} {} {} {} → {}",
        message.position.to_string().dimmed(),
        message.txid.short_id().yellow(),
        message.kind().to_string().cyan(),
        message.sender_addr,
        message.receiver_addr
    );
    let payload = &message.payload;
    if let Some(d) = payload.description() {
        println!("    description: {d}");
    }
    if let Some(a) = payload.alias() {
        println!("    alias: {a}");
    }
    if let Some(c) = payload.communications_addr() {
        println!("    communications: {c}");
    }
    if let Some(t) = payload.transfer_addr() {
        println!("    transfer: {t}");
    }
}

fn print_profile(profile: &Profile) {
    if !profile.is_found() {
        println!("No {} profile at {}.", profile.kind, profile.addr.to_string().cyan());
    } else {
        let status = if profile.is_closed {
            "closed".red()
        } else if profile.is_active {
            "active".green()
        } else {
            "transferred".yellow()
        };
        println!("{} profile {} ({})", profile.kind, profile.addr.to_string().cyan().bold(), status);
        if let Some(d) = &profile.description {
            println!("  Description:    {d}");
        }
        if let Some(a) = &profile.alias {
            println!("  Alias:          {a}");
        }
        if let Some(c) = &profile.communications_addr {
            println!("  Communications: {c}");
        }
        if let Some(t) = &profile.transfer_addr {
            println!("  Transfer:       {t}");
        }
    }
    match &profile.validation {
        Some(Ok(())) => println!("  Validation:     {}", "ok".green()),
        Some(Err(violation)) => println!("  Validation:     {}", violation.to_string().red()),
        None => {}
    }
}
