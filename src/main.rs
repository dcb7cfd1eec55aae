//! pallet-plan - CLI tool to plan and check pallet loads for a production order.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pallet_core::{
    can_merge, review_order, Destination, MemoryPlanner, OrderBook, PalletCache, PalletConfig,
    PalletId, PieceId, PositionId, TransferRequest,
};

/// Plan and check pallet loads of cut panels against weight and height limits.
#[derive(Parser, Debug)]
#[command(name = "pallet-plan")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Order file (JSON) with pieces and pallets
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the updated order (defaults to the input file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pallet limits configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check every pallet against its limits and print order totals
    Report,
    /// Suggest how many units of a piece still fit on a pallet
    Suggest {
        #[arg(long)]
        pallet: u64,
        #[arg(long)]
        piece: u64,
    },
    /// Move every unit of one pallet onto another and delete the source
    Merge {
        #[arg(long)]
        target: u64,
        #[arg(long)]
        source: u64,
    },
    /// Move units of a piece onto a pallet (from the pool without --from)
    Transfer {
        #[arg(long)]
        piece: u64,
        #[arg(long)]
        to: u64,
        #[arg(long)]
        from: Option<u64>,
        #[arg(long)]
        quantity: u32,
    },
    /// Create pallets for every unassigned piece of a position
    Plan {
        #[arg(long)]
        position: u64,
        #[arg(long)]
        destination: Destination,
    },
    /// Close a pallet
    Close {
        #[arg(long)]
        pallet: u64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete a pallet
    Delete {
        #[arg(long)]
        pallet: u64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = match &args.config {
        Some(path) => PalletConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PalletConfig::default(),
    };

    info!("Processing: {}", args.input.display());

    let book = OrderBook::from_json_file(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let order_id = book.order_id;
    info!(
        "Order {}: {} piece type(s), {} pallet(s)",
        order_id,
        book.pieces.len(),
        book.pallets.len()
    );

    let mut cache = PalletCache::new(MemoryPlanner::new(book), order_id, config);
    cache.fetch(false).await?;

    let changed = match args.command {
        Command::Report => {
            report(&cache, args.json)?;
            false
        }
        Command::Suggest { pallet, piece } => {
            let advice = cache.suggest(PalletId(pallet), PieceId(piece))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&advice)?);
            } else {
                println!(
                    "Pallet {} can take {} more of piece {} (available {}, by weight {}, by height {}; limited by {:?})",
                    pallet,
                    advice.max,
                    piece,
                    advice.available,
                    advice.by_weight,
                    advice.by_height,
                    advice.limiting
                );
            }
            false
        }
        Command::Merge { target, source } => {
            let (target, source) = (PalletId(target), PalletId(source));
            let target_pallet = cache
                .pallet(target)
                .with_context(|| format!("Pallet {} not found", target))?;
            let source_pallet = cache
                .pallet(source)
                .with_context(|| format!("Pallet {} not found", source))?;

            let verdict = can_merge(&target_pallet, &source_pallet);
            if let Some(reason) = verdict.reason {
                anyhow::bail!("Cannot merge: {}", reason);
            }
            for assignment in &source_pallet.assignments {
                cache
                    .transfer(TransferRequest {
                        source: Some(source),
                        target,
                        piece_id: assignment.piece_id(),
                        quantity: assignment.quantity,
                    })
                    .await?;
            }
            cache.delete(source).await?;
            info!("Merged pallet {} into {}", source, target);
            true
        }
        Command::Transfer {
            piece,
            to,
            from,
            quantity,
        } => {
            cache
                .transfer(TransferRequest {
                    source: from.map(PalletId),
                    target: PalletId(to),
                    piece_id: PieceId(piece),
                    quantity,
                })
                .await?;
            true
        }
        Command::Plan {
            position,
            destination,
        } => {
            let ids = cache.plan(PositionId(position), destination).await?;
            info!("Created {} pallet(s)", ids.len());
            if args.json {
                println!("{}", serde_json::to_string_pretty(&ids)?);
            }
            true
        }
        Command::Close { pallet, notes } => {
            cache.close(PalletId(pallet), notes).await?;
            info!("Closed pallet {}", pallet);
            true
        }
        Command::Delete { pallet } => {
            cache.delete(PalletId(pallet)).await?;
            info!("Deleted pallet {}", pallet);
            true
        }
    };

    if !changed {
        return Ok(());
    }

    let output_path = args.output.unwrap_or(args.input);
    cache
        .service()
        .snapshot()
        .write_json_file(&output_path)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    info!("Written: {}", output_path.display());

    Ok(())
}

fn report(cache: &PalletCache<MemoryPlanner>, json: bool) -> Result<()> {
    let pallets = cache.pallets();
    let stats = cache.stats();

    if json {
        let report = serde_json::json!({
            "stats": stats,
            "pallets": pallets
                .iter()
                .map(|p| serde_json::json!({
                    "pallet": p,
                    "weight_kg": p.total_weight(),
                    "height_mm": p.stack_height(),
                    "limits": p.limit_report(),
                }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for pallet in &pallets {
            let limits = pallet.limit_report();
            println!(
                "#{:<3} {:<12} {:>5} pcs {:>7.1} kg ({:>3.0}%) {:>6.0} mm ({:>3.0}%) {}",
                pallet.number,
                pallet.destination,
                pallet.total_pieces(),
                pallet.total_weight(),
                limits.weight_percent,
                pallet.stack_height(),
                limits.height_percent,
                if pallet.is_closed() { "closed" } else { "open" }
            );
        }
        println!(
            "{} pallet(s), {} piece(s), {:.1} kg, {:.0}% of capacity",
            stats.pallet_count, stats.total_pieces, stats.total_weight_kg, stats.utilization_percent
        );
    }

    let validation = review_order(&pallets, cache.pieces());

    for warning in &validation.warnings {
        warn!("{}", warning);
    }

    for err in &validation.errors {
        error!("{}", err);
    }

    if !validation.passed {
        anyhow::bail!("Validation failed");
    }

    Ok(())
}
