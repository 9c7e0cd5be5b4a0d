use anyhow::Result;
use clap::{Parser, Subcommand};
use tinytransfer_cli::{commands, PacketKind};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "tinytransfer")]
#[command(about = "TinyTransfer - Checksummed packet framing for lossy links", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack JSON values into update packets
    Pack {
        /// Input JSON file (array of payloads)
        #[arg(short, long)]
        input: String,

        /// Output file for packed packets
        #[arg(short, long)]
        output: String,

        /// Compress payloads with raw DEFLATE
        #[arg(long)]
        compress: bool,

        /// Mark packets as integrator-sourced (no log)
        #[arg(long)]
        integrator: bool,

        /// Starting packet ID
        #[arg(long, default_value = "1")]
        start_id: u32,

        /// Log text attached to every packet
        #[arg(long)]
        log: Option<String>,
    },

    /// Encode a single RPC packet
    Rpc {
        /// Output file
        #[arg(short, long)]
        output: String,

        /// Caller nonce
        #[arg(long, default_value = "0")]
        nonce: u32,

        /// Procedure ID
        #[arg(long)]
        proc_id: u16,

        /// Arguments as hex
        #[arg(long)]
        args_hex: Option<String>,

        /// Append to the output file instead of replacing it
        #[arg(long)]
        append: bool,
    },

    /// Scan a captured dump and recover packets
    Scan {
        /// Input file to scan ("-" for stdin)
        #[arg(short, long)]
        input: String,

        /// Packet family to look for
        #[arg(long, value_enum, default_value_t = PacketKind::Update)]
        kind: PacketKind,

        /// Output JSON file for recovered packets
        #[arg(short, long)]
        output: Option<String>,

        /// Show statistics only
        #[arg(long)]
        stats_only: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Pack {
            input,
            output,
            compress,
            integrator,
            start_id,
            log,
        } => {
            let options = commands::pack::PackOptions {
                compress,
                integrator,
                start_id,
                log,
            };
            commands::pack::execute(&input, &output, &options).map(|_| ())
        }

        Commands::Rpc {
            output,
            nonce,
            proc_id,
            args_hex,
            append,
        } => commands::rpc::execute(&output, nonce, proc_id, args_hex.as_deref(), append),

        Commands::Scan {
            input,
            kind,
            output,
            stats_only,
        } => commands::scan::execute(&input, kind, output.as_deref(), stats_only),
    }
}
