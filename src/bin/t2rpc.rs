use std::path::PathBuf;
use std::time::Duration;

use clap::{command, Parser, Subcommand};
use serde_json::Value;
use t2_rpc::prelude::*;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    version = "1.0",
    author = "Felix Watts",
    about = "Make JSON-RPC requests to a WebSocket server."
)]
struct Cli {
    /// host:port or a full ws:// or wss:// URI
    #[arg(short, long, default_value = t2_rpc::DEFAULT_URI)]
    uri: String,
    /// Use wss if the URI has no scheme
    #[arg(short, long)]
    secure: bool,
    /// Seconds to wait for each result, forever if not given
    #[arg(short, long)]
    timeout: Option<f64>,
    /// Log more, repeat for even more
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the server version
    Version,
    /// List the methods the server accepts
    Methods,
    /// Describe one method
    Schema { method: String },
    /// Make a request and print its result
    Call {
        method: String,
        /// JSON params
        params: Option<String>,
        /// Expect a binary payload after the reply and write it to this file
        #[arg(short, long)]
        binary_out: Option<PathBuf>,
        /// Print progress updates as they arrive
        #[arg(short, long)]
        progress: bool,
    },
    /// Send a notification
    Notify {
        method: String,
        /// JSON params
        params: Option<String>,
    },
}

fn main() {
    if let Err(e) = run() {
        println!("{}", &e.to_string());
        std::process::exit(1);
    }
}

fn run() -> RpcResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let timeout = match cli.timeout {
        Some(secs) if secs.is_finite() && secs >= 0.0 => Some(Duration::from_secs_f64(secs)),
        Some(secs) => return Err(RpcError::InternalError(format!("invalid timeout {}", secs))),
        None => None,
    };

    let client = Client::builder(&cli.uri).secure(cli.secure).connect()?;

    match cli.command {
        Commands::Version => {
            println!("{}", client.get_version(timeout)?);
        }
        Commands::Methods => {
            for method in client.get_methods(timeout)? {
                println!("{}", method);
            }
        }
        Commands::Schema { method } => {
            let entrypoint = client.get_entrypoint(&method, timeout)?;
            println!("{}", serde_json::to_string_pretty(&entrypoint)?);
        }
        Commands::Call {
            method,
            params,
            binary_out,
            progress,
        } => {
            let mut request = Request::new(method).with_params(parse_params(params)?);
            if binary_out.is_some() {
                request = request.expecting_binary();
            }
            let handle = client.send(request)?;

            if progress {
                for progress in handle.progress() {
                    eprintln!("{}: {:.0}%", progress.operation, progress.amount * 100.0);
                }
            }

            let reply = client.result_of(&handle, timeout)?;
            println!("{}", serde_json::to_string_pretty(&reply.result)?);
            if let Some(path) = binary_out {
                std::fs::write(&path, &reply.binary)?;
                eprintln!("{} bytes written to {}", reply.binary.len(), path.display());
            }
        }
        Commands::Notify { method, params } => {
            client.notify(&method, parse_params(params)?)?;
        }
    }

    client.close()
}

fn parse_params(params: Option<String>) -> RpcResult<Value> {
    match params {
        Some(params) => Ok(serde_json::from_str(&params)?),
        None => Ok(Value::Null),
    }
}

fn init_logging(verbose: u8) {
    // RUST_LOG wins over -v
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // also installs the bridge for the library's `log` records
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}
