use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use serde_json::json;
use tonic::transport::Channel;
use tonic::Request;
use tracing::debug;

use roombroker_api::proto::room_broker_client::RoomBrokerClient;
use roombroker_api::proto::{AuthenticateRequest, CreateRoomRequest, SelectQosRequest};
use roombroker_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use roombroker_core::mint_credential;

#[derive(Parser, Debug)]
#[command(name = "roombroker")]
#[command(author, version, about = "Room broker command line client", long_about = None)]
struct Args {
    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// Broker gRPC endpoint
    #[arg(short, long, default_value = "http://127.0.0.1:50051")]
    endpoint: String,

    /// Deadline sent with each call, in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mint a credential signed with ROOMBROKER_JWT_SECRET
    Token {
        /// Identity claim to embed
        #[arg(long)]
        user_id: String,

        /// Lifetime of the credential, e.g. `1h` (no expiry when omitted)
        #[arg(long)]
        ttl: Option<humantime::Duration>,
    },

    /// Verify a credential with the broker
    Authenticate {
        /// Bearer credential
        #[arg(long)]
        token: String,
    },

    /// Register a new room
    CreateRoom {
        #[arg(long)]
        user_id: String,

        #[arg(long)]
        name: String,
    },

    /// Ask whether a QoS proposal is admissible
    SelectQos {
        #[arg(long)]
        room_id: String,

        #[arg(long, allow_negative_numbers = true)]
        bandwidth_kb: i32,

        #[arg(long, allow_negative_numbers = true)]
        latency_ms: i32,
    },
}

fn with_deadline<T>(message: T, timeout: Duration) -> Request<T> {
    let mut request = Request::new(message);
    request.set_timeout(timeout);
    request
}

async fn connect(endpoint: &str) -> Result<RoomBrokerClient<Channel>> {
    debug!(endpoint, "Connecting to broker");
    RoomBrokerClient::connect(endpoint.to_string())
        .await
        .with_context(|| format!("Failed to connect to {}", endpoint))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args.log_level.parse().unwrap_or_else(|_| {
        eprintln!("Invalid log level '{}', using 'warn'", args.log_level);
        LogLevel::Warn
    });
    init_logging_with_config(LogConfig::new(log_level).json_format(args.json_logs))?;

    let timeout = Duration::from_millis(args.timeout_ms);

    let output = match args.command {
        Command::Token { user_id, ttl } => {
            let secret = std::env::var("ROOMBROKER_JWT_SECRET")
                .context("ROOMBROKER_JWT_SECRET must be set to mint credentials")?;
            let token = mint_credential(&SecretString::new(secret), &user_id, ttl.map(Into::into))?;
            json!({ "token": token })
        }
        Command::Authenticate { token } => {
            let mut client = connect(&args.endpoint).await?;
            let response = client
                .authenticate(with_deadline(AuthenticateRequest { token }, timeout))
                .await?
                .into_inner();
            json!({
                "valid": response.valid,
                "userId": response.user_id,
                "error": response.error,
            })
        }
        Command::CreateRoom { user_id, name } => {
            let mut client = connect(&args.endpoint).await?;
            let response = client
                .create_room(with_deadline(
                    CreateRoomRequest {
                        user_id,
                        room_name: name,
                    },
                    timeout,
                ))
                .await?
                .into_inner();
            json!({
                "roomId": response.room_id,
                "error": response.error,
            })
        }
        Command::SelectQos {
            room_id,
            bandwidth_kb,
            latency_ms,
        } => {
            let mut client = connect(&args.endpoint).await?;
            let response = client
                .select_qos(with_deadline(
                    SelectQosRequest {
                        room_id,
                        bandwidth_kb,
                        latency_ms,
                    },
                    timeout,
                ))
                .await?
                .into_inner();
            json!({
                "accepted": response.accepted,
                "error": response.error,
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
