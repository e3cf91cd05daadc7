use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use base64::{engine::general_purpose, Engine as _};
use clap::{Parser, Subcommand};
use probeflow::config::{EngineConfig, EnvConfig, ACTUATOR_SECRET_ENV};
use probeflow::utils::{ConfigValidator, LoggingConfig};
use probeflow::{schema_exports, ActionService, HeadlessDesktop, ScreenshotCodec};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "probeflow", version, about = "ProbeFlow CLI", author)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Actuator {
        #[command(subcommand)]
        command: ActuatorCommand,
    },
    /// 使用截图压缩器压缩图片
    Codec {
        image: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    Schema {
        #[command(subcommand)]
        command: SchemaCommand,
    },
}

#[derive(Subcommand)]
enum ActuatorCommand {
    /// 在无头桌面上提供动作协议服务
    Serve {
        #[arg(long, default_value = "127.0.0.1:9300")]
        bind: String,
        /// 共享密钥；为空时读取 PROBEFLOW_ACTUATOR_SECRET
        #[arg(long, default_value = "")]
        secret: String,
        #[arg(long, default_value_t = 1280)]
        width: u32,
        #[arg(long, default_value_t = 800)]
        height: u32,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    Check { file: PathBuf },
}

#[derive(Subcommand)]
enum SchemaCommand {
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = true)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    LoggingConfig::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Actuator { command } => match command {
            ActuatorCommand::Serve {
                bind,
                secret,
                width,
                height,
            } => handle_actuator_serve(bind, secret, width, height).await?,
        },
        Command::Codec {
            image,
            output,
            config,
        } => handle_codec(image, output, config)?,
        Command::Config { command } => match command {
            ConfigCommand::Check { file } => handle_config_check(file)?,
        },
        Command::Schema { command } => match command {
            SchemaCommand::Export { output, pretty } => handle_schema_export(output, pretty)?,
        },
    }
    Ok(())
}

async fn handle_actuator_serve(
    bind: String,
    secret: String,
    width: u32,
    height: u32,
) -> anyhow::Result<()> {
    let secret = EnvConfig::get_api_key(&secret, ACTUATOR_SECRET_ENV)?;
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    println!("Actuator listening on ws://{bind}");

    let desktop = Arc::new(HeadlessDesktop::new(width, height));
    let service = Arc::new(ActionService::new(secret, desktop, ScreenshotCodec::default()));
    service.serve(listener).await?;
    Ok(())
}

fn handle_codec(
    image: PathBuf,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
) -> anyhow::Result<()> {
    let codec_config = match config {
        Some(path) => EngineConfig::from_path(path)?.codec,
        None => Default::default(),
    };
    ConfigValidator::validate_codec(&codec_config)?;

    let encoded = ScreenshotCodec::new(codec_config).encode_file(&image)?;
    println!(
        "{:<12} {}x{}\n{:<12} {}\n{:<12} {}\n{:<12} {} bytes ({} base64)",
        "Size",
        encoded.width,
        encoded.height,
        "Quality",
        encoded.quality,
        "Attempts",
        encoded.attempts,
        "Payload",
        encoded.bytes,
        encoded.base64.len()
    );

    if let Some(path) = output {
        let raw = general_purpose::STANDARD.decode(&encoded.base64)?;
        fs::write(&path, raw)?;
        println!("Written to `{}`", path.display());
    }
    Ok(())
}

fn handle_config_check(file: PathBuf) -> anyhow::Result<()> {
    let config = EngineConfig::from_path(&file)?;
    ConfigValidator::validate_engine(&config)?;
    println!(
        "`{}` is valid: agent `{}`, iteration cap {}, actuator {}",
        file.display(),
        config.agent_name,
        config.computer_use.iteration_cap,
        config
            .actuator
            .as_ref()
            .map(|a| a.url.as_str())
            .unwrap_or("not configured")
    );
    Ok(())
}

fn handle_schema_export(output: Option<PathBuf>, pretty: bool) -> anyhow::Result<()> {
    let entries = schema_exports();

    let content = if pretty {
        serde_json::to_string_pretty(&entries)?
    } else {
        serde_json::to_string(&entries)?
    };

    if let Some(path) = output {
        fs::write(&path, content)?;
        println!("Schema exported to `{}`", path.display());
    } else {
        println!("{content}");
    }
    Ok(())
}
