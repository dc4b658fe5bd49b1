use anyhow::Result;
use clap::Parser;
use log::info;

use spi_mock_rs::server::{self, DEFAULT_PORT};
use spi_mock_rs::{DeviceKind, Peripheral};

#[derive(Parser, Debug)]
#[command(author, version, about = "Mock SPI peripheral for simulation hosts")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, value_enum, default_value_t = DeviceKind::Echo)]
    device: DeviceKind,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let peripheral = args.device.build();
    info!("Serving device {}", peripheral.name());

    let listener = server::bind(&format!("{}:{}", args.bind, args.port)).await?;
    server::serve(listener, server::share(peripheral)).await
}
