use anyhow::{Context, Result};
use log::{debug, error, info};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::peripheral::Peripheral;
use crate::protocol::{ProtocolCommand, ProtocolHandler, ProtocolResponse};
use crate::transaction::{BufferTransaction, Request};

pub const DEFAULT_PORT: u16 = 7086;
const READ_CHUNK_SIZE: usize = 2048;

/// The single device instance shared by every host connection.
pub type SharedPeripheral = Arc<Mutex<Box<dyn Peripheral>>>;

pub fn share(peripheral: Box<dyn Peripheral>) -> SharedPeripheral {
    Arc::new(Mutex::new(peripheral))
}

pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))
}

pub async fn serve(listener: TcpListener, peripheral: SharedPeripheral) -> Result<()> {
    info!(
        "Waiting for connections on {}...",
        listener.local_addr().context("Listener has no local address")?
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let peripheral = peripheral.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, peripheral).await {
                        error!("Error handling connection: {:#}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

pub async fn handle_connection(mut stream: TcpStream, peripheral: SharedPeripheral) -> Result<()> {
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    let mut buf: Vec<u8> = Vec::new();

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        debug!("rx {:x?}", &chunk[..n]);

        let mut processed = 0;
        loop {
            match ProtocolHandler::parse_command(&buf[processed..]) {
                Ok(Some((command, consumed))) => {
                    processed += consumed;
                    debug!("Parsed command: {:?}", command);

                    let response = {
                        let mut peripheral = peripheral.lock().await;
                        process_command(command, peripheral.as_mut())
                    };
                    if let ProtocolResponse::Error(e) = &response {
                        error!("Protocol error: {}", e);
                    }
                    stream.write_all(&response.to_bytes()).await?;
                }
                // wait for the rest of the frame
                Ok(None) => break,
                Err(e) => {
                    let response = ProtocolHandler::create_error_response(e.to_string());
                    stream.write_all(&response.to_bytes()).await?;
                    return Err(e.context("Failed to parse command"));
                }
            }
        }

        buf.drain(..processed);
    }

    Ok(())
}

/// Runs the device callback for one parsed frame.
pub fn process_command(command: ProtocolCommand, peripheral: &mut dyn Peripheral) -> ProtocolResponse {
    match command {
        ProtocolCommand::Event { flags } => {
            let mut request = Request {
                is_init: flags.is_init,
                is_read: flags.is_read,
                is_write: flags.is_write,
                connection: None,
            };
            match peripheral.handle(&mut request) {
                Ok(()) => ProtocolHandler::create_response(Vec::new()),
                Err(e) => ProtocolHandler::create_error_response(format!("{}: {}", peripheral.name(), e)),
            }
        }
        ProtocolCommand::Spi { header, payload } => {
            let mut transaction =
                BufferTransaction::from_parts(header.phase, header.command_len as usize, payload);

            let mut request = Request::access(header.flags.is_read, header.flags.is_write, &mut transaction);
            request.is_init = header.flags.is_init;
            let result = peripheral.handle(&mut request);

            match result {
                Ok(()) => ProtocolHandler::create_response(transaction.into_bytes()),
                Err(e) => ProtocolHandler::create_error_response(format!("{}: {}", peripheral.name(), e)),
            }
        }
        ProtocolCommand::Unknown(cmd) => {
            ProtocolHandler::create_error_response(format!("Unknown command: 0x{:02x}", cmd))
        }
    }
}
