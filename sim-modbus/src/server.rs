//! The Modbus/TCP server: accepts many concurrent clients polling the
//! register image, each on its own task so a slow poller never blocks
//! another.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sim_registers::map::TOTAL_REGISTERS;
use sim_registers::RegisterImage;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use crate::frame::{
    exception_pdu, frame_response, MbapHeader, EXCEPTION_ILLEGAL_FUNCTION,
    FC_READ_HOLDING_REGISTERS, FC_WRITE_MULTIPLE_REGISTERS, FC_WRITE_SINGLE_REGISTER,
    MBAP_HEADER_LEN,
};

const PRIMARY_PORT: u16 = 502;
const FALLBACK_PORT: u16 = 5020;
const ACCEPT_TIMEOUT: Duration = Duration::from_secs(1);
const READ_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ModbusError {
    #[error("failed to bind {host}:{primary_port} or fallback {host}:{fallback_port}: {source}")]
    BindFailed {
        host: String,
        primary_port: u16,
        fallback_port: u16,
        #[source]
        source: std::io::Error,
    },
}

pub struct ModbusServer {
    image: Arc<RegisterImage>,
    listener: TcpListener,
    bound_addr: SocketAddr,
    running: Arc<AtomicBool>,
}

impl ModbusServer {
    /// Bind to `host:port`. If `port` is the privileged default (502) and
    /// binding fails with a permission error, fall back once to 5020,
    /// logging a warning. Any other bind failure (including the fallback
    /// failing) is fatal.
    pub async fn bind(
        host: &str,
        port: u16,
        image: Arc<RegisterImage>,
    ) -> Result<Self, ModbusError> {
        let primary = format!("{host}:{port}");
        match TcpListener::bind(&primary).await {
            Ok(listener) => {
                let bound_addr = listener.local_addr().unwrap_or_else(|_| {
                    format!("{host}:{port}").parse().expect("valid fallback addr")
                });
                Ok(Self {
                    image,
                    listener,
                    bound_addr,
                    running: Arc::new(AtomicBool::new(true)),
                })
            }
            Err(source) if source.kind() == std::io::ErrorKind::PermissionDenied && port == PRIMARY_PORT => {
                tracing::warn!(
                    host,
                    primary_port = PRIMARY_PORT,
                    fallback_port = FALLBACK_PORT,
                    "permission denied binding Modbus port, falling back"
                );
                let fallback = format!("{host}:{FALLBACK_PORT}");
                let listener =
                    TcpListener::bind(&fallback)
                        .await
                        .map_err(|source| ModbusError::BindFailed {
                            host: host.to_string(),
                            primary_port: PRIMARY_PORT,
                            fallback_port: FALLBACK_PORT,
                            source,
                        })?;
                let bound_addr = listener
                    .local_addr()
                    .unwrap_or_else(|_| fallback.parse().expect("valid fallback addr"));
                Ok(Self {
                    image,
                    listener,
                    bound_addr,
                    running: Arc::new(AtomicBool::new(true)),
                })
            }
            Err(source) => Err(ModbusError::BindFailed {
                host: host.to_string(),
                primary_port: port,
                fallback_port: FALLBACK_PORT,
                source,
            }),
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.bound_addr
    }

    /// A handle that, when set to `false`, stops the accept loop at its next
    /// 1s timeout tick.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Accept connections until `shutdown_handle()` is cleared. Each
    /// connection is handled on its own spawned task.
    pub async fn serve(self) {
        tracing::info!(addr = %self.bound_addr, "modbus server listening");
        while self.running.load(Ordering::Relaxed) {
            match timeout(ACCEPT_TIMEOUT, self.listener.accept()).await {
                Ok(Ok((stream, peer))) => {
                    let image = self.image.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, peer, image).await;
                    });
                }
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "accept failed");
                }
                Err(_timeout_elapsed) => {
                    // no connection within 1s; loop back and re-check `running`
                }
            }
        }
        tracing::info!("modbus server shutting down");
    }
}

async fn handle_connection(mut stream: TcpStream, peer: SocketAddr, image: Arc<RegisterImage>) {
    tracing::debug!(%peer, "client connected");
    loop {
        let mut header_bytes = [0u8; MBAP_HEADER_LEN];
        match timeout(READ_TIMEOUT, stream.read_exact(&mut header_bytes)).await {
            Ok(Ok(())) => {}
            Ok(Err(_eof_or_error)) => break,
            Err(_timeout_elapsed) => break,
        }
        let header = MbapHeader::decode(&header_bytes);
        let body_len = header.length.saturating_sub(1) as usize;
        let mut body = vec![0u8; body_len];
        if timeout(READ_TIMEOUT, stream.read_exact(&mut body))
            .await
            .is_err()
        {
            break;
        }

        let response_pdu = match body.first() {
            Some(&fc) => dispatch(fc, &body[1..], &image),
            None => exception_pdu(0, EXCEPTION_ILLEGAL_FUNCTION),
        };
        let framed = frame_response(&header, &response_pdu);
        if stream.write_all(&framed).await.is_err() {
            break;
        }
    }
    tracing::debug!(%peer, "client disconnected");
}

fn dispatch(function_code: u8, rest: &[u8], image: &RegisterImage) -> Vec<u8> {
    match function_code {
        FC_READ_HOLDING_REGISTERS => fc03(rest, image),
        FC_WRITE_SINGLE_REGISTER => fc06(rest, image),
        FC_WRITE_MULTIPLE_REGISTERS => fc16(rest, image),
        other => exception_pdu(other, EXCEPTION_ILLEGAL_FUNCTION),
    }
}

fn fc03(body: &[u8], image: &RegisterImage) -> Vec<u8> {
    if body.len() < 4 {
        return exception_pdu(FC_READ_HOLDING_REGISTERS, EXCEPTION_ILLEGAL_FUNCTION);
    }
    let start_addr = u16::from_be_bytes([body[0], body[1]]) as usize;
    let quantity = u16::from_be_bytes([body[2], body[3]]) as usize;
    let available = TOTAL_REGISTERS.saturating_sub(start_addr);
    let clamped = quantity.min(available);
    let words = image.get_range(start_addr, clamped);
    let mut pdu = Vec::with_capacity(2 + words.len() * 2);
    pdu.push(FC_READ_HOLDING_REGISTERS);
    pdu.push((words.len() * 2) as u8);
    for word in words {
        pdu.extend_from_slice(&word.to_be_bytes());
    }
    pdu
}

fn fc06(body: &[u8], image: &RegisterImage) -> Vec<u8> {
    if body.len() < 4 {
        return exception_pdu(FC_WRITE_SINGLE_REGISTER, EXCEPTION_ILLEGAL_FUNCTION);
    }
    let addr = u16::from_be_bytes([body[0], body[1]]) as usize;
    let value = u16::from_be_bytes([body[2], body[3]]);
    image.set(addr, value);
    let mut pdu = vec![FC_WRITE_SINGLE_REGISTER];
    pdu.extend_from_slice(&body[0..4]);
    pdu
}

fn fc16(body: &[u8], image: &RegisterImage) -> Vec<u8> {
    if body.len() < 5 {
        return exception_pdu(FC_WRITE_MULTIPLE_REGISTERS, EXCEPTION_ILLEGAL_FUNCTION);
    }
    let start_addr = u16::from_be_bytes([body[0], body[1]]) as usize;
    let qty = u16::from_be_bytes([body[2], body[3]]) as usize;
    let byte_count = body[4] as usize;
    if body.len() < 5 + byte_count || byte_count != qty * 2 {
        return exception_pdu(FC_WRITE_MULTIPLE_REGISTERS, EXCEPTION_ILLEGAL_FUNCTION);
    }
    let mut values = Vec::with_capacity(qty);
    for chunk in body[5..5 + byte_count].chunks_exact(2) {
        values.push(u16::from_be_bytes([chunk[0], chunk[1]]));
    }
    image.set_range(start_addr, &values);
    let mut pdu = vec![FC_WRITE_MULTIPLE_REGISTERS];
    pdu.extend_from_slice(&body[0..4]);
    pdu
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fc03_clamps_to_image_length() {
        let image = RegisterImage::new();
        let body = [0u8, 95, 0, 20]; // start=95, qty=20 -> only 5 words available
        let pdu = fc03(&body, &image);
        assert_eq!(pdu[0], FC_READ_HOLDING_REGISTERS);
        assert_eq!(pdu[1], 10); // 5 words * 2 bytes
    }

    #[test]
    fn fc06_writes_and_echoes() {
        let image = RegisterImage::new();
        let body = [0u8, 3, 0, 123];
        let pdu = fc06(&body, &image);
        assert_eq!(pdu, vec![FC_WRITE_SINGLE_REGISTER, 0, 3, 0, 123]);
        assert_eq!(image.get(3), 123);
    }

    #[test]
    fn fc16_writes_multiple_and_acks() {
        let image = RegisterImage::new();
        // start=3, qty=2, byte_count=4, value pair 0x0000_007B split hi/lo
        let body = [0u8, 3, 0, 2, 4, 0x00, 0x00, 0x00, 0x7B];
        let pdu = fc16(&body, &image);
        assert_eq!(pdu, vec![FC_WRITE_MULTIPLE_REGISTERS, 0, 3, 0, 2]);
        assert_eq!(image.get(3), 0);
        assert_eq!(image.get(4), 0x7B);
    }

    #[test]
    fn unknown_function_code_returns_exception() {
        let image = RegisterImage::new();
        let pdu = dispatch(0x04, &[], &image);
        assert_eq!(pdu, vec![0x84, 0x01]);
    }

    #[tokio::test]
    async fn bind_succeeds_on_ephemeral_port() {
        let image = Arc::new(RegisterImage::new());
        let server = ModbusServer::bind("127.0.0.1", 0, image).await.unwrap();
        assert_ne!(server.local_addr().port(), 0);
    }
}
