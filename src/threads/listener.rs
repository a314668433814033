use log::{debug, error, info};
use std::net::UdpSocket;
use std::sync::mpsc;

use crate::entity::udp_message::Message;

/// Largest payload a UDP datagram can carry; NetFlow packets are far
/// smaller in practice but the exporter decides.
const MAX_DATAGRAM_SIZE: usize = 65535;

pub fn listen(url: &str, sender: mpsc::Sender<Message>) {
    let socket = UdpSocket::bind(url).unwrap_or_else(|e| panic!("Failed to bind udp socket to {}: {}", url, e));
    info!("Listening on {}", url);

    let mut buf = [0; MAX_DATAGRAM_SIZE];

    loop {
        debug!("Waiting for data...");
        let (received_bytes, from) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) => {
                error!("Error while reading from the udp socket: {}", e);
                continue;
            }
        };
        debug!("Received {} bytes from {}", received_bytes, from);

        let msg = Message {
            addr: from,
            buf: buf[..received_bytes].to_vec(),
        };

        if sender.send(msg).is_err() {
            // parser thread is gone, nothing left to feed
            break;
        }
    }

    info!("Closing UDP socket on {}", url);
}
