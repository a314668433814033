use log::error;
use std::sync::mpsc;

use crate::entity::udp_message::Message;
use crate::netflow::{self, ParseResult, ParserState};

/// Owns the ParserState for the session: every datagram from the listener is
/// decoded against the same template cache and statistics.
pub fn parse(
    receiver: mpsc::Receiver<Message>,
    sender: mpsc::Sender<ParseResult>,
    mut state: ParserState,
) {
    for msg in receiver {
        match netflow::parse(&msg.buf, msg.addr, &mut state) {
            Ok(result) => {
                if sender.send(result).is_err() {
                    break;
                }
            }
            Err(e) => error!("Error while parsing netflow msg from {}: {}", msg.addr, e),
        }
    }
}
