use log::{error, info};
use std::io::prelude::*;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;

use crate::netflow::Counters;

pub fn listen(addr: &str, counters: Arc<Counters>) {
    let listener = TcpListener::bind(addr)
        .unwrap_or_else(|e| panic!("Failed to bind tcp socket to {}: {}", addr, e));
    info!("Listening for TCP connection on {}", addr);

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => handle_connection(stream, &counters),
            Err(e) => error!("Connection failed : {}", e),
        }
    }
}

fn handle_connection(mut stream: TcpStream, counters: &Counters) {
    let stats = counters.snapshot();

    let contents = format!(
        "# TYPE netflow_records_total counter\n\
         netflow_records_total {}\n\
         # TYPE netflow_templates_total counter\n\
         netflow_templates_total {}\n\
         # TYPE netflow_option_templates_total counter\n\
         netflow_option_templates_total {}\n\
         # TYPE netflow_missing_template_errors_total counter\n\
         netflow_missing_template_errors_total {}\n\
         # TYPE netflow_malformed_packets_total counter\n\
         netflow_malformed_packets_total {}\n",
        stats.records,
        stats.templates,
        stats.option_templates,
        stats.missing_templates,
        stats.malformed_packets
    );

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\n\r\n{}",
        contents.len(),
        contents
    );

    if let Err(e) = stream.write_all(response.as_bytes()) {
        error!("Failed to write the metrics response: {}", e);
    }
}
