use log::info;
use std::sync::mpsc;

use crate::netflow::ParseResult;

pub fn export(receiver: mpsc::Receiver<ParseResult>) {
    for result in receiver {
        for flowset in result.flowsets() {
            for record in flowset.records() {
                info!("{} - {}", result.exporter(), record);
            }
        }
    }
}
