use log::{info, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::channel;
use std::thread;
use structopt::StructOpt;

use netflow9::netflow::ParserState;
use netflow9::settings::Settings;
use netflow9::{logger, threads};

#[derive(StructOpt, Debug)]
#[structopt(name = "netflow9", about = "NetFlow v9 collector")]
struct Opt {
    /// Configuration file overriding the built-in defaults
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub enum ThreadType {
    Listener,
    Parser,
    Exporter,
    Prometheus,
}

fn main() {
    let opt = Opt::from_args();
    let config = Settings::init(opt.config).unwrap();

    logger::init(&config.log.level);

    warn! {"Starting APP"}

    let state = ParserState::new();
    let counters = state.counters();

    let mut thread_maps: HashMap<ThreadType, _> = HashMap::new();
    let (msg_sender, msg_receiver) = channel();
    let (flow_sender, flow_receiver) = channel();

    let listener_host = config.listener.host;
    thread_maps.insert(
        ThreadType::Listener,
        thread::Builder::new().name("listener".to_string()).spawn(move || {
            threads::listener::listen(&listener_host, msg_sender);
        }),
    );

    thread_maps.insert(
        ThreadType::Parser,
        thread::Builder::new().name("parser".to_string()).spawn(move || {
            threads::parser::parse(msg_receiver, flow_sender, state);
        }),
    );

    thread_maps.insert(
        ThreadType::Exporter,
        thread::Builder::new().name("exporter".to_string()).spawn(move || {
            threads::exporter::export(flow_receiver);
        }),
    );

    if config.prometheus.enable {
        let prometheus_host = config.prometheus.host;
        thread_maps.insert(
            ThreadType::Prometheus,
            thread::Builder::new().name("prometheus".to_string()).spawn(move || {
                threads::prometheus::listen(&prometheus_host, counters);
            }),
        );
    }

    for (_, v) in thread_maps {
        v.unwrap().join().unwrap();
    }

    info! {"Closing APP"}
}
