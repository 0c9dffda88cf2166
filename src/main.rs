//! The `loopcall` binary.
//! It runs one simulated call between side A and side B, then relays stdin
//! lines from A to B over the chat channel.

use std::{env, sync::Arc, time::Duration};

use loopcall::{
    chat::ChatFacade,
    config::Config,
    endpoint::EndpointId,
    log::{LogSink, logger::Logger},
    media::SyntheticMediaSource,
    orchestrator::{CallConfig, CallOrchestrator},
};
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_CONFIG: &str = "loopcall.conf";
const DELIVERY_WAIT: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    let config_result = if args.len() > 1 {
        let path = &args[1];
        println!("Loading config from {path}");
        Config::load(path)
    } else {
        Config::load(DEFAULT_CONFIG)
    };
    let config = config_result.unwrap_or_else(|e| {
        eprintln!("Error loading config: {e}. Using empty config.");
        Config::empty()
    });

    let logger = Logger::start_from_config(4096, 256, 16, &config);
    let sink: Arc<dyn LogSink> = Arc::new(logger.handle());
    println!("Logging to {}", logger.file_path().display());

    let call_config = match CallConfig::from_config(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid call settings: {e}");
            std::process::exit(2);
        }
    };

    let orchestrator = CallOrchestrator::new(
        call_config,
        Arc::new(SyntheticMediaSource::new()),
        Arc::clone(&sink),
    );
    let mut call = match orchestrator.start().await {
        Ok(call) => call,
        Err(e) => {
            eprintln!("Call failed: {e}");
            std::process::exit(1);
        }
    };

    let (Some(mut a_events), Some(mut b_events)) = (
        call.take_channel_events(EndpointId::A),
        call.take_channel_events(EndpointId::B),
    ) else {
        eprintln!("Channel events already taken");
        return;
    };
    let mut chat_a = ChatFacade::new(call.channel(EndpointId::A).clone(), Arc::clone(&sink));
    let mut chat_b = ChatFacade::new(call.channel(EndpointId::B).clone(), Arc::clone(&sink));
    chat_a.drain(&mut a_events);
    chat_b.drain(&mut b_events);
    println!("Connected. Type a line to send it from A; Ctrl-D hangs up.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("stdin: {e}");
                break;
            }
        };
        match chat_a.submit(&line) {
            Ok(false) => continue,
            Ok(true) => {
                if let Ok(Some(event)) = tokio::time::timeout(DELIVERY_WAIT, b_events.recv()).await {
                    chat_b.handle_event(event);
                }
            }
            Err(e) => eprintln!("Send failed: {e}"),
        }
        chat_a.drain(&mut a_events);
        chat_b.drain(&mut b_events);
        print_logs(&chat_a, &chat_b);
        while let Some(l) = logger.try_recv_ui() {
            println!("  [log] {l}");
        }
    }

    call.hang_up().await;
    chat_a.drain(&mut a_events);
    chat_b.drain(&mut b_events);
    print_logs(&chat_a, &chat_b);
}

fn print_logs(a: &ChatFacade, b: &ChatFacade) {
    println!("== A ==\n{}", a.render());
    println!("== B ==\n{}", b.render());
}
