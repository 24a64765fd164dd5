//! rig-console
//!
//! Line-oriented operator console for a rig. Prints every log line
//! and connection event as it arrives, and sends typed lines to the
//! rig as commands. `--poll` switches from the live stream to
//! periodic snapshot requests against the same data model.

use std::env;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use crossbeam::{channel, select};
use riglink::feed::{Event, Interface, PollClient};
use riglink::view::{format_line, AggregatedView, StatusAggregator};
use riglink_tools::{rig_opts, rig_parseopts};

macro_rules! log{
    ($tf:expr, $msg:expr)=>{
    {
        println!("{}{}", chrono::Local::now().format(&$tf), $msg);
    }
    };
    ($tf:expr, $f:expr,$($a:tt)*)=>{
    {
        log!($tf, format!($f, $($a)*));
    }
    };
}

fn status_line(view: AggregatedView) -> String {
    format!(
        "status: ready={} armed={} win={} fail={}",
        view.ready, view.armed, view.win, view.fail
    )
}

fn main() -> ExitCode {
    let mut opts = rig_opts();
    opts.optflag("v", "", "Verbose output");
    opts.optopt("t", "", "Timestamp format (default '%T%.3f ')", "fmt");
    opts.optopt(
        "",
        "poll",
        "Poll snapshots every SECONDS instead of streaming",
        "seconds",
    );
    opts.optflag("h", "help", "Show help");

    let args: Vec<String> = env::args().collect();

    macro_rules! die{
        ($f:expr,$($a:tt)*)=>{
        {
            die!(format!($f, $($a)*));
        }
        };
        ($msg:expr)=>{
        {
            eprintln!("ERROR: {}", $msg);
            return ExitCode::FAILURE;
        }
        };
    }

    let (matches, config) = rig_parseopts(&opts, &args[1..]);
    if matches.opt_present("help") {
        let usage = format!("Usage: {} [options]", &args[0]);
        println!("{}", opts.usage(&usage));
        return ExitCode::SUCCESS;
    }
    let verbose = matches.opt_present("v");
    let tf = matches.opt_str("t").unwrap_or("%T%.3f ".to_string());

    // Typed lines become commands. The channel disconnects on EOF.
    let (line_send, mut lines) = channel::bounded::<String>(10);
    thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if line_send.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    if let Some(interval) = matches.opt_str("poll") {
        let interval: u64 = match interval.parse() {
            Ok(secs) => secs,
            Err(_) => die!("Invalid poll interval '{}'", interval),
        };
        let interval = interval.max(1);
        let poll = PollClient::new(&config.url);
        let mut status = StatusAggregator::with_scope_role(&config.scope);
        let mut cursor: Option<u64> = None;
        let mut last_view: Option<AggregatedView> = None;
        let tick = channel::tick(Duration::from_secs(interval));
        log!(tf, "Polling {} every {}s", config.url, interval);
        loop {
            select! {
                recv(tick) -> _ => {
                    match poll.fetch_messages(cursor) {
                        Ok(messages) => {
                            for msg in &messages {
                                if let Some(id) = msg.id {
                                    cursor = Some(cursor.unwrap_or(0).max(id));
                                }
                                log!(tf, "{}", format_line(msg));
                            }
                        }
                        Err(err) => {
                            if verbose {
                                log!(tf, "Poll error: {:?}", err);
                            }
                        }
                    }
                    match poll.fetch_status() {
                        Ok(snapshot) => {
                            let view = status.apply(&snapshot);
                            if last_view != Some(view) {
                                log!(tf, "{}", status_line(view));
                                last_view = Some(view);
                            }
                        }
                        Err(err) => {
                            if verbose {
                                log!(tf, "Poll error: {:?}", err);
                            }
                        }
                    }
                }
                recv(lines) -> line => {
                    match line {
                        Ok(cmd) => {
                            if cmd.trim().is_empty() {
                                continue;
                            }
                            if let Err(err) = poll.send_command(&cmd) {
                                log!(tf, "Send failed: {:?}", err);
                            }
                        }
                        Err(_) => break,
                    }
                }
            }
        }
        return ExitCode::SUCCESS;
    }

    let (status_send, events) = channel::bounded::<Event>(64);
    let interface = Interface::new_feed(config.to_feed_config(), Some(status_send));
    log!(tf, "Watching {}", config.url);
    let mut last_view: Option<AggregatedView> = None;
    loop {
        select! {
            recv(events) -> event => {
                match event {
                    Ok(Event::Message(line)) => {
                        log!(tf, "{}", line);
                    }
                    Ok(Event::Status(view)) => {
                        if last_view != Some(view) {
                            log!(tf, "{}", status_line(view));
                            last_view = Some(view);
                        }
                    }
                    Ok(Event::Connected) => {
                        log!(tf, "Rig connected");
                    }
                    Ok(Event::Disconnected(err)) => {
                        log!(tf, "Rig disconnected: {:?}", err);
                    }
                    Ok(Event::ConnectFailed(err)) => {
                        if verbose {
                            log!(tf, "Connect failed: {:?}", err);
                        }
                    }
                    Ok(Event::PayloadError(err)) => {
                        log!(tf, "Bad payload: {}", err);
                    }
                    Ok(Event::Connecting) => {
                        if verbose {
                            log!(tf, "Connecting...");
                        }
                    }
                    Ok(Event::Exiting) | Err(_) => break,
                }
            }
            recv(lines) -> line => {
                match line {
                    Ok(cmd) => {
                        if cmd.trim().is_empty() {
                            continue;
                        }
                        if let Err(err) = interface.send_command(&cmd) {
                            log!(tf, "Send failed: {:?}", err);
                        }
                    }
                    Err(_) => {
                        // Stdin closed: wind down and wait for the
                        // core to acknowledge with Exiting.
                        interface.shutdown();
                        lines = channel::never();
                    }
                }
            }
        }
    }
    ExitCode::SUCCESS
}
