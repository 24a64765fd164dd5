// rig-monitor
//
// Full-screen dashboard for a rig: the four indicator lights, the
// scrolling log tail, recent connection events, and a command line.
//
// Quit: Esc / Ctrl-C

use std::collections::VecDeque;
use std::io::{self, Write};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};
use crossbeam::{channel, select};
use crossterm::style::{Attribute, Color, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::{cursor, event, style, terminal, ExecutableCommand, QueueableCommand};
use riglink::feed::{Event, Interface};
use riglink::view::IndicatorStyle;
use riglink_tools::{rig_opts, rig_parseopts, RigConfig};

#[derive(Debug)]
struct Cli {
    fps: u64,
    log_rows: usize,
    event_log_size: usize,
    quiet: bool,
}

fn print_help_and_exit(opts: &getopts::Options, program: &str, code: i32) -> ! {
    let brief = format!(
        "Usage: {program} [options]\n\n\
         Live dashboard for a multi-device rig."
    );
    let usage = opts.usage(&brief);
    eprintln!("{usage}");
    std::process::exit(code)
}

fn parse_cli() -> (RigConfig, Cli) {
    let mut opts = rig_opts();
    opts.optflag("h", "help", "Show help");
    opts.optopt("", "fps", "UI refresh rate (default 10)", "n");
    opts.optopt("", "log-rows", "Log lines to show (default 20)", "n");
    opts.optopt(
        "",
        "event-log-size",
        "Max events to show in log (default 5)",
        "n",
    );
    opts.optflag("", "quiet", "Suppress footer hint");

    let args: Vec<String> = std::env::args().collect();
    let (matches, config) = rig_parseopts(&opts, &args[1..]);
    if matches.opt_present("help") {
        print_help_and_exit(
            &opts,
            &std::env::args()
                .next()
                .unwrap_or_else(|| "rig-monitor".into()),
            0,
        );
    }

    let fps = matches
        .opt_str("fps")
        .as_deref()
        .unwrap_or("10")
        .parse()
        .unwrap_or(10);
    let log_rows = matches
        .opt_str("log-rows")
        .as_deref()
        .unwrap_or("20")
        .parse()
        .unwrap_or(20);
    let event_log_size = matches
        .opt_str("event-log-size")
        .as_deref()
        .unwrap_or("5")
        .parse()
        .unwrap_or(5);
    let quiet = matches.opt_present("quiet");

    (
        config,
        Cli {
            fps,
            log_rows,
            event_log_size,
            quiet,
        },
    )
}

fn style_color(style: IndicatorStyle) -> Color {
    match style {
        IndicatorStyle::Ok => Color::Green,
        IndicatorStyle::Warn => Color::Yellow,
        IndicatorStyle::Bad => Color::Red,
        IndicatorStyle::Off => Color::DarkGrey,
    }
}

#[derive(Clone)]
struct LoggedEvent {
    timestamp: SystemTime,
    event: String,
    color: Color,
}

fn push_event(log: &mut VecDeque<LoggedEvent>, event: String, color: Color, cap: usize) {
    log.push_front(LoggedEvent {
        timestamp: SystemTime::now(),
        event,
        color,
    });
    if log.len() > cap {
        log.pop_back();
    }
}

struct Tui {
    stdout: io::Stdout,
}

impl Tui {
    fn setup() -> io::Result<Self> {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        stdout.execute(terminal::EnterAlternateScreen)?;
        stdout.execute(cursor::Hide)?;
        Ok(Self { stdout })
    }

    fn teardown(&mut self) {
        let _ = self.stdout.execute(cursor::Show);
        let _ = self.stdout.execute(terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
        let _ = self.stdout.flush();
    }

    fn draw(
        &mut self,
        header: &str,
        conn: (&str, Color),
        indicators: &[(&'static str, IndicatorStyle); 4],
        log_lines: &[String],
        input: &str,
        event_log: &VecDeque<LoggedEvent>,
        quiet: bool,
    ) -> io::Result<()> {
        self.stdout.queue(cursor::MoveTo(0, 0))?;
        self.stdout
            .queue(terminal::Clear(terminal::ClearType::All))?;

        // Header
        self.stdout.queue(SetAttribute(Attribute::Bold))?;
        self.stdout.queue(style::Print(header))?;
        self.stdout.queue(SetAttribute(Attribute::Reset))?;
        self.stdout.queue(style::Print("   "))?;
        self.stdout.queue(SetForegroundColor(conn.1))?;
        self.stdout.queue(style::Print(conn.0))?;
        self.stdout.queue(ResetColor)?;
        self.stdout.queue(cursor::MoveToNextLine(2))?;

        // Indicator lights
        for (label, style_) in indicators {
            self.stdout.queue(SetForegroundColor(style_color(*style_)))?;
            self.stdout.queue(style::Print("● "))?;
            self.stdout.queue(ResetColor)?;
            self.stdout.queue(style::Print(format!("{:<8}", label)))?;
        }
        self.stdout.queue(cursor::MoveToNextLine(2))?;

        // Log tail
        for line in log_lines {
            self.stdout.queue(style::Print(line))?;
            self.stdout.queue(cursor::MoveToNextLine(1))?;
        }

        // Recent connection events
        if !event_log.is_empty() {
            self.stdout.queue(cursor::MoveToNextLine(1))?;
            for logged in event_log {
                let datetime: DateTime<Local> = logged.timestamp.into();
                self.stdout.queue(SetForegroundColor(logged.color))?;
                self.stdout.queue(style::Print(format!(
                    "[{}] {}",
                    datetime.format("%H:%M:%S%.3f"),
                    logged.event
                )))?;
                self.stdout.queue(ResetColor)?;
                self.stdout.queue(cursor::MoveToNextLine(1))?;
            }
        }

        // Command line
        self.stdout.queue(cursor::MoveToNextLine(1))?;
        self.stdout.queue(style::Print(format!("> {}", input)))?;
        if !quiet {
            self.stdout.queue(cursor::MoveToNextLine(2))?;
            self.stdout
                .queue(style::Print("Enter sends the typed command, Esc quits"))?;
        }

        self.stdout.flush()
    }
}

fn main() {
    let (config, cli) = parse_cli();

    let mut tui = Tui::setup().expect("TUI setup failed");
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let mut t = Tui {
            stdout: io::stdout(),
        };
        t.teardown();
        original_hook(panic_info);
    }));

    let (status_send, events) = channel::bounded::<Event>(64);
    let interface = Interface::new_feed(config.to_feed_config(), Some(status_send));

    // Command posts happen off the UI thread so a slow rig cannot
    // freeze the repaint loop.
    let (cmd_send, cmd_queue) = channel::unbounded::<String>();
    let (note_send, notes) = channel::unbounded::<String>();
    let sender = interface.clone();
    std::thread::spawn(move || {
        for cmd in cmd_queue.iter() {
            if let Err(err) = sender.send_command(&cmd) {
                if note_send.send(format!("send failed: {:?}", err)).is_err() {
                    break;
                }
            }
        }
    });

    // Keyboard handler
    let (key_send, keys) = channel::unbounded();
    std::thread::spawn(move || loop {
        if let Ok(ev) = event::read() {
            if key_send.send(ev).is_err() {
                break;
            }
        }
    });

    let frame = Duration::from_millis(1000 / cli.fps.max(1));
    let tick = channel::tick(frame);

    let mut conn: (&str, Color) = ("connecting", Color::Yellow);
    let mut input = String::new();
    let mut event_log: VecDeque<LoggedEvent> = VecDeque::new();

    'main: loop {
        select! {
            recv(keys) -> ev => {
                if let Ok(event::Event::Key(k)) = ev {
                    use event::{KeyCode, KeyModifiers};
                    match k.code {
                        KeyCode::Esc => break 'main,
                        KeyCode::Char('c') if k.modifiers == KeyModifiers::CONTROL => break 'main,
                        KeyCode::Enter => {
                            let cmd = input.trim().to_string();
                            input.clear();
                            if !cmd.is_empty() {
                                let _ = cmd_send.send(cmd);
                            }
                        }
                        KeyCode::Backspace => {
                            input.pop();
                        }
                        KeyCode::Char(c) => input.push(c),
                        _ => {}
                    }
                }
            }

            recv(events) -> event => {
                match event {
                    Ok(Event::Connected) => {
                        conn = ("connected", Color::Green);
                        push_event(&mut event_log, "rig connected".to_string(), Color::Green, cli.event_log_size);
                    }
                    Ok(Event::Connecting) => {
                        conn = ("connecting", Color::Yellow);
                    }
                    Ok(Event::Disconnected(err)) => {
                        conn = ("reconnecting", Color::Yellow);
                        push_event(&mut event_log, format!("disconnected: {:?}", err), Color::Red, cli.event_log_size);
                    }
                    Ok(Event::ConnectFailed(_)) => {
                        conn = ("disconnected", Color::Red);
                    }
                    Ok(Event::PayloadError(err)) => {
                        push_event(&mut event_log, format!("bad payload: {}", err), Color::Yellow, cli.event_log_size);
                    }
                    // Messages and snapshots land in the shared state
                    // and show up on the next tick.
                    Ok(_) => {}
                    Err(_) => break 'main,
                }
            }

            recv(notes) -> note => {
                if let Ok(note) = note {
                    push_event(&mut event_log, note, Color::Red, cli.event_log_size);
                }
            }

            recv(tick) -> _ => {
                let view = interface.view();
                let log_lines = interface.log_tail(cli.log_rows);
                let header = format!("rig-monitor — {}", config.url);
                if tui
                    .draw(&header, conn, &view.indicators(), &log_lines, &input, &event_log, cli.quiet)
                    .is_err()
                {
                    break 'main;
                }
            }
        }
    }

    interface.shutdown();
    tui.teardown();
}
