//
// main.rs
// Copyright (C) 2022 matthew <matthew@matthew-VirtualBox>
// Distributed under terms of the MIT license.
//

mod args;
mod host;

use std::error::Error;
use std::io::{Stdout, Write};
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::{
    cursor::MoveTo,
    event::{self, Event, KeyCode as CKeyCode, KeyEvent, KeyModifiers},
    style::{Color, SetForegroundColor},
    terminal::{
        disable_raw_mode, enable_raw_mode, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EnterAlternateScreen, LeaveAlternateScreen,
    },
    QueueableCommand,
};
use flexi_logger::{FileSpec, Logger};
use log::error;

use args::Args;
use host::TerminalHost;
use vim_engine::input::{Input, Inputs, KeyCode, Modifiers, MAPPING_TIMEOUT};
use vim_engine::{Engine, EngineGlobals, EventOutcome};

fn convert_key(key: KeyEvent) -> Option<Input> {
    let mods = Modifiers {
        ctrl: key.modifiers.contains(KeyModifiers::CONTROL),
        alt: key.modifiers.contains(KeyModifiers::ALT),
        shift: key.modifiers.contains(KeyModifiers::SHIFT),
    };
    let plain = !mods.ctrl && !mods.alt;
    let code = match key.code {
        CKeyCode::Char(c) => return Some(Input {
            code: KeyCode::Char(c),
            mods,
            text: if plain { Some(c) } else { None },
        }),
        CKeyCode::Backspace => KeyCode::Backspace,
        CKeyCode::Enter => KeyCode::Enter,
        CKeyCode::Left => KeyCode::Left,
        CKeyCode::Right => KeyCode::Right,
        CKeyCode::Up => KeyCode::Up,
        CKeyCode::Down => KeyCode::Down,
        CKeyCode::Home => KeyCode::Home,
        CKeyCode::End => KeyCode::End,
        CKeyCode::PageUp => KeyCode::PageUp,
        CKeyCode::PageDown => KeyCode::PageDown,
        CKeyCode::Tab => KeyCode::Tab,
        CKeyCode::BackTab => KeyCode::BackTab,
        CKeyCode::Delete => KeyCode::Delete,
        CKeyCode::Insert => KeyCode::Insert,
        CKeyCode::Esc => KeyCode::Esc,
        CKeyCode::F(n) => KeyCode::F(n),
        CKeyCode::Null => return None,
    };
    Some(Input { code, mods, text: None })
}

/// Drives one `TerminalHost`/`Engine` pair over crossterm, mirroring
/// `Curse::run`'s raw-mode/alternate-screen bracketing and
/// `Curse::event_loop`'s poll-then-draw cadence, generalized to drive
/// `vim_engine::Engine` instead of the teacher's own `Vim` state machine
/// and to arm `on_timeout` against the pipeline's mapping-ambiguity
/// window instead of a fixed tick.
struct Session {
    host: TerminalHost,
    engine: Engine,
    exiting: bool,
    pending_since: Option<Instant>,
}

impl Session {
    fn new(mut host: TerminalHost, read_only: bool, startup_commands: Vec<String>) -> Self {
        host.set_read_only(read_only);
        let globals = EngineGlobals::shared();
        let mut engine = Engine::new(globals);
        for cmd in startup_commands {
            let line = format!(":{cmd}<CR>");
            for input in Inputs::parse(&line).0 {
                engine.on_input(&mut host, input);
            }
        }
        Self {
            host,
            engine,
            exiting: false,
            pending_since: None,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.code == CKeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
            self.exiting = true;
            return;
        }
        let Some(input) = convert_key(key) else {
            return;
        };
        let outcome = self.engine.on_input(&mut self.host, input);
        self.dispatch(outcome);
    }

    fn on_tick(&mut self) {
        if let Some(since) = self.pending_since {
            if since.elapsed() >= MAPPING_TIMEOUT {
                let outcome = self.engine.on_timeout(&mut self.host);
                self.dispatch(outcome);
            }
        }
    }

    fn dispatch(&mut self, outcome: EventOutcome) {
        match outcome {
            EventOutcome::Handled => self.pending_since = None,
            EventOutcome::NeedsMoreInput => {
                if self.pending_since.is_none() {
                    self.pending_since = Some(Instant::now());
                }
            }
            // Never produced today (see `EventOutcome::PassThrough`'s own
            // doc comment); treated as handled rather than matched out.
            EventOutcome::PassThrough(_) => self.pending_since = None,
            EventOutcome::Quit => self.exiting = true,
        }
    }

    fn status_line(&mut self) -> String {
        if let Some(cmdline) = self.engine.cmdline_text() {
            return format!(":{cmdline}");
        }
        if let Some(message) = self.host.take_message() {
            return message.text;
        }
        let mode = host::mode_label(self.engine.mode());
        if mode.is_empty() {
            let modified = if self.host.is_modified() { " [+]" } else { "" };
            format!("{}{}", self.host.file_display(), modified)
        } else {
            mode.to_string()
        }
    }
}

struct Terminal {
    out: Stdout,
}

impl Terminal {
    fn enter() -> crossterm::Result<Self> {
        enable_raw_mode()?;
        let mut out = std::io::stdout();
        out.queue(EnterAlternateScreen)?;
        out.queue(DisableLineWrap)?;
        out.flush()?;
        Ok(Self { out })
    }

    fn draw(&mut self, session: &mut Session) -> crossterm::Result<()> {
        let (cols, rows) = crossterm::terminal::size()?;
        self.out.queue(MoveTo(0, 0))?;
        self.out.queue(Clear(ClearType::All))?;
        let body_rows = rows.saturating_sub(1);
        for (i, line) in session.host.lines().iter().take(body_rows as usize).enumerate() {
            self.out.queue(MoveTo(0, i as u16))?;
            let clipped: String = line.chars().take(cols as usize).collect();
            write!(self.out, "{clipped}")?;
        }
        let status_row = rows.saturating_sub(1);
        self.out.queue(MoveTo(0, status_row))?;
        self.out.queue(SetForegroundColor(Color::Yellow))?;
        write!(self.out, "{}", session.status_line())?;
        self.out.queue(SetForegroundColor(Color::Reset))?;
        let cursor = session.host.cursor_pos();
        self.out.queue(MoveTo(
            cursor.col.min(cols.saturating_sub(1) as usize) as u16,
            cursor.line.min(body_rows.saturating_sub(1) as usize) as u16,
        ))?;
        self.out.flush()?;
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = self.out.queue(EnableLineWrap);
        let _ = self.out.queue(LeaveAlternateScreen);
        let _ = self.out.flush();
    }
}

fn panic_cleanup(info: &std::panic::PanicInfo) {
    let mut out = std::io::stdout();
    let _ = disable_raw_mode();
    let _ = out.queue(EnableLineWrap);
    let _ = out.queue(LeaveAlternateScreen);
    let _ = out.flush();
    error!("panic: {info}");
}

fn main() -> Result<(), Box<dyn Error>> {
    let _logger = Logger::try_with_env()?
        .log_to_file(FileSpec::try_from("./rvim.log")?)
        .start()?;
    std::panic::set_hook(Box::new(panic_cleanup));

    let args = Args::parse();
    let host = match &args.file {
        Some(path) => TerminalHost::open(path.clone())?,
        None => TerminalHost::empty(),
    };
    let mut session = Session::new(host, args.read_only, args.command);

    let mut terminal = Terminal::enter()?;
    terminal.draw(&mut session)?;
    while !session.exiting {
        if event::poll(Duration::from_millis(20))? {
            match event::read()? {
                Event::Key(key) => session.on_key(key),
                Event::Resize(_, _) => {}
                _ => {}
            }
        } else {
            session.on_tick();
        }
        terminal.draw(&mut session)?;
    }
    Ok(())
}
