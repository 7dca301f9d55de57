// Snake Arena - terminal runner and headless simulator
use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use notify::{Config, Event as NotifyEvent, RecommendedWatcher, RecursiveMode, Watcher};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::cell::RefCell;
use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use snakearena::config::Args;
use snakearena::logging::init_logging;
use snakearena::render::{self, Palette};
use snakearena::skins::SkinTable;
use snakearena::types::Direction;
use snakearena::{AppConfig, ArenaStats, Session};

const SPEED_STEP: f64 = 0.25;
const INPUT_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, PartialEq, Eq)]
enum KeyAction {
    Continue,
    Quit,
}

/// Forward config file modifications as unit signals
fn spawn_config_watcher(config_path: PathBuf) -> mpsc::Receiver<()> {
    let (change_tx, change_rx) = mpsc::channel();

    std::thread::spawn(move || {
        let (tx, rx) = mpsc::channel();
        let mut watcher = match RecommendedWatcher::new(tx, Config::default()) {
            Ok(w) => w,
            Err(e) => {
                tracing::warn!(error = %e, "Config watcher unavailable");
                return;
            }
        };

        if let Err(e) = watcher.watch(&config_path, RecursiveMode::NonRecursive) {
            tracing::warn!(path = %config_path.display(), error = %e, "Cannot watch config file");
            return;
        }

        loop {
            match rx.recv() {
                Ok(Ok(NotifyEvent { kind, .. })) => {
                    if matches!(kind, notify::EventKind::Modify(_)) && change_tx.send(()).is_err() {
                        break;
                    }
                }
                Err(_) => break,
                _ => {}
            }
        }
    });

    change_rx
}

/// Re-read the config file and rebuild the arena if its table changed
fn reload_config(session: &mut Session, config_path: &Path) -> Option<String> {
    let new_config = match AppConfig::load_from(config_path.to_path_buf()) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "Config reload failed");
            return Some(format!("Config error: {}", e));
        }
    };

    if &new_config.arena == session.config() {
        return None;
    }

    tracing::info!(path = %config_path.display(), "Config changed, rebuilding arena");
    match session.apply_config(new_config.arena) {
        Ok(()) => Some("Config reloaded".to_string()),
        Err(e) => Some(format!("Config rejected: {}", e)),
    }
}

fn handle_key(session: &mut Session, key: KeyEvent, message: &mut Option<String>) -> KeyAction {
    let direction = match key.code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Some(Direction::Up),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Some(Direction::Down),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(Direction::Left),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(Direction::Right),
        _ => None,
    };
    if let Some(direction) = direction {
        session.set_player_direction(direction);
        return KeyAction::Continue;
    }

    let config = session.config().clone();
    let result = match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => return KeyAction::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return KeyAction::Quit,
        KeyCode::Char('p') | KeyCode::Char('P') => {
            if session.is_running() {
                session.stop();
            } else {
                session.start();
            }
            Ok(())
        }
        KeyCode::Char('r') | KeyCode::Char('R') => session.restart(),
        KeyCode::Char('+') | KeyCode::Char('=') => session.set_agent_count(config.agent_count + 1),
        KeyCode::Char('-') => session.set_agent_count(config.agent_count.saturating_sub(1)),
        KeyCode::Char('1'..='3') if config.player_enabled => {
            *message = Some("Difficulty follows the player's score".to_string());
            return KeyAction::Continue;
        }
        KeyCode::Char(c @ '1'..='3') => session.set_difficulty(c as u8 - b'0'),
        KeyCode::Char('[') => session.set_speed_multiplier((config.speed_multiplier - SPEED_STEP).max(SPEED_STEP)),
        KeyCode::Char(']') => session.set_speed_multiplier((config.speed_multiplier + SPEED_STEP).min(4.0)),
        _ => return KeyAction::Continue,
    };

    *message = match result {
        Ok(()) => None,
        Err(e) => Some(e.to_string()),
    };
    KeyAction::Continue
}

fn status_text(session: &Session, message: &Option<String>) -> String {
    if let Some(message) = message {
        return message.clone();
    }
    if session.is_game_over() {
        "Game over - press r to restart".to_string()
    } else if session.is_running() {
        "Running".to_string()
    } else {
        "Paused".to_string()
    }
}

fn terminal_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    session: &mut Session,
    config_path: &Path,
) -> Result<()> {
    let latest: Rc<RefCell<Option<ArenaStats>>> = Rc::new(RefCell::new(None));
    let sink = latest.clone();
    session.set_observer(Box::new(move |stats| {
        *sink.borrow_mut() = Some(stats.clone());
    }));

    let config_changes = spawn_config_watcher(config_path.to_path_buf());
    let palette = Palette::new(session.skins());
    let mut message: Option<String> = None;
    let mut dirty = true;

    session.start();

    loop {
        // Coalesce bursts of file events into one reload
        if config_changes.try_iter().count() > 0 {
            message = reload_config(session, config_path);
            *latest.borrow_mut() = None;
            dirty = true;
        }

        if poll(INPUT_POLL)? {
            if let Event::Key(key) = read()? {
                if key.kind == KeyEventKind::Press {
                    if let KeyAction::Quit = handle_key(session, key, &mut message) {
                        return Ok(());
                    }
                    dirty = true;
                }
            }
        }

        if session.update() {
            dirty = true;
        }

        if dirty {
            let snapshot = latest
                .borrow()
                .clone()
                .unwrap_or_else(|| session.stats(Instant::now()));
            let status = status_text(session, &message);
            terminal.draw(|f| render::draw(f, session.arena(), Some(&snapshot), &palette, &status))?;
            dirty = false;
        }
    }
}

fn run_terminal(mut session: Session, config_path: PathBuf) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    terminal.hide_cursor()?;

    let result = terminal_loop(&mut terminal, &mut session, &config_path);

    terminal.show_cursor().ok();
    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();

    if let Some(player) = session.arena().player() {
        println!("Final score: {}", player.score);
    }
    result
}

/// Step a synthetic clock as fast as possible and print stats as JSON lines
fn run_headless(mut session: Session, ticks: u64, report_every: u64) -> Result<()> {
    let report_every = report_every.max(1);
    session.set_observer(Box::new(move |stats| {
        if stats.tick % report_every != 0 {
            return;
        }
        match serde_json::to_string(stats) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize stats"),
        }
    }));

    let interval = session.arena().update_interval();
    let start = Instant::now();
    session.start();

    let mut clock = start;
    for _ in 0..ticks {
        clock += interval;
        if !session.step(clock) {
            break;
        }
    }

    let stats = session.stats(clock);
    println!("{}", serde_json::to_string(&stats)?);
    tracing::info!(
        ticks = stats.tick,
        alive = stats.alive_agent_count,
        game_over = session.is_game_over(),
        "Headless run finished"
    );
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let cfg_arg = args.cfg.as_deref();
    let config_path = AppConfig::config_path(cfg_arg)?;
    let config_file_exists = config_path.exists();

    let mut config = if config_file_exists {
        match AppConfig::load_with_path(cfg_arg) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config file: {}", e);
                eprintln!("Config file: {}", config_path.display());
                eprintln!("Please fix the config file or delete it to regenerate with defaults.");
                return Err(e);
            }
        }
    } else {
        AppConfig {
            config_path: Some(config_path.clone()),
            ..AppConfig::default()
        }
    };

    let args_provided = config.merge_with_args(&args);
    if !config_file_exists || args_provided {
        config.save()?;
    }

    let log_file = if args.headless { None } else { config.log_path() };
    init_logging(&config.log_level, log_file.as_deref())?;
    tracing::info!(path = %config_path.display(), headless = args.headless, "Starting snakearena");

    let session = Session::new(config.arena.clone(), SkinTable::default())
        .with_context(|| format!("Invalid arena settings in {}", config_path.display()))?;

    if args.headless {
        run_headless(session, args.ticks, args.report_every)
    } else {
        run_terminal(session, config_path)
    }
}
