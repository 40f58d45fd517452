#![forbid(unsafe_code)]

mod about;
mod constants;
mod error;
mod event_handler;
mod event_log;
mod geometry;
mod main_window;
mod persistence;
mod shell;
mod x11_utils;

use clap::Parser;
use tracing::{error, info, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;
use x11rb::connection::Connection;
use x11rb::protocol::Event;

use event_handler::{dispatch, EventTranslator};
use event_log::EventLog;
use main_window::{MainWindow, ShowMode};
use persistence::ConfigStore;
use shell::{Flow, ShellSettings, WindowShell};
use x11_utils::{pointer_buttons_held, AppContext, CachedAtoms, Keymap};

/// Single-window desktop shell that remembers where it was left
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Initial window state
    #[arg(long, value_enum, default_value_t = ShowMode::Normal)]
    show: ShowMode,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(TraceLevel::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let settings = ShellSettings::default();
    let log = EventLog::new(&settings.log_path);
    let store = ConfigStore::new(&settings.config_path);
    info!(config = %store.path().display(), log = %log.path().display(), "using geometry and event files");
    let config = store.load(&log);

    let (conn, screen_num) = x11rb::connect(None)?;
    let screen = &conn.setup().roots[screen_num];
    info!("successfully connected to x11: screen={screen_num}, dimensions={}x{}",
          screen.width_in_pixels, screen.height_in_pixels);

    // Pre-cache atoms and the keyboard map once at startup
    let atoms = CachedAtoms::new(&conn)?;
    let keymap = Keymap::query(&conn)?;

    let ctx = AppContext {
        conn: &conn,
        screen,
        atoms: &atoms,
        keymap: &keymap,
    };

    let placement = config.placement(settings.min_track_size);
    let main_window = MainWindow::create(ctx, placement, settings.min_track_size, cli.show)
        .inspect_err(|e| error!("{e}"))?;
    let mut translator = EventTranslator::new(main_window.window);
    let mut shell = WindowShell::new(main_window, config, store, log, settings.min_track_size);

    loop {
        let event = match shell.backend_mut().next_deferred() {
            Some(event) => event,
            None => match conn.poll_for_event()? {
                Some(event) => event,
                None => {
                    if translator.in_gesture() {
                        let held = pointer_buttons_held(&conn, screen)?;
                        if let Some(gesture_end) = translator.end_if_released(held)
                            && dispatch(&mut shell, &mut translator, [gesture_end]) == Flow::Quit
                        {
                            break;
                        }
                    }
                    conn.wait_for_event()?
                }
            },
        };

        if let Event::DestroyNotify(e) = &event
            && e.window == shell.backend().window
        {
            shell.backend_mut().mark_destroyed();
        }

        let shell_events = match translator.translate(&ctx, event) {
            Ok(events) => events,
            Err(err) => {
                error!("encountered error translating event: err={err:#?}");
                continue;
            }
        };
        if dispatch(&mut shell, &mut translator, shell_events) == Flow::Quit {
            break;
        }
    }

    info!("main window destroyed, exiting");
    Ok(())
}
