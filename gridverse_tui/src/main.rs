use anyhow::{Context, Result};
use clap::Parser;
use gridverse_core::{
    Action, DoorState, Environment, EnvironmentConfig, GridObject, Orientation, Registries, State,
    StepOutcome, object::Color as ObjectColor,
};
use rand::{SeedableRng, rngs::StdRng, seq::IndexedRandom};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    fs::File,
    io::{self, Stdout},
    path::PathBuf,
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment configuration (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE", default_value = "configs/keydoor.json")]
    config: PathBuf,

    /// Layout file, replacing the layout in the configuration
    #[arg(short, long, value_name = "LAYOUT_FILE")]
    layout: Option<PathBuf>,

    /// Seed for the environment and the random bot
    #[arg(short, long)]
    seed: Option<u64>,

    /// Drive the agent from the keyboard instead of the random bot
    #[arg(long)]
    manual: bool,

    /// Milliseconds between bot steps
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,

    /// Write logs to this file (filtered by RUST_LOG)
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

struct App {
    environment: Environment,
    /// Random action source; `None` under manual control.
    bot: Option<StdRng>,
    last_step: Option<(Action, StepOutcome)>,
    episode_return: f64,
    steps: u32,
    episodes: u32,
    episode_over: bool,
    should_quit: bool,
}

impl App {
    fn new(mut environment: Environment, bot: Option<StdRng>) -> Result<Self> {
        environment.reset()?;
        Ok(App {
            environment,
            bot,
            last_step: None,
            episode_return: 0.0,
            steps: 0,
            episodes: 1,
            episode_over: false,
            should_quit: false,
        })
    }

    fn reset(&mut self) -> Result<()> {
        self.environment.reset()?;
        self.last_step = None;
        self.episode_return = 0.0;
        self.steps = 0;
        self.episodes += 1;
        self.episode_over = false;
        Ok(())
    }

    fn act(&mut self, action: Action) -> Result<()> {
        if self.episode_over {
            return Ok(());
        }
        let outcome = self.environment.step(action)?;
        self.last_step = Some((action, outcome));
        self.episode_return += outcome.reward;
        self.steps += 1;
        if outcome.terminal {
            info!(
                episode = self.episodes,
                steps = self.steps,
                episode_return = self.episode_return,
                "episode finished"
            );
            self.episode_over = true;
        }
        Ok(())
    }

    /// Bot step; a finished episode is restarted on the next tick.
    fn tick(&mut self) -> Result<()> {
        if self.episode_over {
            return self.reset();
        }
        let action = match self.bot.as_mut() {
            Some(rng) => Action::ALL.choose(rng).copied(),
            None => None,
        };
        match action {
            Some(action) => self.act(action),
            None => Ok(()),
        }
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    // without a file, logging would draw over the terminal UI
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn load_config(args: &Args) -> Result<EnvironmentConfig> {
    let json = std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading config file {}", args.config.display()))?;
    let mut config = EnvironmentConfig::from_json(&json)
        .with_context(|| format!("parsing config file {}", args.config.display()))?;

    if let Some(layout_file) = &args.layout {
        let layout = std::fs::read_to_string(layout_file)
            .with_context(|| format!("reading layout file {}", layout_file.display()))?;
        config.set_layout(&layout);
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;

    let config = load_config(&args)?;
    let environment = config
        .build(&Registries::default())
        .context("building environment")?;
    let bot = if args.manual {
        None
    } else {
        Some(match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        })
    };
    let mut app = App::new(environment, bot)?;

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Run the main application loop, restoring the terminal even on error
    let result = run_app(&mut terminal, &mut app, Duration::from_millis(args.tick_ms));

    restore_terminal(&mut terminal)?;

    result
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn manual_action(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Up | KeyCode::Char('w') => Some(Action::MoveForward),
        KeyCode::Down | KeyCode::Char('s') => Some(Action::MoveBackward),
        KeyCode::Char('a') => Some(Action::MoveLeft),
        KeyCode::Char('d') => Some(Action::MoveRight),
        KeyCode::Left => Some(Action::TurnLeft),
        KeyCode::Right => Some(Action::TurnRight),
        KeyCode::Char(' ') => Some(Action::Actuate),
        KeyCode::Char('p') => Some(Action::PickNDrop),
        _ => None,
    }
}

/// Runs the main loop of the TUI application.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App, tick_rate: Duration) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                        KeyCode::Char('r') => app.reset()?,
                        code if app.bot.is_none() => {
                            if let Some(action) = manual_action(code) {
                                app.act(action)?;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            if app.bot.is_some() {
                app.tick()?;
            }
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(70), // grid
            Constraint::Percentage(20), // episode status
            Constraint::Percentage(10), // help
        ])
        .split(frame.area());

    if let Some(state) = app.environment.state() {
        render_grid(frame, main_layout[0], state);
        render_status(frame, main_layout[1], app, state);
    }

    let help = if app.bot.is_some() {
        "Random bot. 'r' reset, 'q'/'Esc' quit."
    } else {
        "w/s/a/d move, arrows turn, space actuate, 'p' pick/drop, 'r' reset, 'q'/'Esc' quit."
    };
    let help_text = Paragraph::new(help)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

fn color_style(color: ObjectColor) -> Style {
    match color {
        ObjectColor::None => Style::default(),
        ObjectColor::Red => Style::default().fg(Color::Red),
        ObjectColor::Green => Style::default().fg(Color::Green),
        ObjectColor::Blue => Style::default().fg(Color::Blue),
        ObjectColor::Yellow => Style::default().fg(Color::Yellow),
    }
}

fn object_span(obj: &GridObject) -> Span<'static> {
    let symbol = match obj {
        GridObject::Floor => " ",
        GridObject::Wall => "#",
        GridObject::Hidden => "?",
        GridObject::Exit { .. } => "E",
        GridObject::Door {
            state: DoorState::Open,
            ..
        } => "+",
        GridObject::Door {
            state: DoorState::Closed,
            ..
        } => "|",
        GridObject::Door {
            state: DoorState::Locked,
            ..
        } => "=",
        GridObject::Key { .. } => "k",
        GridObject::MovingObstacle => "*",
        GridObject::Beacon { .. } => "b",
        GridObject::Telepod { .. } => "T",
    };
    let style = match obj {
        GridObject::Wall => Style::default().fg(Color::DarkGray),
        GridObject::MovingObstacle => Style::default().fg(Color::Magenta),
        _ => color_style(obj.color()),
    };
    Span::styled(symbol, style)
}

fn agent_span(orientation: Orientation) -> Span<'static> {
    let symbol = match orientation {
        Orientation::N => "^",
        Orientation::S => "v",
        Orientation::E => ">",
        Orientation::W => "<",
    };
    Span::styled(symbol, Style::default().fg(Color::Red).bold())
}

/// Renders the grid, with the agent drawn over its cell.
fn render_grid(frame: &mut Frame, area: Rect, state: &State) {
    let grid = &state.grid;
    let lines: Vec<Line> = (0..grid.height())
        .map(|y| {
            let spans: Vec<Span> = (0..grid.width())
                .map(|x| {
                    let position = gridverse_core::Position::new(y as i32, x as i32);
                    if position == state.agent.position {
                        agent_span(state.agent.orientation)
                    } else {
                        object_span(&grid[position])
                    }
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    let grid_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Gridverse").borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(grid_paragraph, area);
}

fn render_status(frame: &mut Frame, area: Rect, app: &App, state: &State) {
    let held = match state.agent.held {
        Some(obj) => object_span(&obj),
        None => Span::raw("nothing"),
    };
    let last = match app.last_step {
        Some((action, outcome)) => format!("{action:?} -> reward {:.2}", outcome.reward),
        None => "-".to_string(),
    };
    let status = if app.episode_over {
        Span::styled("terminated", Style::default().fg(Color::Green).bold())
    } else {
        Span::raw("running")
    };

    let items = vec![
        ListItem::from(Line::from(vec![
            Span::raw(format!("Episode {} step {} ", app.episodes, app.steps)),
            status,
        ])),
        ListItem::from(Line::from(vec![
            Span::raw(format!("Pos: {} Holding: ", state.agent.position)),
            held,
        ])),
        ListItem::from(format!("Last: {last}  Return: {:.2}", app.episode_return)),
    ];
    let status_widget = List::new(items).block(Block::default().borders(Borders::ALL).title("Episode"));
    frame.render_widget(status_widget, area);
}
